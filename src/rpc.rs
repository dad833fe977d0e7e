use crate::error::{BanError, FetchError, RpcError};
use crate::peers::{parse_snapshot, Snapshot};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Where peer snapshots come from.
#[async_trait]
pub trait PeerSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}

/// Where ban requests go.
#[async_trait]
pub trait BanRequester: Send + Sync {
    async fn request_ban(&self, ip: &str) -> Result<(), BanError>;
}

/// Talks to the node through its command-line RPC client (`bitcoin-cli` and friends).
///
/// Calls are not bounded here; callers wrap them in a timeout and the child is killed
/// when the future is dropped.
#[derive(Clone, Debug)]
pub struct CliRpc {
    program: String,
    args: Vec<String>,
}

impl CliRpc {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn call(&self, method: &str, params: &[&str]) -> Result<String, RpcError> {
        debug!("{} {} {:?}", self.program, method, params);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(method)
            .args(params)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RpcError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RpcError::Failed {
                method: method.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PeerSource for CliRpc {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let json = self.call("getpeerinfo", &[]).await?;
        Ok(parse_snapshot(&json)?)
    }
}

#[async_trait]
impl BanRequester for CliRpc {
    async fn request_ban(&self, ip: &str) -> Result<(), BanError> {
        self.call("setban", &[ip, "add"])
            .await
            .map(|_| ())
            .map_err(|source| BanError::Rejected {
                ip: ip.to_string(),
                source,
            })
    }
}
