use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to the node's RPC client.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{method}` failed ({status}): {stderr}")]
    Failed {
        method: String,
        status: String,
        stderr: String,
    },
}

/// Why a peer snapshot could not be obtained. Recovered by retrying next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("malformed peer list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("peer list not returned within {0:?}")]
    Timeout(Duration),
}

/// The node refused (or never answered) a ban request. Reported, never escalated.
#[derive(Debug, Error)]
pub enum BanError {
    #[error("ban of {ip} failed: {source}")]
    Rejected {
        ip: String,
        #[source]
        source: RpcError,
    },
    #[error("ban of {ip} not confirmed within {after:?}")]
    Timeout { ip: String, after: Duration },
}

/// One field of one peer record had an unexpected shape.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed `{field}`: {reason}")]
pub struct MalformedField {
    pub field: &'static str,
    pub reason: String,
}
