mod error;
mod format;
mod keys;
mod peers;
mod policy;
mod refresh;
mod row;
mod rpc;
mod services;
mod shutdown;
mod sink;
mod types;

use clap::Parser;
use error::FetchError;
use refresh::RefreshLoop;
use rpc::CliRpc;
use shutdown::Shutdown;
use sink::{PlainSink, ScreenSink, TableSink};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::RefreshConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Live view of a full node's peer connections")]
struct Args {
    #[arg(
        long,
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Refresh interval, in seconds"
    )]
    interval: u64,

    /// Ban peers whose banscore is above this value
    #[arg(long)]
    ban_threshold: Option<i64>,

    /// Characters of the client version shown before it is cut off
    #[arg(long, default_value = "20")]
    truncate_width: usize,

    #[arg(
        long,
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Give up on a node call after this many seconds"
    )]
    timeout: u64,

    /// Node RPC client executable
    #[arg(long, default_value = "bitcoin-cli")]
    cli: String,

    /// Extra argument passed to the RPC client before the method, e.g. --rpc-arg=-testnet
    #[arg(long = "rpc-arg", allow_hyphen_values = true)]
    rpc_args: Vec<String>,

    /// Print the peer table once and exit
    #[arg(long, conflicts_with = "plain")]
    once: bool,

    /// Append a table on every refresh instead of redrawing the screen
    #[arg(long)]
    plain: bool,

    #[arg(long, help = "Write logs to this file")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: Duration::from_secs(self.interval),
            ban_threshold: self.ban_threshold,
            truncate_width: self.truncate_width,
            fetch_timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// The dashboard owns the terminal, so logs only reach it in line-oriented modes.
fn init_logging(args: &Args) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (&args.log_file, args.once || args.plain) {
        (Some(path), _) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        (None, true) => builder.with_writer(io::stderr).init(),
        (None, false) => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

async fn drive<T: TableSink>(
    mut refresh: RefreshLoop<CliRpc, CliRpc, T>,
    once: bool,
) -> Result<(), FetchError> {
    if once {
        refresh.run_once().await
    } else {
        refresh.run().await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let cfg = args.refresh_config();
    let rpc = CliRpc::new(args.cli.clone(), args.rpc_args.clone());
    let shutdown = Shutdown::new();

    tokio::spawn({
        let interrupt_handle = shutdown.clone();
        async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            interrupt_handle.trigger();
        }
    });

    let outcome = if args.once || args.plain {
        let sink = PlainSink::new(io::stdout(), io::stdout().is_terminal());
        let refresh = RefreshLoop::new(rpc.clone(), rpc, sink, cfg, shutdown.clone());
        drive(refresh, args.once).await
    } else {
        let sink = ScreenSink::new(io::stdout())?;
        let keys_handle = tokio::spawn(keys::watch_keys(shutdown.clone()));
        let refresh = RefreshLoop::new(rpc.clone(), rpc, sink, cfg, shutdown.clone());
        let outcome = drive(refresh, false).await;
        // stops the key watcher; the screen was restored when the loop was dropped
        shutdown.trigger();
        let _ = keys_handle.await;
        outcome
    };

    // the only fatal path: no answer from the node before the first table
    if let Err(e) = outcome {
        error!("Cannot reach node through '{}': {}", args.cli, e);
        eprintln!("peerwatch: cannot reach node through '{}': {}", args.cli, e);
        std::process::exit(1);
    }

    info!("Exiting");
    Ok(())
}
