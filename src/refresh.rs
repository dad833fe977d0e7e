use crate::error::{BanError, FetchError};
use crate::peers::{RawPeer, Snapshot};
use crate::policy::{evaluate, Action};
use crate::row::RowBuilder;
use crate::rpc::{BanRequester, PeerSource};
use crate::shutdown::Shutdown;
use crate::sink::TableSink;
use crate::types::RefreshConfig;
use chrono::Utc;
use futures_util::future::join_all;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub enum LoopState {
    Idle,
    Fetching,
    Rendering(Snapshot),
    Waiting,
    Cancelled,
}

/// Fetch one snapshot, giving up after `limit`.
async fn fetch_with_timeout<S: PeerSource + ?Sized>(
    source: &S,
    limit: Duration,
) -> Result<Snapshot, FetchError> {
    match time::timeout(limit, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

fn wall_clock() -> i64 {
    Utc::now().timestamp()
}

/// One fetch/render cycle at a time, separated by an interruptible wait.
pub struct RefreshLoop<S, B, T> {
    source: S,
    bans: B,
    sink: T,
    cfg: RefreshConfig,
    rows: RowBuilder,
    shutdown: Shutdown,
    clock: fn() -> i64,
}

impl<S, B, T> RefreshLoop<S, B, T>
where
    S: PeerSource,
    B: BanRequester,
    T: TableSink,
{
    pub fn new(source: S, bans: B, sink: T, cfg: RefreshConfig, shutdown: Shutdown) -> Self {
        Self {
            source,
            bans,
            sink,
            cfg,
            rows: RowBuilder::default(),
            shutdown,
            clock: wall_clock,
        }
    }

    /// Replace the wall clock used for connection durations.
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Refresh until cancelled. Only a failure of the very first fetch is returned.
    pub async fn run(&mut self) -> Result<(), FetchError> {
        self.drive(false).await
    }

    /// Fetch and render a single table.
    pub async fn run_once(&mut self) -> Result<(), FetchError> {
        self.drive(true).await
    }

    async fn drive(&mut self, once: bool) -> Result<(), FetchError> {
        info!("Refresh loop started, interval {:?}", self.cfg.interval);
        let mut state = LoopState::Idle;
        let mut started = false;
        loop {
            state = match state {
                LoopState::Cancelled => break,
                LoopState::Fetching if !started => {
                    let snapshot = fetch_with_timeout(&self.source, self.cfg.fetch_timeout).await?;
                    started = true;
                    LoopState::Rendering(snapshot)
                }
                LoopState::Waiting if once => LoopState::Cancelled,
                other => self.step(other).await,
            };
        }
        info!("Refresh loop stopped");
        Ok(())
    }

    pub async fn step(&mut self, state: LoopState) -> LoopState {
        match state {
            LoopState::Idle => LoopState::Fetching,
            LoopState::Fetching => match fetch_with_timeout(&self.source, self.cfg.fetch_timeout).await {
                Ok(snapshot) => {
                    debug!("Fetched {} peers", snapshot.len());
                    LoopState::Rendering(snapshot)
                }
                Err(e) => {
                    warn!("Peer fetch failed, retrying next tick: {}", e);
                    if let Err(e) = self.sink.show_error(&e.to_string()) {
                        error!("Failed to draw error banner: {}", e);
                    }
                    LoopState::Waiting
                }
            },
            LoopState::Rendering(snapshot) => {
                self.render(&snapshot).await;
                LoopState::Waiting
            }
            LoopState::Waiting => self.wait().await,
            LoopState::Cancelled => LoopState::Cancelled,
        }
    }

    async fn render(&mut self, snapshot: &[RawPeer]) {
        let now = (self.clock)();
        let rows = self.rows.build_all(snapshot, now, &self.cfg);
        let notices = self.enforce(snapshot).await;
        if let Err(e) = self.sink.render(&rows, &notices) {
            error!("Failed to draw peer table: {}", e);
        }
    }

    /// Apply the peer policy; returns one notice line per warning or ban outcome.
    /// Bans are sent together, so the cycle waits at most one timeout for them.
    async fn enforce(&self, snapshot: &[RawPeer]) -> Vec<String> {
        let actions: Vec<Action> = snapshot
            .iter()
            .map(|peer| evaluate(peer, &self.cfg))
            .collect();

        let bans = snapshot
            .iter()
            .zip(&actions)
            .filter_map(|(peer, action)| match action {
                Action::RequestBan(ip) => {
                    info!(
                        "Banning peer {} with banscore {}",
                        peer.addr,
                        peer.banscore.unwrap_or_default()
                    );
                    Some(self.ban(ip))
                }
                _ => None,
            });
        let mut outcomes = join_all(bans).await.into_iter();

        let mut notices = Vec::new();
        for action in &actions {
            match action {
                Action::None => {}
                Action::Warn(addr) => {
                    warn!("Peer {} is missing NODE_NETWORK service", addr);
                    notices.push(format!("Warning: peer {} is missing NODE_NETWORK", addr));
                }
                Action::RequestBan(ip) => match outcomes.next() {
                    Some(Ok(())) => notices.push(format!("Banned {}", ip)),
                    Some(Err(e)) => {
                        warn!("{}", e);
                        notices.push(format!("Warning: {}", e));
                    }
                    None => {}
                },
            }
        }
        notices
    }

    async fn ban(&self, ip: &str) -> Result<(), BanError> {
        let limit = self.cfg.fetch_timeout;
        match time::timeout(limit, self.bans.request_ban(ip)).await {
            Ok(result) => result,
            Err(_) => Err(BanError::Timeout {
                ip: ip.to_string(),
                after: limit,
            }),
        }
    }

    async fn wait(&self) -> LoopState {
        if self.shutdown.is_triggered() {
            return LoopState::Cancelled;
        }
        tokio::select! {
            _ = time::sleep(self.cfg.interval) => LoopState::Fetching,
            _ = self.shutdown.cancelled() => {
                info!("Cancellation received");
                LoopState::Cancelled
            }
        }
    }
}
