use futures_util::Stream;
use std::pin::Pin;
use std::time::Duration;

pub type GenericBoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Per-run settings for the refresh loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Peers whose banscore exceeds this are banned. `None` disables banning.
    pub ban_threshold: Option<i64>,
    /// Max subver characters before the ellipsis.
    pub truncate_width: usize,
    /// Upper bound on each call to the node.
    pub fetch_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            ban_threshold: None,
            truncate_width: 20,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Header and alignment of each column, in `DisplayRow::cells` order.
pub const COLUMNS: [(&str, Align); 14] = [
    ("ID", Align::Right),
    ("Address", Align::Left),
    ("Connected For", Align::Left),
    ("Services", Align::Left),
    ("Version", Align::Left),
    ("Protocol", Align::Left),
    ("Bytes Out", Align::Right),
    ("Bytes In", Align::Right),
    ("Ping Time", Align::Right),
    ("Direction", Align::Left),
    ("Synced Headers", Align::Left),
    ("Synced Blocks", Align::Left),
    ("Ban Score", Align::Left),
    ("Relays TX", Align::Left),
];

/// One formatted table row, rebuilt every refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayRow {
    pub id: String,
    pub addr: String,
    pub connected_for: String,
    pub services: String,
    pub subver: String,
    pub version: String,
    pub bytes_sent: String,
    pub bytes_recv: String,
    pub ping: String,
    pub direction: String,
    pub synced_headers: String,
    pub synced_blocks: String,
    pub banscore: String,
    pub relay: String,
    /// The peer does not advertise full block service.
    pub anomalous: bool,
}

impl DisplayRow {
    pub fn cells(&self) -> [&str; 14] {
        [
            &self.id,
            &self.addr,
            &self.connected_for,
            &self.services,
            &self.subver,
            &self.version,
            &self.bytes_sent,
            &self.bytes_recv,
            &self.ping,
            &self.direction,
            &self.synced_headers,
            &self.synced_blocks,
            &self.banscore,
            &self.relay,
        ]
    }
}
