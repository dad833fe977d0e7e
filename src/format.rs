use crate::peers::PingTime;

const SECS_PER_DAY: i64 = 86_400;
const BYTES_PER_MB: f64 = 1_048_576.0;

pub const NOT_AVAILABLE: &str = "N/A";

/// Time since `conntime`: `HH:MM:SS` up to and including one day, fractional days beyond.
pub fn connection_duration(conntime: i64, now: i64) -> String {
    let elapsed = now.saturating_sub(conntime).max(0);
    if elapsed <= SECS_PER_DAY {
        let hours = elapsed / 3600;
        let minutes = (elapsed % 3600) / 60;
        let seconds = elapsed % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:.1} days", elapsed as f64 / SECS_PER_DAY as f64)
    }
}

pub fn bytes_to_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Ping in seconds with three decimals; absent or unparseable values read `N/A`.
pub fn format_ping(ping: Option<&PingTime>) -> String {
    match ping.map(PingTime::seconds) {
        Some(Ok(secs)) if secs.is_finite() => format!("{:.3}", secs),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Keeps the first `max_len` characters and appends `...`, so the result may be `max_len + 3` long.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_len).collect();
    out.push_str("...");
    out
}
