use crate::format::{bytes_to_mb, connection_duration, format_ping, truncate, NOT_AVAILABLE};
use crate::peers::RawPeer;
use crate::services::{join_labels, ServiceDecoder, ServiceTag};
use crate::types::{DisplayRow, RefreshConfig};

/// Turns raw peers into display rows. Pure: the caller supplies `now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowBuilder {
    decoder: ServiceDecoder,
}

impl RowBuilder {
    pub fn build(&self, peer: &RawPeer, now: i64, cfg: &RefreshConfig) -> DisplayRow {
        let tags = self.decoder.decode(peer.services);
        DisplayRow {
            id: peer.id.to_string(),
            addr: peer.addr.clone(),
            connected_for: connection_duration(peer.conntime, now),
            services: join_labels(&tags),
            subver: truncate(&peer.subver, cfg.truncate_width),
            version: peer.version.to_string(),
            bytes_sent: bytes_to_mb(peer.bytessent),
            bytes_recv: bytes_to_mb(peer.bytesrecv),
            ping: format_ping(peer.pingtime.as_ref()),
            direction: if peer.inbound { "Inbound" } else { "Outbound" }.to_string(),
            synced_headers: peer.synced_headers.to_string(),
            synced_blocks: peer.synced_blocks.to_string(),
            banscore: peer
                .banscore
                .map(|score| score.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            relay: if peer.relaytxes { "Yes" } else { "No" }.to_string(),
            anomalous: !tags.contains(&ServiceTag::Network),
        }
    }

    pub fn build_all(&self, snapshot: &[RawPeer], now: i64, cfg: &RefreshConfig) -> Vec<DisplayRow> {
        snapshot
            .iter()
            .map(|peer| self.build(peer, now, cfg))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::PingTime;
    use crate::services::ServiceFlags;

    const NOW: i64 = 1_700_000_000;

    fn peer() -> RawPeer {
        RawPeer {
            id: 4,
            addr: "198.51.100.20:8333".into(),
            conntime: NOW - 3661,
            services: ServiceFlags::NETWORK | ServiceFlags::WITNESS | ServiceFlags::NETWORK_LIMITED,
            subver: "/Satoshi:26.0.0(custom-build)/".into(),
            version: 70016,
            bytessent: 1_048_576,
            bytesrecv: 3_145_728,
            pingtime: Some(PingTime::Seconds(0.1234)),
            inbound: true,
            synced_headers: 830_000,
            synced_blocks: 829_998,
            banscore: Some(0),
            relaytxes: true,
        }
    }

    #[test]
    fn formats_every_field() {
        let row = RowBuilder::default().build(&peer(), NOW, &RefreshConfig::default());
        assert_eq!(
            row.cells(),
            [
                "4",
                "198.51.100.20:8333",
                "01:01:01",
                "N_N, N_W, N_N_L",
                "/Satoshi:26.0.0(cust...",
                "70016",
                "1.00 MB",
                "3.00 MB",
                "0.123",
                "Inbound",
                "830000",
                "829998",
                "0",
                "Yes",
            ]
        );
        assert!(!row.anomalous);
    }

    #[test]
    fn missing_network_is_anomalous() {
        let mut raw = peer();
        raw.services = ServiceFlags::WITNESS | ServiceFlags::NETWORK_LIMITED;
        let row = RowBuilder::default().build(&raw, NOW, &RefreshConfig::default());
        assert!(row.anomalous);
        assert_eq!(row.services, "N_W, N_N_L");
    }

    #[test]
    fn missing_optionals_render_not_available() {
        let mut raw = peer();
        raw.pingtime = None;
        raw.banscore = None;
        raw.inbound = false;
        raw.relaytxes = false;
        let row = RowBuilder::default().build(&raw, NOW, &RefreshConfig::default());
        assert_eq!(row.ping, "N/A");
        assert_eq!(row.banscore, "N/A");
        assert_eq!(row.direction, "Outbound");
        assert_eq!(row.relay, "No");
    }

    #[test]
    fn truncate_width_comes_from_config() {
        let cfg = RefreshConfig {
            truncate_width: 9,
            ..RefreshConfig::default()
        };
        let row = RowBuilder::default().build(&peer(), NOW, &cfg);
        assert_eq!(row.subver, "/Satoshi:...");
    }

    #[test]
    fn does_not_touch_input_and_keeps_order() {
        let mut second = peer();
        second.id = 1;
        let snapshot = vec![peer(), second];
        let before = snapshot.clone();
        let rows = RowBuilder::default().build_all(&snapshot, NOW, &RefreshConfig::default());
        assert_eq!(snapshot, before);
        assert_eq!(rows[0].id, "4");
        assert_eq!(rows[1].id, "1");
    }
}
