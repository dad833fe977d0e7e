use crate::error::MalformedField;
use crate::services::{parse_services_hex, ServiceFlags};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One peer as reported by the node's `getpeerinfo`.
///
/// Every field tolerates a missing key or an unexpected type by falling back to its default,
/// so one odd field never costs the whole row. Keys we do not know are ignored.
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct RawPeer {
    #[serde(deserialize_with = "lenient")]
    pub id: i64,
    #[serde(deserialize_with = "lenient")]
    pub addr: String,
    /// Unix seconds.
    #[serde(deserialize_with = "lenient")]
    pub conntime: i64,
    #[serde(deserialize_with = "services_bits")]
    pub services: ServiceFlags,
    #[serde(deserialize_with = "lenient")]
    pub subver: String,
    #[serde(deserialize_with = "lenient")]
    pub version: i64,
    #[serde(deserialize_with = "lenient")]
    pub bytessent: u64,
    #[serde(deserialize_with = "lenient")]
    pub bytesrecv: u64,
    #[serde(deserialize_with = "lenient")]
    pub pingtime: Option<PingTime>,
    #[serde(deserialize_with = "lenient")]
    pub inbound: bool,
    #[serde(deserialize_with = "lenient")]
    pub synced_headers: i64,
    #[serde(deserialize_with = "lenient")]
    pub synced_blocks: i64,
    /// Dropped from newer nodes, hence optional.
    #[serde(deserialize_with = "lenient")]
    pub banscore: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub relaytxes: bool,
}

/// Ordered as the node returned it; never sorted or deduplicated.
pub type Snapshot = Vec<RawPeer>;

/// Ping as it arrives on the wire: normally seconds, occasionally text.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum PingTime {
    Seconds(f64),
    Text(String),
}

impl PingTime {
    pub fn seconds(&self) -> Result<f64, MalformedField> {
        match self {
            PingTime::Seconds(secs) => Ok(*secs),
            PingTime::Text(text) => text.trim().parse().map_err(|_| MalformedField {
                field: "pingtime",
                reason: format!("{:?} is not a number", text),
            }),
        }
    }
}

pub fn parse_snapshot(json: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(json)
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        debug!("substituting default for {}: {}", value, e);
        T::default()
    }))
}

/// Accepts the hex string modern nodes send as well as a plain integer.
fn services_bits<'de, D>(deserializer: D) -> Result<ServiceFlags, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::String(hex) => parse_services_hex(hex),
        Value::Number(n) => n.as_u64().map(ServiceFlags::from_bits_retain).ok_or_else(|| {
            MalformedField {
                field: "services",
                reason: format!("{} is not an unsigned 64-bit mask", n),
            }
        }),
        other => Err(MalformedField {
            field: "services",
            reason: format!("unexpected value {}", other),
        }),
    };
    Ok(parsed.unwrap_or_else(|e| {
        warn!("{}, treating as no services", e);
        ServiceFlags::empty()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE_SAMPLE: &str = r#"[
      {
        "id": 7,
        "addr": "203.0.113.5:8333",
        "addrbind": "192.168.1.10:51234",
        "network": "ipv4",
        "services": "0000000000000c09",
        "servicesnames": ["NETWORK", "WITNESS", "NETWORK_LIMITED", "P2P_V2"],
        "relaytxes": true,
        "lastsend": 1700000100,
        "bytessent": 2097152,
        "bytesrecv": 1048576,
        "conntime": 1699990000,
        "pingtime": 0.052,
        "version": 70016,
        "subver": "/Satoshi:27.0.0/",
        "inbound": false,
        "synced_headers": 820000,
        "synced_blocks": 819999
      }
    ]"#;

    #[test]
    fn parses_core_output_and_ignores_unknown_keys() {
        let snapshot = parse_snapshot(CORE_SAMPLE).unwrap();
        assert_eq!(snapshot.len(), 1);
        let peer = &snapshot[0];
        assert_eq!(peer.id, 7);
        assert_eq!(peer.addr, "203.0.113.5:8333");
        assert_eq!(peer.services.bits(), 0xc09);
        assert_eq!(peer.pingtime, Some(PingTime::Seconds(0.052)));
        assert_eq!(peer.banscore, None);
        assert!(peer.relaytxes);
        assert_eq!(peer.synced_blocks, 819_999);
    }

    #[test]
    fn services_as_integer() {
        let snapshot = parse_snapshot(r#"[{"id": 1, "services": 1033}]"#).unwrap();
        assert_eq!(snapshot[0].services.bits(), 1033);
    }

    #[test]
    fn bad_services_hex_means_no_services() {
        let snapshot = parse_snapshot(r#"[{"id": 1, "services": "zz"}]"#).unwrap();
        assert!(snapshot[0].services.is_empty());
    }

    #[test]
    fn wrong_typed_fields_fall_back_per_field() {
        let snapshot = parse_snapshot(
            r#"[{"id": 3, "addr": "10.0.0.1:8333", "pingtime": "oops", "banscore": "high", "bytessent": -4}]"#,
        )
        .unwrap();
        let peer = &snapshot[0];
        assert_eq!(peer.id, 3);
        assert_eq!(peer.addr, "10.0.0.1:8333");
        assert_eq!(peer.pingtime, Some(PingTime::Text("oops".into())));
        assert_eq!(peer.banscore, None);
        assert_eq!(peer.bytessent, 0);
    }

    #[test]
    fn order_and_duplicates_are_preserved() {
        let snapshot =
            parse_snapshot(r#"[{"id": 9}, {"id": 2}, {"id": 9}]"#).unwrap();
        let ids: Vec<i64> = snapshot.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![9, 2, 9]);
    }

    #[test]
    fn not_a_list_is_an_error() {
        assert!(parse_snapshot(r#"{"error": "warming up"}"#).is_err());
        assert!(parse_snapshot("").is_err());
    }

    #[test]
    fn ping_text_parses() {
        assert_eq!(PingTime::Text(" 0.5 ".into()).seconds(), Ok(0.5));
        assert!(PingTime::Text("x".into()).seconds().is_err());
    }
}
