use crate::error::MalformedField;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Service bits a peer advertises in its version handshake.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ServiceFlags: u64 {
        /// Serves the full block chain.
        const NETWORK = 1 << 0;
        /// BIP 64, long retired.
        const GETUTXOS = 1 << 1;
        /// BIP 111
        const BLOOM = 1 << 2;
        /// BIP 144
        const WITNESS = 1 << 3;
        /// Never proposed as a BIP, still seen occasionally.
        const XTHIN = 1 << 4;
        /// BIP 157
        const COMPACT_FILTERS = 1 << 6;
        /// BIP 159, serves only the most recent blocks.
        const NETWORK_LIMITED = 1 << 10;
        /// BIP 324 encrypted transport.
        const P2P_V2 = 1 << 11;
    }
}

/// A capability we know how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceTag {
    Network,
    Witness,
    CompactFilters,
    NetworkLimited,
    GetUtxos,
    Bloom,
    Xthin,
    P2pV2,
}

impl ServiceTag {
    /// Short column label.
    pub fn label(self) -> &'static str {
        match self {
            ServiceTag::Network => "N_N",
            ServiceTag::Witness => "N_W",
            ServiceTag::CompactFilters => "N_C_F",
            ServiceTag::NetworkLimited => "N_N_L",
            ServiceTag::GetUtxos => "N_G",
            ServiceTag::Bloom => "N_B",
            ServiceTag::Xthin => "N_X",
            ServiceTag::P2pV2 => "N_P2",
        }
    }
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display order of the known tags. Each entry owns exactly one bit.
pub const KNOWN_SERVICES: &[(ServiceFlags, ServiceTag)] = &[
    (ServiceFlags::NETWORK, ServiceTag::Network),
    (ServiceFlags::WITNESS, ServiceTag::Witness),
    (ServiceFlags::COMPACT_FILTERS, ServiceTag::CompactFilters),
    (ServiceFlags::NETWORK_LIMITED, ServiceTag::NetworkLimited),
    (ServiceFlags::GETUTXOS, ServiceTag::GetUtxos),
    (ServiceFlags::BLOOM, ServiceTag::Bloom),
    (ServiceFlags::XTHIN, ServiceTag::Xthin),
    (ServiceFlags::P2P_V2, ServiceTag::P2pV2),
];

/// Maps a services bitmask onto the tags of a (flag, tag) table.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDecoder {
    table: &'static [(ServiceFlags, ServiceTag)],
}

impl Default for ServiceDecoder {
    fn default() -> Self {
        Self::new(KNOWN_SERVICES)
    }
}

impl ServiceDecoder {
    pub fn new(table: &'static [(ServiceFlags, ServiceTag)]) -> Self {
        Self { table }
    }

    /// Tags whose bit is set, in table order. Unknown bits are ignored.
    pub fn decode(&self, services: ServiceFlags) -> Vec<ServiceTag> {
        self.table
            .iter()
            .filter(|(flag, _)| services.intersects(*flag))
            .map(|(_, tag)| *tag)
            .collect()
    }
}

/// `"N_N, N_W"` style rendering of decoded tags.
pub fn join_labels(tags: &[ServiceTag]) -> String {
    tags.iter()
        .map(|tag| tag.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses the hex rendering of a services bitmask, e.g. `"0000000000000409"`.
pub fn parse_services_hex(raw: &str) -> Result<ServiceFlags, MalformedField> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16)
        .map(ServiceFlags::from_bits_retain)
        .map_err(|e| MalformedField {
            field: "services",
            reason: format!("{:?} is not hex: {}", raw, e),
        })
}
