use crate::peers::RawPeer;
use crate::services::ServiceFlags;
use crate::types::RefreshConfig;

/// What the loop should do about one peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    None,
    /// Peer address lacking full block service.
    Warn(String),
    /// IP to hand to the node's ban list.
    RequestBan(String),
}

/// Decides on a peer without side effects. The ban check wins over the capability check.
pub fn evaluate(peer: &RawPeer, cfg: &RefreshConfig) -> Action {
    if let (Some(threshold), Some(score)) = (cfg.ban_threshold, peer.banscore) {
        if score > threshold {
            return Action::RequestBan(ban_target(&peer.addr).to_string());
        }
    }
    if !peer.services.contains(ServiceFlags::NETWORK) {
        return Action::Warn(peer.addr.clone());
    }
    Action::None
}

/// Everything before the first `:`. Right for `ip:port`, wrong for bracketed IPv6 literals.
pub fn ban_target(addr: &str) -> &str {
    addr.split(':').next().unwrap_or(addr)
}
