//! Network-location access gate.
//!
//! Every request is classified by its source address before a handler runs.
//! Callers are admitted when they are the local host, come from the overlay
//! network's address ranges, or hold one of the overlay addresses reported by
//! the attached [`PeerRoster`]. Everything else, including addresses that do
//! not parse, is rejected.

pub mod middleware;
pub mod roster;

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, RwLock};
use tracing::debug;

pub use middleware::require_overlay;
pub use roster::{CommandRoster, PeerRoster, RosterSet, StaticRoster};

/// Why a request was admitted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    Localhost,
    OverlayRange,
    KnownPeer,
    InvalidAddress,
    NotMember,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessReason::Localhost => "localhost",
            AccessReason::OverlayRange => "overlay range",
            AccessReason::KnownPeer => "known peer",
            AccessReason::InvalidAddress => "invalid address",
            AccessReason::NotMember => "not a network member",
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership facts established for one request. Checks run in order and
/// stop at the first positive, so later facts stay `false` once one holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Membership {
    pub is_localhost: bool,
    pub is_in_overlay_range: bool,
    pub is_known_peer: bool,
}

impl Membership {
    pub fn admits(&self) -> bool {
        self.is_localhost || self.is_in_overlay_range || self.is_known_peer
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allow: bool,
    pub reason: AccessReason,
    /// Remote host with any port suffix removed.
    pub host: String,
    pub membership: Membership,
}

impl AccessDecision {
    fn new(host: &str, reason: AccessReason, membership: Membership) -> Self {
        Self {
            allow: membership.admits(),
            reason,
            host: host.to_string(),
            membership,
        }
    }
}

/// Decides per request whether the caller is inside the overlay network.
///
/// The gate holds no per-request state. The roster slot can be filled or
/// replaced at runtime since the overlay stack may come up after the agent.
#[derive(Default)]
pub struct AccessGate {
    roster: RwLock<Option<Arc<dyn PeerRoster>>>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: Arc<dyn PeerRoster>) -> Self {
        Self {
            roster: RwLock::new(Some(roster)),
        }
    }

    /// Attaches, replaces (`Some`) or detaches (`None`) the peer roster.
    pub fn set_roster(&self, roster: Option<Arc<dyn PeerRoster>>) {
        let mut slot = self
            .roster
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = roster;
    }

    pub fn has_roster(&self) -> bool {
        self.current_roster().is_some()
    }

    fn current_roster(&self) -> Option<Arc<dyn PeerRoster>> {
        self.roster
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Classifies a remote address (`host`, `host:port` or `[v6]:port`).
    ///
    /// May block on the roster query; call from a blocking context.
    pub fn decide(&self, remote: &str) -> AccessDecision {
        let host = strip_port(remote);

        if is_localhost_name(host) {
            return AccessDecision::new(host, AccessReason::Localhost, localhost());
        }

        let ip = match host.parse::<IpAddr>() {
            Ok(ip) => ip.to_canonical(),
            Err(_) => {
                return AccessDecision::new(
                    host,
                    AccessReason::InvalidAddress,
                    Membership::default(),
                )
            }
        };

        if is_loopback_literal(ip) {
            return AccessDecision::new(host, AccessReason::Localhost, localhost());
        }

        if is_overlay_address(ip) {
            let membership = Membership {
                is_in_overlay_range: true,
                ..Membership::default()
            };
            return AccessDecision::new(host, AccessReason::OverlayRange, membership);
        }

        if let Some(roster) = self.current_roster() {
            match roster.self_addresses() {
                Some(addresses) if addresses.iter().any(|a| a.to_canonical() == ip) => {
                    let membership = Membership {
                        is_known_peer: true,
                        ..Membership::default()
                    };
                    return AccessDecision::new(host, AccessReason::KnownPeer, membership);
                }
                Some(_) => {}
                None => debug!(host, "Peer roster unavailable, skipping peer check"),
            }
        }

        AccessDecision::new(host, AccessReason::NotMember, Membership::default())
    }
}

fn localhost() -> Membership {
    Membership {
        is_localhost: true,
        ..Membership::default()
    }
}

fn is_localhost_name(host: &str) -> bool {
    host == "127.0.0.1" || host == "::1" || host == "localhost"
}

fn is_loopback_literal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4 == Ipv4Addr::LOCALHOST,
        IpAddr::V6(v6) => v6 == Ipv6Addr::LOCALHOST,
    }
}

/// Removes a trailing `:port` and surrounding brackets from a remote address.
///
/// A bare IPv6 literal (more than one colon, no brackets) has no port and is
/// returned unchanged.
pub fn strip_port(remote: &str) -> &str {
    let remote = remote.trim();

    if let Some(rest) = remote.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => remote,
        };
    }

    match remote.split_once(':') {
        Some((host, port)) if !port.contains(':') => host,
        _ => remote,
    }
}

/// True for addresses in the overlay's reserved ranges.
pub fn is_overlay_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_overlay_ipv4(v4),
        IpAddr::V6(v6) => is_overlay_ipv6(v6),
    }
}

/// 100.64.0.0/10 (CGNAT range).
pub fn is_overlay_ipv4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] == 100 && (o[1] & 0xC0) == 0x40
}

/// fd7a:115c:a1e0::/48, i.e. canonical text starting with `fd7a:115c:a1e0:`.
pub fn is_overlay_ipv6(ip: Ipv6Addr) -> bool {
    let s = ip.segments();
    s[0] == 0xfd7a && s[1] == 0x115c && s[2] == 0xa1e0
}
