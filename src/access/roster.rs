//! Overlay peer rosters.
//!
//! A roster answers one narrow question: which overlay addresses belong to
//! the local node. The gate admits a caller whose address matches one of
//! them exactly. Peers other than the local node are *not* enumerated, so a
//! roster only extends access to the node talking to itself over its overlay
//! addresses; remote members are admitted by the address-range checks.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::platform::CommandRunner;

/// Source of the local node's own overlay addresses.
pub trait PeerRoster: Send + Sync {
    /// The local node's overlay addresses, or `None` when the overlay stack
    /// cannot be queried right now. `None` makes the gate skip the check.
    fn self_addresses(&self) -> Option<Vec<IpAddr>>;
}

/// Fixed address list from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    addresses: Vec<IpAddr>,
}

impl StaticRoster {
    pub fn new(addresses: Vec<IpAddr>) -> Self {
        Self {
            addresses: addresses.into_iter().map(|a| a.to_canonical()).collect(),
        }
    }
}

impl PeerRoster for StaticRoster {
    fn self_addresses(&self) -> Option<Vec<IpAddr>> {
        Some(self.addresses.clone())
    }
}

/// Queries the overlay CLI (e.g. `<overlay> ip`) on every lookup and parses
/// one address per output line.
#[derive(Debug, Clone)]
pub struct CommandRoster {
    program: String,
    args: Vec<String>,
    runner: CommandRunner,
}

impl CommandRoster {
    /// Returns `None` for an empty argv.
    pub fn new(argv: &[String], runner: CommandRunner) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            runner,
        })
    }
}

impl PeerRoster for CommandRoster {
    fn self_addresses(&self) -> Option<Vec<IpAddr>> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        match self.runner.output(&self.program, &args) {
            Ok(out) => Some(parse_address_lines(&out)),
            Err(e) => {
                warn!(program = %self.program, "Peer roster query failed: {}", e);
                None
            }
        }
    }
}

/// Union of several rosters. Unavailable members are ignored; the set is
/// unavailable only when every member is.
#[derive(Clone, Default)]
pub struct RosterSet {
    rosters: Vec<Arc<dyn PeerRoster>>,
}

impl RosterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, roster: Arc<dyn PeerRoster>) {
        self.rosters.push(roster);
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }
}

impl PeerRoster for RosterSet {
    fn self_addresses(&self) -> Option<Vec<IpAddr>> {
        let mut any = false;
        let mut addresses = Vec::new();
        for roster in &self.rosters {
            if let Some(found) = roster.self_addresses() {
                any = true;
                addresses.extend(found);
            }
        }
        any.then_some(addresses)
    }
}

/// Parses one IP address per line, skipping blank and unparseable lines.
pub fn parse_address_lines(output: &str) -> Vec<IpAddr> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse::<IpAddr>() {
            Ok(ip) => Some(ip.to_canonical()),
            Err(_) => {
                debug!(line, "Ignoring non-address roster line");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_address_lines() {
        let out = "100.101.102.103\nfd7a:115c:a1e0::1\n\n  not-an-ip \n";
        let parsed = parse_address_lines(out);
        assert_eq!(
            parsed,
            vec![
                "100.101.102.103".parse::<IpAddr>().unwrap(),
                "fd7a:115c:a1e0::1".parse::<IpAddr>().unwrap(),
            ]
        );
    }

    #[test]
    fn test_command_roster_rejects_empty_argv() {
        let runner = CommandRunner::new(Duration::from_secs(1));
        assert!(CommandRoster::new(&[], runner).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_roster_runs_command() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 10.1.2.3".to_string(),
        ];
        let roster = CommandRoster::new(&argv, runner).unwrap();
        assert_eq!(
            roster.self_addresses(),
            Some(vec!["10.1.2.3".parse().unwrap()])
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_roster_failure_is_unavailable() {
        let runner = CommandRunner::new(Duration::from_secs(5));
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()];
        let roster = CommandRoster::new(&argv, runner).unwrap();
        assert_eq!(roster.self_addresses(), None);
    }

    struct Unavailable;

    impl PeerRoster for Unavailable {
        fn self_addresses(&self) -> Option<Vec<IpAddr>> {
            None
        }
    }

    #[test]
    fn test_roster_set_merges_available_members() {
        let mut set = RosterSet::new();
        assert_eq!(set.self_addresses(), None);

        set.push(Arc::new(Unavailable));
        assert_eq!(set.self_addresses(), None);

        set.push(Arc::new(StaticRoster::new(vec!["10.0.0.7".parse().unwrap()])));
        assert_eq!(set.self_addresses(), Some(vec!["10.0.0.7".parse().unwrap()]));
        assert_eq!(set.len(), 2);
    }
}
