//! Linux backend.
//!
//! Reads kernel counters from `/proc` and filesystem usage via `statvfs`.
//! Parsing is split from file access so it can be tested on fixed input.

use std::fs;
use tracing::info;

use super::statvfs::statvfs_usage;
use super::{CommandRunner, PlatformError, SystemBackend};
use crate::metrics::{CpuTimes, MemorySnapshot, NetworkTotals, Usage};
use crate::shutdown::{with_fallback, ShutdownError};

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";
const PROC_NET_DEV: &str = "/proc/net/dev";
const PROC_UPTIME: &str = "/proc/uptime";

pub struct LinuxBackend {
    commands: CommandRunner,
}

impl LinuxBackend {
    pub fn new(commands: CommandRunner) -> Self {
        Self { commands }
    }
}

fn read_proc(path: &str) -> Result<String, PlatformError> {
    fs::read_to_string(path).map_err(|source| PlatformError::Read {
        path: path.to_string(),
        source,
    })
}

impl SystemBackend for LinuxBackend {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn cpu_times(&self) -> Result<CpuTimes, PlatformError> {
        parse_cpu_line(&read_proc(PROC_STAT)?)
    }

    fn memory(&self) -> Result<Usage, PlatformError> {
        Ok(parse_meminfo(&read_proc(PROC_MEMINFO)?)?.usage())
    }

    fn root_disk(&self) -> Result<Usage, PlatformError> {
        statvfs_usage("/")
    }

    fn network(&self) -> Result<NetworkTotals, PlatformError> {
        Ok(parse_net_dev(&read_proc(PROC_NET_DEV)?))
    }

    fn uptime(&self) -> Result<u64, PlatformError> {
        parse_uptime(&read_proc(PROC_UPTIME)?)
    }

    fn power_off(&self, force: bool) -> Result<(), ShutdownError> {
        if force {
            info!("Forcing immediate power-off");
            with_fallback(
                "forced power-off",
                || self.commands.launch("systemctl", &["poweroff", "-i", "--force"]),
                || self.commands.launch("shutdown", &["-h", "now"]),
            )
        } else {
            info!("Scheduling power-off in one minute");
            with_fallback(
                "graceful power-off",
                || self.commands.launch("shutdown", &["-h", "+1"]),
                || self.commands.launch("systemctl", &["poweroff"]),
            )
        }
    }
}

/// Parses the aggregate `cpu ` line of `/proc/stat`.
pub fn parse_cpu_line(content: &str) -> Result<CpuTimes, PlatformError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| PlatformError::parse(PROC_STAT, "no aggregate cpu line"))?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 8 {
        return Err(PlatformError::parse(
            PROC_STAT,
            format!("expected at least 8 fields, got {}", fields.len()),
        ));
    }

    let field = |idx: usize| -> Result<u64, PlatformError> {
        fields[idx]
            .parse()
            .map_err(|_| PlatformError::parse(PROC_STAT, format!("invalid counter '{}'", fields[idx])))
    };

    Ok(CpuTimes {
        user: field(1)?,
        nice: field(2)?,
        system: field(3)?,
        idle: field(4)?,
        iowait: field(5)?,
        irq: field(6)?,
    })
}

/// Parses `/proc/meminfo` (values in kB) into byte counters.
pub fn parse_meminfo(content: &str) -> Result<MemorySnapshot, PlatformError> {
    let mut total = None;
    let mut snapshot = MemorySnapshot::default();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        let bytes = kb.saturating_mul(1024);

        match key {
            "MemTotal:" => total = Some(bytes),
            "MemFree:" => snapshot.free = bytes,
            "MemAvailable:" => snapshot.available = Some(bytes),
            "Buffers:" => snapshot.buffers = bytes,
            "Cached:" => snapshot.cached = bytes,
            _ => {}
        }
    }

    snapshot.total = total.ok_or_else(|| PlatformError::parse(PROC_MEMINFO, "missing MemTotal"))?;
    Ok(snapshot)
}

/// Sums receive and transmit bytes of every non-loopback interface in
/// `/proc/net/dev`. Malformed rows are skipped.
pub fn parse_net_dev(content: &str) -> NetworkTotals {
    let mut totals = NetworkTotals::default();

    // First two lines are the column headers
    for line in content.lines().skip(2) {
        let Some((interface, stats)) = line.split_once(':') else {
            continue;
        };
        if interface.trim() == "lo" {
            continue;
        }

        let values: Vec<&str> = stats.split_whitespace().collect();
        if values.len() < 9 {
            continue;
        }

        totals.recv = totals
            .recv
            .saturating_add(values[0].parse().unwrap_or(0));
        totals.sent = totals
            .sent
            .saturating_add(values[8].parse().unwrap_or(0));
    }

    totals
}

/// Whole seconds since boot from `/proc/uptime`.
pub fn parse_uptime(content: &str) -> Result<u64, PlatformError> {
    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| PlatformError::parse(PROC_UPTIME, "empty file"))?;

    let seconds: f64 = first
        .parse()
        .map_err(|_| PlatformError::parse(PROC_UPTIME, format!("invalid value '{}'", first)))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(PlatformError::parse(PROC_UPTIME, format!("out of range '{}'", first)));
    }
    Ok(seconds as u64)
}
