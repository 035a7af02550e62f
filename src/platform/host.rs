//! Host counters read through `sysinfo`.
//!
//! The macOS and Windows backends take memory, disk, network and uptime from
//! here; only their CPU tick counters and power-off calls are native.

use std::path::Path;
use sysinfo::{Disks, Networks, System};

use super::PlatformError;
use crate::metrics::{NetworkTotals, Usage};

/// Physical memory, with used = total - available.
pub fn memory_usage() -> Result<Usage, PlatformError> {
    let mut system = System::new();
    system.refresh_memory();

    let total = system.total_memory();
    if total == 0 {
        return Err(PlatformError::parse("memory", "no physical memory reported"));
    }
    Ok(Usage {
        used: total.saturating_sub(system.available_memory()),
        total,
    })
}

/// Usage of the filesystem mounted at `mount_point`.
pub fn disk_usage(mount_point: &Path) -> Result<Usage, PlatformError> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == mount_point)
        .ok_or_else(|| {
            PlatformError::parse("disk list", format!("no disk mounted at {}", mount_point.display()))
        })?;

    let total = disk.total_space();
    Ok(Usage {
        used: total.saturating_sub(disk.available_space()),
        total,
    })
}

/// Cumulative byte counters summed over all non-loopback interfaces.
pub fn network_totals() -> NetworkTotals {
    let networks = Networks::new_with_refreshed_list();
    sum_interfaces(
        networks
            .list()
            .iter()
            .map(|(name, data)| (name.as_str(), data.total_received(), data.total_transmitted())),
    )
}

/// Seconds since boot.
pub fn uptime() -> u64 {
    System::uptime()
}

/// `lo`, `lo0` and Windows' `Loopback Pseudo-Interface 1`.
pub fn is_loopback_interface(name: &str) -> bool {
    name == "lo" || name.starts_with("lo0") || name.to_ascii_lowercase().contains("loopback")
}

/// Sums `(name, received, transmitted)` rows, skipping loopback interfaces.
pub fn sum_interfaces<'a>(rows: impl IntoIterator<Item = (&'a str, u64, u64)>) -> NetworkTotals {
    rows.into_iter()
        .filter(|(name, _, _)| !is_loopback_interface(name))
        .fold(NetworkTotals::default(), |totals, (_, recv, sent)| NetworkTotals {
            recv: totals.recv.saturating_add(recv),
            sent: totals.sent.saturating_add(sent),
        })
}
