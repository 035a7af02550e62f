//! macOS backend.
//!
//! CPU ticks come from the Mach host statistics call; memory, disk, network
//! and uptime from [`super::host`].

use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use super::{host, CommandRunner, PlatformError, SystemBackend};
use crate::metrics::{CpuTimes, NetworkTotals, Usage};
use crate::shutdown::{with_fallback, ShutdownError};

#[allow(non_camel_case_types)]
type mach_port_t = u32;
#[allow(non_camel_case_types)]
type kern_return_t = i32;

const KERN_SUCCESS: kern_return_t = 0;
const HOST_CPU_LOAD_INFO: i32 = 3;
const CPU_STATE_MAX: usize = 4;
const CPU_STATE_USER: usize = 0;
const CPU_STATE_SYSTEM: usize = 1;
const CPU_STATE_IDLE: usize = 2;
const CPU_STATE_NICE: usize = 3;

#[repr(C)]
#[derive(Default)]
struct HostCpuLoadInfo {
    cpu_ticks: [u32; CPU_STATE_MAX],
}

extern "C" {
    fn mach_host_self() -> mach_port_t;
    fn host_statistics(
        host: mach_port_t,
        flavor: i32,
        info: *mut i32,
        count: *mut u32,
    ) -> kern_return_t;
}

fn host_port() -> mach_port_t {
    // Each mach_host_self call adds a send right; one per process is enough.
    static PORT: OnceLock<mach_port_t> = OnceLock::new();
    *PORT.get_or_init(|| unsafe { mach_host_self() })
}

pub struct MacosBackend {
    commands: CommandRunner,
}

impl MacosBackend {
    pub fn new(commands: CommandRunner) -> Self {
        Self { commands }
    }
}

impl SystemBackend for MacosBackend {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn cpu_times(&self) -> Result<CpuTimes, PlatformError> {
        let mut info = HostCpuLoadInfo::default();
        let mut count = (std::mem::size_of::<HostCpuLoadInfo>() / std::mem::size_of::<i32>()) as u32;

        let kr = unsafe {
            host_statistics(
                host_port(),
                HOST_CPU_LOAD_INFO,
                &mut info as *mut HostCpuLoadInfo as *mut i32,
                &mut count,
            )
        };
        if kr != KERN_SUCCESS {
            return Err(PlatformError::Syscall {
                call: "host_statistics",
                source: std::io::Error::other(format!("kern_return_t {}", kr)),
            });
        }

        let ticks = info.cpu_ticks;
        Ok(CpuTimes {
            user: ticks[CPU_STATE_USER] as u64,
            nice: ticks[CPU_STATE_NICE] as u64,
            system: ticks[CPU_STATE_SYSTEM] as u64,
            idle: ticks[CPU_STATE_IDLE] as u64,
            ..CpuTimes::default()
        })
    }

    fn memory(&self) -> Result<Usage, PlatformError> {
        host::memory_usage()
    }

    fn root_disk(&self) -> Result<Usage, PlatformError> {
        host::disk_usage(Path::new("/"))
    }

    fn network(&self) -> Result<NetworkTotals, PlatformError> {
        Ok(host::network_totals())
    }

    fn uptime(&self) -> Result<u64, PlatformError> {
        Ok(host::uptime())
    }

    fn power_off(&self, force: bool) -> Result<(), ShutdownError> {
        let when = if force { "now" } else { "+1" };
        info!(when, "Requesting power-off");

        with_fallback(
            if force { "forced power-off" } else { "graceful power-off" },
            || self.commands.launch("shutdown", &["-h", when]),
            || self.commands.launch("sudo", &["-n", "shutdown", "-h", when]),
        )
    }
}
