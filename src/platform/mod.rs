//! Platform backends for metrics collection and machine power-off.
//!
//! Every supported OS gets one [`SystemBackend`] implementation, selected at
//! build time by [`detect`]. The backends differ wildly in mechanism:
//! - Linux: kernel counter files under `/proc` plus `statvfs`
//! - macOS: Mach host statistics for CPU ticks, `sysinfo` for the rest
//! - Windows: `GetSystemTimes` for CPU ticks, `sysinfo` for the rest, and
//!   advapi32/user32 calls next to `shutdown.exe` for power-off
//!
//! The individual readers return `Result` and the shared [`SystemBackend::collect`]
//! turns each failure into a zero field, so the exposed metrics have the same
//! semantics everywhere.

pub mod command;
#[cfg(any(target_os = "macos", windows, test))]
pub mod host;
#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "linux")]
mod statvfs;
pub mod unsupported;
#[cfg(windows)]
pub mod windows;

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::metrics::{CpuSampler, CpuTimes, NetworkTotals, SystemMetrics, Usage};
use crate::shutdown::ShutdownError;

pub use command::CommandRunner;
pub use unsupported::UnsupportedBackend;

/// Errors raised by platform readers and actions.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("no metrics backend for platform '{0}'")]
    Unsupported(&'static str),

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{call} failed: {source}")]
    Syscall {
        call: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

impl PlatformError {
    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        PlatformError::Parse {
            what,
            detail: detail.into(),
        }
    }

    pub(crate) fn last_os_error(call: &'static str) -> Self {
        PlatformError::Syscall {
            call,
            source: io::Error::last_os_error(),
        }
    }
}

/// Capability interface of one operating system.
pub trait SystemBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn cpu_times(&self) -> Result<CpuTimes, PlatformError>;

    fn memory(&self) -> Result<Usage, PlatformError>;

    /// Usage of the root filesystem (system drive on Windows).
    fn root_disk(&self) -> Result<Usage, PlatformError>;

    /// Cumulative byte counters over all non-loopback interfaces.
    fn network(&self) -> Result<NetworkTotals, PlatformError>;

    /// Seconds since boot from a monotonic source.
    fn uptime(&self) -> Result<u64, PlatformError>;

    /// Powers the machine off, trying a fallback mechanism when the primary
    /// one fails.
    fn power_off(&self, force: bool) -> Result<(), ShutdownError>;

    /// Collects one metrics sample.
    ///
    /// Each reader may fail on its own; failed fields stay zero. Only a
    /// backend that cannot collect at all returns an error.
    fn collect(&self, sampler: &CpuSampler) -> Result<SystemMetrics, PlatformError> {
        let mut metrics = SystemMetrics::default();

        if let Some(times) = degrade("cpu", self.cpu_times()) {
            metrics.cpu_percent = sampler.observe(times);
        }
        if let Some(usage) = degrade("memory", self.memory()) {
            metrics.set_memory(usage);
        }
        if let Some(usage) = degrade("disk", self.root_disk()) {
            metrics.set_disk(usage);
        }
        if let Some(totals) = degrade("network", self.network()) {
            metrics.set_network(totals);
        }
        if let Some(uptime) = degrade("uptime", self.uptime()) {
            metrics.uptime_seconds = uptime;
        }

        Ok(metrics)
    }
}

/// Logs a failed reader and drops its error.
fn degrade<T>(field: &'static str, result: Result<T, PlatformError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(field, error = %e, "Metric unavailable, reporting zero");
            None
        }
    }
}

/// Returns the backend for the running operating system.
///
/// `command_timeout` bounds every helper command the backend spawns.
pub fn detect(command_timeout: Duration) -> Arc<dyn SystemBackend> {
    let commands = CommandRunner::new(command_timeout);

    #[cfg(target_os = "linux")]
    let backend: Arc<dyn SystemBackend> = Arc::new(linux::LinuxBackend::new(commands));

    #[cfg(target_os = "macos")]
    let backend: Arc<dyn SystemBackend> = Arc::new(macos::MacosBackend::new(commands));

    #[cfg(windows)]
    let backend: Arc<dyn SystemBackend> = Arc::new(windows::WindowsBackend::new(commands));

    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    let backend: Arc<dyn SystemBackend> = {
        let _ = commands;
        Arc::new(UnsupportedBackend::new(std::env::consts::OS))
    };

    backend
}
