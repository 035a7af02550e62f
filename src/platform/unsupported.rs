//! Backend for operating systems without a metrics implementation.
//!
//! Every query fails, so `/metrics` answers 500 and shutdown is refused.

use super::{PlatformError, SystemBackend};
use crate::metrics::{CpuSampler, CpuTimes, NetworkTotals, SystemMetrics, Usage};
use crate::shutdown::ShutdownError;

pub struct UnsupportedBackend {
    os: &'static str,
}

impl UnsupportedBackend {
    pub fn new(os: &'static str) -> Self {
        Self { os }
    }
}

impl SystemBackend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn cpu_times(&self) -> Result<CpuTimes, PlatformError> {
        Err(PlatformError::Unsupported(self.os))
    }

    fn memory(&self) -> Result<Usage, PlatformError> {
        Err(PlatformError::Unsupported(self.os))
    }

    fn root_disk(&self) -> Result<Usage, PlatformError> {
        Err(PlatformError::Unsupported(self.os))
    }

    fn network(&self) -> Result<NetworkTotals, PlatformError> {
        Err(PlatformError::Unsupported(self.os))
    }

    fn uptime(&self) -> Result<u64, PlatformError> {
        Err(PlatformError::Unsupported(self.os))
    }

    fn power_off(&self, _force: bool) -> Result<(), ShutdownError> {
        Err(ShutdownError::Unsupported(self.os))
    }

    fn collect(&self, _sampler: &CpuSampler) -> Result<SystemMetrics, PlatformError> {
        Err(PlatformError::Unsupported(self.os))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_fails_as_a_whole() {
        let backend = UnsupportedBackend::new("plan9");
        let err = backend.collect(&CpuSampler::new()).unwrap_err();
        assert_eq!(err.to_string(), "no metrics backend for platform 'plan9'");
    }

    #[test]
    fn test_power_off_is_refused() {
        let backend = UnsupportedBackend::new("plan9");
        assert!(matches!(
            backend.power_off(true),
            Err(ShutdownError::Unsupported("plan9"))
        ));
    }
}
