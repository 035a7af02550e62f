//! System metrics data model.
//!
//! A [`SystemMetrics`] value is one immutable sample of host resource usage.
//! Platform backends fill it field by field; a field whose query failed keeps
//! its zero value so that a single broken counter never hides the others.

pub mod cpu;
pub mod exposition;

pub use cpu::{CpuSampler, CpuTimes};

/// One sample of host resource usage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub memory_percent: f64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub disk_percent: f64,
    pub network_bytes_sent: u64,
    pub network_bytes_recv: u64,
    pub uptime_seconds: u64,
}

impl SystemMetrics {
    pub fn set_memory(&mut self, usage: Usage) {
        self.memory_used = usage.used;
        self.memory_total = usage.total;
        self.memory_percent = usage.percent();
    }

    pub fn set_disk(&mut self, usage: Usage) {
        self.disk_used = usage.used;
        self.disk_total = usage.total;
        self.disk_percent = usage.percent();
    }

    pub fn set_network(&mut self, totals: NetworkTotals) {
        self.network_bytes_sent = totals.sent;
        self.network_bytes_recv = totals.recv;
    }
}

/// Used/total pair for a sized resource (memory, filesystem).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub used: u64,
    pub total: u64,
}

impl Usage {
    pub fn percent(&self) -> f64 {
        usage_percent(self.used, self.total)
    }
}

/// Cumulative byte counters summed over all non-loopback interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkTotals {
    pub sent: u64,
    pub recv: u64,
}

/// Raw memory counters as reported by the kernel, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub free: u64,
    /// Kernel estimate of memory available without swapping, when provided.
    pub available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
}

impl MemorySnapshot {
    /// Used memory, preferring the kernel's "available" estimate.
    pub fn used(&self) -> u64 {
        match self.available {
            Some(available) => self.total.saturating_sub(available),
            None => self
                .total
                .saturating_sub(self.free)
                .saturating_sub(self.buffers)
                .saturating_sub(self.cached),
        }
    }

    pub fn usage(&self) -> Usage {
        Usage {
            used: self.used(),
            total: self.total,
        }
    }
}

/// Percentage of `used` over `total`; zero when `total` is zero.
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percent_zero_total() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(42, 0), 0.0);
    }

    #[test]
    fn test_usage_percent() {
        assert!((usage_percent(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!((usage_percent(4, 4) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_prefers_available() {
        let snapshot = MemorySnapshot {
            total: 1000,
            free: 100,
            available: Some(600),
            buffers: 50,
            cached: 150,
        };
        assert_eq!(snapshot.used(), 400);
    }

    #[test]
    fn test_memory_falls_back_without_available() {
        let snapshot = MemorySnapshot {
            total: 1000,
            free: 100,
            available: None,
            buffers: 50,
            cached: 150,
        };
        assert_eq!(snapshot.used(), 700);
    }

    #[test]
    fn test_memory_fallback_saturates() {
        let snapshot = MemorySnapshot {
            total: 100,
            free: 80,
            available: None,
            buffers: 30,
            cached: 30,
        };
        assert_eq!(snapshot.used(), 0);
    }

    #[test]
    fn test_set_memory_derives_percent() {
        let mut metrics = SystemMetrics::default();
        metrics.set_memory(Usage {
            used: 512,
            total: 2048,
        });
        assert_eq!(metrics.memory_used, 512);
        assert_eq!(metrics.memory_total, 2048);
        assert!((metrics.memory_percent - 25.0).abs() < f64::EPSILON);
    }
}
