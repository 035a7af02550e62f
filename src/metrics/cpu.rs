//! Delta-based CPU usage sampling.
//!
//! Platforms expose CPU time as cumulative counters. A usage percentage only
//! makes sense between two snapshots, so [`CpuSampler`] keeps the previous
//! snapshot and computes the percentage from the delta on every call.

use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

/// Cumulative CPU time-in-state counters, in platform ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
}

impl CpuTimes {
    /// Calculate total CPU time (all tracked states).
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq
    }
}

struct CpuSample {
    times: CpuTimes,
    taken_at: Instant,
}

/// Holds the previous CPU snapshot for delta calculation.
///
/// One sampler lives for the lifetime of the service. Access is serialized by
/// a mutex that is held only while the delta is computed and the snapshot
/// replaced.
pub struct CpuSampler {
    previous: Mutex<Option<CpuSample>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }

    /// Records `current` and returns the usage percentage since the previous
    /// snapshot. The first observation has nothing to compare with and
    /// reports 0.
    pub fn observe(&self, current: CpuTimes) -> f64 {
        let now = Instant::now();
        let mut previous = self
            .previous
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let usage = match previous.as_ref() {
            Some(prev) => {
                debug!(
                    interval_ms = now.duration_since(prev.taken_at).as_millis() as u64,
                    "Computing CPU usage from previous sample"
                );
                usage_between(&prev.times, &current)
            }
            None => 0.0,
        };

        *previous = Some(CpuSample {
            times: current,
            taken_at: now,
        });

        usage
    }

    /// Forgets the previous snapshot; the next observation reports 0.
    pub fn reset(&self) {
        let mut previous = self
            .previous
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *previous = None;
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// CPU usage percentage between two snapshots.
///
/// Returns 0 when the total did not advance or a counter went backwards
/// (counter reset, hotplugged CPU), and never leaves the 0..=100 range.
pub fn usage_between(previous: &CpuTimes, current: &CpuTimes) -> f64 {
    let total_delta = current.total().checked_sub(previous.total());
    let idle_delta = current.idle.checked_sub(previous.idle);

    match (total_delta, idle_delta) {
        (Some(total), Some(idle)) if total > 0 => {
            let idle = idle.min(total);
            (100.0 * (1.0 - idle as f64 / total as f64)).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}
