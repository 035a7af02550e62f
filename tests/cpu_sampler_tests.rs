//! Integration tests for delta-based CPU usage sampling.

use overlay_node_agent::metrics::cpu::usage_between;
use overlay_node_agent::metrics::{CpuSampler, CpuTimes};

fn snapshot(user: u64, system: u64, idle: u64) -> CpuTimes {
    CpuTimes {
        user,
        system,
        idle,
        ..CpuTimes::default()
    }
}

#[test]
fn test_first_observation_is_zero() {
    let sampler = CpuSampler::new();
    assert_eq!(sampler.observe(snapshot(5000, 3000, 90000)), 0.0);
}

#[test]
fn test_half_idle_delta_is_fifty_percent() {
    let sampler = CpuSampler::new();
    sampler.observe(snapshot(1000, 1000, 1000));

    // total +100, idle +50
    let usage = sampler.observe(snapshot(1030, 1020, 1050));
    assert!((usage - 50.0).abs() < 1e-9, "usage = {usage}");
}

#[test]
fn test_delta_only_uses_previous_sample() {
    let sampler = CpuSampler::new();
    sampler.observe(snapshot(0, 0, 0));
    sampler.observe(snapshot(100, 0, 0));

    // Since the second sample everything was idle.
    let usage = sampler.observe(snapshot(100, 0, 100));
    assert_eq!(usage, 0.0);
}

#[test]
fn test_unchanged_counters_report_zero() {
    let sampler = CpuSampler::new();
    sampler.observe(snapshot(10, 10, 10));
    assert_eq!(sampler.observe(snapshot(10, 10, 10)), 0.0);
}

#[test]
fn test_counter_reset_reports_zero() {
    let sampler = CpuSampler::new();
    sampler.observe(snapshot(10_000, 10_000, 10_000));
    assert_eq!(sampler.observe(snapshot(10, 10, 10)), 0.0);

    // The reset sample becomes the new baseline.
    let usage = sampler.observe(snapshot(60, 10, 60));
    assert!((usage - 50.0).abs() < 1e-9, "usage = {usage}");
}

#[test]
fn test_usage_stays_in_range() {
    let previous = CpuTimes {
        user: 1,
        nice: 2,
        system: 3,
        idle: 4,
        iowait: 5,
        irq: 6,
    };
    for (user, idle) in [(1, 4), (1000, 4), (1, 1000), (500, 500)] {
        let current = CpuTimes {
            user,
            idle,
            ..previous
        };
        let usage = usage_between(&previous, &current);
        assert!((0.0..=100.0).contains(&usage), "usage = {usage}");
    }
}

#[test]
fn test_sampler_is_shared_across_threads() {
    let sampler = std::sync::Arc::new(CpuSampler::new());
    sampler.observe(snapshot(0, 0, 0));

    let handles: Vec<_> = (1..=4u64)
        .map(|i| {
            let sampler = sampler.clone();
            std::thread::spawn(move || sampler.observe(snapshot(i * 100, 0, i * 100)))
        })
        .collect();

    for handle in handles {
        let usage = handle.join().unwrap();
        assert!((0.0..=100.0).contains(&usage));
    }
}
