//! Integration tests for the Prometheus text exposition.
//!
//! Scrapers depend on the exact layout, so the rendered text is compared
//! byte for byte.

use overlay_node_agent::metrics::exposition::{render, CONTENT_TYPE};
use overlay_node_agent::metrics::{SystemMetrics, Usage};

const EXPECTED: &str = "\
# HELP system_cpu_usage_percent CPU usage percentage
# TYPE system_cpu_usage_percent gauge
system_cpu_usage_percent 12.35

# HELP system_memory_used_bytes Memory used in bytes
# TYPE system_memory_used_bytes gauge
system_memory_used_bytes 1073741824

# HELP system_memory_total_bytes Total memory in bytes
# TYPE system_memory_total_bytes gauge
system_memory_total_bytes 4294967296

# HELP system_memory_usage_percent Memory usage percentage
# TYPE system_memory_usage_percent gauge
system_memory_usage_percent 25.00

# HELP system_disk_used_bytes Disk used in bytes
# TYPE system_disk_used_bytes gauge
system_disk_used_bytes 1000

# HELP system_disk_total_bytes Total disk space in bytes
# TYPE system_disk_total_bytes gauge
system_disk_total_bytes 3000

# HELP system_disk_usage_percent Disk usage percentage
# TYPE system_disk_usage_percent gauge
system_disk_usage_percent 33.33

# HELP system_network_bytes_sent Network bytes sent
# TYPE system_network_bytes_sent counter
system_network_bytes_sent 123456

# HELP system_network_bytes_recv Network bytes received
# TYPE system_network_bytes_recv counter
system_network_bytes_recv 654321

# HELP system_uptime_seconds System uptime in seconds
# TYPE system_uptime_seconds counter
system_uptime_seconds 86400
";

fn sample() -> SystemMetrics {
    let mut metrics = SystemMetrics {
        cpu_percent: 12.345_6,
        network_bytes_sent: 123_456,
        network_bytes_recv: 654_321,
        uptime_seconds: 86_400,
        ..SystemMetrics::default()
    };
    metrics.set_memory(Usage {
        used: 1 << 30,
        total: 4 << 30,
    });
    metrics.set_disk(Usage {
        used: 1000,
        total: 3000,
    });
    metrics
}

#[test]
fn test_render_matches_exact_layout() {
    assert_eq!(render(&sample()), EXPECTED);
}

#[test]
fn test_zero_total_renders_zero_percent() {
    let mut metrics = SystemMetrics::default();
    metrics.set_disk(Usage { used: 5, total: 0 });
    let text = render(&metrics);
    assert!(text.contains("\nsystem_disk_usage_percent 0.00\n"));
    assert!(text.contains("\nsystem_disk_used_bytes 5\n"));
}

#[test]
fn test_full_cpu_renders_two_decimals() {
    let metrics = SystemMetrics {
        cpu_percent: 100.0,
        ..SystemMetrics::default()
    };
    assert!(render(&metrics).contains("\nsystem_cpu_usage_percent 100.00\n"));
}

#[test]
fn test_content_type() {
    assert_eq!(CONTENT_TYPE, "text/plain; version=0.0.4");
}
