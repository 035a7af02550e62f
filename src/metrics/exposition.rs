//! Prometheus text exposition for [`SystemMetrics`].
//!
//! The output layout is fixed so scrapers configured against earlier agents
//! keep working: HELP and TYPE lines per metric, a blank line between metrics,
//! two decimals for percentages and plain integers everywhere else.

use std::fmt::Write as FmtWrite;

use super::SystemMetrics;

/// Content type of the exposition text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Value {
    Percent(f64),
    Integer(u64),
}

struct Sample {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    value: Value,
}

fn samples(m: &SystemMetrics) -> [Sample; 10] {
    use MetricKind::{Counter, Gauge};
    use Value::{Integer, Percent};

    [
        Sample {
            name: "system_cpu_usage_percent",
            help: "CPU usage percentage",
            kind: Gauge,
            value: Percent(m.cpu_percent),
        },
        Sample {
            name: "system_memory_used_bytes",
            help: "Memory used in bytes",
            kind: Gauge,
            value: Integer(m.memory_used),
        },
        Sample {
            name: "system_memory_total_bytes",
            help: "Total memory in bytes",
            kind: Gauge,
            value: Integer(m.memory_total),
        },
        Sample {
            name: "system_memory_usage_percent",
            help: "Memory usage percentage",
            kind: Gauge,
            value: Percent(m.memory_percent),
        },
        Sample {
            name: "system_disk_used_bytes",
            help: "Disk used in bytes",
            kind: Gauge,
            value: Integer(m.disk_used),
        },
        Sample {
            name: "system_disk_total_bytes",
            help: "Total disk space in bytes",
            kind: Gauge,
            value: Integer(m.disk_total),
        },
        Sample {
            name: "system_disk_usage_percent",
            help: "Disk usage percentage",
            kind: Gauge,
            value: Percent(m.disk_percent),
        },
        Sample {
            name: "system_network_bytes_sent",
            help: "Network bytes sent",
            kind: Counter,
            value: Integer(m.network_bytes_sent),
        },
        Sample {
            name: "system_network_bytes_recv",
            help: "Network bytes received",
            kind: Counter,
            value: Integer(m.network_bytes_recv),
        },
        Sample {
            name: "system_uptime_seconds",
            help: "System uptime in seconds",
            kind: Counter,
            value: Integer(m.uptime_seconds),
        },
    ]
}

/// Renders all metrics in exposition order.
pub fn render(metrics: &SystemMetrics) -> String {
    let mut out = String::with_capacity(1280);

    for (idx, sample) in samples(metrics).iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        writeln!(out, "# HELP {} {}", sample.name, sample.help).ok();
        writeln!(out, "# TYPE {} {}", sample.name, sample.kind.as_str()).ok();
        match sample.value {
            Value::Percent(v) => writeln!(out, "{} {:.2}", sample.name, v).ok(),
            Value::Integer(v) => writeln!(out, "{} {}", sample.name, v).ok(),
        };
    }

    out
}
