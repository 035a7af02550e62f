//! Overlay Node Agent Library
//!
//! A small HTTP control plane for machines on a private overlay network. It
//! exposes the machine's hostname, Prometheus-format system metrics and a
//! shutdown action, and only answers callers on the local host or inside the
//! overlay network.
//!
//! # Features
//!
//! - **Access Gate**: per-request source-address classification (localhost,
//!   overlay address ranges, the node's own overlay addresses)
//! - **Metrics**: CPU, memory, root disk, network and uptime per platform
//!   (Linux, macOS, Windows), degrading field by field
//! - **Shutdown**: graceful or forced power-off with a fallback mechanism
//!
//! # Usage
//!
//! ```rust
//! use overlay_node_agent::access::AccessGate;
//!
//! let gate = AccessGate::new();
//! assert!(gate.decide("100.101.102.103:41641").allow);
//! assert!(gate.decide("[::1]:8088").allow);
//! assert!(!gate.decide("8.8.8.8:53").allow);
//! ```

pub mod access;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod platform;
pub mod server;
pub mod shutdown;
pub mod startup_checks;
pub mod state;

// Re-export main types for convenience
pub use access::{AccessDecision, AccessGate, AccessReason, PeerRoster};
pub use config::Config;
pub use metrics::{CpuSampler, SystemMetrics};
pub use platform::{PlatformError, SystemBackend};
pub use shutdown::{ShutdownActuator, ShutdownError, ShutdownMode};
pub use state::{AppState, SharedState};
