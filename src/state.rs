//! Application state shared by the HTTP handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::access::AccessGate;
use crate::metrics::CpuSampler;
use crate::platform::SystemBackend;
use crate::shutdown::ShutdownActuator;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    /// Source-address gate applied to every route.
    pub gate: AccessGate,
    pub backend: Arc<dyn SystemBackend>,
    /// Previous CPU snapshot; the only state carried between requests.
    pub sampler: CpuSampler,
    pub actuator: ShutdownActuator,
    /// Server start time.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn SystemBackend>,
        gate: AccessGate,
        shutdown_delay: Duration,
    ) -> SharedState {
        Arc::new(Self {
            gate,
            actuator: ShutdownActuator::new(backend.clone(), shutdown_delay),
            backend,
            sampler: CpuSampler::new(),
            start_time: Instant::now(),
        })
    }
}
