//! Machine shutdown actuator.
//!
//! The HTTP handler answers first and hands the actual power-off to a
//! detached task. [`ShutdownActuator::shutdown`] waits a short flush delay
//! before touching the platform, so the confirmation reaches the caller before
//! the machine starts going down.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::platform::{PlatformError, SystemBackend};

/// Minimum delay between answering the request and powering off.
pub const FLUSH_DELAY: Duration = Duration::from_millis(100);

/// Errors surfaced by a shutdown attempt.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("primary shutdown mechanism failed ({primary}); fallback failed ({fallback})")]
    Exhausted {
        primary: PlatformError,
        fallback: PlatformError,
    },

    #[error("shutdown is not supported on platform '{0}'")]
    Unsupported(&'static str),

    #[error("shutdown task failed: {0}")]
    Task(String),
}

/// Graceful (delayed, with a grace window) or forced (immediate) power-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    Graceful,
    Forced,
}

impl ShutdownMode {
    pub fn from_force(force: bool) -> Self {
        if force {
            ShutdownMode::Forced
        } else {
            ShutdownMode::Graceful
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, ShutdownMode::Forced)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownMode::Graceful => "graceful",
            ShutdownMode::Forced => "forced",
        }
    }
}

impl fmt::Display for ShutdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tries `primary`, then `fallback`. Success of either is success; when both
/// fail the two causes are combined into one error.
pub fn with_fallback<P, F>(action: &str, primary: P, fallback: F) -> Result<(), ShutdownError>
where
    P: FnOnce() -> Result<(), PlatformError>,
    F: FnOnce() -> Result<(), PlatformError>,
{
    let primary = match primary() {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(action, error = %primary, "Primary shutdown mechanism failed, trying fallback");

    match fallback() {
        Ok(()) => {
            info!(action, "Fallback shutdown mechanism succeeded");
            Ok(())
        }
        Err(fallback) => Err(ShutdownError::Exhausted { primary, fallback }),
    }
}

/// Issues platform power-off after the flush delay.
#[derive(Clone)]
pub struct ShutdownActuator {
    backend: Arc<dyn SystemBackend>,
    delay: Duration,
}

impl ShutdownActuator {
    /// Delays shorter than [`FLUSH_DELAY`] are raised to it.
    pub fn new(backend: Arc<dyn SystemBackend>, delay: Duration) -> Self {
        Self {
            backend,
            delay: delay.max(FLUSH_DELAY),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits the flush delay, then powers off on the blocking pool.
    pub async fn shutdown(&self, mode: ShutdownMode) -> Result<(), ShutdownError> {
        tokio::time::sleep(self.delay).await;

        info!(mode = %mode, backend = self.backend.name(), "Powering off machine");
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.power_off(mode.is_forced()))
            .await
            .map_err(|e| ShutdownError::Task(e.to_string()))?
    }

    /// Runs [`shutdown`](Self::shutdown) on a detached task. Failures are
    /// logged; the caller has already been told the shutdown was initiated.
    pub fn spawn(&self, mode: ShutdownMode) -> JoinHandle<()> {
        let actuator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = actuator.shutdown(mode).await {
                error!(mode = %mode, "Shutdown failed: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(what: &'static str) -> PlatformError {
        PlatformError::parse(what, "simulated")
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let mut fallback_called = false;
        let result = with_fallback(
            "test",
            || Ok(()),
            || {
                fallback_called = true;
                Ok(())
            },
        );
        assert!(result.is_ok());
        assert!(!fallback_called);
    }

    #[test]
    fn test_fallback_success_is_overall_success() {
        let result = with_fallback("test", || Err(failure("primary")), || Ok(()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_both_failures_are_combined() {
        let err = with_fallback(
            "test",
            || Err(failure("primary")),
            || Err(failure("fallback")),
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("primary"), "{text}");
        assert!(text.contains("fallback"), "{text}");
    }

    #[test]
    fn test_mode_from_force() {
        assert_eq!(ShutdownMode::from_force(true), ShutdownMode::Forced);
        assert_eq!(ShutdownMode::from_force(false), ShutdownMode::Graceful);
        assert_eq!(ShutdownMode::Forced.to_string(), "forced");
    }
}
