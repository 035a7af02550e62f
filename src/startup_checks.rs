//! Startup requirement validation for overlay-node-agent.
//!
//! Nothing here is fatal: the agent serves hostname and metrics without
//! privileges, only shutdown needs them. Missing requirements are reported
//! so the operator sees them before the first shutdown request fails.

use tracing::{info, warn};

use crate::platform::SystemBackend;

/// Result of the startup checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub backend: &'static str,
    pub privileged: Option<bool>,
    pub warnings: Vec<String>,
}

impl StartupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate all runtime requirements
pub fn validate_requirements(backend: &dyn SystemBackend, shutdown_enabled: bool) -> StartupReport {
    info!("🔍 Validating runtime requirements...");

    let mut report = StartupReport {
        backend: backend.name(),
        privileged: is_privileged(),
        warnings: Vec::new(),
    };

    if backend.name() == "unsupported" {
        warn!("⚠️  No metrics backend for this platform - /metrics will answer 500");
        report
            .warnings
            .push(format!("unsupported platform '{}'", std::env::consts::OS));
    } else {
        info!("✅ Metrics backend: {}", backend.name());
    }

    if shutdown_enabled {
        check_user_privileges(&mut report);
    } else {
        info!("Shutdown endpoint disabled by configuration");
    }

    if report.is_clean() {
        info!("✅ All runtime requirements validated");
    }
    report
}

/// Check if running with sufficient privileges to power off the machine
fn check_user_privileges(report: &mut StartupReport) {
    match report.privileged {
        Some(true) => info!("✅ Running with root privileges"),
        Some(false) => {
            warn!("⚠️  Not running as root - machine shutdown will likely fail");
            warn!("   Recommendation: run the agent as a root service");
            report
                .warnings
                .push("not running as root; shutdown will likely fail".to_string());
        }
        None => {
            warn!("⚠️  Cannot determine process privileges on this platform");
            warn!("   Shutdown requires SeShutdownPrivilege (administrator)");
        }
    }
}

#[cfg(unix)]
fn is_privileged() -> Option<bool> {
    Some(nix::unistd::geteuid().is_root())
}

#[cfg(not(unix))]
fn is_privileged() -> Option<bool> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::UnsupportedBackend;

    #[test]
    fn test_unsupported_backend_is_reported() {
        let backend = UnsupportedBackend::new("plan9");
        let report = validate_requirements(&backend, false);
        assert_eq!(report.backend, "unsupported");
        assert!(!report.is_clean());
    }

    #[cfg(unix)]
    #[test]
    fn test_privilege_is_known_on_unix() {
        let backend = UnsupportedBackend::new("plan9");
        let report = validate_requirements(&backend, true);
        assert_eq!(report.privileged, Some(nix::unistd::geteuid().is_root()));
    }
}
