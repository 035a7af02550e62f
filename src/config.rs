//! Configuration management for overlay-node-agent.
//!
//! This module handles loading and validating configuration files. It
//! supports YAML, JSON, and TOML formats; CLI overrides are merged by the
//! binary on top of what is loaded here.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::access::{AccessGate, CommandRoster, PeerRoster, RosterSet, StaticRoster};
use crate::platform::CommandRunner;
use crate::shutdown::FLUSH_DELAY;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SHUTDOWN_DELAY_MS: u64 = 100;
pub const DEFAULT_ROSTER_TIMEOUT_MS: u64 = 2000;

/// Default config file locations, searched in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 8] = [
    "/etc/overlay-node-agent/config.yaml",
    "/etc/overlay-node-agent/config.yml",
    "/etc/overlay-node-agent/config.json",
    "/etc/overlay-node-agent/config.toml",
    "./overlay-node-agent.yaml",
    "./overlay-node-agent.yml",
    "./overlay-node-agent.json",
    "./overlay-node-agent.toml",
];

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Sources of the local node's own overlay addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Fixed overlay addresses of this node
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Overlay CLI invocation printing one address per line, e.g. `["tailscale", "ip"]`
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Timeout for the roster command in milliseconds (default: 2000)
    #[serde(default = "default_roster_timeout_ms", alias = "timeout-ms")]
    pub timeout_ms: u64,
}

fn default_roster_timeout_ms() -> u64 {
    DEFAULT_ROSTER_TIMEOUT_MS
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            command: None,
            timeout_ms: default_roster_timeout_ms(),
        }
    }
}

impl RosterConfig {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.command.is_none()
    }
}

/// Agent configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // Platform helpers
    /// Deadline for helper commands in milliseconds. Queries still running
    /// are killed; power-off commands still running are left to finish.
    #[serde(alias = "command-timeout-ms")]
    pub command_timeout_ms: Option<u64>,

    // Shutdown
    /// Register the /shutdown route
    #[serde(alias = "enable-shutdown")]
    pub enable_shutdown: Option<bool>,
    /// Delay between answering a shutdown request and powering off (min 100)
    #[serde(alias = "shutdown-delay-ms")]
    pub shutdown_delay_ms: Option<u64>,

    // Peer roster
    #[serde(default)]
    pub roster: RosterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            log_level: Some("info".into()),
            command_timeout_ms: Some(DEFAULT_COMMAND_TIMEOUT_MS),
            enable_shutdown: Some(true),
            shutdown_delay_ms: Some(DEFAULT_SHUTDOWN_DELAY_MS),
            roster: RosterConfig::default(),
        }
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let ip: IpAddr = self
            .bind()
            .parse()
            .map_err(|_| format!("Invalid bind address '{}'", self.bind()))?;
        Ok(SocketAddr::new(ip, self.port()))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS))
    }

    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_millis(self.shutdown_delay_ms.unwrap_or(DEFAULT_SHUTDOWN_DELAY_MS))
    }

    pub fn shutdown_enabled(&self) -> bool {
        self.enable_shutdown.unwrap_or(true)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}'", bind).into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        match level.to_ascii_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(format!(
                    "Invalid log_level '{}', expected off/error/warn/info/debug/trace",
                    other
                )
                .into());
            }
        }
    }

    if cfg.command_timeout_ms == Some(0) {
        return Err("command_timeout_ms must be greater than 0".into());
    }

    if let Some(delay) = cfg.shutdown_delay_ms {
        if delay < FLUSH_DELAY.as_millis() as u64 {
            return Err(format!(
                "shutdown_delay_ms must be at least {} (got {})",
                FLUSH_DELAY.as_millis(),
                delay
            )
            .into());
        }
    }

    for address in &cfg.roster.addresses {
        if address.trim().parse::<IpAddr>().is_err() {
            return Err(format!("Invalid roster address '{}'", address).into());
        }
    }

    if let Some(command) = &cfg.roster.command {
        if command.first().map_or(true, |program| program.trim().is_empty()) {
            return Err("roster.command is set but names no program".into());
        }
    }

    if cfg.roster.timeout_ms == 0 {
        return Err("roster.timeout_ms must be greater than 0".into());
    }

    Ok(())
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Serializes configuration in the requested format
pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Builds the peer roster described by `cfg.roster`, if any.
pub fn build_roster(
    cfg: &Config,
) -> Result<Option<Arc<dyn PeerRoster>>, Box<dyn std::error::Error>> {
    if cfg.roster.is_empty() {
        return Ok(None);
    }

    let mut set = RosterSet::new();

    if !cfg.roster.addresses.is_empty() {
        let addresses = cfg
            .roster
            .addresses
            .iter()
            .map(|a| {
                a.trim()
                    .parse::<IpAddr>()
                    .map_err(|_| format!("Invalid roster address '{}'", a))
            })
            .collect::<Result<Vec<_>, _>>()?;
        set.push(Arc::new(StaticRoster::new(addresses)));
    }

    if let Some(argv) = &cfg.roster.command {
        let runner = CommandRunner::new(Duration::from_millis(cfg.roster.timeout_ms));
        let roster = CommandRoster::new(argv, runner)
            .ok_or("roster.command is set but names no program")?;
        set.push(Arc::new(roster));
    }

    Ok(Some(Arc::new(set)))
}

/// Builds the access gate with the configured roster attached.
pub fn build_gate(cfg: &Config) -> Result<AccessGate, Box<dyn std::error::Error>> {
    Ok(match build_roster(cfg)? {
        Some(roster) => AccessGate::with_roster(roster),
        None => AccessGate::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_default_listen_addr() {
        let addr = Config::default().listen_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8088");
    }

    #[test]
    fn test_rejects_short_shutdown_delay() {
        let cfg = Config {
            shutdown_delay_ms: Some(50),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_rejects_empty_roster_command() {
        let mut cfg = Config::default();
        cfg.roster.command = Some(vec![]);
        assert!(validate_effective_config(&cfg).is_err());
        cfg.roster.command = Some(vec!["  ".to_string()]);
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_build_gate_without_roster() {
        let gate = build_gate(&Config::default()).unwrap();
        assert!(!gate.has_roster());
    }

    #[test]
    fn test_build_gate_with_static_roster() {
        let mut cfg = Config::default();
        cfg.roster.addresses = vec!["10.20.30.40".to_string()];
        let gate = build_gate(&cfg).unwrap();
        assert!(gate.has_roster());
        assert!(gate.decide("10.20.30.40:5555").allow);
        assert!(!gate.decide("10.20.30.41:5555").allow);
    }

    #[test]
    fn test_render_every_format() {
        let cfg = Config::default();
        for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
            let text = render_config(&cfg, format).unwrap();
            assert!(text.contains("8088"), "{format:?}: {text}");
        }
    }
}
