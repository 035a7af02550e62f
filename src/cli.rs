//! CLI arguments and subcommands for overlay-node-agent.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands, and merges CLI overrides into the
//! loaded configuration.

use clap::{Parser, Subcommand, ValueEnum};
use overlay_node_agent::config::{load_config, Config, ConfigFormat};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses a config file value (case-insensitive).
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "overlay-node-agent",
    about = "Overlay-network gated agent serving hostname, system metrics and shutdown",
    long_about = "Overlay-network gated agent serving hostname, system metrics and shutdown.\n\n\
                  Exposes GET /, GET /metrics (Prometheus text format) and POST /shutdown. \
                  Every endpoint only answers the local host and members of the private \
                  overlay network (100.64.0.0/10, fd7a:115c:a1e0::/48 and the node's own \
                  overlay addresses).",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Overlay address of this node (repeatable)
    #[arg(long = "roster-address", value_name = "IP")]
    pub roster_addresses: Vec<IpAddr>,

    /// Overlay CLI printing this node's addresses, e.g. "tailscale ip"
    #[arg(long, value_name = "COMMAND")]
    pub roster_command: Option<String>,

    /// Do not register the /shutdown endpoint
    #[arg(long)]
    pub disable_shutdown: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect metrics twice and print the exposition text
    Check {
        /// Pause between the two samples in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Show how the access gate classifies an address
    Access {
        /// Remote address (`host`, `host:port` or `[v6]:port`)
        address: String,
    },

    /// Generate configuration files
    Config {
        /// Output file path (`-` for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(format!("{:?}", level).to_lowercase());
    }

    // Roster: CLI wins if provided
    if !args.roster_addresses.is_empty() {
        config.roster.addresses = args
            .roster_addresses
            .iter()
            .map(|ip| ip.to_string())
            .collect();
    }
    if let Some(command) = &args.roster_command {
        config.roster.command = Some(command.split_whitespace().map(str::to_string).collect());
    }

    if args.disable_shutdown {
        config.enable_shutdown = Some(false);
    }

    Ok(config)
}

/// Effective log level: CLI > config file > info.
pub fn effective_log_level(args: &Args, config: &Config) -> LogLevel {
    args.log_level
        .or_else(|| config.log_level.as_deref().and_then(LogLevel::from_config))
        .unwrap_or(LogLevel::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let args = parse(&[
            "overlay-node-agent",
            "--no-config",
            "-p",
            "9000",
            "--bind",
            "127.0.0.1",
            "--roster-address",
            "10.0.0.1",
            "--roster-address",
            "10.0.0.2",
            "--roster-command",
            "tailscale ip",
            "--disable-shutdown",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.roster.addresses, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(
            config.roster.command,
            Some(vec!["tailscale".to_string(), "ip".to_string()])
        );
        assert!(!config.shutdown_enabled());
    }

    #[test]
    fn test_log_level_precedence() {
        let mut config = Config::default();
        config.log_level = Some("DEBUG".to_string());

        let args = parse(&["overlay-node-agent", "--no-config"]);
        assert_eq!(effective_log_level(&args, &config), LogLevel::Debug);

        let args = parse(&["overlay-node-agent", "--no-config", "--log-level", "warn"]);
        assert_eq!(effective_log_level(&args, &config), LogLevel::Warn);

        config.log_level = None;
        let args = parse(&["overlay-node-agent", "--no-config"]);
        assert_eq!(effective_log_level(&args, &config), LogLevel::Info);
    }

    #[test]
    fn test_access_subcommand() {
        let args = parse(&["overlay-node-agent", "access", "100.64.0.1"]);
        match args.command {
            Some(Commands::Access { address }) => assert_eq!(address, "100.64.0.1"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
