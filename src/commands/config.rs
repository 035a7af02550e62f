//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use overlay_node_agent::config::{render_config, Config, ConfigFormat};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from(default_file_name(format)),
    };

    let mut content = render_config(&config, format)?;
    if format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

fn default_file_name(format: ConfigFormat) -> &'static str {
    match format {
        ConfigFormat::Yaml => "overlay-node-agent.yaml",
        ConfigFormat::Json => "overlay-node-agent.json",
        ConfigFormat::Toml => "overlay-node-agent.toml",
    }
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Overlay Node Agent Configuration
# ================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 8088                   # HTTP port
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# Platform Helpers
# ----------------
# command_timeout_ms: 5000     # Helper command deadline (power-off commands are not killed)
#
# Shutdown
# --------
# enable_shutdown: true        # Register POST /shutdown
# shutdown_delay_ms: 100       # Pause before powering off (minimum 100)
#
# Peer Roster (this node's own overlay addresses)
# -----------------------------------------------
# roster:
#   addresses: []              # Fixed addresses, e.g. ["100.101.102.103"]
#   command: null              # Overlay CLI, e.g. ["tailscale", "ip"]
#   timeout_ms: 2000           # Roster command timeout
"#;

    format!("{comments}\n{yaml}")
}
