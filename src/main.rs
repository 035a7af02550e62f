//! overlay-node-agent - version 0.1.0
//!
//! Overlay-network gated control agent with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;

use clap::Parser;
use overlay_node_agent::config::{build_gate, render_config, validate_effective_config, Config};
use overlay_node_agent::state::AppState;
use overlay_node_agent::{platform, server, startup_checks};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

use cli::{effective_log_level, resolve_config, Args, Commands, LogLevel};
use commands::{command_access, command_check, command_config};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.as_filter())
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Loads configuration and logging for subcommands that need them.
fn prepare_command(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = load_validated_config(args)?;
    setup_logging(effective_log_level(args, &config))?;
    Ok(config)
}

/// Resolves once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        println!("{}", render_config(&config, args.config_format)?);
        return Ok(());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            // Generating a config needs neither a valid config nor logging.
            Commands::Config { output, format } => command_config(output.clone(), *format),
            Commands::Check { interval_ms } => command_check(*interval_ms, &prepare_command(&args)?),
            Commands::Access { address } => command_access(address, &prepare_command(&args)?),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;
    setup_logging(effective_log_level(&args, &config))?;

    info!("Starting overlay-node-agent");

    let backend = platform::detect(config.command_timeout());
    let report = startup_checks::validate_requirements(backend.as_ref(), config.shutdown_enabled());
    if !report.is_clean() {
        warn!(
            "Starting with {} unmet requirement(s); the agent will run but may not function fully",
            report.warnings.len()
        );
    }

    let gate = build_gate(&config)?;
    if gate.has_roster() {
        info!("Peer roster attached");
    }

    let state = AppState::new(backend, gate, config.shutdown_delay());
    let app = server::router(state.clone(), config.shutdown_enabled());

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        e
    })?;

    if let Err(e) = server::serve(listener, app, shutdown_signal()).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!(
        uptime_secs = state.start_time.elapsed().as_secs(),
        "overlay-node-agent stopped gracefully"
    );
    Ok(())
}
