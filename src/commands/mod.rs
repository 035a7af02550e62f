//! CLI command implementations for overlay-node-agent.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration validation and a metrics dry run
//! - `access`: Access gate decision for an address
//! - `config`: Configuration file generation

pub mod access;
pub mod check;
pub mod config;

// Re-export command functions
pub use access::command_access;
pub use check::command_check;
pub use config::command_config;
