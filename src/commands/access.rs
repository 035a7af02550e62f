//! Access command implementation.
//!
//! Runs one address through the access gate with the configured roster and
//! prints the decision.

use overlay_node_agent::config::{build_gate, Config};

/// Prints the gate's decision for `address`.
pub fn command_access(address: &str, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let gate = build_gate(config)?;
    let decision = gate.decide(address);

    let verdict = if decision.allow { "✅ allowed" } else { "❌ denied" };
    println!("Address:  {}", address);
    println!("Host:     {}", decision.host);
    println!("Decision: {} ({})", verdict, decision.reason);
    println!(
        "Roster:   {}",
        if gate.has_roster() { "attached" } else { "none" }
    );
    println!();
    println!("  localhost:        {}", decision.membership.is_localhost);
    println!("  overlay range:    {}", decision.membership.is_in_overlay_range);
    println!("  known peer:       {}", decision.membership.is_known_peer);

    Ok(())
}
