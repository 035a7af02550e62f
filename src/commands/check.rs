//! Check command implementation.
//!
//! Validates configuration and collects two metric samples so that the CPU
//! percentage has a delta to work from.

use std::thread;
use std::time::{Duration, Instant};

use overlay_node_agent::config::{validate_effective_config, Config};
use overlay_node_agent::metrics::{exposition, CpuSampler};
use overlay_node_agent::platform;

/// Validates configuration and prints one metrics exposition.
pub fn command_check(interval_ms: u64, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Overlay Node Agent - System Check");
    println!("====================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    let backend = platform::detect(config.command_timeout());
    println!("\n📊 Collecting metrics (backend: {})...", backend.name());

    let sampler = CpuSampler::new();
    let start = Instant::now();
    let collected = backend.collect(&sampler).and_then(|_| {
        thread::sleep(Duration::from_millis(interval_ms));
        backend.collect(&sampler)
    });

    match collected {
        Ok(metrics) => {
            println!(
                "   ✅ Collected two samples in {:.2}s\n",
                start.elapsed().as_secs_f64()
            );
            print!("{}", exposition::render(&metrics));
        }
        Err(e) => {
            println!("   ❌ Metrics collection failed: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - agent is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the output above");
        std::process::exit(1);
    }
}
