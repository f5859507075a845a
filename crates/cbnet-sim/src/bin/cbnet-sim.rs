//! CBNet simulation runner
//!
//! Usage: `cbnet-sim [nodes] [messages] [seed] [--skewed] [--json]`

use std::process::ExitCode;

use cbnet_sim::{Simulation, SimulationConfig, Workload};
use tracing::error;

const DEFAULT_NODES: usize = 128;
const DEFAULT_MESSAGES: usize = 1000;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cbnet_sim=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let flag = |name: &str| args.iter().any(|a| a == name);
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let nodes = positional
        .first()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_NODES);
    let messages = positional
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MESSAGES);
    let seed = positional
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(SimulationConfig::default().seed);

    let workload = if flag("--skewed") {
        Workload::Skewed {
            hot_set: (nodes / 10).max(2),
            hot_fraction: 0.8,
        }
    } else {
        Workload::Uniform
    };
    let json = flag("--json");

    let config = SimulationConfig {
        nodes,
        messages,
        seed,
        workload,
        record_timeline: json,
        ..SimulationConfig::default()
    };

    let result = Simulation::new(config).and_then(|mut sim| {
        let stats = sim.run()?;
        if json {
            for line in sim.timeline_json()? {
                println!("{line}");
            }
        } else {
            println!("CBNet simulation");
            println!("================");
            println!("  Nodes:         {}", nodes);
            println!("  Messages:      {}", stats.delivered);
            println!("  Rounds:        {}", stats.rounds);
            println!("  Rotations:     {}", stats.rotations);
            println!("  Deferred hops: {}", stats.deferred);
            println!("  Avg hops:      {:.2}", stats.average_hops());
            println!("  Avg latency:   {:.2}", stats.average_latency());
        }
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("simulation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
