// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/baseline.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/baseline.yaml --seed 0x1234...

use std::env;
use std::fs;
use std::path::Path;

use simple_logger::SimpleLogger;

use gn_rust::{run_simulation, write_report, SimConfig};

/// Scenario file format: metadata plus the full simulation configuration.
#[derive(Debug, serde::Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    meta: ScenarioMeta,

    config: SimConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
}

fn main() {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/baseline.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/baseline.yaml --seed 0x123456...", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    // Parse optional seed
    let seed: Option<[u8; 32]> = if args.len() >= 4 && args[2] == "--seed" {
        Some(parse_seed_hex(&args[3]))
    } else {
        None
    };

    if path.is_file() {
        run_scenario_file(path, seed);
    } else if path.is_dir() {
        run_scenario_directory(path, seed);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<[u8; 32]>) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("yaml")
                || path.extension().and_then(|s| s.to_str()) == Some("yml")
            {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\nFound {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, seed);
    }

    println!("\nAll scenarios complete.\n");
}

fn run_scenario_file(path: &Path, seed: Option<[u8; 32]>) {
    println!("Loading scenario from: {}", path.display());

    let yaml_content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let scenario: ScenarioFile = serde_yaml::from_str(&yaml_content).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", path.display(), e);
        std::process::exit(1);
    });

    println!("\n╔════════════════════════════════════════════════════════╗");
    if let Some(ref name) = scenario.meta.name {
        println!("║  {}", name);
    } else {
        println!("║  Scenario: {}", path.file_stem().unwrap().to_str().unwrap());
    }
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    let config = scenario.config;
    println!("Configuration:");
    println!("  Duration: {} over {} epochs", config.duration, config.epochs);
    println!("  Nodes: {} across {} locations", config.total_nodes, config.locations.len());
    println!(
        "  Topology: k={} p={}",
        config.topology.degree, config.topology.rewire_probability
    );
    println!(
        "  Transactions per epoch: {}..{} (size <= {})",
        config.transactions.min_count, config.transactions.max_count, config.transactions.max_size
    );
    println!("\nStarting simulation...\n");

    let world = run_simulation(&config, seed).unwrap_or_else(|e| {
        eprintln!("Scenario failed: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = write_report(&world.data) {
        eprintln!("Report write failed: {}", e);
        std::process::exit(1);
    }

    println!("Results:");
    println!("  Nodes: {}", world.nodes.len());
    println!("  Blocks mined: {}", world.blocks_mined());
    println!("  Max chain height: {}", world.max_height());
    println!("  Report entries: {}", world.data.len());

    println!("\n✓ Scenario complete!\n");
}

fn parse_seed_hex(hex: &str) -> [u8; 32] {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut seed = [0u8; 32];

    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        if i >= 32 {
            break;
        }
        let byte_str = std::str::from_utf8(chunk).unwrap();
        seed[i] = u8::from_str_radix(byte_str, 16).unwrap_or_else(|e| {
            eprintln!("Invalid hex seed: {}", e);
            std::process::exit(1);
        });
    }

    seed
}
