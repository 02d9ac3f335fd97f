//! VoltLab - DC workbench circuit analyzer.
//!
//! Loads a workbench snapshot, runs one analysis pass and prints the
//! solved state.
//!
//! # Usage
//!
//! ```bash
//! voltlab circuit.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use voltlab_core::{
    analysis::{analyze, RegionOutcome},
    components::ElementKind,
    error::{Result, VoltLabError},
    snapshot::Snapshot,
};

/// DC workbench circuit analyzer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the workbench snapshot file (JSON)
    #[arg(value_name = "SNAPSHOT_FILE")]
    snapshot_file: PathBuf,

    /// Also print per-terminal potentials
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let content =
        std::fs::read_to_string(&args.snapshot_file).map_err(|e| VoltLabError::FileReadError {
            path: args.snapshot_file.display().to_string(),
            source: e,
        })?;
    let snapshot = Snapshot::from_json(&content)?;
    let mut bench = snapshot.restore()?;

    let analysis = analyze(&mut bench);

    for region in analysis.regions() {
        match region.outcome {
            RegionOutcome::Solved {
                total_resistance,
                current,
            } => println!(
                "battery {}: {:.4} ohm total, {:.4} A",
                region.battery, total_resistance, current
            ),
            RegionOutcome::Open => println!("battery {}: open circuit", region.battery),
            RegionOutcome::ShortCircuit => {
                println!("battery {}: SHORT CIRCUIT", region.battery)
            }
            RegionOutcome::Unsupported => {
                println!("battery {}: unsupported topology", region.battery)
            }
        }
    }

    for element in bench.elements() {
        match &element.kind {
            ElementKind::Ammeter(_) | ElementKind::Voltmeter(_) => {
                let unit = if matches!(element.kind, ElementKind::Ammeter(_)) {
                    "A"
                } else {
                    "V"
                };
                if let Some(reading) = analysis.meter_reading(element.id) {
                    println!("{} {}: {:.4} {}", element.kind.name(), element.id, reading, unit);
                }
            }
            ElementKind::Battery(_) => {}
            _ => {
                if let Some(current) = analysis.branch_current(element.id) {
                    println!(
                        "{} {}: {:.4} A ({:?})",
                        element.kind.name(),
                        element.id,
                        current.abs(),
                        element.work
                    );
                }
            }
        }
    }

    if args.verbose {
        for terminal in bench.terminals() {
            println!(
                "  {} ({} {}): {:.4} V",
                terminal.id, terminal.owner, terminal.key, terminal.potential
            );
        }
    }

    Ok(())
}
