//! lumina — command-line driver for the cost allocation engine.
//!
//! Runs a calculation against a JSON fixture of instances, Reserved
//! Instances, Savings Plans, and on-demand prices, and prints the resulting
//! per-instance cost allocation. Also exposes the engine's discount
//! configuration and Prometheus metrics.

mod commands;
mod config;
mod error;

use clap::{Parser, Subcommand};
use error::CliResult;
use lumina_observe::EngineMetrics;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lumina")]
#[command(about = "Lumina cost allocation engine CLI")]
#[command(version)]
struct Cli {
    /// Directory holding engine config state (default: ~/.lumina)
    #[arg(long, global = true)]
    state_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a calculation against a fixture JSON file and print the result.
    Calculate {
        /// Path to a CalculationInputs JSON fixture.
        fixture: PathBuf,
    },

    /// Print current engine metrics in Prometheus text format.
    Metrics,

    /// Engine discount configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the current discount configuration.
    Get,
    /// Set the EC2-Instance and Compute SP discount fallback multipliers.
    SetDiscounts {
        /// Fraction of shelf price charged once an EC2-Instance SP covers an instance (e.g. 0.72).
        ec2_instance: f64,
        /// Fraction of shelf price charged once a Compute SP covers an instance (e.g. 0.72).
        compute: f64,
    },
    /// List stored config entries.
    List {
        /// Only list entries whose name starts with this prefix.
        prefix: Option<String>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("lumina=info".parse().expect("valid directive")))
        .init();

    let state_path = commands::resolve_state_path(cli.state_path);
    let metrics = EngineMetrics::new();

    match cli.command {
        Commands::Calculate { fixture } => match commands::run_calculate(&fixture, &state_path, &metrics) {
            Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            Err(e) => {
                error!(error = %e, "calculation failed");
                metrics.record_invariant_violation();
                let err = serde_json::json!({ "ok": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&err)?);
                std::process::exit(1);
            }
        },
        Commands::Metrics => {
            print!("{}", commands::render_metrics(&metrics));
        }
        Commands::Config { action } => match action {
            ConfigAction::Get => {
                let value = commands::config_get(&state_path, "engine")?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            ConfigAction::SetDiscounts { ec2_instance, compute } => {
                commands::config_set_discounts(&state_path, ec2_instance, compute)?;
                println!("discount configuration updated");
            }
            ConfigAction::List { prefix } => {
                let value = commands::config_list(&state_path, prefix.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        },
    }

    Ok(())
}
