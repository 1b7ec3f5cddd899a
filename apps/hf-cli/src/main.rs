//! Command line driver: read a configuration, simulate, write results.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hf_results::{format_for_path, to_csv, to_json, variable_table, vessel_table, OutputOptions};
use hf_sim::run_simulation;

#[derive(Parser)]
#[command(name = "zerodsolver")]
#[command(about = "0D lumped-parameter hemodynamics solver", long_about = None)]
struct Cli {
    /// Path to the simulation configuration (JSON)
    config: PathBuf,
    /// Output file; suffix selects the format (.csv or .json)
    output: PathBuf,
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Resolve the output format up front so a bad suffix fails before the
    // simulation runs.
    let format = format_for_path(&cli.output)?;

    log::info!("reading configuration from {}", cli.config.display());
    let mut loaded = hf_project::load_file(&cli.config)?;
    log::info!(
        "model has {} blocks, {} unknowns, dt = {:.6e}",
        loaded.model.num_blocks(),
        loaded.model.num_dofs(),
        loaded.params.time_step_size
    );

    let output = run_simulation(&mut loaded.model, &loaded.params, loaded.initial_state)?;

    let opts = OutputOptions {
        mean_only: loaded.params.output_mean_only,
        derivative: loaded.params.output_derivative,
    };
    let table = if loaded.params.output_variable_based {
        variable_table(&loaded.model, &output, opts)
    } else {
        vessel_table(&loaded.model, &output, opts)
    };

    let text = match format {
        hf_results::OutputFormat::Csv => to_csv(&table),
        hf_results::OutputFormat::Json => to_json(&table)?,
    };
    std::fs::write(&cli.output, text)?;
    log::info!("wrote results to {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
