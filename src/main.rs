//! # NEST Benchmark Analysis - Main Entry Point
//!
//! Aggregates a benchmark timer file, and optionally a control timer file,
//! then writes the derived tables and a JSON summary.
//!
//! ## Steps
//!
//! 1. **Initialize logging**: colorized tracing output, `RUST_LOG` aware
//! 2. **Parse arguments**: command line plus optional configuration file
//! 3. **Analyse**: load, aggregate and derive each dataset
//! 4. **Write results**: `<run_id>.csv`, `<run_id>_ctrl.csv`, `<run_id>.json`
//!
//! ## Error Handling
//!
//! A primary file that cannot be loaded aborts the run. A control file that
//! cannot be loaded aborts it too, unless `--continue-on-error` is given, in
//! which case the primary analysis is still written.

use anyhow::{Context, Result};
use clap::Parser;
use nest_bench_analysis::{
    cli::Args, logging, utils::generate_run_id, Aggregator, AnalysisConfig, ResultsManager, Role,
};
use tracing::{error, info};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    info!("Starting NEST benchmark analysis");
    info!("Configuration: {:?}", args);

    let config = AnalysisConfig::from_args(&args)?;
    info!(
        "Time scaling {}, {} construction timers, {} phases",
        config.time_scaling,
        config.construct_timer,
        config.phases.len()
    );

    let run_id = args.run_id.clone().unwrap_or_else(generate_run_id);
    let results_manager = ResultsManager::new(&args.output_dir, run_id)?;

    let mut aggregator = Aggregator::new(config);
    aggregator
        .load_file(&args.data_file, Role::Primary)
        .with_context(|| format!("Analysis of {} aborted", args.data_file.display()))?;

    if let Some(ref control_file) = args.control {
        match aggregator.load_file(control_file, Role::Control) {
            Ok(_) => info!("Control data loaded from {:?}", control_file),
            Err(e) => {
                error!("Control analysis failed for {:?}: {}", control_file, e);
                if !args.continue_on_error {
                    return Err(e).with_context(|| {
                        format!("Analysis of {} aborted", control_file.display())
                    });
                }
            }
        }
    }

    let summary = results_manager.finalize(&aggregator)?;
    let warnings: usize = summary.tables.iter().map(|t| t.warnings.len()).sum();

    info!(
        "Analysis {} completed with {} warnings",
        results_manager.run_id(),
        warnings
    );
    Ok(())
}
