//! # NEST Benchmark Analysis Library
//!
//! Aggregation and derived-metric analysis for neural network simulation
//! benchmarks. The benchmarking framework writes one CSV row per simulation
//! trial; this library collapses repeated trials (different random seeds) of
//! each configuration into means and standard deviations and derives the
//! metrics every scaling plot is built from.
//!
//! ## Derived Metrics
//!
//! - **Real-time factor** (`sim_factor`): wall-clock time per unit of model time
//! - **Phase factors and fractions**: each instrumented phase's share of the
//!   real-time factor and of the wall time
//! - **Residual** (`others`): simulation time no phase timer accounts for
//! - **Construction time** (`time_construct`): network creation plus connection
//! - **Spike rate and average firing rate**
//!
//! ## Architecture Overview
//!
//! - `schema`: Known columns, which are required, how each is aggregated
//! - `loader`: CSV reading and header validation
//! - `aggregate`: Grouping by configuration, mean/std/first reduction
//! - `metrics`: Derived metric formulas and primary/control comparison
//! - `aggregator`: One analysis run over a primary and a control dataset
//! - `results`: Aggregated CSV and JSON summary output
//! - `config`, `cli`: Analysis parameters from files and the command line
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use nest_bench_analysis::{AnalysisConfig, Aggregator, Role};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AnalysisConfig {
//!         time_scaling: 1000.0,
//!         ..Default::default()
//!     };
//!
//!     let mut aggregator = Aggregator::new(config);
//!     let derived = aggregator.load_file(Path::new("timer_file.csv"), Role::Primary)?;
//!
//!     for (row, key) in derived.keys().iter().enumerate() {
//!         println!("{}: {:?}", key, derived.table().value("sim_factor", row));
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;

/// Command-line interface
///
/// Argument parsing using clap. Every analysis parameter is optional on the
/// command line so that values from a configuration file are only replaced
/// when the user asks for it.
pub mod cli;

/// Analysis parameters
///
/// Time scaling, construction timers, phase list and residual tolerance,
/// loadable from YAML or JSON.
pub mod config;

pub mod error;
pub mod loader;
pub mod logging;

/// Derived metrics
///
/// The fixed, ordered set of formulas applied to aggregated means:
/// - Real-time factor and its propagated standard deviation
/// - Phase factors, phase fractions and the residual
/// - Spike rate and average firing rate
pub mod metrics;

pub mod aggregator;

/// Result output
///
/// Writes derived tables as fixed-precision CSV and a JSON summary with
/// metadata, warnings and the primary/control comparison.
pub mod results;

pub mod schema;
pub mod table;
pub mod utils;

pub use aggregate::{aggregate, AggregatedTable, ConfigurationKey};
pub use aggregator::Aggregator;
pub use config::{AnalysisConfig, ConstructTimer, Role};
pub use error::{AnalysisWarning, LoadError};
pub use metrics::{derive, DerivedTable, RelativeDifference};
pub use results::ResultsManager;

/// The current version of the analysis tool
///
/// Recorded in every JSON summary so results can be traced back to the
/// code that produced them.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default divisor for `model_time_sim`
    ///
    /// NEST reports the model time in milliseconds; dividing by 1000 gives
    /// seconds so that the real-time factor is wall seconds per model second.
    pub const TIME_SCALING: f64 = 1000.0;

    /// Phases that partition the state propagation time
    pub const PHASES: [&str; 6] = [
        "time_update",
        "time_communicate_spike_data",
        "time_deliver_spike_data",
        "time_collocate_spike_data",
        "time_deliver_secondary_data",
        "time_gather_secondary_data",
    ];

    /// Relative tolerance for negative residual time
    ///
    /// Sums of phase timers may exceed the total by rounding noise; anything
    /// below `-RESIDUAL_TOLERANCE * time_simulate` is reported.
    pub const RESIDUAL_TOLERANCE: f64 = 1e-6;

    /// Decimal places of floats in the aggregated CSV
    pub const CSV_PRECISION: usize = 3;

    /// Default output directory
    pub const OUTPUT_DIR: &str = ".";
}
