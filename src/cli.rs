use crate::config::ConstructTimer;
use clap::Parser;
use std::path::PathBuf;

/// NEST Benchmark Analysis - aggregate benchmark timer files and derive performance metrics
#[derive(Parser, Debug, Clone, Default)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Timer CSV of the dataset under study (one row per trial)
    #[clap(value_name = "TIMER_FILE", help_heading = "Core Options")]
    pub data_file: PathBuf,

    /// Timer CSV of a control dataset to compare against
    #[clap(long, help_heading = "Core Options")]
    pub control: Option<PathBuf>,

    /// Analysis configuration file (YAML or JSON)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Divisor turning model_time_sim into seconds [default: 1000]
    #[clap(short = 't', long)]
    pub time_scaling: Option<f64>,

    /// Timers used for the network construction time [default: cpp]
    #[clap(long, value_enum)]
    pub construct_timer: Option<ConstructTimer>,

    /// Phase timers decomposing the simulation time (replaces the default set)
    #[clap(long = "phase", num_args = 1..)]
    pub phases: Vec<String>,

    /// Relative tolerance below which a negative residual is reported [default: 1e-6]
    #[clap(long)]
    pub residual_tolerance: Option<f64>,

    /// Directory for the aggregated CSV and JSON summary
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Identifier used to name output files (random uuid if omitted)
    #[clap(long)]
    pub run_id: Option<String>,

    /// Keep going with the primary analysis if the control file fails to load
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["nest-bench-analysis", "timers.csv"]).unwrap();
        assert_eq!(args.data_file, PathBuf::from("timers.csv"));
        assert_eq!(args.output_dir, PathBuf::from(crate::defaults::OUTPUT_DIR));
        assert!(args.control.is_none());
        assert!(args.time_scaling.is_none());
        assert!(args.phases.is_empty());
        assert!(!args.continue_on_error);
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "nest-bench-analysis",
            "timers.csv",
            "--control",
            "ctrl.csv",
            "-t",
            "1",
            "--construct-timer",
            "python",
            "--phase",
            "time_update",
            "time_deliver_spike_data",
            "--run-id",
            "abc",
        ])
        .unwrap();

        assert_eq!(args.control, Some(PathBuf::from("ctrl.csv")));
        assert_eq!(args.time_scaling, Some(1.0));
        assert_eq!(args.construct_timer, Some(ConstructTimer::Python));
        assert_eq!(args.phases, vec!["time_update", "time_deliver_spike_data"]);
        assert_eq!(args.run_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_data_file_is_required() {
        assert!(Args::try_parse_from(["nest-bench-analysis"]).is_err());
    }
}
