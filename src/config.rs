//! Analysis configuration
//!
//! All knobs of the derivation step live in [`AnalysisConfig`], which is
//! passed explicitly to every analysis run. It can be read from a YAML or
//! JSON file and then overridden from the command line.

use crate::cli::Args;
use crate::schema::DETAILED_TIMERS;
use crate::utils::{validate_residual_tolerance, validate_time_scaling};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which timers measure network construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructTimer {
    /// Kernel-side timers (`time_construction_create` / `_connect`)
    #[default]
    #[clap(name = "cpp")]
    Cpp,

    /// Script-side timers (`py_time_create` / `py_time_connect`)
    #[clap(name = "python")]
    Python,
}

impl std::fmt::Display for ConstructTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructTimer::Cpp => write!(f, "C++"),
            ConstructTimer::Python => write!(f, "Python"),
        }
    }
}

/// Which of the two datasets of a comparison a table belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Control,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Primary => write!(f, "primary"),
            Role::Control => write!(f, "control"),
        }
    }
}

/// Parameters of the derived-metric computation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Divisor applied once to `model_time_sim` (1000 turns ms into s)
    pub time_scaling: f64,

    /// Timers summed into `time_construct`
    pub construct_timer: ConstructTimer,

    /// Named phases that partition `time_simulate`; whatever they do not
    /// cover ends up in the `others` residual
    pub phases: Vec<String>,

    /// Residuals below `-residual_tolerance * time_simulate` are reported
    pub residual_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            time_scaling: crate::defaults::TIME_SCALING,
            construct_timer: ConstructTimer::default(),
            phases: crate::defaults::PHASES.iter().map(|p| p.to_string()).collect(),
            residual_tolerance: crate::defaults::RESIDUAL_TOLERANCE,
        }
    }
}

impl AnalysisConfig {
    /// Read a configuration file
    ///
    /// The format follows the extension: `.yaml`/`.yml` is YAML, anything
    /// else is JSON. Fields left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
            _ => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Build the configuration for a command-line run
    ///
    /// Starts from the config file when one is given, otherwise from the
    /// defaults, then applies every flag the user set explicitly.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match args.config {
            Some(ref path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(time_scaling) = args.time_scaling {
            config.time_scaling = time_scaling;
        }
        if let Some(construct_timer) = args.construct_timer {
            config.construct_timer = construct_timer;
        }
        if let Some(tolerance) = args.residual_tolerance {
            config.residual_tolerance = tolerance;
        }
        if !args.phases.is_empty() {
            config.phases = args.phases.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and the phase list
    ///
    /// Phases must be distinct detailed timer columns: a phase listed twice
    /// would be subtracted twice from the residual.
    pub fn validate(&self) -> Result<()> {
        validate_time_scaling(self.time_scaling)?;
        validate_residual_tolerance(self.residual_tolerance)?;
        if self.phases.is_empty() {
            anyhow::bail!("At least one phase timer must be configured");
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if !DETAILED_TIMERS.contains(&phase.as_str()) {
                anyhow::bail!(
                    "Phase '{}' is not a phase timer (expected one of: {})",
                    phase,
                    DETAILED_TIMERS.join(", ")
                );
            }
            if self.phases[..i].contains(phase) {
                anyhow::bail!("Phase '{}' is listed more than once", phase);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsStr;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.phases.len(), 6);
        assert_eq!(config.construct_timer, ConstructTimer::Cpp);
    }

    #[test]
    fn test_from_yaml_file_keeps_defaults_for_missing_fields() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "time_scaling: 1.0").unwrap();
        writeln!(file, "construct_timer: python").unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.time_scaling, 1.0);
        assert_eq!(config.construct_timer, ConstructTimer::Python);
        assert_eq!(config.phases, AnalysisConfig::default().phases);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"phases": ["time_update"], "residual_tolerance": 0.01}}"#).unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.phases, vec!["time_update".to_string()]);
        assert_eq!(config.residual_tolerance, 0.01);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "time_scaling: 0").unwrap();
        assert!(AnalysisConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_empty_phase_list_is_rejected() {
        let config = AnalysisConfig {
            phases: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_phase_is_rejected() {
        let config = AnalysisConfig {
            phases: vec!["time_update".to_string(), "time_update".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_non_timer_phase_is_rejected() {
        for column in ["time_simulate", "num_nodes", "time_not_a_timer"] {
            let config = AnalysisConfig {
                phases: vec![column.to_string()],
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} accepted as phase", column);
        }
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "time_scaling: 10.0").unwrap();
        writeln!(file, "construct_timer: python").unwrap();
        writeln!(file, "residual_tolerance: 0.05").unwrap();
        writeln!(file, "phases: [time_update, time_deliver_spike_data]").unwrap();

        let args = Args::try_parse_from([
            OsStr::new("nest-bench-analysis"),
            OsStr::new("timers.csv"),
            OsStr::new("--config"),
            file.path().as_os_str(),
            OsStr::new("--time-scaling"),
            OsStr::new("1"),
            OsStr::new("--phase"),
            OsStr::new("time_update"),
        ])
        .unwrap();
        let config = AnalysisConfig::from_args(&args).unwrap();

        // overridden on the command line
        assert_eq!(config.time_scaling, 1.0);
        assert_eq!(config.phases, vec!["time_update".to_string()]);
        // kept from the file
        assert_eq!(config.construct_timer, ConstructTimer::Python);
        assert_eq!(config.residual_tolerance, 0.05);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConstructTimer::Cpp.to_string(), "C++");
        assert_eq!(ConstructTimer::Python.to_string(), "Python");
        assert_eq!(Role::Primary.to_string(), "primary");
        assert_eq!(Role::Control.to_string(), "control");
    }
}
