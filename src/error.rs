//! Error and warning types for timer analysis
//!
//! Loading is the only fallible stage: a [`LoadError`] aborts the analysis of
//! that one input file. Everything that goes wrong after a successful load is
//! reduced output rather than failure and is reported as an [`AnalysisWarning`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort loading a timer file
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV itself is malformed (unbalanced quotes, ragged rows, ...)
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A column the aggregation cannot do without is absent from the header
    #[error("Required column '{column}' is missing")]
    MissingColumn { column: String },

    /// A schema column holds text that is not a number
    #[error("Invalid value '{value}' in column '{column}' at line {line}")]
    InvalidValue {
        column: String,
        line: u64,
        value: String,
    },

    /// Header present but no trial rows
    #[error("No trial rows found")]
    Empty,
}

/// Non-fatal conditions found while aggregating or deriving
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// An optional column is absent, so the columns derived from it are skipped
    #[error("Column '{column}' not found, skipping {skipped}")]
    MissingColumn { column: String, skipped: String },

    /// The uninstrumented residual is negative beyond tolerance, which
    /// points to phases being counted twice upstream
    #[error(
        "Negative residual time {others:.6}s (time_simulate {time_simulate:.6}s) for {configuration}"
    )]
    NegativeResidual {
        configuration: String,
        others: f64,
        time_simulate: f64,
    },

    /// A trial row lacks one of the group key values
    #[error("Skipping row at line {line}: no value for key column '{column}'")]
    SkippedRow { line: u64, column: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = LoadError::MissingColumn {
            column: "time_simulate".to_string(),
        };
        assert_eq!(err.to_string(), "Required column 'time_simulate' is missing");

        let err = LoadError::InvalidValue {
            column: "num_nodes".to_string(),
            line: 3,
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'abc' in column 'num_nodes' at line 3"
        );
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = AnalysisWarning::MissingColumn {
            column: "time_update".to_string(),
            skipped: "phase factor and fraction".to_string(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "missing_column");
        assert_eq!(json["column"], "time_update");
    }
}
