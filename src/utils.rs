//! # Utility Functions and Helper Module
//!
//! This module provides the small helpers shared by the loader, the
//! aggregation step and the output writers.
//!
//! ## Key Functionality Categories
//!
//! - **Statistics**: Mean and sample standard deviation over trials with gaps
//! - **Parsing**: Turning raw CSV cells into optional numbers
//! - **Formatting**: Fixed-precision output of table cells
//! - **Validation**: Checks on user-supplied configuration values
//! - **Identifiers**: Unique run ids used to name output files
//!
//! ## Usage Examples
//!
//! ```rust
//! use nest_bench_analysis::utils::*;
//!
//! let (mean, std) = mean_std(&[Some(10.0), Some(12.0)]);
//! assert_eq!(mean, Some(11.0));
//! assert!((std.unwrap() - 1.4142135623730951).abs() < 1e-12);
//!
//! assert_eq!(format_cell(Some(2.2), 3), "2.200");
//! assert_eq!(format_cell(None, 3), "");
//! ```

use anyhow::Result;
use uuid::Uuid;

/// Generate a unique identifier for an analysis run
///
/// Output files are named after the run id so that independent analyses
/// writing into the same directory never collide.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Arithmetic mean of the present values
///
/// Missing values are skipped. Returns `None` when no value is present.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sample standard deviation of the present values
///
/// Uses the `n - 1` denominator:
/// s = √(Σ(x - x̄)² / (N - 1))
///
/// Fewer than two present values leave the deviation undefined, so the
/// result is `None` rather than zero.
pub fn sample_std(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return None;
    }
    let count = present.len() as f64;
    let mean = present.iter().sum::<f64>() / count;
    let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1.0);
    Some(variance.sqrt())
}

/// Mean and sample standard deviation in one call
pub fn mean_std(values: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    (mean(values), sample_std(values))
}

/// First present value, as used for static per-configuration descriptors
pub fn first_present(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().next().copied()
}

/// Root of the sum of squares of independent standard deviations
///
/// Any missing term makes the result missing.
pub fn quadrature_sum(stds: &[Option<f64>]) -> Option<f64> {
    stds.iter()
        .try_fold(0.0, |acc, s| s.map(|s| acc + s * s))
        .map(f64::sqrt)
}

/// Parse one CSV cell into an optional number
///
/// Empty cells and the spellings `nan`/`NaN`/`NA` are the missing-value
/// marker. Anything else that does not parse as `f64` is an error and the
/// raw text is handed back to the caller for reporting.
pub fn parse_cell(raw: &str) -> std::result::Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "NA" {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| trimmed.to_string())
}

/// Format a table cell with a fixed number of decimals
///
/// Missing values become empty cells, matching what spreadsheet tools and
/// data-frame libraries read back as missing.
pub fn format_cell(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", precision, v),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Validate the divisor applied to the model time
///
/// The divisor converts the model time unit (milliseconds in NEST output)
/// to seconds and therefore has to be a positive finite number.
pub fn validate_time_scaling(time_scaling: f64) -> Result<()> {
    if !time_scaling.is_finite() || time_scaling <= 0.0 {
        anyhow::bail!(
            "Time scaling {} is invalid (must be a positive, finite number)",
            time_scaling
        );
    }
    Ok(())
}

/// Validate the relative tolerance for negative residual time
pub fn validate_residual_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        anyhow::bail!(
            "Residual tolerance {} is invalid (must be zero or positive)",
            tolerance
        );
    }
    Ok(())
}
