//! # Derived Performance Metrics
//!
//! Turns an [`AggregatedTable`] into a [`DerivedTable`] by adding the columns
//! every plot reads: virtual process count, construction time, real-time
//! factor, per-phase factors and fractions, the uninstrumented residual,
//! spike rate and average firing rate.
//!
//! ## Formulas
//!
//! Computed in this order, from per-configuration means (never from
//! per-trial derived values):
//!
//! 1. `num_vp = threads_per_task * tasks_per_node`
//! 2. `model_time_sim /= time_scaling`
//! 3. `time_construct = create + connect`, `time_construct_std = √(create_std² + connect_std²)`
//! 4. `sim_factor = time_simulate / model_time_sim` (and `_std` likewise)
//! 5. per phase: `<phase>_factor = phase / model_time_sim`,
//!    `<phase>_frac = 100 * phase / time_simulate`
//! 6. `time_addup = Σ phases`, `others = time_simulate - time_addup`,
//!    `others_factor`, `others_frac`
//! 7. `total_spike_count_per_s = local_spike_counter / model_time_sim`
//! 8. `average_firing_rate = total_spike_count_per_s / population`
//!
//! ## Decomposition
//!
//! Because `others` is defined against the same phase set, the phase factors
//! plus `others_factor` add up to `sim_factor`, and the phase fractions plus
//! `others_frac` add up to 100. A negative residual means phases overlap
//! upstream; it is reported and kept as is.
//!
//! ## Missing data
//!
//! A derived column whose inputs are absent from the table is skipped with an
//! [`AnalysisWarning::MissingColumn`]. A missing cell, or a zero divisor,
//! leaves the dependent cells of that row missing.

use crate::aggregate::{AggregatedTable, ConfigurationKey};
use crate::config::{AnalysisConfig, ConstructTimer};
use crate::error::AnalysisWarning;
use crate::schema::{self, std_name};
use crate::table::Table;
use crate::utils::quadrature_sum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const NUM_VP: &str = "num_vp";
pub const TIME_CONSTRUCT: &str = "time_construct";
pub const SIM_FACTOR: &str = "sim_factor";
pub const TIME_ADDUP: &str = "time_addup";
pub const OTHERS: &str = "others";
pub const OTHERS_FACTOR: &str = "others_factor";
pub const OTHERS_FRAC: &str = "others_frac";
pub const TOTAL_SPIKE_COUNT_PER_S: &str = "total_spike_count_per_s";
pub const AVERAGE_FIRING_RATE: &str = "average_firing_rate";

/// Phase groups reported as one band in stacked plots
///
/// A group is only derived when all of its member phases are present.
pub const PHASE_GROUPS: [(&str, &[&str]); 2] = [
    (
        "spike_ccd",
        &[
            "time_collocate_spike_data",
            "time_communicate_spike_data",
            "time_deliver_spike_data",
        ],
    ),
    (
        "secondary_gd",
        &["time_deliver_secondary_data", "time_gather_secondary_data"],
    ),
];

/// Name of the real-time-factor contribution column of a phase
pub fn factor_name(phase: &str) -> String {
    format!("{}_factor", phase)
}

/// Name of the wall-time-percentage column of a phase
pub fn frac_name(phase: &str) -> String {
    format!("{}_frac", phase)
}

fn add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? + b?)
}

fn sub(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

fn mul(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? * b?)
}

fn div(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 => Some(a / b),
        _ => None,
    }
}

fn percent(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    div(a, b).map(|ratio| 100.0 * ratio)
}

/// Aggregated table enriched with derived metrics; the output contract for plotting
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    keys: Vec<ConfigurationKey>,
    table: Table,
    phases: Vec<String>,
    warnings: Vec<AnalysisWarning>,
}

impl DerivedTable {
    /// Configuration keys as aggregated, before model time scaling
    pub fn keys(&self) -> &[ConfigurationKey] {
        &self.keys
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Configured phases that were present and decomposed
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// Everything reported while aggregating and deriving
    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    pub fn rows(&self) -> usize {
        self.table.rows()
    }

    /// Row index of a configuration
    pub fn row_of(&self, key: &ConfigurationKey) -> Option<usize> {
        self.keys.binary_search(key).ok()
    }

    /// Configuration with the lowest real-time factor
    pub fn fastest_configuration(&self) -> Option<(ConfigurationKey, f64)> {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(row, key)| self.table.value(SIM_FACTOR, row).map(|v| (*key, v)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Row-wise builder that records which derived columns had to be skipped
struct Deriver<'a> {
    table: Table,
    config: &'a AnalysisConfig,
    keys: &'a [ConfigurationKey],
    warnings: Vec<AnalysisWarning>,
}

impl<'a> Deriver<'a> {
    fn missing(&mut self, column: &str, skipped: &str) {
        let warning = AnalysisWarning::MissingColumn {
            column: column.to_string(),
            skipped: skipped.to_string(),
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Insert `f(a, b)` for every row, or warn when an input column is absent
    fn binary<F>(&mut self, name: &str, a: &str, b: &str, f: F) -> bool
    where
        F: Fn(Option<f64>, Option<f64>) -> Option<f64>,
    {
        for input in [a, b] {
            if !self.table.contains(input) {
                self.missing(input, name);
                return false;
            }
        }
        let values = self
            .table
            .compute(|row| f(self.table.value(a, row), self.table.value(b, row)));
        self.table.insert(name, values);
        true
    }

    fn num_vp(&mut self) {
        self.binary(
            NUM_VP,
            schema::THREADS_PER_TASK,
            schema::TASKS_PER_NODE,
            mul,
        );
    }

    fn scale_model_time(&mut self) {
        let scaling = self.config.time_scaling;
        let scaled = self.table.compute(|row| {
            self.table
                .value(schema::MODEL_TIME_SIM, row)
                .map(|t| t / scaling)
        });
        self.table.insert(schema::MODEL_TIME_SIM, scaled);
    }

    fn construction(&mut self) {
        let (create, connect) = match self.config.construct_timer {
            ConstructTimer::Cpp => (
                schema::TIME_CONSTRUCTION_CREATE,
                schema::TIME_CONSTRUCTION_CONNECT,
            ),
            ConstructTimer::Python => (schema::PY_TIME_CREATE, schema::PY_TIME_CONNECT),
        };
        if !self.binary(TIME_CONSTRUCT, create, connect, add) {
            return;
        }
        let (create_std, connect_std) = (std_name(create), std_name(connect));
        let std = self.table.compute(|row| {
            quadrature_sum(&[
                self.table.value(&create_std, row),
                self.table.value(&connect_std, row),
            ])
        });
        self.table.insert(std_name(TIME_CONSTRUCT), std);
    }

    fn per_model_time(&mut self, name: &str, source: &str) -> bool {
        let done = self.binary(name, source, schema::MODEL_TIME_SIM, div);
        if done {
            let values = self.table.compute(|row| {
                div(
                    self.table.value(&std_name(source), row),
                    self.table.value(schema::MODEL_TIME_SIM, row),
                )
            });
            self.table.insert(std_name(name), values);
        }
        done
    }

    fn sim_factor(&mut self) {
        self.per_model_time(SIM_FACTOR, schema::TIME_SIMULATE);
    }

    /// Factor and fraction per phase; returns the phases that were present
    fn phases(&mut self) -> Vec<String> {
        let config = self.config;
        let mut present = Vec::new();
        for phase in &config.phases {
            if !self.table.contains(phase) {
                self.missing(phase, "phase factor and fraction");
                continue;
            }
            self.per_model_time(&factor_name(phase), phase);
            self.binary(&frac_name(phase), phase, schema::TIME_SIMULATE, percent);
            present.push(phase.clone());
        }

        for (group, members) in PHASE_GROUPS {
            if !members.iter().all(|m| present.iter().any(|p| p == m)) {
                continue;
            }
            let namers: [fn(&str) -> String; 2] = [factor_name, frac_name];
            for column in namers {
                let summed = self.table.compute(|row| {
                    members.iter().try_fold(0.0, |acc, m| {
                        self.table.value(&column(m), row).map(|v| acc + v)
                    })
                });
                self.table.insert(column(group), summed);
            }
        }

        present
    }

    fn residual(&mut self, phases: &[String]) {
        if phases.is_empty() {
            self.missing("phase timers", "time_addup and others");
            return;
        }

        let addup = self.table.compute(|row| {
            phases
                .iter()
                .try_fold(0.0, |acc, p| self.table.value(p, row).map(|v| acc + v))
        });
        let addup_std = self.table.compute(|row| {
            let stds: Vec<Option<f64>> = phases
                .iter()
                .map(|p| self.table.value(&std_name(p), row))
                .collect();
            quadrature_sum(&stds)
        });
        self.table.insert(TIME_ADDUP, addup);
        self.table.insert(std_name(TIME_ADDUP), addup_std);
        self.binary("time_addup_factor", TIME_ADDUP, schema::MODEL_TIME_SIM, div);
        self.binary(
            "time_addup_std_factor",
            &std_name(TIME_ADDUP),
            schema::MODEL_TIME_SIM,
            div,
        );

        self.binary(OTHERS, schema::TIME_SIMULATE, TIME_ADDUP, sub);
        self.binary(OTHERS_FACTOR, OTHERS, schema::MODEL_TIME_SIM, div);
        self.binary(OTHERS_FRAC, OTHERS, schema::TIME_SIMULATE, percent);

        for row in 0..self.table.rows() {
            let (Some(others), Some(simulate)) = (
                self.table.value(OTHERS, row),
                self.table.value(schema::TIME_SIMULATE, row),
            ) else {
                continue;
            };
            if others < -self.config.residual_tolerance * simulate.abs() {
                let warning = AnalysisWarning::NegativeResidual {
                    configuration: self.keys[row].to_string(),
                    others,
                    time_simulate: simulate,
                };
                warn!("{}", warning);
                self.warnings.push(warning);
            }
        }
    }

    fn spike_rate(&mut self) -> bool {
        if !self.table.contains(schema::LOCAL_SPIKE_COUNTER) {
            self.missing(schema::LOCAL_SPIKE_COUNTER, TOTAL_SPIKE_COUNT_PER_S);
            return false;
        }
        self.per_model_time(TOTAL_SPIKE_COUNT_PER_S, schema::LOCAL_SPIKE_COUNTER)
    }

    fn firing_rate(&mut self) {
        let population = if self.table.contains(schema::N_EX) && self.table.contains(schema::N_IN)
        {
            debug!("Using N_ex + N_in as the neuron population");
            self.table.compute(|row| {
                add(
                    self.table.value(schema::N_EX, row),
                    self.table.value(schema::N_IN, row),
                )
            })
        } else if self.table.contains(schema::NETWORK_SIZE) {
            // one Poisson generator, rest split evenly between E and I
            debug!("N_ex or N_in missing, estimating population from network_size");
            self.table.compute(|row| {
                self.table
                    .value(schema::NETWORK_SIZE, row)
                    .map(|size| (size - 1.0) / 2.0)
            })
        } else {
            self.missing(schema::NETWORK_SIZE, AVERAGE_FIRING_RATE);
            return;
        };

        for (name, source) in [
            (AVERAGE_FIRING_RATE.to_string(), TOTAL_SPIKE_COUNT_PER_S.to_string()),
            (std_name(AVERAGE_FIRING_RATE), std_name(TOTAL_SPIKE_COUNT_PER_S)),
        ] {
            let values = self
                .table
                .compute(|row| div(self.table.value(&source, row), population[row]));
            self.table.insert(name, values);
        }
    }
}

/// Compute all derived metrics of an aggregated table
///
/// Consumes the aggregated table: the model time is rescaled in place, so
/// a table can go through this step only once.
pub fn derive(aggregated: AggregatedTable, config: &AnalysisConfig) -> DerivedTable {
    let AggregatedTable {
        keys,
        table,
        warnings,
    } = aggregated;

    let mut deriver = Deriver {
        table,
        config,
        keys: &keys,
        warnings,
    };

    deriver.num_vp();
    deriver.scale_model_time();
    deriver.construction();
    deriver.sim_factor();
    let phases = deriver.phases();
    deriver.residual(&phases);
    if deriver.spike_rate() {
        deriver.firing_rate();
    }

    let Deriver {
        table, warnings, ..
    } = deriver;

    info!(
        "Derived metrics for {} configurations ({} of {} phases present)",
        table.rows(),
        phases.len(),
        config.phases.len()
    );

    DerivedTable {
        keys,
        table,
        phases,
        warnings,
    }
}

/// One configuration measured in both the primary and the control dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub configuration: ConfigurationKey,
    pub primary: f64,
    pub control: f64,
    /// `primary / control`
    pub ratio: Option<f64>,
}

/// Compare a derived column between two tables, configuration by configuration
///
/// Only configurations present in both tables with a value in both are
/// reported. Tables are never merged row-wise.
pub fn compare(primary: &DerivedTable, control: &DerivedTable, column: &str) -> Vec<ComparisonRow> {
    primary
        .keys()
        .iter()
        .enumerate()
        .filter_map(|(row, key)| {
            let control_row = control.row_of(key)?;
            let p = primary.table().value(column, row)?;
            let c = control.table().value(column, control_row)?;
            Some(ComparisonRow {
                configuration: *key,
                primary: p,
                control: c,
                ratio: div(Some(p), Some(c)),
            })
        })
        .collect()
}

/// Per-configuration relative difference of a primary table to a control table
///
/// Rows are the configurations present in both tables, columns those present
/// in both. Key columns keep the primary's values; every other cell holds
/// `(primary - control) / control`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeDifference {
    keys: Vec<ConfigurationKey>,
    table: Table,
}

impl RelativeDifference {
    pub fn keys(&self) -> &[ConfigurationKey] {
        &self.keys
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn rows(&self) -> usize {
        self.table.rows()
    }
}

/// Relative difference of every shared column, for shared configurations only
///
/// A missing value on either side, or a control value of zero, leaves the
/// cell missing.
pub fn relative_difference(primary: &DerivedTable, control: &DerivedTable) -> RelativeDifference {
    // (primary row, control row)
    let pairs: Vec<(usize, usize)> = primary
        .keys()
        .iter()
        .enumerate()
        .filter_map(|(row, key)| control.row_of(key).map(|c| (row, c)))
        .collect();
    let keys = pairs.iter().map(|&(row, _)| primary.keys()[row]).collect();

    let mut table = Table::new(pairs.len());
    for column in primary.table().columns() {
        let Some(control_values) = control.table().get(&column.name) else {
            continue;
        };
        let is_key = schema::KEY_COLUMNS.contains(&column.name.as_str());
        let values = pairs
            .iter()
            .map(|&(p, c)| {
                if is_key {
                    column.values[p]
                } else {
                    div(sub(column.values[p], control_values[c]), control_values[c])
                }
            })
            .collect();
        table.insert(column.name.as_str(), values);
    }

    debug!(
        "Relative difference over {} shared configurations and {} columns",
        table.rows(),
        table.columns().len()
    );
    RelativeDifference { keys, table }
}
