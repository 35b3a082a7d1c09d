//! # Trial Aggregation
//!
//! Collapses the repeated trials of each experimental configuration into a
//! single row. Trials of one configuration differ only by their random seed,
//! so the seed column is dropped and rows are grouped by
//! [`ConfigurationKey`]. Timer and counter columns become a mean plus a
//! `_std` column holding the sample standard deviation; static descriptors
//! such as population sizes keep their first value.

use crate::error::AnalysisWarning;
use crate::loader::TrialTable;
use crate::schema::{self, Aggregation, Schema};
use crate::table::Table;
use crate::utils::{first_present, mean_std};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One experimental configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfigurationKey {
    pub num_nodes: f64,
    pub threads_per_task: f64,
    pub tasks_per_node: f64,
    pub model_time_sim: f64,
}

impl ConfigurationKey {
    fn fields(&self) -> [f64; 4] {
        [
            self.num_nodes,
            self.threads_per_task,
            self.tasks_per_node,
            self.model_time_sim,
        ]
    }
}

impl PartialEq for ConfigurationKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ConfigurationKey {}

impl PartialOrd for ConfigurationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigurationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields()
            .iter()
            .zip(other.fields().iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl std::fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nodes={} threads={} tasks={} T_model={}",
            self.num_nodes, self.threads_per_task, self.tasks_per_node, self.model_time_sim
        )
    }
}

/// One row per configuration, with means, standard deviations and descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTable {
    pub(crate) keys: Vec<ConfigurationKey>,
    pub(crate) table: Table,
    pub(crate) warnings: Vec<AnalysisWarning>,
}

impl AggregatedTable {
    pub fn keys(&self) -> &[ConfigurationKey] {
        &self.keys
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Conditions met while grouping (skipped rows)
    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }
}

/// Group trials by configuration and reduce each group to one row
///
/// Groups come out in ascending key order. Optional columns absent from the
/// trial table are simply absent from the result.
pub fn aggregate(trials: &TrialTable, schema: &Schema) -> AggregatedTable {
    let source = trials.table();
    let mut warnings = Vec::new();
    let mut groups: BTreeMap<ConfigurationKey, Vec<usize>> = BTreeMap::new();

    for row in 0..source.rows() {
        let mut fields = [0.0; 4];
        let mut complete = true;
        for (field, &column) in fields.iter_mut().zip(schema::KEY_COLUMNS.iter()) {
            match source.value(column, row) {
                Some(v) => *field = v,
                None => {
                    let warning = AnalysisWarning::SkippedRow {
                        line: trials.line(row),
                        column: column.to_string(),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            continue;
        }

        let key = ConfigurationKey {
            num_nodes: fields[0],
            threads_per_task: fields[1],
            tasks_per_node: fields[2],
            model_time_sim: fields[3],
        };
        groups.entry(key).or_default().push(row);
    }

    let keys: Vec<ConfigurationKey> = groups.keys().copied().collect();
    let mut table = Table::new(keys.len());

    for spec in schema.columns() {
        let Some(values) = source.get(spec.name) else {
            continue;
        };
        let gather = |rows: &[usize]| -> Vec<Option<f64>> {
            rows.iter().map(|&row| values[row]).collect()
        };

        match spec.aggregation {
            Aggregation::Drop => {}
            Aggregation::Key | Aggregation::First => {
                let column = groups
                    .values()
                    .map(|rows| first_present(&gather(rows.as_slice())))
                    .collect();
                table.insert(spec.name, column);
            }
            Aggregation::MeanStd => {
                let (means, stds): (Vec<_>, Vec<_>) = groups
                    .values()
                    .map(|rows| mean_std(&gather(rows.as_slice())))
                    .unzip();
                table.insert(spec.name, means);
                table.insert(schema::std_name(spec.name), stds);
            }
        }
    }

    debug!(
        "Aggregated {} trials into {} configurations",
        source.rows(),
        keys.len()
    );

    AggregatedTable {
        keys,
        table,
        warnings,
    }
}
