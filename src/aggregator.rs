//! # Metrics Aggregator
//!
//! Entry point of the analysis. An [`Aggregator`] owns one analysis run: a
//! configuration and up to two derived tables, the primary dataset and an
//! optional control dataset that it is compared against. Each dataset is
//! loaded, aggregated and derived independently; the two are only ever
//! compared configuration by configuration, never merged.
//!
//! ## Lifecycle
//!
//! 1. **Load**: read the trial CSV and check it against the schema
//! 2. **Aggregate**: group trials by configuration, mean/std per column
//! 3. **Derive**: compute the derived metrics once from the means
//!
//! Loading the same role twice replaces the earlier table; nothing is
//! mutated after it has been derived.

use crate::aggregate::aggregate;
use crate::config::{AnalysisConfig, Role};
use crate::error::LoadError;
use crate::loader::{load_file, load_reader, TrialTable};
use crate::metrics::{
    compare, derive, relative_difference, ComparisonRow, DerivedTable, RelativeDifference,
};
use crate::schema::Schema;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One analysis run over a primary and an optional control dataset
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AnalysisConfig,
    schema: Schema,
    primary: Option<DerivedTable>,
    control: Option<DerivedTable>,
}

impl Aggregator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            schema: Schema::default(),
            primary: None,
            control: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load, aggregate and derive a timer file for the given role
    pub fn load_file(&mut self, path: &Path, role: Role) -> Result<&DerivedTable, LoadError> {
        info!("Loading {} data from {}", role, path.display());
        let trials = load_file(path, &self.schema)?;
        Ok(self.load(trials, role))
    }

    /// Same as [`Aggregator::load_file`] for data that is not on disk
    pub fn load_reader<R: Read>(&mut self, reader: R, role: Role) -> Result<&DerivedTable, LoadError> {
        let trials = load_reader(reader, &self.schema)?;
        Ok(self.load(trials, role))
    }

    /// Aggregate and derive already loaded trials
    pub fn load(&mut self, trials: TrialTable, role: Role) -> &DerivedTable {
        let derived = derive(aggregate(&trials, &self.schema), &self.config);
        info!(
            "{} data: {} trials in {} configurations, {} warnings",
            role,
            trials.rows(),
            derived.rows(),
            derived.warnings().len()
        );
        let slot = match role {
            Role::Primary => &mut self.primary,
            Role::Control => &mut self.control,
        };
        slot.insert(derived)
    }

    pub fn table(&self, role: Role) -> Option<&DerivedTable> {
        match role {
            Role::Primary => self.primary.as_ref(),
            Role::Control => self.control.as_ref(),
        }
    }

    /// Compare a derived column between the primary and control tables
    ///
    /// Returns `None` unless both tables are loaded.
    pub fn compare(&self, column: &str) -> Option<Vec<ComparisonRow>> {
        Some(compare(self.primary.as_ref()?, self.control.as_ref()?, column))
    }

    /// Relative difference of every shared column, primary against control
    ///
    /// Returns `None` unless both tables are loaded.
    pub fn relative_difference(&self) -> Option<RelativeDifference> {
        Some(relative_difference(
            self.primary.as_ref()?,
            self.control.as_ref()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SIM_FACTOR;

    const CSV: &str = "num_nodes,threads_per_task,tasks_per_node,model_time_sim,rng_seed,\
time_construction_create,time_construction_connect,time_simulate\n\
1,1,1,5,1,1,1,10\n\
1,1,1,5,2,1,1,12\n";

    fn unscaled() -> AnalysisConfig {
        AnalysisConfig {
            time_scaling: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_roles_are_kept_apart() {
        let mut aggregator = Aggregator::new(unscaled());
        aggregator.load_reader(CSV.as_bytes(), Role::Primary).unwrap();

        assert!(aggregator.table(Role::Primary).is_some());
        assert!(aggregator.table(Role::Control).is_none());
        assert!(aggregator.compare(SIM_FACTOR).is_none());
        assert!(aggregator.relative_difference().is_none());
    }

    #[test]
    fn test_compare_with_control() {
        let mut aggregator = Aggregator::new(unscaled());
        aggregator.load_reader(CSV.as_bytes(), Role::Primary).unwrap();
        aggregator.load_reader(CSV.as_bytes(), Role::Control).unwrap();

        let rows = aggregator.compare(SIM_FACTOR).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ratio, Some(1.0));

        let diff = aggregator.relative_difference().unwrap();
        assert_eq!(diff.rows(), 1);
        assert_eq!(diff.table().value(SIM_FACTOR, 0), Some(0.0));
    }

    #[test]
    fn test_failed_load_keeps_previous_table() {
        let mut aggregator = Aggregator::new(unscaled());
        aggregator.load_reader(CSV.as_bytes(), Role::Primary).unwrap();
        assert!(aggregator
            .load_reader("not,a,timer,file\n".as_bytes(), Role::Primary)
            .is_err());
        assert!(aggregator.table(Role::Primary).is_some());
    }
}
