use crate::aggregate::ConfigurationKey;
use crate::aggregator::Aggregator;
use crate::config::{AnalysisConfig, Role};
use crate::error::AnalysisWarning;
use crate::metrics::{ComparisonRow, DerivedTable, SIM_FACTOR};
use crate::table::Table;
use crate::utils::format_cell;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Summary of one derived table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub role: Role,
    pub output_file: PathBuf,
    pub configurations: usize,
    pub columns: Vec<String>,
    pub phases: Vec<String>,
    pub fastest_configuration: Option<ConfigurationKey>,
    pub fastest_sim_factor: Option<f64>,
    pub warnings: Vec<AnalysisWarning>,
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub tool_version: String,
}

/// Analysis metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub run_id: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub system_info: SystemInfo,
    pub config: AnalysisConfig,
}

/// JSON summary written next to the aggregated CSV files
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub metadata: AnalysisMetadata,
    pub tables: Vec<TableSummary>,
    /// Per-configuration `sim_factor` of primary over control
    pub comparison: Option<Vec<ComparisonRow>>,
    /// Relative difference table of primary to control, when both were loaded
    pub relative_difference_file: Option<PathBuf>,
}

/// Writes the derived tables of an analysis run and its summary
pub struct ResultsManager {
    output_dir: PathBuf,
    run_id: String,
    precision: usize,
}

impl ResultsManager {
    /// Create a results manager writing `<run_id>*.csv` and `<run_id>.json` into `output_dir`
    pub fn new(output_dir: &Path, run_id: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run_id: run_id.into(),
            precision: crate::defaults::CSV_PRECISION,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Path of the aggregated CSV for a role
    pub fn csv_path(&self, role: Role) -> PathBuf {
        let name = match role {
            Role::Primary => format!("{}.csv", self.run_id),
            Role::Control => format!("{}_ctrl.csv", self.run_id),
        };
        self.output_dir.join(name)
    }

    /// Path of the primary-to-control relative difference CSV
    pub fn rel_diff_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_rel_diff.csv", self.run_id))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.run_id))
    }

    /// Write every loaded table and the JSON summary
    pub fn finalize(&self, aggregator: &Aggregator) -> Result<AnalysisSummary> {
        info!("Finalizing analysis results");

        let mut tables = Vec::new();
        for role in [Role::Primary, Role::Control] {
            if let Some(derived) = aggregator.table(role) {
                let path = self.csv_path(role);
                self.write_csv(derived.table(), &path)?;
                info!("{} table written to: {:?}", role, path);
                tables.push(Self::summarize(role, derived, path));
            }
        }

        let relative_difference_file = match aggregator.relative_difference() {
            Some(diff) => {
                let path = self.rel_diff_path();
                self.write_csv(diff.table(), &path)?;
                info!(
                    "Relative difference of {} shared configurations written to: {:?}",
                    diff.rows(),
                    path
                );
                Some(path)
            }
            None => None,
        };

        let summary = AnalysisSummary {
            metadata: AnalysisMetadata {
                run_id: self.run_id.clone(),
                version: crate::VERSION.to_string(),
                timestamp: chrono::Utc::now(),
                system_info: SystemInfo::default(),
                config: aggregator.config().clone(),
            },
            tables,
            comparison: aggregator.compare(SIM_FACTOR),
            relative_difference_file,
        };

        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(self.summary_path(), json)
            .with_context(|| format!("Failed to write {}", self.summary_path().display()))?;
        info!("Summary written to: {:?}", self.summary_path());

        Ok(summary)
    }

    /// Write a table as CSV with fixed-precision floats
    pub fn write_csv(&self, table: &Table, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_table(table, file)
    }

    fn write_table<W: Write>(&self, table: &Table, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(table.column_names())?;
        for row in 0..table.rows() {
            csv_writer.write_record(
                table
                    .columns()
                    .iter()
                    .map(|c| format_cell(c.values[row], self.precision)),
            )?;
        }
        csv_writer.flush()?;

        debug!("Wrote {} rows x {} columns", table.rows(), table.columns().len());
        Ok(())
    }

    fn summarize(role: Role, derived: &DerivedTable, output_file: PathBuf) -> TableSummary {
        let fastest = derived.fastest_configuration();
        TableSummary {
            role,
            output_file,
            configurations: derived.rows(),
            columns: derived.table().column_names().map(str::to_string).collect(),
            phases: derived.phases().to_vec(),
            fastest_configuration: fastest.map(|(key, _)| key),
            fastest_sim_factor: fastest.map(|(_, factor)| factor),
            warnings: derived.warnings().to_vec(),
        }
    }
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            tool_version: crate::VERSION.to_string(),
        }
    }
}
