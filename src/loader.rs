//! # Timer File Loader
//!
//! Reads the per-trial CSV written by the benchmarking framework into a
//! [`TrialTable`]. Only columns named by the [`Schema`] are kept; the
//! framework also emits text columns (job ids, metadata uuids) which are
//! ignored here. The header is validated against the schema's required
//! columns before any row is read.

use crate::error::LoadError;
use crate::schema::Schema;
use crate::table::Table;
use crate::utils::parse_cell;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Raw trials, one row per simulation run, restricted to schema columns
#[derive(Debug, Clone)]
pub struct TrialTable {
    table: Table,
    lines: Vec<u64>,
}

impl TrialTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn rows(&self) -> usize {
        self.table.rows()
    }

    /// Source line of a row, for diagnostics
    pub fn line(&self, row: usize) -> u64 {
        self.lines.get(row).copied().unwrap_or(0)
    }

    /// Build a trial table from already parsed columns
    ///
    /// Used by callers that obtain trials from somewhere other than a CSV
    /// file. Rows are numbered from line 2, as if a header preceded them.
    pub fn from_table(table: Table, schema: &Schema) -> Result<Self, LoadError> {
        let header: Vec<String> = table.column_names().map(str::to_string).collect();
        schema
            .check_header(&header)
            .map_err(|column| LoadError::MissingColumn {
                column: column.to_string(),
            })?;
        if table.rows() == 0 {
            return Err(LoadError::Empty);
        }
        let lines = (0..table.rows() as u64).map(|row| row + 2).collect();
        Ok(Self { table, lines })
    }
}

/// Load a timer CSV from disk
pub fn load_file(path: &Path, schema: &Schema) -> Result<TrialTable, LoadError> {
    debug!("Loading {}", path.display());
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_reader(file, schema)
}

/// Load a timer CSV from any reader
pub fn load_reader<R: Read>(reader: R, schema: &Schema) -> Result<TrialTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    schema
        .check_header(&header)
        .map_err(|column| LoadError::MissingColumn {
            column: column.to_string(),
        })?;

    // (schema column name, position in the file)
    let selected: Vec<(&'static str, usize)> = schema
        .columns()
        .iter()
        .filter_map(|spec| {
            header
                .iter()
                .position(|h| h == spec.name)
                .map(|index| (spec.name, index))
        })
        .collect();

    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); selected.len()];
    let mut lines = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        for (slot, &(name, index)) in selected.iter().enumerate() {
            let raw = record.get(index).unwrap_or("");
            let value = parse_cell(raw).map_err(|value| LoadError::InvalidValue {
                column: name.to_string(),
                line,
                value,
            })?;
            values[slot].push(value);
        }
        lines.push(line);
    }

    if lines.is_empty() {
        return Err(LoadError::Empty);
    }

    let mut table = Table::new(lines.len());
    for ((name, _), column) in selected.into_iter().zip(values) {
        table.insert(name, column);
    }

    debug!(
        "Loaded {} trials with {} known columns",
        table.rows(),
        table.columns().len()
    );
    Ok(TrialTable { table, lines })
}
