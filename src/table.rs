//! Column-oriented numeric table
//!
//! Every cell is an `Option<f64>`; `None` is the missing-value marker that
//! flows through derived formulas instead of aborting them.

use serde::{Deserialize, Serialize};

/// A named column of optional values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// An ordered set of equally long columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// A single cell; `None` when either the column or the value is missing
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.get(name).and_then(|values| values.get(row).copied().flatten())
    }

    /// Append a column, or replace the values of an existing one in place
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per row.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        assert_eq!(
            values.len(),
            self.rows,
            "column length must match the table's row count"
        );
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    /// Build a new column row by row from existing cells
    pub fn compute<F>(&self, f: F) -> Vec<Option<f64>>
    where
        F: Fn(usize) -> Option<f64>,
    {
        (0..self.rows).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut table = Table::new(2);
        table.insert("a", vec![Some(1.0), None]);

        assert!(table.contains("a"));
        assert_eq!(table.value("a", 0), Some(1.0));
        assert_eq!(table.value("a", 1), None);
        assert_eq!(table.value("b", 0), None);
    }

    #[test]
    fn test_insert_replaces_existing_column() {
        let mut table = Table::new(1);
        table.insert("a", vec![Some(1.0)]);
        table.insert("b", vec![Some(2.0)]);
        table.insert("a", vec![Some(3.0)]);

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.value("a", 0), Some(3.0));
    }

    #[test]
    fn test_compute() {
        let mut table = Table::new(3);
        table.insert("x", vec![Some(1.0), Some(2.0), None]);
        let doubled = table.compute(|row| table.value("x", row).map(|x| x * 2.0));
        assert_eq!(doubled, vec![Some(2.0), Some(4.0), None]);
    }

    #[test]
    #[should_panic]
    fn test_insert_rejects_wrong_length() {
        let mut table = Table::new(2);
        table.insert("a", vec![Some(1.0)]);
    }
}
