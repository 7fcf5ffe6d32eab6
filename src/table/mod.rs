// src/table/mod.rs

pub mod arrow;
pub mod flatten;
pub mod write;

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::HashMap;

pub use flatten::{cell_text, flatten_record};

/// A flat, column-named table of optional string cells.
///
/// Every row holds exactly `columns.len()` cells. `None` marks a cell whose
/// key was absent from (or `null` in) the source record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Build a table from explicit columns and rows, rejecting ragged rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            bail!(
                "row {} has {} cells but the table has {} columns",
                idx,
                row.len(),
                columns.len()
            );
        }
        Ok(Self { columns, rows })
    }

    /// Flatten a sequence of JSON objects into one table.
    ///
    /// Columns are the union of the flattened keys in order of first
    /// appearance. Elements that are not objects contribute an empty row.
    pub fn from_records(records: &[Value]) -> Self {
        let flattened: Vec<Vec<(String, Value)>> = records.iter().map(flatten_record).collect();

        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for rec in &flattened {
            for (key, _) in rec {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = flattened
            .into_iter()
            .map(|rec| {
                let mut row = vec![None; columns.len()];
                for (key, value) in rec {
                    row[index[&key]] = cell_text(&value);
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of column `name`, or `None` if there is no such column.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?[idx].as_deref()
    }

    /// Rename columns through `mapping`. Names missing from the mapping are kept.
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        for col in self.columns.iter_mut() {
            if let Some(new_name) = mapping.get(col.as_str()) {
                *col = new_name.clone();
            }
        }
    }

    /// Insert a column at `index` (clamped to the width) holding `value` on every row.
    pub fn insert_column(&mut self, index: usize, name: impl Into<String>, value: Option<String>) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, name.into());
        for row in self.rows.iter_mut() {
            row.insert(index, value.clone());
        }
    }

    /// Project onto `names`, in that order. Unknown names become all-`None` columns.
    pub fn select(&self, names: &[&str]) -> Table {
        let picks: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                picks
                    .iter()
                    .map(|p| p.and_then(|i| r[i].clone()))
                    .collect()
            })
            .collect();
        Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        }
    }

    /// Iterate rows as `(column, cell)` pairs.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, Option<&str>)>> + '_ {
        self.rows.iter().map(move |r| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(r.iter().map(|c| c.as_deref()))
                .collect()
        })
    }
}
