// src/table/arrow.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;

use super::Table;

/// Build an ArrowSchema (inside an Arc) with one nullable Utf8 field per column.
///
/// e-Stat delivers every observation as text (values carry markers such as
/// `-` or `***` alongside numbers), so no type inference is attempted here.
pub fn build_arrow_schema(columns: &[String]) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = columns
        .iter()
        .map(|name| ArrowField::new(name, DataType::Utf8, /* nullable = */ true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

impl Table {
    /// Convert into a single Arrow `RecordBatch`.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = build_arrow_schema(self.columns());

        let arrays: Vec<ArrayRef> = (0..self.width())
            .map(|i| {
                let arr: StringArray = self.rows().iter().map(|r| r[i].as_deref()).collect();
                Arc::new(arr) as ArrayRef
            })
            .collect();

        // a zero-column table still carries its row count
        let options = RecordBatchOptions::new().with_row_count(Some(self.len()));
        RecordBatch::try_new_with_options(schema, arrays, &options)
            .context("building record batch from table")
    }
}
