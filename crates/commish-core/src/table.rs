//! The record store's data shapes: workbooks hold named tables, tables hold a
//! header row and ordered rows of text cells.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A named collection of tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
  pub workbook_id: i64,
  pub name:        String,
  pub created_at:  DateTime<Utc>,
}

/// A snapshot of one table: its header and every row, in order.
///
/// Every row has exactly `columns.len()` cells. Empty cells are empty
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
  pub name:    String,
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<String>>,
}

impl Table {
  pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
    Self { name: name.into(), columns, rows: Vec::new() }
  }

  pub fn column_index(&self, column: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == column)
  }

  /// Like [`column_index`](Self::column_index) but missing headers are an
  /// error naming the table.
  pub fn require_column(&self, column: &str) -> Result<usize> {
    self.column_index(column).ok_or_else(|| Error::MissingColumn {
      table:  self.name.clone(),
      column: column.to_owned(),
    })
  }

  /// The cell at `row` under `column`, if both exist.
  pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
    let col = self.column_index(column)?;
    self.rows.get(row)?.get(col).map(String::as_str)
  }

  /// Row index of the first row whose `column` cell equals `value`.
  pub fn find_row(&self, column: &str, value: &str) -> Option<usize> {
    let col = self.column_index(column)?;
    self
      .rows
      .iter()
      .position(|r| r.get(col).is_some_and(|c| c == value))
  }

  /// Rows keyed by header, for display and JSON output.
  pub fn records(&self) -> Vec<BTreeMap<String, String>> {
    self
      .rows
      .iter()
      .map(|row| {
        self
          .columns
          .iter()
          .cloned()
          .zip(row.iter().cloned())
          .collect()
      })
      .collect()
  }
}

/// Pad or truncate `row` to `width` cells.
pub fn fit_row(mut row: Vec<String>, width: usize) -> Vec<String> {
  row.resize(width, String::new());
  row
}
