//! Error type for `commish-store-sqlite`.

use commish_core::store::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] commish_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("workbook not found: {0:?}")]
  WorkbookNotFound(String),

  #[error("table {table:?} not found in workbook {workbook:?}")]
  TableNotFound { workbook: String, table: String },

  #[error("table {table:?} already exists in workbook {workbook:?}")]
  TableExists { workbook: String, table: String },

  #[error("table {table:?} has no column {column:?}")]
  UnknownColumn { table: String, column: String },

  #[error("table {table:?} has no row {row}")]
  RowOutOfRange { table: String, row: usize },

  #[error("schedule entry not found: {0}")]
  EntryNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  fn is_busy(&self) -> bool {
    let Self::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
      e,
      _,
    ))) = self
    else {
      return false;
    };
    matches!(
      e.code,
      rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
    )
  }
}

impl Classify for Error {
  fn failure_kind(&self) -> FailureKind {
    match self {
      _ if self.is_busy() => FailureKind::Transient,
      Self::TableExists { .. } => FailureKind::Duplicate,
      Self::WorkbookNotFound(_)
      | Self::TableNotFound { .. }
      | Self::EntryNotFound(_) => FailureKind::NotFound,
      _ => FailureKind::Permanent,
    }
  }
}
