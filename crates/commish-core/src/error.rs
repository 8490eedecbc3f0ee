//! Error types for `commish-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown team name: {0:?}")]
  UnknownTeam(String),

  #[error("table {table:?} has no column {column:?}")]
  MissingColumn { table: String, column: String },

  #[error("table {table:?} has no row {row}")]
  MissingRow { table: String, row: usize },

  #[error("not a week table name: {0:?}")]
  NotAWeekTable(String),

  #[error("invalid timestamp {value:?}: {reason}")]
  InvalidTimestamp { value: String, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
