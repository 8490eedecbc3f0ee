//! The collaborator traits: the record store, the durable schedule store and
//! the event provider.
//!
//! Backends live in their own crates (`commish-store-sqlite`,
//! `commish-odds`). The engine depends on these abstractions only.

use std::future::Future;

use crate::{
  game::Game,
  schedule::{EntryStatus, ScheduleEntry},
  table::{Table, Workbook},
};

// ─── Failure classification ──────────────────────────────────────────────────

/// How a caller should react to a collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// Worth retrying after a delay (busy database, rate limit, network).
  Transient,
  /// The thing being created already exists.
  Duplicate,
  /// The thing being read does not exist.
  NotFound,
  /// Anything else; retrying will not help.
  Permanent,
}

/// Implemented by every collaborator error type.
pub trait Classify {
  fn failure_kind(&self) -> FailureKind;

  fn is_transient(&self) -> bool { self.failure_kind() == FailureKind::Transient }
}

// ─── Record store ────────────────────────────────────────────────────────────

/// Workbooks of tables of text cells.
///
/// All methods return `Send` futures so a store can be shared across tokio
/// tasks and axum handlers.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Create a workbook, or return the existing one with that name.
  fn create_workbook<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Workbook, Self::Error>> + Send + 'a;

  /// Look up a workbook by name. Missing workbooks classify as
  /// [`FailureKind::NotFound`].
  fn open<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Workbook, Self::Error>> + Send + 'a;

  /// Names of every table in `workbook`, in creation order.
  fn list_tables<'a>(
    &'a self,
    workbook: &'a Workbook,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Create a table with a header and initial rows. An existing table of the
  /// same name classifies as [`FailureKind::Duplicate`] and is left as is.
  fn create_table<'a>(
    &'a self,
    workbook: &'a Workbook,
    name: &'a str,
    columns: &'a [String],
    rows: &'a [Vec<String>],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Snapshot a whole table.
  fn read_all<'a>(
    &'a self,
    workbook: &'a Workbook,
    table: &'a str,
  ) -> impl Future<Output = Result<Table, Self::Error>> + Send + 'a;

  /// Overwrite one cell, addressed by zero-based row and header name.
  fn write_cell<'a>(
    &'a self,
    workbook: &'a Workbook,
    table: &'a str,
    row: usize,
    column: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Append a row and return its index.
  fn append_row<'a>(
    &'a self,
    workbook: &'a Workbook,
    table: &'a str,
    cells: &'a [String],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}

// ─── Schedule store ──────────────────────────────────────────────────────────

/// Durable storage for schedule entries, so armed timers survive a restart.
pub trait ScheduleStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Persist a pending entry. Returns `false` if an entry with the same id
  /// already exists, in which case nothing changes.
  fn save_entry<'a>(
    &'a self,
    entry: &'a ScheduleEntry,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Every pending entry, earliest target first.
  fn pending_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<ScheduleEntry>, Self::Error>> + Send + '_;

  /// Record the final status of an entry.
  fn finish_entry<'a>(
    &'a self,
    entry_id: &'a str,
    status: EntryStatus,
    error: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Event provider ──────────────────────────────────────────────────────────

/// Source of the game schedule and results.
pub trait EventProvider: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Upcoming games.
  fn fetch_events(
    &self,
  ) -> impl Future<Output = Result<Vec<Game>, Self::Error>> + Send + '_;

  /// Games from the last `days_from` days, with completion state and scores.
  fn fetch_results(
    &self,
    days_from: u32,
  ) -> impl Future<Output = Result<Vec<Game>, Self::Error>> + Send + '_;
}
