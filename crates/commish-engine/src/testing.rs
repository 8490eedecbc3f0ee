//! Shared fixtures for the engine's unit tests.

use std::{
  fmt,
  future::Future,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use commish_core::{
  game::{Game, TeamScore},
  schedule::{EntryStatus, ScheduleEntry},
  store::{Classify, EventProvider, FailureKind, RecordStore, ScheduleStore},
  table::{Table, Workbook},
  team::TeamName,
  week::{CONFIDENCE_RANK, PREDICTED_WINNER, week_table_name},
};
use commish_store_sqlite::SqliteStore;

use crate::{EngineConfig, RetryPolicy};

pub async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

pub fn config() -> EngineConfig {
  EngineConfig {
    participants: vec!["Amy".into(), "Ben".into()],
    retry: RetryPolicy::none(),
    ..EngineConfig::default()
  }
}

/// Sunday 2024-09-08 13:00 America/New_York.
pub fn base_time() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap() }

/// Detroit hosts Chicago `hours` after [`base_time`].
pub fn game(id: &str, hours: i64) -> Game {
  game_between(id, "detroit-lions", "chicago-bears", base_time() + TimeDelta::hours(hours))
}

pub fn game_between(id: &str, home: &str, away: &str, at: DateTime<Utc>) -> Game {
  Game {
    id:            id.to_owned(),
    home_team:     TeamName::parse(home).unwrap(),
    away_team:     TeamName::parse(away).unwrap(),
    commence_time: at,
    completed:     None,
    scores:        None,
  }
}

/// `game` as reported by the scores endpoint once it has finished.
pub fn finished(mut game: Game, home_score: i64, away_score: i64) -> Game {
  game.completed = Some(true);
  game.scores = Some(vec![
    TeamScore { team: game.home_team.clone(), score: home_score },
    TeamScore { team: game.away_team.clone(), score: away_score },
  ]);
  game
}

/// Fill in a participant's pick for one game.
pub async fn enter_pick(
  store: &SqliteStore,
  participant: &str,
  week: u32,
  game_id: &str,
  predicted: &str,
  confidence: &str,
) {
  let wb = store.open(&format!("{participant} Picks")).await.unwrap();
  let table = week_table_name(week);
  let row = store
    .read_all(&wb, &table)
    .await
    .unwrap()
    .find_row("Game ID", game_id)
    .unwrap();
  store.write_cell(&wb, &table, row, PREDICTED_WINNER, predicted).await.unwrap();
  store.write_cell(&wb, &table, row, CONFIDENCE_RANK, confidence).await.unwrap();
}

// ─── Fake provider ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FakeError(pub FailureKind);

impl fmt::Display for FakeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "fake {:?} failure", self.0) }
}

impl std::error::Error for FakeError {}

impl Classify for FakeError {
  fn failure_kind(&self) -> FailureKind { self.0 }
}

/// Serves canned events and results and counts calls. With `failing` set,
/// every fetch fails with that kind.
#[derive(Default)]
pub struct FakeProvider {
  pub events:        Mutex<Vec<Game>>,
  pub results:       Mutex<Vec<Game>>,
  pub failing:       Mutex<Option<FailureKind>>,
  pub event_calls:   AtomicUsize,
  pub results_calls: AtomicUsize,
}

impl FakeProvider {
  pub fn with_events(events: Vec<Game>) -> Arc<Self> {
    Arc::new(Self { events: Mutex::new(events), ..Self::default() })
  }

  pub fn with_results(results: Vec<Game>) -> Arc<Self> {
    Arc::new(Self { results: Mutex::new(results), ..Self::default() })
  }
}

impl EventProvider for FakeProvider {
  type Error = FakeError;

  async fn fetch_events(&self) -> Result<Vec<Game>, FakeError> {
    self.event_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(kind) = *self.failing.lock().unwrap() {
      return Err(FakeError(kind));
    }
    Ok(self.events.lock().unwrap().clone())
  }

  async fn fetch_results(&self, _days_from: u32) -> Result<Vec<Game>, FakeError> {
    self.results_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(kind) = *self.failing.lock().unwrap() {
      return Err(FakeError(kind));
    }
    Ok(self.results.lock().unwrap().clone())
  }
}

// ─── Flaky store ─────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FlakyError {
  #[error(transparent)]
  Inner(#[from] commish_store_sqlite::Error),
  #[error("injected {0:?} failure")]
  Injected(FailureKind),
}

impl Classify for FlakyError {
  fn failure_kind(&self) -> FailureKind {
    match self {
      Self::Inner(e) => e.failure_kind(),
      Self::Injected(kind) => *kind,
    }
  }
}

/// A [`SqliteStore`] that fails chosen operations with a chosen kind.
pub struct FlakyStore {
  pub inner:      SqliteStore,
  /// Opening this workbook fails.
  pub fail_open:  Mutex<Option<(String, FailureKind)>>,
  /// Writing a cell in this column fails.
  pub fail_write: Mutex<Option<(String, FailureKind)>>,
  /// Every `save_entry` fails.
  pub fail_save:  Mutex<Option<FailureKind>>,
}

impl FlakyStore {
  pub async fn new() -> Arc<Self> {
    Arc::new(Self {
      inner:      store().await,
      fail_open:  Mutex::new(None),
      fail_write: Mutex::new(None),
      fail_save:  Mutex::new(None),
    })
  }

  fn injected(slot: &Mutex<Option<(String, FailureKind)>>, key: &str) -> Result<(), FlakyError> {
    match &*slot.lock().unwrap() {
      Some((target, kind)) if target == key => Err(FlakyError::Injected(*kind)),
      _ => Ok(()),
    }
  }
}

impl RecordStore for FlakyStore {
  type Error = FlakyError;

  fn create_workbook<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Workbook, FlakyError>> + Send + 'a {
    async move { Ok(self.inner.create_workbook(name).await?) }
  }

  fn open<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Workbook, FlakyError>> + Send + 'a {
    async move {
      Self::injected(&self.fail_open, name)?;
      Ok(self.inner.open(name).await?)
    }
  }

  fn list_tables<'a>(
    &'a self,
    workbook: &'a Workbook,
  ) -> impl Future<Output = Result<Vec<String>, FlakyError>> + Send + 'a {
    async move { Ok(self.inner.list_tables(workbook).await?) }
  }

  fn create_table<'a>(
    &'a self,
    workbook: &'a Workbook,
    name: &'a str,
    columns: &'a [String],
    rows: &'a [Vec<String>],
  ) -> impl Future<Output = Result<(), FlakyError>> + Send + 'a {
    async move { Ok(self.inner.create_table(workbook, name, columns, rows).await?) }
  }

  fn read_all<'a>(
    &'a self,
    workbook: &'a Workbook,
    table: &'a str,
  ) -> impl Future<Output = Result<Table, FlakyError>> + Send + 'a {
    async move { Ok(self.inner.read_all(workbook, table).await?) }
  }

  fn write_cell<'a>(
    &'a self,
    workbook: &'a Workbook,
    table: &'a str,
    row: usize,
    column: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), FlakyError>> + Send + 'a {
    async move {
      Self::injected(&self.fail_write, column)?;
      Ok(self.inner.write_cell(workbook, table, row, column, value).await?)
    }
  }

  fn append_row<'a>(
    &'a self,
    workbook: &'a Workbook,
    table: &'a str,
    cells: &'a [String],
  ) -> impl Future<Output = Result<usize, FlakyError>> + Send + 'a {
    async move { Ok(self.inner.append_row(workbook, table, cells).await?) }
  }
}

impl ScheduleStore for FlakyStore {
  type Error = FlakyError;

  fn save_entry<'a>(
    &'a self,
    entry: &'a ScheduleEntry,
  ) -> impl Future<Output = Result<bool, FlakyError>> + Send + 'a {
    async move {
      if let Some(kind) = *self.fail_save.lock().unwrap() {
        return Err(FlakyError::Injected(kind));
      }
      Ok(self.inner.save_entry(entry).await?)
    }
  }

  fn pending_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<ScheduleEntry>, FlakyError>> + Send + '_ {
    async move { Ok(self.inner.pending_entries().await?) }
  }

  fn finish_entry<'a>(
    &'a self,
    entry_id: &'a str,
    status: EntryStatus,
    error: Option<String>,
  ) -> impl Future<Output = Result<(), FlakyError>> + Send + 'a {
    async move { Ok(self.inner.finish_entry(entry_id, status, error).await?) }
  }
}
