//! Creating the workbooks, the week tables and the season ledger.
//!
//! Everything here is idempotent. A table that already exists is skipped
//! with an info log and left untouched.

use commish_core::{
  game::Game,
  store::{Classify as _, FailureKind, RecordStore},
  week::{
    LEDGER_TABLE, ledger_columns, participant_columns, participant_row, week_columns,
    week_row, week_table_name,
  },
};
use serde::Serialize;

use crate::{EngineConfig, Error, Result, records::Records};

/// What [`register_week`] did, table by table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registration {
  /// `workbook/table` names that were created.
  pub created:  Vec<String>,
  /// Tables that were already there.
  pub existing: Vec<String>,
  /// Tables that could not be created.
  pub failed:   Vec<String>,
}

enum Created {
  New,
  Existing,
}

async fn create_once<S: RecordStore>(
  records: &Records<'_, S>,
  workbook: &str,
  table: &str,
  columns: &[String],
  rows: &[Vec<String>],
) -> Result<Created> {
  let wb = records.create_workbook(workbook).await?;
  match records.create_table(&wb, table, columns, rows).await {
    Ok(()) => Ok(Created::New),
    Err(e) if e.failure_kind() == FailureKind::Duplicate => Ok(Created::Existing),
    Err(e) => Err(e),
  }
}

/// Create the admin workbook, every participant workbook and the ledger.
pub async fn init_workbooks<S: RecordStore>(store: &S, config: &EngineConfig) -> Result<()> {
  let records = Records::new(store, &config.retry);
  records.create_workbook(&config.admin_workbook).await?;
  for name in &config.participants {
    records.create_workbook(&config.participant_workbook_name(name)).await?;
  }
  ensure_ledger(store, config).await?;
  tracing::info!(
    admin = %config.admin_workbook,
    participants = config.participants.len(),
    "workbooks ready",
  );
  Ok(())
}

/// Create the `Season Totals` table unless it exists.
pub async fn ensure_ledger<S: RecordStore>(store: &S, config: &EngineConfig) -> Result<()> {
  let records = Records::new(store, &config.retry);
  let columns = ledger_columns(&config.participants);
  match create_once(&records, &config.admin_workbook, LEDGER_TABLE, &columns, &[]).await? {
    Created::New => tracing::info!("created season ledger"),
    Created::Existing => tracing::debug!("season ledger already exists"),
  }
  Ok(())
}

/// Create `Week {week}` in the admin workbook and in every participant
/// workbook, and make sure the ledger exists.
///
/// Failures are logged and reported, never returned: registration must not
/// stop the week from being scheduled.
pub async fn register_week<S: RecordStore>(
  store: &S,
  config: &EngineConfig,
  week: u32,
  games: &[Game],
) -> Registration {
  let records = Records::new(store, &config.retry);
  let table = week_table_name(week);
  let tz = config.timezone;
  let mut report = Registration::default();

  let mut targets = Vec::with_capacity(config.participants.len() + 1);
  targets.push((
    config.admin_workbook.clone(),
    week_columns(&config.participants),
    games.iter().map(|g| week_row(g, tz, &config.participants)).collect::<Vec<_>>(),
  ));
  for name in &config.participants {
    targets.push((
      config.participant_workbook_name(name),
      participant_columns(),
      games.iter().map(|g| participant_row(g, tz)).collect(),
    ));
  }

  for (workbook, columns, rows) in &targets {
    let label = format!("{workbook}/{table}");
    match create_once(&records, workbook, &table, columns, rows).await {
      Ok(Created::New) => {
        tracing::info!(week, workbook = %workbook, games = rows.len(), "created week table");
        report.created.push(label);
      }
      Ok(Created::Existing) => {
        tracing::info!(week, workbook = %workbook, "week table already exists, skipping");
        report.existing.push(label);
      }
      Err(e) => {
        tracing::error!(week, workbook = %workbook, error = %e, "failed to create week table");
        report.failed.push(label);
      }
    }
  }

  if let Err(e) = ensure_ledger(store, config).await {
    tracing::error!(week, error = %e, "failed to create season ledger");
    report.failed.push(format!("{}/{LEDGER_TABLE}", config.admin_workbook));
  }

  report
}

/// Not-found errors from the record store.
pub(crate) fn is_missing(e: &Error) -> bool { e.failure_kind() == FailureKind::NotFound }
