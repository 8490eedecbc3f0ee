//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone, Utc};
use commish_core::{
  schedule::{EntryStatus, ScheduleEntry, ScheduledAction},
  store::{Classify, FailureKind, RecordStore, ScheduleStore},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn cols(names: &[&str]) -> Vec<String> { names.iter().map(|s| (*s).to_owned()).collect() }

fn row(cells: &[&str]) -> Vec<String> { cols(cells) }

// ─── Workbooks ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_workbook_is_idempotent() {
  let s = store().await;

  let first = s.create_workbook("Commissioner").await.unwrap();
  let again = s.create_workbook("Commissioner").await.unwrap();
  assert_eq!(first.workbook_id, again.workbook_id);

  let opened = s.open("Commissioner").await.unwrap();
  assert_eq!(opened, first);
}

#[tokio::test]
async fn open_missing_workbook_is_not_found() {
  let s = store().await;
  let err = s.open("Nobody Picks").await.unwrap_err();
  assert!(matches!(err, Error::WorkbookNotFound(_)));
  assert_eq!(err.failure_kind(), FailureKind::NotFound);
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_read_table() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();

  s.create_table(
    &wb,
    "Week 1",
    &cols(&["Game ID", "Winner"]),
    &[row(&["g1"]), row(&["g2", "buffalo-bills"])],
  )
  .await
  .unwrap();

  let table = s.read_all(&wb, "Week 1").await.unwrap();
  assert_eq!(table.name, "Week 1");
  assert_eq!(table.columns, ["Game ID", "Winner"]);
  assert_eq!(table.rows, vec![row(&["g1", ""]), row(&["g2", "buffalo-bills"])]);
}

#[tokio::test]
async fn create_existing_table_is_duplicate_and_untouched() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();
  s.create_table(&wb, "Week 1", &cols(&["Game ID"]), &[row(&["g1"])])
    .await
    .unwrap();

  let err = s
    .create_table(&wb, "Week 1", &cols(&["Other"]), &[])
    .await
    .unwrap_err();
  assert_eq!(err.failure_kind(), FailureKind::Duplicate);

  let table = s.read_all(&wb, "Week 1").await.unwrap();
  assert_eq!(table.columns, ["Game ID"]);
  assert_eq!(table.rows.len(), 1);
}

#[tokio::test]
async fn same_table_name_in_different_workbooks() {
  let s = store().await;
  let admin = s.create_workbook("Commissioner").await.unwrap();
  let amy = s.create_workbook("Amy Picks").await.unwrap();
  s.create_table(&admin, "Week 1", &cols(&["A"]), &[]).await.unwrap();
  s.create_table(&amy, "Week 1", &cols(&["B"]), &[]).await.unwrap();

  assert_eq!(s.read_all(&amy, "Week 1").await.unwrap().columns, ["B"]);
}

#[tokio::test]
async fn list_tables_in_creation_order() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();
  for name in ["Week 1", "Season Totals", "Week 2"] {
    s.create_table(&wb, name, &cols(&["A"]), &[]).await.unwrap();
  }

  let names = s.list_tables(&wb).await.unwrap();
  assert_eq!(names, ["Week 1", "Season Totals", "Week 2"]);
}

#[tokio::test]
async fn read_missing_table_is_not_found() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();
  let err = s.read_all(&wb, "Week 9").await.unwrap_err();
  assert!(matches!(err, Error::TableNotFound { .. }));
  assert_eq!(err.failure_kind(), FailureKind::NotFound);
}

// ─── Cells ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn write_cell_overwrites() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();
  s.create_table(&wb, "Week 1", &cols(&["Game ID", "Winner"]), &[row(&["g1"])])
    .await
    .unwrap();

  s.write_cell(&wb, "Week 1", 0, "Winner", "TIE").await.unwrap();
  s.write_cell(&wb, "Week 1", 0, "Winner", "detroit-lions").await.unwrap();

  let table = s.read_all(&wb, "Week 1").await.unwrap();
  assert_eq!(table.cell(0, "Winner"), Some("detroit-lions"));
}

#[tokio::test]
async fn write_cell_rejects_bad_addresses() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();
  s.create_table(&wb, "Week 1", &cols(&["Game ID"]), &[row(&["g1"])])
    .await
    .unwrap();

  let err = s.write_cell(&wb, "Week 1", 0, "Winner", "x").await.unwrap_err();
  assert!(matches!(err, Error::UnknownColumn { .. }));
  assert_eq!(err.failure_kind(), FailureKind::Permanent);

  let err = s.write_cell(&wb, "Week 1", 1, "Game ID", "x").await.unwrap_err();
  assert!(matches!(err, Error::RowOutOfRange { row: 1, .. }));
}

#[tokio::test]
async fn append_row_extends_table() {
  let s = store().await;
  let wb = s.create_workbook("Commissioner").await.unwrap();
  s.create_table(&wb, "Season Totals", &cols(&["Week", "Amy"]), &[])
    .await
    .unwrap();

  assert_eq!(s.append_row(&wb, "Season Totals", &row(&["1", "12"])).await.unwrap(), 0);
  assert_eq!(s.append_row(&wb, "Season Totals", &row(&["2"])).await.unwrap(), 1);

  let table = s.read_all(&wb, "Season Totals").await.unwrap();
  assert_eq!(table.rows, vec![row(&["1", "12"]), row(&["2", ""])]);
  s.write_cell(&wb, "Season Totals", 1, "Amy", "3").await.unwrap();
}

// ─── Schedule ────────────────────────────────────────────────────────────────

fn entry(hour: u32, action: ScheduledAction) -> ScheduleEntry {
  ScheduleEntry::new(Utc.with_ymd_and_hms(2024, 9, 8, hour, 0, 0).unwrap(), action)
    .unwrap()
}

#[tokio::test]
async fn save_entry_ignores_duplicates() {
  let s = store().await;
  let e = entry(17, ScheduledAction::SettleScores { week: 1 });

  assert!(s.save_entry(&e).await.unwrap());
  assert!(!s.save_entry(&e).await.unwrap());
  assert_eq!(s.pending_entries().await.unwrap(), vec![e]);
}

#[tokio::test]
async fn pending_entries_in_target_order() {
  let s = store().await;
  let late = entry(21, ScheduledAction::SettleScores { week: 1 });
  let early = entry(12, ScheduledAction::LockPicks {
    week:     1,
    game_ids: vec!["g1".into(), "g2".into()],
  });
  s.save_entry(&late).await.unwrap();
  s.save_entry(&early).await.unwrap();

  let pending = s.pending_entries().await.unwrap();
  assert_eq!(pending, vec![early, late]);
}

#[tokio::test]
async fn finished_entries_are_not_pending() {
  let s = store().await;
  let done = entry(12, ScheduledAction::SettleScores { week: 1 });
  let failed = entry(13, ScheduledAction::SettleScores { week: 1 });
  let waiting = entry(14, ScheduledAction::AdvanceWeek { week: 2 });
  for e in [&done, &failed, &waiting] {
    s.save_entry(e).await.unwrap();
  }

  s.finish_entry(&done.entry_id, EntryStatus::Done, None).await.unwrap();
  s.finish_entry(&failed.entry_id, EntryStatus::Failed, Some("provider down".into()))
    .await
    .unwrap();

  assert_eq!(s.pending_entries().await.unwrap(), vec![waiting.clone()]);

  // A finished entry stays finished when registered again.
  assert!(!s.save_entry(&done).await.unwrap());
  assert_eq!(s.pending_entries().await.unwrap(), vec![waiting]);
}

#[tokio::test]
async fn finish_unknown_entry_is_not_found() {
  let s = store().await;
  let err = s
    .finish_entry("deadbeef", EntryStatus::Done, None)
    .await
    .unwrap_err();
  assert_eq!(err.failure_kind(), FailureKind::NotFound);
}
