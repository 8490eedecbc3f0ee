//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! ordering matches time ordering. Headers and scheduled actions are stored
//! as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use commish_core::{
  schedule::{ScheduleEntry, ScheduledAction},
  table::Workbook,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Headers ─────────────────────────────────────────────────────────────────

pub fn encode_columns(columns: &[String]) -> Result<String> {
  Ok(serde_json::to_string(columns)?)
}

pub fn decode_columns(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── ScheduledAction ─────────────────────────────────────────────────────────

pub fn encode_action(action: &ScheduledAction) -> Result<String> {
  Ok(serde_json::to_string(action)?)
}

pub fn decode_action(s: &str) -> Result<ScheduledAction> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `workbooks` row.
pub struct RawWorkbook {
  pub workbook_id: i64,
  pub name:        String,
  pub created_at:  String,
}

impl RawWorkbook {
  pub fn into_workbook(self) -> Result<Workbook> {
    Ok(Workbook {
      workbook_id: self.workbook_id,
      name:        self.name,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `record_tables` row.
pub struct RawTableMeta {
  pub table_id:     i64,
  pub columns_json: String,
  pub row_count:    i64,
}

/// Decoded table metadata.
pub struct TableMeta {
  pub table_id:  i64,
  pub columns:   Vec<String>,
  pub row_count: usize,
}

impl RawTableMeta {
  pub fn into_meta(self) -> Result<TableMeta> {
    Ok(TableMeta {
      table_id:  self.table_id,
      columns:   decode_columns(&self.columns_json)?,
      row_count: usize::try_from(self.row_count).unwrap_or(0),
    })
  }
}

/// Raw values read directly from a `scheduled_actions` row.
pub struct RawEntry {
  pub entry_id:     String,
  pub target_time:  String,
  pub payload_json: String,
}

impl RawEntry {
  pub fn into_entry(self) -> Result<ScheduleEntry> {
    Ok(ScheduleEntry {
      entry_id:    self.entry_id,
      target_time: decode_dt(&self.target_time)?,
      action:      decode_action(&self.payload_json)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = Utc.with_ymd_and_hms(2024, 9, 8, 9, 0, 0).unwrap();
    let late = early + chrono::TimeDelta::milliseconds(1500);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(encode_dt(early).len(), encode_dt(late).len());
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn bad_timestamp_is_a_date_error() {
    assert!(matches!(decode_dt("next tuesday"), Err(Error::DateParse(_))));
  }
}
