//! [`SqliteStore`], the SQLite implementation of [`RecordStore`] and
//! [`ScheduleStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use commish_core::{
  schedule::{EntryStatus, ScheduleEntry},
  store::{RecordStore, ScheduleStore},
  table::{Table, Workbook, fit_row},
};

use crate::{
  Error, Result,
  encode::{RawEntry, RawTableMeta, RawWorkbook, TableMeta, encode_action, encode_columns, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Workbooks, tables and the schedule, backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Header, id and length of a table, or a not-found error.
  async fn table_meta(&self, workbook: &Workbook, table: &str) -> Result<TableMeta> {
    let workbook_id = workbook.workbook_id;
    let name = table.to_owned();

    let raw: Option<RawTableMeta> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT table_id, columns_json, row_count FROM record_tables
               WHERE workbook_id = ?1 AND name = ?2",
              rusqlite::params![workbook_id, name],
              |row| {
                Ok(RawTableMeta {
                  table_id:     row.get(0)?,
                  columns_json: row.get(1)?,
                  row_count:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or_else(|| Error::TableNotFound {
        workbook: workbook.name.clone(),
        table:    table.to_owned(),
      })?
      .into_meta()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn create_workbook(&self, name: &str) -> Result<Workbook> {
    let name = name.to_owned();
    let at_str = encode_dt(Utc::now());

    let raw: RawWorkbook = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO workbooks (name, created_at) VALUES (?1, ?2)",
          rusqlite::params![name, at_str],
        )?;
        Ok(conn.query_row(
          "SELECT workbook_id, name, created_at FROM workbooks WHERE name = ?1",
          rusqlite::params![name],
          |row| {
            Ok(RawWorkbook {
              workbook_id: row.get(0)?,
              name:        row.get(1)?,
              created_at:  row.get(2)?,
            })
          },
        )?)
      })
      .await?;

    raw.into_workbook()
  }

  async fn open(&self, name: &str) -> Result<Workbook> {
    let owned = name.to_owned();

    let raw: Option<RawWorkbook> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT workbook_id, name, created_at FROM workbooks WHERE name = ?1",
              rusqlite::params![owned],
              |row| {
                Ok(RawWorkbook {
                  workbook_id: row.get(0)?,
                  name:        row.get(1)?,
                  created_at:  row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or_else(|| Error::WorkbookNotFound(name.to_owned()))?
      .into_workbook()
  }

  async fn list_tables(&self, workbook: &Workbook) -> Result<Vec<String>> {
    let workbook_id = workbook.workbook_id;

    let names = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name FROM record_tables WHERE workbook_id = ?1 ORDER BY table_id",
        )?;
        let names = stmt
          .query_map(rusqlite::params![workbook_id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
      })
      .await?;

    Ok(names)
  }

  async fn create_table(
    &self,
    workbook: &Workbook,
    name:     &str,
    columns:  &[String],
    rows:     &[Vec<String>],
  ) -> Result<()> {
    let workbook_id  = workbook.workbook_id;
    let table_name   = name.to_owned();
    let columns_json = encode_columns(columns)?;
    let at_str       = encode_dt(Utc::now());
    let width        = columns.len();
    let rows: Vec<Vec<String>> =
      rows.iter().map(|r| fit_row(r.clone(), width)).collect();

    let created: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM record_tables WHERE workbook_id = ?1 AND name = ?2",
            rusqlite::params![workbook_id, table_name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if exists {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO record_tables (workbook_id, name, columns_json, row_count, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![workbook_id, table_name, columns_json, rows.len() as i64, at_str],
        )?;
        let table_id = tx.last_insert_rowid();
        {
          let mut stmt = tx.prepare(
            "INSERT INTO cells (table_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
              if !value.is_empty() {
                stmt.execute(rusqlite::params![table_id, r as i64, c as i64, value])?;
              }
            }
          }
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !created {
      return Err(Error::TableExists {
        workbook: workbook.name.clone(),
        table:    name.to_owned(),
      });
    }
    tracing::debug!(workbook = %workbook.name, table = name, "created table");
    Ok(())
  }

  async fn read_all(&self, workbook: &Workbook, table: &str) -> Result<Table> {
    let meta = self.table_meta(workbook, table).await?;
    let table_id = meta.table_id;

    let cells: Vec<(i64, i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT row_idx, col_idx, value FROM cells WHERE table_id = ?1",
        )?;
        let cells = stmt
          .query_map(rusqlite::params![table_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cells)
      })
      .await?;

    let width = meta.columns.len();
    let mut rows = vec![vec![String::new(); width]; meta.row_count];
    for (r, c, value) in cells {
      let (Ok(r), Ok(c)) = (usize::try_from(r), usize::try_from(c)) else {
        continue;
      };
      if let Some(cell) = rows.get_mut(r).and_then(|row| row.get_mut(c)) {
        *cell = value;
      }
    }

    Ok(Table { name: table.to_owned(), columns: meta.columns, rows })
  }

  async fn write_cell(
    &self,
    workbook: &Workbook,
    table:    &str,
    row:      usize,
    column:   &str,
    value:    &str,
  ) -> Result<()> {
    let meta = self.table_meta(workbook, table).await?;
    let col = meta
      .columns
      .iter()
      .position(|c| c == column)
      .ok_or_else(|| Error::UnknownColumn {
        table:  table.to_owned(),
        column: column.to_owned(),
      })?;
    if row >= meta.row_count {
      return Err(Error::RowOutOfRange { table: table.to_owned(), row });
    }

    let table_id = meta.table_id;
    let value = value.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cells (table_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (table_id, row_idx, col_idx) DO UPDATE SET value = excluded.value",
          rusqlite::params![table_id, row as i64, col as i64, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn append_row(
    &self,
    workbook: &Workbook,
    table:    &str,
    cells:    &[String],
  ) -> Result<usize> {
    let meta = self.table_meta(workbook, table).await?;
    let table_id = meta.table_id;
    let cells = fit_row(cells.to_vec(), meta.columns.len());

    let row_idx: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let row_idx: i64 = tx.query_row(
          "SELECT row_count FROM record_tables WHERE table_id = ?1",
          rusqlite::params![table_id],
          |row| row.get(0),
        )?;
        for (c, value) in cells.iter().enumerate() {
          if !value.is_empty() {
            tx.execute(
              "INSERT INTO cells (table_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![table_id, row_idx, c as i64, value],
            )?;
          }
        }
        tx.execute(
          "UPDATE record_tables SET row_count = row_count + 1 WHERE table_id = ?1",
          rusqlite::params![table_id],
        )?;
        tx.commit()?;
        Ok(row_idx)
      })
      .await?;

    Ok(usize::try_from(row_idx).unwrap_or_default())
  }
}

// ─── ScheduleStore impl ──────────────────────────────────────────────────────

impl ScheduleStore for SqliteStore {
  type Error = Error;

  async fn save_entry(&self, entry: &ScheduleEntry) -> Result<bool> {
    let entry_id    = entry.entry_id.clone();
    let kind        = entry.action.kind().as_str();
    let target_str  = encode_dt(entry.target_time);
    let payload_str = encode_action(&entry.action)?;
    let at_str      = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO scheduled_actions
             (entry_id, kind, target_time, payload_json, status, created_at)
           VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
          rusqlite::params![entry_id, kind, target_str, payload_str, at_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(inserted)
  }

  async fn pending_entries(&self) -> Result<Vec<ScheduleEntry>> {
    let raws: Vec<RawEntry> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, target_time, payload_json FROM scheduled_actions
           WHERE status = 'pending'
           ORDER BY target_time, entry_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawEntry {
              entry_id:     row.get(0)?,
              target_time:  row.get(1)?,
              payload_json: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn finish_entry(
    &self,
    entry_id: &str,
    status:   EntryStatus,
    error:    Option<String>,
  ) -> Result<()> {
    let id_str     = entry_id.to_owned();
    let status_str = status.as_str();
    let at_str     = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE scheduled_actions
           SET status = ?2, finished_at = ?3, last_error = ?4
           WHERE entry_id = ?1",
          rusqlite::params![id_str, status_str, at_str, error],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::EntryNotFound(entry_id.to_owned()));
    }
    Ok(())
  }
}
