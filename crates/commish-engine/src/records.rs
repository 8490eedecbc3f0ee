//! Record store access with retries and error wrapping.

use commish_core::{
  store::RecordStore,
  table::{Table, Workbook},
  week::{WeekRecord, week_table_name},
};

use crate::{Error, Result, retry::RetryPolicy};

pub(crate) struct Records<'a, S> {
  store: &'a S,
  retry: &'a RetryPolicy,
}

impl<'a, S: RecordStore> Records<'a, S> {
  pub(crate) fn new(store: &'a S, retry: &'a RetryPolicy) -> Self { Self { store, retry } }

  pub(crate) async fn create_workbook(&self, name: &str) -> Result<Workbook> {
    let store = self.store;
    self
      .retry
      .run("create workbook", move || store.create_workbook(name))
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn open(&self, name: &str) -> Result<Workbook> {
    let store = self.store;
    self
      .retry
      .run("open workbook", move || store.open(name))
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn list_tables(&self, workbook: &Workbook) -> Result<Vec<String>> {
    let store = self.store;
    self
      .retry
      .run("list tables", move || store.list_tables(workbook))
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn create_table(
    &self,
    workbook: &Workbook,
    name:     &str,
    columns:  &[String],
    rows:     &[Vec<String>],
  ) -> Result<()> {
    let store = self.store;
    self
      .retry
      .run("create table", move || store.create_table(workbook, name, columns, rows))
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn read(&self, workbook: &Workbook, table: &str) -> Result<Table> {
    let store = self.store;
    self
      .retry
      .run("read table", move || store.read_all(workbook, table))
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn write(
    &self,
    workbook: &Workbook,
    table:    &str,
    row:      usize,
    column:   &str,
    value:    &str,
  ) -> Result<()> {
    let store = self.store;
    self
      .retry
      .run("write cell", move || store.write_cell(workbook, table, row, column, value))
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn append(
    &self,
    workbook: &Workbook,
    table:    &str,
    cells:    &[String],
  ) -> Result<usize> {
    let store = self.store;
    self
      .retry
      .run("append row", move || store.append_row(workbook, table, cells))
      .await
      .map_err(Error::store)
  }

  /// The admin workbook's `Week {week}` table, parsed.
  pub(crate) async fn read_week(&self, admin: &Workbook, week: u32) -> Result<WeekRecord> {
    let table = self.read(admin, &week_table_name(week)).await?;
    Ok(WeekRecord::from_table(&table)?)
  }
}
