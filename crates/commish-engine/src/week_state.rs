//! Which week of the season is active.

use std::sync::Arc;

use commish_core::{store::RecordStore, week::parse_week_table_name};

use crate::{EngineConfig, Result, records::Records, workbooks::is_missing};

/// Derives the active week from the admin workbook's week tables.
pub struct WeekStateTracker<S> {
  store:  Arc<S>,
  config: Arc<EngineConfig>,
}

impl<S> Clone for WeekStateTracker<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone(), config: self.config.clone() } }
}

impl<S: RecordStore> WeekStateTracker<S> {
  pub fn new(store: Arc<S>, config: Arc<EngineConfig>) -> Self { Self { store, config } }

  /// The highest registered week, or the one after it once every game in it
  /// has a winner. Week 1 when nothing is registered yet.
  pub async fn current_week(&self) -> Result<u32> {
    let records = Records::new(self.store.as_ref(), &self.config.retry);
    let admin = match records.open(&self.config.admin_workbook).await {
      Ok(wb) => wb,
      Err(e) if is_missing(&e) => return Ok(1),
      Err(e) => return Err(e),
    };

    let max_week = records
      .list_tables(&admin)
      .await?
      .iter()
      .filter_map(|name| parse_week_table_name(name))
      .max();
    let Some(max_week) = max_week else {
      return Ok(1);
    };

    let record = records.read_week(&admin, max_week).await?;
    let week = if record.is_complete() { max_week + 1 } else { max_week };
    tracing::debug!(max_week, week, "current week");
    Ok(week)
  }
}
