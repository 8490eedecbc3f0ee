//! Handlers for season-wide endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/ledger` | One object per week, keyed by column |
//! | `GET`  | `/schedule` | Pending schedule entries, earliest first |

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use commish_core::{
  schedule::ScheduleEntry,
  store::{EventProvider, RecordStore, ScheduleStore},
  week::LEDGER_TABLE,
};
use commish_engine::Error;

use crate::{ApiState, auth::Authenticated, error::ApiError};

/// `GET /ledger`
pub async fn ledger<S, P>(
  _: Authenticated,
  State(state): State<ApiState<S, P>>,
) -> Result<Json<Vec<BTreeMap<String, String>>>, ApiError>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  let admin = state
    .store
    .open(&state.scheduler.config().admin_workbook)
    .await
    .map_err(Error::store)?;
  let table = state.store.read_all(&admin, LEDGER_TABLE).await.map_err(Error::store)?;
  Ok(Json(table.records()))
}

/// `GET /schedule`
pub async fn schedule<S, P>(
  _: Authenticated,
  State(state): State<ApiState<S, P>>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  Ok(Json(state.scheduler.pending_entries().await?))
}
