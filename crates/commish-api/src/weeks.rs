//! Handlers for `/weeks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/weeks/current` | `{"week": n}` |
//! | `GET`  | `/weeks/{week}` | Parsed admin week table; 404 if not registered |
//! | `POST` | `/weeks/{week}/lock` | Optional body `{"game_ids": [...]}` |
//! | `POST` | `/weeks/{week}/settle` | |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
};
use commish_core::{
  store::{EventProvider, RecordStore, ScheduleStore},
  week::{WeekRecord, week_table_name},
};
use commish_engine::{Error, LockReport, SettleReport};
use serde::{Deserialize, Serialize};

use crate::{ApiState, auth::Authenticated, error::ApiError};

fn check_week(week: u32) -> Result<u32, ApiError> {
  if week == 0 {
    return Err(ApiError::BadRequest("weeks start at 1".into()));
  }
  Ok(week)
}

// ─── Current ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CurrentWeek {
  pub week: u32,
}

/// `GET /weeks/current`
pub async fn current<S, P>(
  _: Authenticated,
  State(state): State<ApiState<S, P>>,
) -> Result<Json<CurrentWeek>, ApiError>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  let week = state.scheduler.weeks().current_week().await?;
  Ok(Json(CurrentWeek { week }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /weeks/{week}`
pub async fn get_one<S, P>(
  _: Authenticated,
  State(state): State<ApiState<S, P>>,
  Path(week): Path<u32>,
) -> Result<Json<WeekRecord>, ApiError>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  let week = check_week(week)?;
  let admin = state
    .store
    .open(&state.scheduler.config().admin_workbook)
    .await
    .map_err(Error::store)?;
  let table = state
    .store
    .read_all(&admin, &week_table_name(week))
    .await
    .map_err(Error::store)?;
  let record = WeekRecord::from_table(&table).map_err(Error::from)?;
  Ok(Json(record))
}

// ─── Lock ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LockBody {
  #[serde(default)]
  pub game_ids: Option<Vec<String>>,
}

/// `POST /weeks/{week}/lock`; an empty body locks every game of the week.
pub async fn lock<S, P>(
  _: Authenticated,
  State(state): State<ApiState<S, P>>,
  Path(week): Path<u32>,
  body: Bytes,
) -> Result<Json<LockReport>, ApiError>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  let week = check_week(week)?;
  let body: LockBody = if body.iter().all(u8::is_ascii_whitespace) {
    LockBody::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };

  let participants = &state.scheduler.config().participants;
  let report = state
    .scheduler
    .reconciler()
    .copy_predictions(week, participants, body.game_ids.as_deref())
    .await?;
  Ok(Json(report))
}

// ─── Settle ───────────────────────────────────────────────────────────────────

/// `POST /weeks/{week}/settle`
pub async fn settle<S, P>(
  _: Authenticated,
  State(state): State<ApiState<S, P>>,
  Path(week): Path<u32>,
) -> Result<Json<SettleReport>, ApiError>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  let week = check_week(week)?;
  let participants = &state.scheduler.config().participants;
  let report = state.scheduler.settler().settle_completed(week, participants).await?;
  Ok(Json(report))
}
