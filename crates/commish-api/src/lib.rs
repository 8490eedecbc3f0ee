//! JSON admin API for the pool.
//!
//! Exposes an axum [`Router`] over a [`TaskScheduler`] and its record store.
//! Every route requires HTTP Basic auth. TLS and binding are the caller's
//! concern.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", commish_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod season;
pub mod weeks;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use commish_core::store::{EventProvider, RecordStore, ScheduleStore};
use commish_engine::TaskScheduler;
use tower_http::trace::TraceLayer;

pub use auth::{AuthConfig, hash_password};
pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S, P> {
  pub scheduler: TaskScheduler<S, P>,
  pub store:     Arc<S>,
  pub auth:      Arc<AuthConfig>,
}

impl<S, P> Clone for ApiState<S, P> {
  fn clone(&self) -> Self {
    Self {
      scheduler: self.scheduler.clone(),
      store:     self.store.clone(),
      auth:      self.auth.clone(),
    }
  }
}

/// Build the API router for `state`.
pub fn api_router<S, P>(state: ApiState<S, P>) -> Router<()>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  Router::new()
    // Weeks
    .route("/weeks/current", get(weeks::current::<S, P>))
    .route("/weeks/{week}", get(weeks::get_one::<S, P>))
    .route("/weeks/{week}/lock", post(weeks::lock::<S, P>))
    .route("/weeks/{week}/settle", post(weeks::settle::<S, P>))
    // Season
    .route("/ledger", get(season::ledger::<S, P>))
    .route("/schedule", get(season::schedule::<S, P>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
