//! Error type for `commish-odds`.

use commish_core::store::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] commish_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET {endpoint} → {status}")]
  Status {
    endpoint: &'static str,
    status:   reqwest::StatusCode,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("game {game_id}: invalid commence_time {value:?}")]
  InvalidTimestamp { game_id: String, value: String },

  #[error("game {game_id}: invalid score {value:?}")]
  InvalidScore { game_id: String, value: String },

  #[error("game {game_id}: completed but no scores reported")]
  MissingScores { game_id: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn failure_kind(&self) -> FailureKind {
    match self {
      Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
        FailureKind::Transient
      }
      Self::Status { status, .. }
        if *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() =>
      {
        FailureKind::Transient
      }
      _ => FailureKind::Permanent,
    }
  }
}
