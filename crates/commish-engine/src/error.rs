//! Error type for `commish-engine`.

use chrono::NaiveDateTime;
use commish_core::store::{Classify, FailureKind};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("core error: {0}")]
  Core(#[from] commish_core::Error),

  #[error("record store error: {source}")]
  Store {
    kind:   FailureKind,
    #[source]
    source: BoxError,
  },

  #[error("schedule store error: {source}")]
  Schedule {
    kind:   FailureKind,
    #[source]
    source: BoxError,
  },

  #[error("event provider error: {source}")]
  Provider {
    kind:   FailureKind,
    #[source]
    source: BoxError,
  },

  #[error("local time {0} does not exist in {1}")]
  NonexistentLocalTime(NaiveDateTime, chrono_tz::Tz),

  #[error("participant {0:?} has no columns in the week table")]
  UnknownParticipant(String),

  #[error("the dispatcher is already running")]
  AlreadyRunning,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { kind: e.failure_kind(), source: Box::new(e) }
  }

  pub fn schedule<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Schedule { kind: e.failure_kind(), source: Box::new(e) }
  }

  pub fn provider<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Provider { kind: e.failure_kind(), source: Box::new(e) }
  }
}

impl Classify for Error {
  fn failure_kind(&self) -> FailureKind {
    match self {
      Self::Store { kind, .. } | Self::Schedule { kind, .. } | Self::Provider { kind, .. } => {
        *kind
      }
      Self::UnknownParticipant(_) => FailureKind::NotFound,
      _ => FailureKind::Permanent,
    }
  }
}
