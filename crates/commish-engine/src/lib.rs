//! The week reconciliation and self-scheduling engine.
//!
//! - [`resolve`]: staged free-text → [`TeamName`](commish_core::team::TeamName)
//!   resolution with a pluggable similarity fallback.
//! - [`week_state`]: which week is active.
//! - [`reconcile`]: lock participants' picks into the admin week table.
//! - [`settle`]: write winners, points and ledger totals.
//! - [`scheduler`]: plan a week, persist and arm its timers, run them.
//!
//! Every component takes its collaborators and an [`EngineConfig`] at
//! construction and re-reads the record store at the start of each operation.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod resolve;
pub mod retry;
pub mod scheduler;
pub mod settle;
pub mod week_state;
pub mod workbooks;

mod records;

pub use config::{EngineConfig, TiePolicy};
pub use error::{Error, Result};
pub use reconcile::{DuplicateRank, LockReport, PickReconciler};
pub use resolve::{Resolution, SimilarityScorer, StringSimilarityScorer, TeamNameResolver};
pub use retry::RetryPolicy;
pub use scheduler::{CompletionReason, ScheduleOutcome, TaskScheduler, WeekPlan, plan_week};
pub use settle::{ScoreSettler, SettleReport};
pub use week_state::WeekStateTracker;

#[cfg(test)]
mod testing;
