//! Scheduled actions and their durable entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;

/// A deferred unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScheduledAction {
  /// Copy predictions for the listed games into the admin week table.
  LockPicks { week: u32, game_ids: Vec<String> },
  /// Settle every completed, unsettled game of the week.
  SettleScores { week: u32 },
  /// Schedule the given week.
  AdvanceWeek { week: u32 },
}

impl ScheduledAction {
  pub fn kind(&self) -> ActionKind {
    match self {
      Self::LockPicks { .. } => ActionKind::LockPicks,
      Self::SettleScores { .. } => ActionKind::SettleScores,
      Self::AdvanceWeek { .. } => ActionKind::AdvanceWeek,
    }
  }

  pub fn week(&self) -> u32 {
    match self {
      Self::LockPicks { week, .. }
      | Self::SettleScores { week }
      | Self::AdvanceWeek { week } => *week,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
  LockPicks,
  SettleScores,
  AdvanceWeek,
}

impl ActionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::LockPicks => "lock_picks",
      Self::SettleScores => "settle_scores",
      Self::AdvanceWeek => "advance_week",
    }
  }
}

impl fmt::Display for ActionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
  Pending,
  Done,
  Failed,
}

impl EntryStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Done => "done",
      Self::Failed => "failed",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(Self::Pending),
      "done" => Some(Self::Done),
      "failed" => Some(Self::Failed),
      _ => None,
    }
  }
}

/// An action bound to the instant it should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
  /// Hex SHA-256 of the action and target; identical registrations collide.
  pub entry_id:    String,
  pub target_time: DateTime<Utc>,
  pub action:      ScheduledAction,
}

impl ScheduleEntry {
  pub fn new(target_time: DateTime<Utc>, action: ScheduledAction) -> Result<Self> {
    let entry_id = entry_id(target_time, &action)?;
    Ok(Self { entry_id, target_time, action })
  }
}

fn entry_id(target_time: DateTime<Utc>, action: &ScheduledAction) -> Result<String> {
  let mut hasher = Sha256::new();
  hasher.update(target_time.to_rfc3339().as_bytes());
  hasher.update(b"\n");
  hasher.update(serde_json::to_vec(action)?);
  Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 9, 8, h, 0, 0).unwrap() }

  #[test]
  fn entry_id_is_deterministic() {
    let a = ScheduleEntry::new(at(17), ScheduledAction::SettleScores { week: 1 }).unwrap();
    let b = ScheduleEntry::new(at(17), ScheduledAction::SettleScores { week: 1 }).unwrap();
    assert_eq!(a.entry_id, b.entry_id);
    assert_eq!(a.entry_id.len(), 64);
  }

  #[test]
  fn entry_id_depends_on_action_and_target() {
    let base = ScheduleEntry::new(at(17), ScheduledAction::SettleScores { week: 1 }).unwrap();
    let later = ScheduleEntry::new(at(18), ScheduledAction::SettleScores { week: 1 }).unwrap();
    let other = ScheduleEntry::new(at(17), ScheduledAction::SettleScores { week: 2 }).unwrap();
    assert_ne!(base.entry_id, later.entry_id);
    assert_ne!(base.entry_id, other.entry_id);
  }

  #[test]
  fn action_serializes_with_tag() {
    let action = ScheduledAction::LockPicks { week: 3, game_ids: vec!["g1".into()] };
    let json = serde_json::to_value(&action).unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "action": "lock_picks", "week": 3, "game_ids": ["g1"] })
    );
    assert_eq!(action.kind().as_str(), "lock_picks");
    assert_eq!(action.week(), 3);
  }

  #[test]
  fn status_round_trips_through_text() {
    for status in [EntryStatus::Pending, EntryStatus::Done, EntryStatus::Failed] {
      assert_eq!(EntryStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(EntryStatus::parse("armed"), None);
  }
}
