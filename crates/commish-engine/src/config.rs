//! Engine configuration, passed to every component at construction.

use chrono::{TimeDelta, Weekday};
use chrono_tz::Tz;
use commish_core::team::is_team_label;
use serde::Deserialize;

use crate::{Error, Result, retry::RetryPolicy};

/// What to write when a completed game ends level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
  /// Write the tie label as the winner; nobody scores.
  #[default]
  Record,
  /// Leave the winner empty so the week stays open.
  LeaveUnsettled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Display names of the people in the pool.
  pub participants:          Vec<String>,
  pub admin_workbook:        String,
  /// Workbook name pattern for participants; `{name}` is replaced.
  pub participant_workbook:  String,
  pub lock_offset_minutes:   i64,
  pub settle_offset_minutes: i64,
  pub season_weeks:          u32,
  pub missed_label:          String,
  pub tie_label:             String,
  pub tie_policy:            TiePolicy,
  pub timezone:              Tz,
  pub cutoff_weekday:        Weekday,
  pub checkpoint_weekday:    Weekday,
  pub checkpoint_hour:       u32,
  pub results_lookback_days: u32,
  /// When set, similarity-scored resolutions must exceed this confidence.
  pub classifier_threshold:  Option<f64>,
  pub retry:                 RetryPolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      participants:          Vec::new(),
      admin_workbook:        "Commissioner".to_owned(),
      participant_workbook:  "{name} Picks".to_owned(),
      lock_offset_minutes:   5,
      settle_offset_minutes: 300,
      season_weeks:          18,
      missed_label:          "missed".to_owned(),
      tie_label:             "TIE".to_owned(),
      tie_policy:            TiePolicy::Record,
      timezone:              chrono_tz::America::New_York,
      cutoff_weekday:        Weekday::Tue,
      checkpoint_weekday:    Weekday::Tue,
      checkpoint_hour:       2,
      results_lookback_days: 3,
      classifier_threshold:  None,
      retry:                 RetryPolicy::default(),
    }
  }
}

impl EngineConfig {
  /// Reject settings the engine cannot run with.
  pub fn validate(&self) -> Result<()> {
    let bad = |msg: String| Err(Error::Config(msg));

    let mut seen = std::collections::BTreeSet::new();
    for name in &self.participants {
      if name.trim().is_empty() {
        return bad("participant names must not be empty".into());
      }
      if !seen.insert(name.as_str()) {
        return bad(format!("participant {name:?} is listed twice"));
      }
    }
    if self.admin_workbook.trim().is_empty() {
      return bad("admin_workbook must not be empty".into());
    }
    if !self.participant_workbook.contains("{name}") {
      return bad("participant_workbook must contain {name}".into());
    }
    if self.participants.iter().any(|p| self.participant_workbook_name(p) == self.admin_workbook) {
      return bad("a participant workbook would shadow the admin workbook".into());
    }
    for (field, label) in [("missed_label", &self.missed_label), ("tie_label", &self.tie_label)] {
      if label.trim().is_empty() {
        return bad(format!("{field} must not be empty"));
      }
      if is_team_label(label) {
        return bad(format!("{field} {label:?} is a team name"));
      }
    }
    if self.missed_label == self.tie_label {
      return bad("missed_label and tie_label must differ".into());
    }
    if self.checkpoint_hour >= 24 {
      return bad(format!("checkpoint_hour {} is not an hour of the day", self.checkpoint_hour));
    }
    if self.lock_offset_minutes < 0 || self.settle_offset_minutes < 0 {
      return bad("offsets must not be negative".into());
    }
    if let Some(t) = self.classifier_threshold {
      if !(0.0..=1.0).contains(&t) {
        return bad(format!("classifier_threshold {t} is outside 0..=1"));
      }
    }
    Ok(())
  }

  pub fn participant_workbook_name(&self, participant: &str) -> String {
    self.participant_workbook.replace("{name}", participant)
  }

  pub fn lock_offset(&self) -> TimeDelta { TimeDelta::minutes(self.lock_offset_minutes) }

  pub fn settle_offset(&self) -> TimeDelta { TimeDelta::minutes(self.settle_offset_minutes) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> EngineConfig {
    EngineConfig {
      participants: vec!["Amy".into(), "Ben".into()],
      ..EngineConfig::default()
    }
  }

  #[test]
  fn defaults_are_valid() {
    config().validate().unwrap();
    let c = config();
    assert_eq!(c.lock_offset(), TimeDelta::minutes(5));
    assert_eq!(c.settle_offset(), TimeDelta::hours(5));
    assert_eq!(c.participant_workbook_name("Amy"), "Amy Picks");
  }

  #[test]
  fn duplicate_participants_are_rejected() {
    let c = EngineConfig {
      participants: vec!["Amy".into(), "Amy".into()],
      ..EngineConfig::default()
    };
    assert!(matches!(c.validate(), Err(Error::Config(_))));
  }

  #[test]
  fn labels_must_not_be_teams() {
    let c = EngineConfig { missed_label: "Dallas Cowboys".into(), ..config() };
    assert!(c.validate().is_err());
    let c = EngineConfig { tie_label: "missed".into(), ..config() };
    assert!(c.validate().is_err());
  }

  #[test]
  fn checkpoint_hour_is_bounded() {
    let c = EngineConfig { checkpoint_hour: 24, ..config() };
    assert!(c.validate().is_err());
  }

  #[test]
  fn deserializes_partial_settings() {
    let c: EngineConfig = serde_json::from_value(serde_json::json!({
      "participants": ["Amy"],
      "timezone": "America/Chicago",
      "cutoff_weekday": "Wed",
      "tie_policy": "leave_unsettled",
      "retry": { "max_attempts": 2 },
    }))
    .unwrap();
    assert_eq!(c.timezone, chrono_tz::America::Chicago);
    assert_eq!(c.cutoff_weekday, Weekday::Wed);
    assert_eq!(c.checkpoint_weekday, Weekday::Tue);
    assert_eq!(c.tie_policy, TiePolicy::LeaveUnsettled);
    assert_eq!(c.retry.max_attempts, 2);
    assert_eq!(c.retry.base_delay_ms, 1_000);
  }
}
