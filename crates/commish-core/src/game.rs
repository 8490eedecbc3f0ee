//! Games, the scheduled events the pool is played over.
//!
//! A [`Game`] is created by parsing a provider response and is never mutated
//! afterwards; fresher state is obtained by fetching again.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::team::TeamName;

/// One team's points in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
  pub team:  TeamName,
  pub score: i64,
}

/// The result of a completed game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "team", rename_all = "snake_case")]
pub enum Outcome {
  /// The team with the strictly greatest score.
  Winner(TeamName),
  /// Two or more teams share the greatest score.
  Tie,
}

/// A scheduled game between two canonical teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
  /// Opaque provider id; unique within one retrieval batch.
  pub id:            String,
  pub home_team:     TeamName,
  pub away_team:     TeamName,
  pub commence_time: DateTime<Utc>,
  /// `None` when the provider did not report completion at all.
  pub completed:     Option<bool>,
  pub scores:        Option<Vec<TeamScore>>,
}

impl Game {
  pub fn is_completed(&self) -> bool { self.completed == Some(true) }

  /// The game's two teams, home first.
  pub fn teams(&self) -> [TeamName; 2] {
    [self.home_team.clone(), self.away_team.clone()]
  }

  /// The outcome, if the game is completed and scores were reported.
  pub fn outcome(&self) -> Option<Outcome> {
    if !self.is_completed() {
      return None;
    }
    let scores = self.scores.as_ref()?;
    let best = scores.iter().map(|s| s.score).max()?;
    let mut leaders = scores.iter().filter(|s| s.score == best);
    match (leaders.next(), leaders.next()) {
      (Some(only), None) => Some(Outcome::Winner(only.team.clone())),
      _ => Some(Outcome::Tie),
    }
  }

  pub fn local_commence_time(&self, tz: Tz) -> DateTime<Tz> {
    self.commence_time.with_timezone(&tz)
  }

  pub fn local_date(&self, tz: Tz) -> NaiveDate {
    self.local_commence_time(tz).date_naive()
  }

  pub fn local_time(&self, tz: Tz) -> NaiveTime {
    self.local_commence_time(tz).time()
  }

  pub fn local_weekday(&self, tz: Tz) -> Weekday {
    use chrono::Datelike as _;
    self.local_commence_time(tz).weekday()
  }
}

/// Keep games whose start is strictly inside `(after, before)`.
pub fn filter_by_window(
  games:  &[Game],
  after:  DateTime<Utc>,
  before: DateTime<Utc>,
) -> Vec<Game> {
  games
    .iter()
    .filter(|g| after < g.commence_time && g.commence_time < before)
    .cloned()
    .collect()
}

/// Keep only games the provider reports as completed.
pub fn completed_games(games: &[Game]) -> Vec<Game> {
  games.iter().filter(|g| g.is_completed()).cloned().collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn team(label: &str) -> TeamName { TeamName::parse(label).unwrap() }

  fn game(completed: Option<bool>, scores: Option<Vec<(&str, i64)>>) -> Game {
    Game {
      id:            "612c2c3f".into(),
      home_team:     team("kansas-city-chiefs"),
      away_team:     team("baltimore-ravens"),
      commence_time: Utc.with_ymd_and_hms(2024, 9, 6, 0, 20, 0).unwrap(),
      completed,
      scores:        scores.map(|s| {
        s.into_iter()
          .map(|(t, score)| TeamScore { team: team(t), score })
          .collect()
      }),
    }
  }

  #[test]
  fn winner_has_strictly_greatest_score() {
    let g = game(
      Some(true),
      Some(vec![("kansas-city-chiefs", 5), ("baltimore-ravens", 9356)]),
    );
    assert_eq!(g.outcome(), Some(Outcome::Winner(team("baltimore-ravens"))));
  }

  #[test]
  fn equal_scores_are_a_tie() {
    let g = game(
      Some(true),
      Some(vec![("kansas-city-chiefs", 20), ("baltimore-ravens", 20)]),
    );
    assert_eq!(g.outcome(), Some(Outcome::Tie));
  }

  #[test]
  fn in_progress_game_has_no_outcome() {
    let g = game(
      Some(false),
      Some(vec![("kansas-city-chiefs", 14), ("baltimore-ravens", 3)]),
    );
    assert_eq!(g.outcome(), None);
    assert_eq!(game(None, None).outcome(), None);
    assert_eq!(game(Some(true), None).outcome(), None);
  }

  #[test]
  fn local_kickoff_in_eastern_time() {
    let g = game(None, None);
    let tz = chrono_tz::America::New_York;
    assert_eq!(g.local_date(tz), NaiveDate::from_ymd_opt(2024, 9, 5).unwrap());
    assert_eq!(g.local_time(tz), NaiveTime::from_hms_opt(20, 20, 0).unwrap());
    assert_eq!(g.local_weekday(tz), Weekday::Thu);
  }

  #[test]
  fn window_bounds_are_exclusive() {
    let g = game(None, None);
    let at = g.commence_time;
    let games = vec![g];
    assert!(filter_by_window(&games, at, at + chrono::TimeDelta::hours(1)).is_empty());
    assert!(filter_by_window(&games, at - chrono::TimeDelta::hours(1), at).is_empty());
    assert_eq!(
      filter_by_window(
        &games,
        at - chrono::TimeDelta::hours(1),
        at + chrono::TimeDelta::hours(1),
      )
      .len(),
      1
    );
  }
}
