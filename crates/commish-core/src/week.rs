//! Week records: the per-week tables in the admin and participant workbooks,
//! and the season ledger.
//!
//! The record store only knows about text cells. This module fixes the table
//! layouts (header names, row shapes) and parses a [`Table`] snapshot back
//! into typed [`WeekRecord`] rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  game::Game,
  table::{Table, fit_row},
  team::TeamName,
};

// ─── Layout ──────────────────────────────────────────────────────────────────

pub const GAME_ID: &str = "Game ID";
pub const HOME_TEAM: &str = "Home Team";
pub const AWAY_TEAM: &str = "Away Team";
pub const WEEKDAY: &str = "Weekday";
pub const KICKOFF_TIME: &str = "Kickoff Time";
pub const DATE: &str = "Date";
pub const KICKOFF_UTC: &str = "Kickoff (UTC)";
pub const WINNER: &str = "Winner";

pub const PREDICTED_WINNER: &str = "Predicted Winner";
pub const CONFIDENCE_RANK: &str = "Confidence Rank";

pub const LEDGER_TABLE: &str = "Season Totals";
pub const LEDGER_WEEK: &str = "Week";

const PREDICTED_SUFFIX: &str = " Predicted";
const CONFIDENCE_SUFFIX: &str = " Confidence";
const POINTS_SUFFIX: &str = " Points";

/// `Week {n}`.
pub fn week_table_name(week: u32) -> String { format!("Week {week}") }

/// The week number of a `Week {n}` table name, `n >= 1`.
pub fn parse_week_table_name(name: &str) -> Option<u32> {
  let digits = name.strip_prefix("Week ")?;
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok().filter(|n| *n >= 1)
}

pub fn predicted_column(participant: &str) -> String {
  format!("{participant}{PREDICTED_SUFFIX}")
}

pub fn confidence_column(participant: &str) -> String {
  format!("{participant}{CONFIDENCE_SUFFIX}")
}

pub fn points_column(participant: &str) -> String {
  format!("{participant}{POINTS_SUFFIX}")
}

fn sorted(participants: &[String]) -> Vec<String> {
  let mut names = participants.to_vec();
  names.sort();
  names.dedup();
  names
}

/// Header of an admin `Week {n}` table.
pub fn week_columns(participants: &[String]) -> Vec<String> {
  let mut columns: Vec<String> = [
    GAME_ID,
    HOME_TEAM,
    AWAY_TEAM,
    WEEKDAY,
    KICKOFF_TIME,
    DATE,
    KICKOFF_UTC,
    WINNER,
  ]
  .iter()
  .map(|c| (*c).to_owned())
  .collect();
  for name in sorted(participants) {
    columns.push(predicted_column(&name));
    columns.push(confidence_column(&name));
    columns.push(points_column(&name));
  }
  columns
}

/// Header of a participant's `Week {n}` table.
pub fn participant_columns() -> Vec<String> {
  [
    GAME_ID,
    HOME_TEAM,
    AWAY_TEAM,
    WEEKDAY,
    KICKOFF_TIME,
    DATE,
    PREDICTED_WINNER,
    CONFIDENCE_RANK,
  ]
  .iter()
  .map(|c| (*c).to_owned())
  .collect()
}

/// Header of the season ledger.
pub fn ledger_columns(participants: &[String]) -> Vec<String> {
  let mut columns = vec![LEDGER_WEEK.to_owned()];
  columns.extend(sorted(participants));
  columns
}

fn display_cells(game: &Game, tz: Tz) -> Vec<String> {
  let local = game.local_commence_time(tz);
  vec![
    game.id.clone(),
    game.home_team.to_string(),
    game.away_team.to_string(),
    local.format("%A").to_string(),
    local.format("%I:%M %p").to_string(),
    local.format("%m/%d/%y").to_string(),
  ]
}

/// One admin row for `game`; every result cell empty.
pub fn week_row(game: &Game, tz: Tz, participants: &[String]) -> Vec<String> {
  let mut row = display_cells(game, tz);
  row.push(game.commence_time.to_rfc3339());
  fit_row(row, week_columns(participants).len())
}

/// One participant row for `game`; prediction cells empty.
pub fn participant_row(game: &Game, tz: Tz) -> Vec<String> {
  fit_row(display_cells(game, tz), participant_columns().len())
}

/// A confidence cell holding a non-negative integer.
pub fn parse_confidence(cell: &str) -> Option<u32> { cell.trim().parse().ok() }

/// A numeric points cell; anything else counts as zero.
pub fn parse_points(cell: &str) -> i64 { cell.trim().parse().unwrap_or(0) }

// ─── Week record ─────────────────────────────────────────────────────────────

/// One participant's result cells in one row of the admin week table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PickCells {
  pub predicted:  String,
  pub confidence: String,
  pub points:     String,
}

/// One game row of the admin week table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRow {
  /// Zero-based row index within the table.
  pub row:       usize,
  pub game_id:   String,
  pub home_team: TeamName,
  pub away_team: TeamName,
  pub kickoff:   Option<DateTime<Utc>>,
  pub winner:    String,
  /// Keyed by participant name.
  pub picks:     BTreeMap<String, PickCells>,
}

impl WeekRow {
  pub fn is_settled(&self) -> bool { !self.winner.trim().is_empty() }

  pub fn teams(&self) -> [TeamName; 2] {
    [self.home_team.clone(), self.away_team.clone()]
  }
}

/// A parsed admin `Week {n}` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRecord {
  pub week:         u32,
  /// Participants with result columns in this table, sorted.
  pub participants: Vec<String>,
  pub rows:         Vec<WeekRow>,
}

impl WeekRecord {
  pub fn from_table(table: &Table) -> Result<Self> {
    let week = parse_week_table_name(&table.name)
      .ok_or_else(|| Error::NotAWeekTable(table.name.clone()))?;

    let id_col = table.require_column(GAME_ID)?;
    let home_col = table.require_column(HOME_TEAM)?;
    let away_col = table.require_column(AWAY_TEAM)?;
    let winner_col = table.require_column(WINNER)?;
    let kickoff_col = table.column_index(KICKOFF_UTC);

    let participants: Vec<String> = table
      .columns
      .iter()
      .filter_map(|c| c.strip_suffix(PREDICTED_SUFFIX))
      .map(str::to_owned)
      .collect();
    let participants = sorted(&participants);

    let mut pick_cols = Vec::with_capacity(participants.len());
    for name in &participants {
      pick_cols.push((
        name.clone(),
        table.require_column(&predicted_column(name))?,
        table.require_column(&confidence_column(name))?,
        table.require_column(&points_column(name))?,
      ));
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    for (idx, cells) in table.rows.iter().enumerate() {
      let get = |col: usize| cells.get(col).cloned().unwrap_or_default();
      let kickoff = match kickoff_col.map(get).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
          DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::InvalidTimestamp {
              value:  raw.clone(),
              reason: e.to_string(),
            })?,
        ),
        None => None,
      };
      let picks = pick_cols
        .iter()
        .map(|(name, p, c, pts)| {
          (name.clone(), PickCells {
            predicted:  get(*p),
            confidence: get(*c),
            points:     get(*pts),
          })
        })
        .collect();
      rows.push(WeekRow {
        row: idx,
        game_id: get(id_col),
        home_team: TeamName::parse(&get(home_col))?,
        away_team: TeamName::parse(&get(away_col))?,
        kickoff,
        winner: get(winner_col),
        picks,
      });
    }

    Ok(Self { week, participants, rows })
  }

  /// Every game has a winner. An empty week is vacuously complete.
  pub fn is_complete(&self) -> bool { self.rows.iter().all(WeekRow::is_settled) }

  pub fn unsettled(&self) -> impl Iterator<Item = &WeekRow> {
    self.rows.iter().filter(|r| !r.is_settled())
  }

  pub fn row_for(&self, game_id: &str) -> Option<&WeekRow> {
    self.rows.iter().find(|r| r.game_id == game_id)
  }

  /// Sum of a participant's numeric points cells.
  pub fn total_points(&self, participant: &str) -> i64 {
    self
      .rows
      .iter()
      .filter_map(|r| r.picks.get(participant))
      .map(|p| parse_points(&p.points))
      .sum()
  }
}

// ─── Participant picks ───────────────────────────────────────────────────────

/// What a participant entered for one game, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawPick {
  pub predicted:  String,
  pub confidence: String,
}

/// Read a participant's `Week {n}` table into picks keyed by game id.
pub fn participant_picks(table: &Table) -> Result<BTreeMap<String, RawPick>> {
  let id_col = table.require_column(GAME_ID)?;
  let pred_col = table.require_column(PREDICTED_WINNER)?;
  let conf_col = table.require_column(CONFIDENCE_RANK)?;
  Ok(
    table
      .rows
      .iter()
      .filter_map(|cells| {
        let id = cells.get(id_col)?.clone();
        Some((id, RawPick {
          predicted:  cells.get(pred_col).cloned().unwrap_or_default(),
          confidence: cells.get(conf_col).cloned().unwrap_or_default(),
        }))
      })
      .collect(),
  )
}
