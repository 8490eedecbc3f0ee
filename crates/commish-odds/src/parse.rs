//! the-odds-api JSON → [`Game`].
//!
//! Both the `events` and `scores` endpoints return an array of objects with
//! the same core fields. `scores` adds `completed` and a `scores` array whose
//! values are decimal strings.

use chrono::{DateTime, Utc};
use commish_core::{
  game::{Game, TeamScore},
  team::TeamName,
};
use serde::Deserialize;

use crate::{Error, Result};

/// One element of an `events` or `scores` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
  pub id:            String,
  pub commence_time: String,
  pub home_team:     String,
  pub away_team:     String,
  #[serde(default)]
  pub completed:     Option<bool>,
  #[serde(default)]
  pub scores:        Option<Vec<RawScore>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScore {
  pub name:  String,
  pub score: serde_json::Value,
}

fn parse_score(game_id: &str, value: &serde_json::Value) -> Result<i64> {
  let invalid = || Error::InvalidScore {
    game_id: game_id.to_owned(),
    value:   value.to_string(),
  };
  match value {
    serde_json::Value::Number(n) => n.as_i64().ok_or_else(invalid),
    serde_json::Value::String(s) => s.trim().parse().map_err(|_| invalid()),
    _ => Err(invalid()),
  }
}

/// Validate one raw game: canonical team names, a UTC timestamp, integer
/// scores, and scores present whenever the game is completed.
pub fn parse_game(raw: RawGame) -> Result<Game> {
  let commence_time = DateTime::parse_from_rfc3339(&raw.commence_time)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::InvalidTimestamp {
      game_id: raw.id.clone(),
      value:   raw.commence_time.clone(),
    })?;

  let scores = raw
    .scores
    .as_ref()
    .map(|scores| {
      scores
        .iter()
        .map(|s| -> Result<TeamScore> {
          Ok(TeamScore {
            team:  TeamName::parse(&s.name)?,
            score: parse_score(&raw.id, &s.score)?,
          })
        })
        .collect::<Result<Vec<_>>>()
    })
    .transpose()?;

  if raw.completed == Some(true) && scores.is_none() {
    return Err(Error::MissingScores { game_id: raw.id });
  }

  Ok(Game {
    home_team: TeamName::parse(&raw.home_team)?,
    away_team: TeamName::parse(&raw.away_team)?,
    id: raw.id,
    commence_time,
    completed: raw.completed,
    scores,
  })
}

/// Parse a response body. Elements that fail validation are logged and
/// dropped; only a malformed body is an error.
pub fn parse_games(body: &str) -> Result<Vec<Game>> {
  let raws: Vec<RawGame> = serde_json::from_str(body)?;
  let mut games = Vec::with_capacity(raws.len());
  for raw in raws {
    let game_id = raw.id.clone();
    match parse_game(raw) {
      Ok(game) => games.push(game),
      Err(e) => tracing::warn!(game_id = %game_id, error = %e, "dropping unparseable game"),
    }
  }
  Ok(games)
}
