//! Canonical team names.
//!
//! The league has a closed set of 32 franchises, each identified by a
//! lowercase, hyphen-joined slug such as `new-orleans-saints`. Any label
//! outside the set is rejected at the boundary, so a [`TeamName`] is always
//! one of [`TEAM_NAMES`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Every canonical team slug, sorted alphabetically.
pub const TEAM_NAMES: [&str; 32] = [
  "arizona-cardinals",
  "atlanta-falcons",
  "baltimore-ravens",
  "buffalo-bills",
  "carolina-panthers",
  "chicago-bears",
  "cincinnati-bengals",
  "cleveland-browns",
  "dallas-cowboys",
  "denver-broncos",
  "detroit-lions",
  "green-bay-packers",
  "houston-texans",
  "indianapolis-colts",
  "jacksonville-jaguars",
  "kansas-city-chiefs",
  "las-vegas-raiders",
  "los-angeles-chargers",
  "los-angeles-rams",
  "miami-dolphins",
  "minnesota-vikings",
  "new-england-patriots",
  "new-orleans-saints",
  "new-york-giants",
  "new-york-jets",
  "philadelphia-eagles",
  "pittsburgh-steelers",
  "san-francisco-49ers",
  "seattle-seahawks",
  "tampa-bay-buccaneers",
  "tennessee-titans",
  "washington-commanders",
];

/// Convert a free-form label into slug form: lowercase, trimmed, hyphens
/// treated as whitespace, words joined with `-`.
///
/// `"New Orleans Saints"` and `" new-orleans  SAINTS "` both become
/// `"new-orleans-saints"`.
pub fn normalize_label(label: &str) -> String {
  label
    .to_lowercase()
    .replace('-', " ")
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("-")
}

/// Whether `label` normalizes to a canonical team slug.
pub fn is_team_label(label: &str) -> bool {
  TEAM_NAMES.contains(&normalize_label(label).as_str())
}

/// A member of the closed canonical team set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamName(String);

impl TeamName {
  /// Normalize `label` and accept it only if it names a canonical team.
  pub fn parse(label: &str) -> Result<Self> {
    let slug = normalize_label(label);
    if TEAM_NAMES.contains(&slug.as_str()) {
      Ok(Self(slug))
    } else {
      Err(Error::UnknownTeam(label.to_owned()))
    }
  }

  /// All 32 teams in slug order.
  pub fn all() -> Vec<Self> {
    TEAM_NAMES.iter().map(|s| Self((*s).to_owned())).collect()
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TeamName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for TeamName {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<TeamName> for String {
  fn from(value: TeamName) -> Self { value.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_provider_label() {
    assert_eq!(normalize_label("New Orleans Saints"), "new-orleans-saints");
    assert_eq!(normalize_label("  new-orleans   SAINTS "), "new-orleans-saints");
    assert_eq!(normalize_label("San Francisco 49ers"), "san-francisco-49ers");
  }

  #[test]
  fn team_set_is_closed_and_sorted() {
    assert_eq!(TEAM_NAMES.len(), 32);
    let mut sorted = TEAM_NAMES;
    sorted.sort_unstable();
    assert_eq!(sorted, TEAM_NAMES);
    assert!(TEAM_NAMES.iter().all(|t| normalize_label(t) == *t));
  }

  #[test]
  fn parse_accepts_display_names() {
    let team = TeamName::parse("Kansas City Chiefs").unwrap();
    assert_eq!(team.as_str(), "kansas-city-chiefs");
  }

  #[test]
  fn parse_rejects_unknown_labels() {
    assert!(matches!(
      TeamName::parse("Springfield Atoms"),
      Err(Error::UnknownTeam(_))
    ));
    assert!(TeamName::parse("saints").is_err());
  }

  #[test]
  fn serde_validates_on_deserialize() {
    let ok: TeamName = serde_json::from_str("\"Buffalo Bills\"").unwrap();
    assert_eq!(ok.as_str(), "buffalo-bills");
    assert!(serde_json::from_str::<TeamName>("\"missed\"").is_err());
    assert_eq!(serde_json::to_string(&ok).unwrap(), "\"buffalo-bills\"");
  }
}
