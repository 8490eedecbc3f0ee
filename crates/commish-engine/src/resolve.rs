//! Free-text team name resolution.
//!
//! Resolution is staged. Text that normalizes to a candidate's slug ("New
//! York Jets") resolves outright. A deterministic word-overlap pass then
//! handles the common case ("Saints", "new orleans", "Patriots") with full
//! confidence. Only when that pass finds zero or several candidates is the
//! injected [`SimilarityScorer`] consulted.

use std::{collections::BTreeSet, sync::Arc};

use commish_core::team::{TeamName, normalize_label};

/// Tokens that never distinguish one team from another.
pub const STOP_WORDS: [&str; 6] = ["new", "san", "las", "los", "city", "bay"];

/// The result of resolving one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
  Resolved { team: TeamName, confidence: f64 },
  /// More than one candidate is an equally good answer.
  Ambiguous { candidates: Vec<TeamName> },
  NoMatch,
}

impl Resolution {
  pub fn team(&self) -> Option<&TeamName> {
    match self {
      Self::Resolved { team, .. } => Some(team),
      _ => None,
    }
  }
}

/// Ranks candidates by how well they match `text`.
///
/// Implementations return one `(candidate, confidence)` pair per candidate;
/// order does not matter.
pub trait SimilarityScorer: Send + Sync {
  fn score(&self, text: &str, candidates: &[TeamName]) -> Vec<(TeamName, f64)>;
}

/// Normalized, stop-word-free tokens of a label.
pub fn tokens(label: &str) -> BTreeSet<String> {
  normalize_label(label)
    .split('-')
    .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
    .map(str::to_owned)
    .collect()
}

/// Resolves free text against a candidate set, falling back to an optional
/// scorer.
#[derive(Clone, Default)]
pub struct TeamNameResolver {
  scorer: Option<Arc<dyn SimilarityScorer>>,
}

impl std::fmt::Debug for TeamNameResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TeamNameResolver")
      .field("scorer", &self.scorer.is_some())
      .finish()
  }
}

impl TeamNameResolver {
  /// Word overlap only.
  pub fn new() -> Self { Self::default() }

  pub fn with_scorer(scorer: Arc<dyn SimilarityScorer>) -> Self { Self { scorer: Some(scorer) } }

  pub fn resolve(&self, text: &str, candidates: &[TeamName]) -> Resolution {
    self.resolve_staged(text, candidates).0
  }

  /// As [`resolve`](Self::resolve), but a scorer answer whose confidence does
  /// not exceed `threshold` becomes [`Resolution::NoMatch`].
  pub fn resolve_strict(&self, text: &str, candidates: &[TeamName], threshold: f64) -> Resolution {
    match self.resolve_staged(text, candidates) {
      (Resolution::Resolved { confidence, .. }, true) if confidence <= threshold => Resolution::NoMatch,
      (resolution, _) => resolution,
    }
  }

  /// The resolution, and whether the scorer produced it.
  fn resolve_staged(&self, text: &str, candidates: &[TeamName]) -> (Resolution, bool) {
    let slug = normalize_label(text);
    if let Some(exact) = candidates.iter().find(|c| c.as_str() == slug) {
      return (Resolution::Resolved { team: exact.clone(), confidence: 1.0 }, false);
    }

    let input = tokens(text);
    let matches: Vec<&TeamName> = candidates
      .iter()
      .filter(|c| !tokens(c.as_str()).is_disjoint(&input))
      .collect();

    if let [only] = matches.as_slice() {
      return (Resolution::Resolved { team: (*only).clone(), confidence: 1.0 }, false);
    }

    match &self.scorer {
      Some(scorer) => (rank(scorer.score(text, candidates)), true),
      None if matches.is_empty() => (Resolution::NoMatch, false),
      None => {
        let candidates = matches.into_iter().cloned().collect();
        (Resolution::Ambiguous { candidates }, false)
      }
    }
  }
}

/// Pick the winner of a scorer ranking.
fn rank(mut scored: Vec<(TeamName, f64)>) -> Resolution {
  scored.retain(|(_, s)| s.is_finite());
  scored.sort_by(|a, b| b.1.total_cmp(&a.1));
  let Some((_, best)) = scored.first().cloned() else {
    return Resolution::NoMatch;
  };
  if best <= 0.0 {
    return Resolution::NoMatch;
  }
  let mut top: Vec<TeamName> = scored
    .into_iter()
    .take_while(|(_, s)| *s == best)
    .map(|(t, _)| t)
    .collect();
  if top.len() > 1 {
    return Resolution::Ambiguous { candidates: top };
  }
  match top.pop() {
    Some(team) => Resolution::Resolved { team, confidence: best },
    None => Resolution::NoMatch,
  }
}

// ─── String similarity scorer ────────────────────────────────────────────────

/// Jaro-Winkler similarity between the input's tokens and each candidate's
/// distinguishing tokens, normalized so the confidences sum to one.
///
/// A candidate's distinguishing tokens are those not shared by every
/// candidate, so "New York" carries no signal between the two New York teams.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSimilarityScorer;

impl SimilarityScorer for StringSimilarityScorer {
  fn score(&self, text: &str, candidates: &[TeamName]) -> Vec<(TeamName, f64)> {
    let input = tokens(text);
    let candidate_tokens: Vec<BTreeSet<String>> =
      candidates.iter().map(|c| tokens(c.as_str())).collect();
    let shared: BTreeSet<String> = match candidate_tokens.split_first() {
      Some((first, rest)) if !rest.is_empty() => first
        .iter()
        .filter(|t| rest.iter().all(|other| other.contains(*t)))
        .cloned()
        .collect(),
      _ => BTreeSet::new(),
    };

    let raw: Vec<f64> = candidate_tokens
      .iter()
      .map(|own| {
        let distinguishing: Vec<&String> = own.iter().filter(|t| !shared.contains(*t)).collect();
        let pool = if distinguishing.is_empty() { own.iter().collect() } else { distinguishing };
        input
          .iter()
          .flat_map(|i| pool.iter().map(move |c| strsim::jaro_winkler(i, c)))
          .fold(0.0, f64::max)
      })
      .collect();

    let total: f64 = raw.iter().sum();
    candidates
      .iter()
      .cloned()
      .zip(raw)
      .map(|(team, s)| (team, if total > 0.0 { s / total } else { 0.0 }))
      .collect()
  }
}
