//! Locking participants' picks into the admin week table.
//!
//! Each participant's prediction and confidence are resolved and copied into
//! their columns of the admin `Week {n}` table. A non-empty cell is never
//! overwritten, so running the same lock twice leaves the same state.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::Arc,
};

use commish_core::{
  store::{Classify as _, FailureKind, RecordStore},
  table::Workbook,
  week::{
    RawPick, WeekRecord, WeekRow, confidence_column, parse_confidence, participant_picks,
    predicted_column, week_table_name,
  },
};
use serde::Serialize;

use crate::{
  EngineConfig, Error, Result,
  records::Records,
  resolve::{Resolution, TeamNameResolver},
};

/// Several games given the same confidence rank by one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRank {
  pub participant: String,
  pub rank:        u32,
  pub game_ids:    Vec<String>,
}

/// Outcome of one [`PickReconciler::copy_predictions`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LockReport {
  pub week:                u32,
  /// Games in scope after the filter.
  pub games:               usize,
  pub cells_written:       usize,
  /// Cells left alone because they were already filled.
  pub cells_skipped:       usize,
  /// Picks recorded as the sentinel.
  pub missed:              usize,
  pub failed_participants: Vec<String>,
  pub duplicate_ranks:     Vec<DuplicateRank>,
}

/// Copies predictions from participant workbooks into the admin week table.
pub struct PickReconciler<S> {
  store:    Arc<S>,
  config:   Arc<EngineConfig>,
  resolver: Arc<TeamNameResolver>,
}

impl<S> Clone for PickReconciler<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      config:   self.config.clone(),
      resolver: self.resolver.clone(),
    }
  }
}

impl<S: RecordStore> PickReconciler<S> {
  pub fn new(store: Arc<S>, config: Arc<EngineConfig>, resolver: Arc<TeamNameResolver>) -> Self {
    Self { store, config, resolver }
  }

  /// Lock `participants`' picks for `week`, limited to `game_filter` when
  /// given.
  pub async fn copy_predictions(
    &self,
    week: u32,
    participants: &[String],
    game_filter: Option<&[String]>,
  ) -> Result<LockReport> {
    let records = Records::new(self.store.as_ref(), &self.config.retry);
    let table = week_table_name(week);
    let admin = records.open(&self.config.admin_workbook).await?;
    let record = records.read_week(&admin, week).await?;

    let in_scope = |id: &str| game_filter.is_none_or(|ids| ids.iter().any(|g| g == id));
    let mut report = LockReport {
      week,
      games: record.rows.iter().filter(|r| in_scope(&r.game_id)).count(),
      ..LockReport::default()
    };

    for participant in participants {
      if let Err(e) = self
        .lock_participant(&records, &admin, &record, participant, &in_scope, &mut report)
        .await
      {
        tracing::error!(week, participant = %participant, error = %e, "failed to lock picks");
        report.failed_participants.push(participant.clone());
      }
    }

    match records.read_week(&admin, week).await {
      Ok(after) => report.duplicate_ranks = duplicate_ranks(&after, participants),
      Err(e) => tracing::warn!(week, error = %e, "could not re-read week to check ranks"),
    }
    for dup in &report.duplicate_ranks {
      tracing::warn!(
        week,
        participant = %dup.participant,
        rank = dup.rank,
        games = ?dup.game_ids,
        "confidence rank used more than once",
      );
    }

    tracing::info!(
      week,
      table = %table,
      games = report.games,
      written = report.cells_written,
      skipped = report.cells_skipped,
      missed = report.missed,
      "locked picks",
    );
    Ok(report)
  }

  async fn lock_participant(
    &self,
    records: &Records<'_, S>,
    admin: &Workbook,
    record: &WeekRecord,
    participant: &str,
    in_scope: &impl Fn(&str) -> bool,
    report: &mut LockReport,
  ) -> Result<()> {
    if !record.participants.iter().any(|p| p == participant) {
      return Err(Error::UnknownParticipant(participant.to_owned()));
    }
    let picks = self.load_picks(records, record.week, participant).await?;
    let table = week_table_name(record.week);
    let predicted_col = predicted_column(participant);
    let confidence_col = confidence_column(participant);

    for row in record.rows.iter().filter(|r| in_scope(&r.game_id)) {
      let (label, confidence) = self.decide(participant, row, picks.get(&row.game_id));
      if label == self.config.missed_label {
        report.missed += 1;
      }

      let Some(current) = row.picks.get(participant) else {
        continue;
      };
      for (column, existing, value) in [
        (&predicted_col, &current.predicted, label),
        (&confidence_col, &current.confidence, confidence.to_string()),
      ] {
        if !existing.trim().is_empty() {
          report.cells_skipped += 1;
          continue;
        }
        match records.write(admin, &table, row.row, column, &value).await {
          Ok(()) => report.cells_written += 1,
          Err(e) => tracing::error!(
            week = record.week,
            participant,
            game_id = %row.game_id,
            column = %column,
            error = %e,
            "failed to write pick",
          ),
        }
      }
    }
    Ok(())
  }

  /// A participant's raw picks keyed by game id; empty if their workbook or
  /// week table does not exist. Any other failure is returned so their cells
  /// stay empty for a later run.
  async fn load_picks(
    &self,
    records: &Records<'_, S>,
    week: u32,
    participant: &str,
  ) -> Result<BTreeMap<String, RawPick>> {
    let workbook = self.config.participant_workbook_name(participant);
    let loaded = async {
      let wb = records.open(&workbook).await?;
      records.read(&wb, &week_table_name(week)).await
    }
    .await;
    match loaded {
      Ok(table) => Ok(participant_picks(&table)?),
      Err(e) if e.failure_kind() == FailureKind::NotFound => {
        tracing::warn!(
          week,
          participant,
          workbook = %workbook,
          error = %e,
          "participant picks missing, recording every game as missed",
        );
        Ok(BTreeMap::new())
      }
      Err(e) => Err(e),
    }
  }

  /// The label and confidence to lock for one game.
  fn decide(
    &self,
    participant: &str,
    row: &WeekRow,
    pick: Option<&RawPick>,
  ) -> (String, u32) {
    let missed = || (self.config.missed_label.clone(), 0);
    let Some(pick) = pick else {
      return missed();
    };
    let predicted = pick.predicted.trim();
    let Some(confidence) = parse_confidence(&pick.confidence) else {
      return missed();
    };
    if predicted.is_empty() {
      return missed();
    }

    let candidates = row.teams();
    let resolution = match self.config.classifier_threshold {
      Some(threshold) => self.resolver.resolve_strict(predicted, &candidates, threshold),
      None => self.resolver.resolve(predicted, &candidates),
    };
    match resolution {
      Resolution::Resolved { team, .. } => (team.to_string(), confidence),
      other => {
        tracing::warn!(
          participant,
          game_id = %row.game_id,
          predicted,
          resolution = ?other,
          "could not resolve prediction",
        );
        missed()
      }
    }
  }
}

/// Positive confidence ranks a participant used for more than one game.
fn duplicate_ranks(record: &WeekRecord, participants: &[String]) -> Vec<DuplicateRank> {
  let wanted: BTreeSet<&str> = participants.iter().map(String::as_str).collect();
  let mut out = Vec::new();
  for participant in record.participants.iter().filter(|p| wanted.contains(p.as_str())) {
    let mut by_rank: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for row in &record.rows {
      let rank = row
        .picks
        .get(participant)
        .and_then(|p| parse_confidence(&p.confidence))
        .filter(|r| *r > 0);
      if let Some(rank) = rank {
        by_rank.entry(rank).or_default().push(row.game_id.clone());
      }
    }
    out.extend(
      by_rank
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(rank, game_ids)| DuplicateRank {
          participant: participant.clone(),
          rank,
          game_ids,
        }),
    );
  }
  out
}
