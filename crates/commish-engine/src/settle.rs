//! Settling completed games: winners, points and the season ledger.
//!
//! Only games whose `Winner` cell is still empty are considered, so a game is
//! settled at most once no matter how often settlement runs. The winner is
//! written after every points cell, so a game whose points were not all
//! written is picked up again by the next run.

use std::{collections::BTreeSet, sync::Arc};

use commish_core::{
  game::{Game, Outcome, completed_games},
  store::{EventProvider, RecordStore},
  table::Workbook,
  week::{
    LEDGER_TABLE, LEDGER_WEEK, WINNER, WeekRecord, WeekRow, parse_confidence, points_column,
    week_table_name,
  },
};
use serde::Serialize;

use crate::{
  EngineConfig, Error, Result, TiePolicy,
  records::Records,
  resolve::{Resolution, TeamNameResolver},
  workbooks::ensure_ledger,
};

/// Outcome of one [`ScoreSettler::settle_completed`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettleReport {
  pub week:           u32,
  /// Game ids whose winner was written this run.
  pub settled:        Vec<String>,
  /// Tied games left open under [`TiePolicy::LeaveUnsettled`].
  pub ties_left_open: Vec<String>,
  pub points_written: usize,
  pub ledger_updated: bool,
  /// Per-game or per-cell failures that were logged and skipped.
  pub failures:       usize,
}

/// Writes winners and points for completed games, then the week's totals.
pub struct ScoreSettler<S, P> {
  store:    Arc<S>,
  provider: Arc<P>,
  config:   Arc<EngineConfig>,
  resolver: Arc<TeamNameResolver>,
}

impl<S, P> Clone for ScoreSettler<S, P> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      provider: self.provider.clone(),
      config:   self.config.clone(),
      resolver: self.resolver.clone(),
    }
  }
}

impl<S: RecordStore, P: EventProvider> ScoreSettler<S, P> {
  pub fn new(
    store: Arc<S>,
    provider: Arc<P>,
    config: Arc<EngineConfig>,
    resolver: Arc<TeamNameResolver>,
  ) -> Self {
    Self { store, provider, config, resolver }
  }

  pub async fn settle_completed(&self, week: u32, participants: &[String]) -> Result<SettleReport> {
    let records = Records::new(self.store.as_ref(), &self.config.retry);
    let admin = records.open(&self.config.admin_workbook).await?;
    let record = records.read_week(&admin, week).await?;
    let mut report = SettleReport { week, ..SettleReport::default() };

    let open: BTreeSet<&str> = record.unsettled().map(|r| r.game_id.as_str()).collect();
    if open.is_empty() {
      tracing::info!(week, "every game already settled");
    } else {
      let provider = self.provider.as_ref();
      let lookback = self.config.results_lookback_days;
      let results = self
        .config
        .retry
        .run("fetch results", move || provider.fetch_results(lookback))
        .await
        .map_err(Error::provider)?;

      let completed = completed_games(&results);
      for game in completed.iter().filter(|g| open.contains(g.id.as_str())) {
        let Some(row) = record.row_for(&game.id) else {
          continue;
        };
        self
          .settle_game(&records, &admin, &record, row, game, participants, &mut report)
          .await;
      }
    }

    match self.update_ledger(&records, &admin, week, participants).await {
      Ok(()) => report.ledger_updated = true,
      Err(e) => {
        tracing::error!(week, error = %e, "failed to update season ledger");
        report.failures += 1;
      }
    }

    tracing::info!(
      week,
      settled = report.settled.len(),
      points = report.points_written,
      failures = report.failures,
      "settled scores",
    );
    Ok(report)
  }

  #[allow(clippy::too_many_arguments)]
  async fn settle_game(
    &self,
    records: &Records<'_, S>,
    admin: &Workbook,
    record: &WeekRecord,
    row: &WeekRow,
    game: &Game,
    participants: &[String],
    report: &mut SettleReport,
  ) {
    let table = week_table_name(record.week);
    let winner = match game.outcome() {
      Some(Outcome::Winner(team)) => team.to_string(),
      Some(Outcome::Tie) => match self.config.tie_policy {
        TiePolicy::Record => self.config.tie_label.clone(),
        TiePolicy::LeaveUnsettled => {
          tracing::info!(week = record.week, game_id = %game.id, "tie left unsettled");
          report.ties_left_open.push(game.id.clone());
          return;
        }
      },
      None => {
        tracing::warn!(week = record.week, game_id = %game.id, "completed game has no outcome");
        return;
      }
    };

    let mut complete = true;
    for participant in participants {
      let Some(cells) = row.picks.get(participant) else {
        tracing::warn!(week = record.week, participant = %participant, "no columns for participant");
        continue;
      };
      let points = self.points(row, participant, &cells.predicted, &cells.confidence, &winner);
      let column = points_column(participant);
      match records.write(admin, &table, row.row, &column, &points.to_string()).await {
        Ok(()) => report.points_written += 1,
        Err(e) => {
          tracing::error!(
            week = record.week,
            participant = %participant,
            game_id = %game.id,
            error = %e,
            "failed to write points",
          );
          report.failures += 1;
          complete = false;
        }
      }
    }
    if !complete {
      tracing::warn!(week = record.week, game_id = %game.id, "points incomplete, winner left open");
      return;
    }

    if let Err(e) = records.write(admin, &table, row.row, WINNER, &winner).await {
      tracing::error!(week = record.week, game_id = %game.id, error = %e, "failed to write winner");
      report.failures += 1;
      return;
    }
    tracing::info!(week = record.week, game_id = %game.id, winner = %winner, "settled game");
    report.settled.push(game.id.clone());
  }

  /// `confidence` when the locked prediction names the winner, else zero.
  fn points(
    &self,
    row: &WeekRow,
    participant: &str,
    predicted: &str,
    confidence: &str,
    winner: &str,
  ) -> u32 {
    let predicted = predicted.trim();
    if predicted.is_empty() {
      tracing::warn!(participant, game_id = %row.game_id, "no locked pick, scoring as missed");
      return 0;
    }
    if predicted == self.config.missed_label {
      return 0;
    }
    match self.resolver.resolve(predicted, &row.teams()) {
      Resolution::Resolved { team, .. } if team.as_str() == winner => {
        parse_confidence(confidence).unwrap_or(0)
      }
      Resolution::Resolved { .. } => 0,
      other => {
        tracing::warn!(
          participant,
          game_id = %row.game_id,
          predicted,
          resolution = ?other,
          "locked pick does not resolve",
        );
        0
      }
    }
  }

  /// Write each participant's week total into the ledger row for `week`.
  async fn update_ledger(
    &self,
    records: &Records<'_, S>,
    admin: &Workbook,
    week: u32,
    participants: &[String],
  ) -> Result<()> {
    ensure_ledger(self.store.as_ref(), &self.config).await?;
    let record = records.read_week(admin, week).await?;
    let ledger = records.read(admin, LEDGER_TABLE).await?;

    let week_label = week.to_string();
    let row = match ledger.find_row(LEDGER_WEEK, &week_label) {
      Some(row) => row,
      None => records.append(admin, LEDGER_TABLE, &[week_label.clone()]).await?,
    };

    for participant in participants {
      if ledger.column_index(participant).is_none() {
        tracing::warn!(week, participant = %participant, "participant missing from ledger");
        continue;
      }
      let total = record.total_points(participant);
      records
        .write(admin, LEDGER_TABLE, row, participant, &total.to_string())
        .await?;
    }
    Ok(())
  }
}
