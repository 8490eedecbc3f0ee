//! Planning a week and running its timers.
//!
//! A week is planned into lock, settle and advance entries. Every entry is
//! saved in the schedule store before its timer is armed, so a restart can
//! pick up whatever had not run yet through [`TaskScheduler::recover`].
//!
//! Each armed entry gets its own task that sleeps until the target instant and
//! hands the entry to the dispatcher in [`TaskScheduler::run`], which runs it
//! on a fresh task. The dispatcher stops once no armed entry is outstanding
//! and the schedule store has nothing pending.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{
  DateTime, Datelike, DurationRound, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
  Utc, Weekday,
};
use chrono_tz::Tz;
use commish_core::{
  game::{Game, filter_by_window},
  schedule::{EntryStatus, ScheduleEntry, ScheduledAction},
  store::{EventProvider, RecordStore, ScheduleStore},
};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, mpsc};

use crate::{
  EngineConfig, Error, PickReconciler, Result, ScoreSettler, WeekStateTracker,
  resolve::TeamNameResolver,
  workbooks::{Registration, register_week},
};

// ─── Planning ────────────────────────────────────────────────────────────────

/// Everything one week needs, computed without touching any store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekPlan {
  pub week:            u32,
  /// Games starting after `now` and before the cutoff.
  pub games:           Vec<Game>,
  pub cutoff:          DateTime<Utc>,
  pub next_checkpoint: DateTime<Utc>,
  /// Lock, settle and advance entries ordered by target time. Empty when
  /// there are no games.
  pub entries:         Vec<ScheduleEntry>,
}

/// Plan `week` from the provider's `games` as seen at `now`.
pub fn plan_week(
  week: u32,
  games: &[Game],
  now: DateTime<Utc>,
  config: &EngineConfig,
) -> Result<WeekPlan> {
  let tz = config.timezone;
  let cutoff = next_local(now, config.cutoff_weekday, NaiveTime::MIN, tz)?;
  let checkpoint_time = NaiveTime::from_hms_opt(config.checkpoint_hour, 0, 0)
    .ok_or_else(|| Error::Config(format!("bad checkpoint_hour {}", config.checkpoint_hour)))?;
  let next_checkpoint = next_local(now, config.checkpoint_weekday, checkpoint_time, tz)?;

  let mut games = filter_by_window(games, now, cutoff);
  games.sort_by(|a, b| a.commence_time.cmp(&b.commence_time).then_with(|| a.id.cmp(&b.id)));

  let mut entries = Vec::new();
  if !games.is_empty() {
    let mut by_start: BTreeMap<DateTime<Utc>, Vec<String>> = BTreeMap::new();
    let mut settle_hours = BTreeSet::new();
    for game in &games {
      by_start.entry(game.commence_time).or_default().push(game.id.clone());
      let hour = game
        .commence_time
        .duration_trunc(TimeDelta::hours(1))
        .unwrap_or(game.commence_time);
      settle_hours.insert(hour);
    }

    for (start, game_ids) in by_start {
      let action = ScheduledAction::LockPicks { week, game_ids };
      entries.push(ScheduleEntry::new(start - config.lock_offset(), action)?);
    }
    for hour in settle_hours {
      let action = ScheduledAction::SettleScores { week };
      entries.push(ScheduleEntry::new(hour + config.settle_offset(), action)?);
    }
    let action = ScheduledAction::AdvanceWeek { week: week + 1 };
    entries.push(ScheduleEntry::new(next_checkpoint, action)?);
    entries.sort_by(|a, b| a.target_time.cmp(&b.target_time).then_with(|| a.entry_id.cmp(&b.entry_id)));
  }

  Ok(WeekPlan { week, games, cutoff, next_checkpoint, entries })
}

/// The next `weekday` strictly after today (in `tz`) at local `time`.
fn next_local(
  now: DateTime<Utc>,
  weekday: Weekday,
  time: NaiveTime,
  tz: Tz,
) -> Result<DateTime<Utc>> {
  let today = now.with_timezone(&tz).date_naive();
  let from = i64::from(today.weekday().num_days_from_monday());
  let to = i64::from(weekday.num_days_from_monday());
  let days = match (to - from).rem_euclid(7) {
    0 => 7,
    d => d,
  };
  localize((today + TimeDelta::days(days)).and_time(time), tz)
}

/// Pin a local wall-clock time to an instant: the earlier one when the clock
/// repeats, an hour later when it skips.
fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
  match tz.from_local_datetime(&naive) {
    LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Ok(t.with_timezone(&Utc)),
    LocalResult::None => match tz.from_local_datetime(&(naive + TimeDelta::hours(1))) {
      LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Ok(t.with_timezone(&Utc)),
      LocalResult::None => Err(Error::NonexistentLocalTime(naive, tz)),
    },
  }
}

// ─── Scheduling ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
  PastSeasonCap,
  NoRemainingGames,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
  Scheduled {
    week:            u32,
    games:           usize,
    entries:         usize,
    /// Entries that were not already in the schedule store.
    newly_saved:     usize,
    next_checkpoint: DateTime<Utc>,
    registration:    Registration,
  },
  SeasonComplete {
    week:   u32,
    reason: CompletionReason,
  },
}

struct Inner<S, P> {
  store:      Arc<S>,
  provider:   Arc<P>,
  config:     Arc<EngineConfig>,
  weeks:      WeekStateTracker<S>,
  reconciler: PickReconciler<S>,
  settler:    ScoreSettler<S, P>,
  tx:         mpsc::UnboundedSender<ScheduleEntry>,
  rx:         Mutex<Option<mpsc::UnboundedReceiver<ScheduleEntry>>>,
  /// Armed entries that have not finished running.
  in_flight:  AtomicUsize,
  idle:       Notify,
}

/// Plans weeks, persists and arms their entries, and runs them when due.
pub struct TaskScheduler<S, P> {
  inner: Arc<Inner<S, P>>,
}

impl<S, P> Clone for TaskScheduler<S, P> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<S, P> TaskScheduler<S, P>
where
  S: RecordStore + ScheduleStore + 'static,
  P: EventProvider + 'static,
{
  pub fn new(
    store: Arc<S>,
    provider: Arc<P>,
    config: Arc<EngineConfig>,
    resolver: Arc<TeamNameResolver>,
  ) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let inner = Inner {
      weeks: WeekStateTracker::new(store.clone(), config.clone()),
      reconciler: PickReconciler::new(store.clone(), config.clone(), resolver.clone()),
      settler: ScoreSettler::new(store.clone(), provider.clone(), config.clone(), resolver),
      store,
      provider,
      config,
      tx,
      rx: Mutex::new(Some(rx)),
      in_flight: AtomicUsize::new(0),
      idle: Notify::new(),
    };
    Self { inner: Arc::new(inner) }
  }

  pub fn config(&self) -> &EngineConfig { &self.inner.config }

  pub fn weeks(&self) -> &WeekStateTracker<S> { &self.inner.weeks }

  pub fn reconciler(&self) -> &PickReconciler<S> { &self.inner.reconciler }

  pub fn settler(&self) -> &ScoreSettler<S, P> { &self.inner.settler }

  /// Schedule whichever week is current.
  pub async fn start(&self) -> Result<ScheduleOutcome> {
    let week = self.inner.weeks.current_week().await?;
    tracing::info!(week, "starting schedule");
    self.schedule_week(week).await
  }

  pub async fn schedule_week(&self, week: u32) -> Result<ScheduleOutcome> {
    self.schedule_week_at(week, Utc::now()).await
  }

  /// Plan `week` as seen at `now`, register its tables, then persist and arm
  /// its entries.
  pub async fn schedule_week_at(&self, week: u32, now: DateTime<Utc>) -> Result<ScheduleOutcome> {
    let config = self.inner.config.as_ref();
    if week > config.season_weeks {
      tracing::info!(week, season_weeks = config.season_weeks, "season complete");
      return Ok(ScheduleOutcome::SeasonComplete { week, reason: CompletionReason::PastSeasonCap });
    }

    let plan = self.plan_at(week, now).await?;
    if plan.games.is_empty() {
      tracing::info!(week, cutoff = %plan.cutoff, "no remaining games, season complete");
      return Ok(ScheduleOutcome::SeasonComplete {
        week,
        reason: CompletionReason::NoRemainingGames,
      });
    }

    let registration = register_week(self.inner.store.as_ref(), config, week, &plan.games).await;
    let newly_saved = self.persist_and_arm(&plan.entries).await;
    tracing::info!(
      week,
      games = plan.games.len(),
      entries = plan.entries.len(),
      newly_saved,
      next_checkpoint = %plan.next_checkpoint,
      "week scheduled",
    );
    Ok(ScheduleOutcome::Scheduled {
      week,
      games: plan.games.len(),
      entries: plan.entries.len(),
      newly_saved,
      next_checkpoint: plan.next_checkpoint,
      registration,
    })
  }

  /// Fetch events and plan `week` without registering anything.
  pub async fn plan_at(&self, week: u32, now: DateTime<Utc>) -> Result<WeekPlan> {
    let provider = self.inner.provider.as_ref();
    let events = self
      .inner
      .config
      .retry
      .run("fetch events", move || provider.fetch_events())
      .await
      .map_err(Error::provider)?;
    plan_week(week, &events, now, &self.inner.config)
  }

  /// Re-arm every pending entry in the schedule store.
  pub async fn recover(&self) -> Result<usize> {
    let pending = self.pending_entries().await?;
    for entry in &pending {
      tracing::info!(
        entry_id = %entry.entry_id,
        action = %entry.action.kind(),
        week = entry.action.week(),
        target = %entry.target_time,
        "recovering scheduled action",
      );
      self.arm(entry.clone());
    }
    Ok(pending.len())
  }

  pub async fn pending_entries(&self) -> Result<Vec<ScheduleEntry>> {
    let store = self.inner.store.as_ref();
    self
      .inner
      .config
      .retry
      .run("load pending entries", move || store.pending_entries())
      .await
      .map_err(Error::schedule)
  }

  /// Dispatch due entries until nothing is armed or pending.
  pub async fn run(&self) -> Result<()> {
    let mut rx = self.inner.rx.lock().await.take().ok_or(Error::AlreadyRunning)?;
    let result = self.dispatch(&mut rx).await;
    *self.inner.rx.lock().await = Some(rx);
    result
  }

  async fn dispatch(&self, rx: &mut mpsc::UnboundedReceiver<ScheduleEntry>) -> Result<()> {
    if self.is_idle().await? {
      tracing::info!("nothing scheduled");
      return Ok(());
    }
    loop {
      tokio::select! {
        Some(entry) = rx.recv() => {
          let this = self.clone();
          tokio::spawn(async move {
            this.execute(entry, Utc::now()).await;
            this.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            if !matches!(this.is_idle().await, Ok(false)) {
              this.inner.idle.notify_one();
            }
          });
        }
        () = self.inner.idle.notified() => {
          if self.is_idle().await? {
            tracing::info!("schedule drained");
            return Ok(());
          }
        }
      }
    }
  }

  async fn is_idle(&self) -> Result<bool> {
    if self.inner.in_flight.load(Ordering::SeqCst) > 0 {
      return Ok(false);
    }
    Ok(self.pending_entries().await?.is_empty())
  }

  /// Save each entry and arm the ones that were new. An entry that cannot be
  /// saved is still armed, and the dispatcher waits for it, but it does not
  /// survive a restart.
  async fn persist_and_arm(&self, entries: &[ScheduleEntry]) -> usize {
    let store = self.inner.store.as_ref();
    let mut newly_saved = 0;
    for entry in entries {
      let saved = self
        .inner
        .config
        .retry
        .run("save entry", move || store.save_entry(entry))
        .await;
      match saved {
        Ok(true) => {
          newly_saved += 1;
          self.arm(entry.clone());
        }
        Ok(false) => tracing::debug!(entry_id = %entry.entry_id, "entry already scheduled"),
        Err(e) => {
          tracing::error!(
            entry_id = %entry.entry_id,
            action = %entry.action.kind(),
            error = %e,
            "failed to persist entry, arming in memory only",
          );
          self.arm(entry.clone());
        }
      }
    }
    newly_saved
  }

  fn arm(&self, entry: ScheduleEntry) {
    let inner = self.inner.clone();
    let wait = (entry.target_time - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    tracing::debug!(entry_id = %entry.entry_id, wait_secs = wait.as_secs(), "armed");
    inner.in_flight.fetch_add(1, Ordering::SeqCst);
    tokio::spawn(async move {
      tokio::time::sleep(wait).await;
      if let Err(e) = inner.tx.send(entry) {
        tracing::debug!(entry_id = %e.0.entry_id, "scheduler gone, dropping entry");
        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
      }
    });
  }

  async fn execute(&self, entry: ScheduleEntry, now: DateTime<Utc>) {
    let ScheduleEntry { entry_id, action, .. } = &entry;
    tracing::info!(
      entry_id = %entry_id,
      action = %action.kind(),
      week = action.week(),
      "running scheduled action",
    );

    let participants = &self.inner.config.participants;
    let result = match action {
      ScheduledAction::LockPicks { week, game_ids } => self
        .inner
        .reconciler
        .copy_predictions(*week, participants, Some(game_ids.as_slice()))
        .await
        .map(drop),
      ScheduledAction::SettleScores { week } => self
        .inner
        .settler
        .settle_completed(*week, participants)
        .await
        .map(drop),
      ScheduledAction::AdvanceWeek { week } => self.advance(*week, now).await,
    };

    let (status, error) = match result {
      Ok(()) => (EntryStatus::Done, None),
      Err(e) => {
        tracing::error!(entry_id = %entry_id, action = %action.kind(), error = %e, "scheduled action failed");
        (EntryStatus::Failed, Some(e.to_string()))
      }
    };
    let store = self.inner.store.as_ref();
    let finished = self
      .inner
      .config
      .retry
      .run("finish entry", move || store.finish_entry(entry_id, status, error.clone()))
      .await;
    if let Err(e) = finished {
      tracing::error!(entry_id = %entry_id, error = %e, "failed to record entry status");
    }
  }

  /// Schedule `week`. An earlier week left unsettled is only reported; its
  /// remaining games can still be settled by hand.
  async fn advance(&self, week: u32, now: DateTime<Utc>) -> Result<()> {
    match self.inner.weeks.current_week().await {
      Ok(current) if current < week => {
        tracing::warn!(week, unsettled = current, "advancing past an unsettled week");
      }
      Ok(_) => {}
      Err(e) => tracing::warn!(week, error = %e, "could not check earlier weeks"),
    }
    match self.schedule_week_at(week, now).await? {
      ScheduleOutcome::SeasonComplete { week, reason } => {
        tracing::info!(week, reason = ?reason, "no further weeks to schedule");
      }
      ScheduleOutcome::Scheduled { week, newly_saved, .. } => {
        tracing::info!(week, newly_saved, "advanced");
      }
    }
    Ok(())
  }
}
