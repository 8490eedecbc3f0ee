//! `commish` binary: runs the pool's schedule and serves the admin API.
//!
//! Reads `commish.toml` (or the path given with `--config`) overlaid by
//! `COMMISH_*` environment variables, opens the SQLite store and either runs
//! the self-scheduling loop or performs one command and exits.
//!
//! # Password hash generation
//!
//! ```text
//! echo -n 'secret' | commish hash-password
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use commish_api::{ApiState, api_router, hash_password};
use commish_engine::{
  StringSimilarityScorer, TaskScheduler, TeamNameResolver, workbooks::init_workbooks,
};
use commish_odds::OddsClient;
use commish_store_sqlite::SqliteStore;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

type Scheduler = TaskScheduler<SqliteStore, OddsClient>;

#[derive(Parser)]
#[command(author, version, about = "Weekly confidence-pool commissioner")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "commish.toml", env = "COMMISH_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Recover pending actions or schedule the current week, then run until
  /// the season completes or Ctrl-C.
  Run,
  /// Create the admin and participant workbooks and the season ledger.
  Init,
  /// Print the active week.
  CurrentWeek,
  /// Print the plan for the current week without registering anything.
  Plan,
  /// Lock participants' picks into the admin week table now.
  Lock {
    #[arg(long)]
    week: u32,
    /// Limit to these game ids; repeatable.
    #[arg(long = "game")]
    games: Vec<String>,
  },
  /// Settle completed games and update the ledger now.
  Settle {
    #[arg(long)]
    week: u32,
  },
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Needs no settings or store.
  if matches!(cli.command, Command::HashPassword) {
    return print_hash();
  }

  let settings = Settings::load(&cli.config)?;
  let store = Arc::new(open_store(&settings).await?);
  let provider = Arc::new(OddsClient::new(settings.odds.clone()).context("failed to build HTTP client")?);
  let config = Arc::new(settings.engine.clone());
  let scheduler = TaskScheduler::new(
    store.clone(),
    provider,
    config.clone(),
    Arc::new(resolver()),
  );

  match cli.command {
    Command::Run => run(&settings, store, scheduler).await,
    Command::Init => {
      init_workbooks(store.as_ref(), &config).await.context("failed to create workbooks")?;
      println!("workbooks ready");
      Ok(())
    }
    Command::CurrentWeek => {
      let week = scheduler.weeks().current_week().await.context("failed to read week")?;
      println!("{week}");
      Ok(())
    }
    Command::Plan => {
      let week = scheduler.weeks().current_week().await.context("failed to read week")?;
      let plan = scheduler.plan_at(week, Utc::now()).await.context("failed to plan week")?;
      print_json(&plan)
    }
    Command::Lock { week, games } => {
      let filter = (!games.is_empty()).then_some(games.as_slice());
      let report = scheduler
        .reconciler()
        .copy_predictions(week, &config.participants, filter)
        .await
        .with_context(|| format!("failed to lock week {week}"))?;
      print_json(&report)
    }
    Command::Settle { week } => {
      let report = scheduler
        .settler()
        .settle_completed(week, &config.participants)
        .await
        .with_context(|| format!("failed to settle week {week}"))?;
      print_json(&report)
    }
    Command::HashPassword => print_hash(),
  }
}

/// Word overlap backed by string similarity for names it cannot place.
fn resolver() -> TeamNameResolver { TeamNameResolver::with_scorer(Arc::new(StringSimilarityScorer)) }

async fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
  let path = &settings.store_path;
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {}", path.display()))
}

async fn run(settings: &Settings, store: Arc<SqliteStore>, scheduler: Scheduler) -> anyhow::Result<()> {
  init_workbooks(store.as_ref(), scheduler.config())
    .await
    .context("failed to create workbooks")?;

  if settings.api.enabled {
    let state = ApiState {
      scheduler: scheduler.clone(),
      store,
      auth: Arc::new(settings.api.auth()),
    };
    let app = axum::Router::new().nest("/api", api_router(state));
    let address = format!("{}:{}", settings.api.host, settings.api.port);
    let listener = TcpListener::bind(&address)
      .await
      .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("API listening on http://{address}/api");
    tokio::spawn(async move {
      if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "API server stopped");
      }
    });
  }

  let recovered = scheduler.recover().await.context("failed to load pending actions")?;
  if recovered > 0 {
    tracing::info!(recovered, "resuming schedule");
  } else {
    let outcome = scheduler.start().await.context("failed to schedule the current week")?;
    tracing::info!(outcome = ?outcome, "schedule started");
  }

  tokio::select! {
    result = scheduler.run() => {
      result.context("dispatcher failed")?;
      tracing::info!("season complete, nothing left to run");
    }
    result = tokio::signal::ctrl_c() => {
      result.context("failed to listen for Ctrl-C")?;
      tracing::info!("interrupted, pending actions resume on next start");
    }
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_hash() -> anyhow::Result<()> {
  let password = read_password()?;
  let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  println!("{hash}");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

#[cfg(test)]
mod tests {
  use commish_core::team::TeamName;
  use commish_engine::Resolution;

  use super::*;

  #[test]
  fn shipped_resolver_falls_back_to_similarity() {
    let candidates = vec![
      TeamName::parse("new-york-jets").unwrap(),
      TeamName::parse("new-york-giants").unwrap(),
    ];
    let r = resolver().resolve("New York Jetts", &candidates);
    let Resolution::Resolved { team, confidence } = r else {
      panic!("expected a resolution, got {r:?}");
    };
    assert_eq!(team.as_str(), "new-york-jets");
    assert!(confidence < 1.0);
  }
}
