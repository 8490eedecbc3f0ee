//! Runtime settings, read once at startup from `commish.toml` and
//! `COMMISH_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use commish_api::AuthConfig;
use commish_engine::EngineConfig;
use commish_odds::OddsConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite file holding the workbooks and the schedule.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
  #[serde(default)]
  pub odds:       OddsConfig,
  #[serde(default)]
  pub api:        ApiSettings,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/commish/commish.db") }

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
  pub enabled:            bool,
  pub host:               String,
  pub port:               u16,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      enabled:            false,
      host:               "127.0.0.1".to_owned(),
      port:               8080,
      auth_username:      "commish".to_owned(),
      auth_password_hash: String::new(),
    }
  }
}

impl ApiSettings {
  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

impl Settings {
  /// Read `path` (optional) overlaid by `COMMISH_*` variables, where `__`
  /// separates nested keys: `COMMISH_ODDS__API_KEY`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("COMMISH")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read {}", path.display()))?;
    Self::from_config(raw)
  }

  fn from_config(raw: config::Config) -> anyhow::Result<Self> {
    let mut settings: Settings = raw.try_deserialize().context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings.engine.validate().context("invalid [engine] settings")?;
    if settings.api.enabled && settings.api.auth_password_hash.is_empty() {
      anyhow::bail!("[api] is enabled but auth_password_hash is empty; see `commish hash-password`");
    }
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use chrono::Weekday;
  use commish_engine::TiePolicy;
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> anyhow::Result<Settings> {
    let raw = Config::builder().add_source(File::from_str(toml, FileFormat::Toml)).build()?;
    Settings::from_config(raw)
  }

  #[test]
  fn full_file() {
    let settings = parse(
      r#"
        store_path = "/var/lib/commish/pool.db"

        [engine]
        participants = ["Amy", "Ben"]
        tie_policy = "leave_unsettled"
        timezone = "America/Chicago"
        cutoff_weekday = "Wed"
        classifier_threshold = 0.6

        [engine.retry]
        max_attempts = 3

        [odds]
        api_key = "k"

        [api]
        enabled = true
        port = 9000
        auth_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
      "#,
    )
    .unwrap();

    assert_eq!(settings.store_path, PathBuf::from("/var/lib/commish/pool.db"));
    assert_eq!(settings.engine.participants, ["Amy", "Ben"]);
    assert_eq!(settings.engine.tie_policy, TiePolicy::LeaveUnsettled);
    assert_eq!(settings.engine.timezone.name(), "America/Chicago");
    assert_eq!(settings.engine.cutoff_weekday, Weekday::Wed);
    assert_eq!(settings.engine.classifier_threshold, Some(0.6));
    assert_eq!(settings.engine.retry.max_attempts, 3);
    assert_eq!(settings.engine.retry.base_delay_ms, 1_000);
    assert_eq!(settings.engine.lock_offset_minutes, 5);
    assert_eq!(settings.odds.api_key, "k");
    assert_eq!(settings.odds.sport, "americanfootball_nfl");
    assert_eq!(settings.api.port, 9000);
    assert_eq!(settings.api.host, "127.0.0.1");
  }

  #[test]
  fn empty_file_uses_defaults() {
    let settings = parse("").unwrap();
    assert!(settings.store_path.ends_with(".local/share/commish/commish.db"));
    assert!(settings.engine.participants.is_empty());
    assert!(!settings.api.enabled);
  }

  #[test]
  fn invalid_engine_settings_are_rejected() {
    let err = parse("[engine]\nparticipants = [\"Amy\", \"Amy\"]\n").unwrap_err();
    assert!(format!("{err:#}").contains("listed twice"));

    let err = parse("[engine]\nmissed_label = \"dallas-cowboys\"\n").unwrap_err();
    assert!(format!("{err:#}").contains("team name"));
  }

  #[test]
  fn enabled_api_needs_a_hash() {
    assert!(parse("[api]\nenabled = true\n").is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
