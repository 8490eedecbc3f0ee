//! Async HTTP client for the-odds-api `v4` sports endpoints.

use std::time::Duration;

use commish_core::{game::Game, store::EventProvider};
use reqwest::{Client, header::HeaderMap};
use serde::Deserialize;

use crate::{Error, Result, parse::parse_games};

/// Connection settings for the-odds-api.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OddsConfig {
  pub api_key:      String,
  pub base_url:     String,
  pub sport:        String,
  pub regions:      String,
  pub timeout_secs: u64,
}

impl Default for OddsConfig {
  fn default() -> Self {
    Self {
      api_key:      String::new(),
      base_url:     "https://api.the-odds-api.com/v4".to_owned(),
      sport:        "americanfootball_nfl".to_owned(),
      regions:      "us".to_owned(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
  Events,
  Scores,
}

impl Endpoint {
  fn as_str(self) -> &'static str {
    match self {
      Self::Events => "events",
      Self::Scores => "scores",
    }
  }
}

/// Async client for the events and scores endpoints.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OddsClient {
  client: Client,
  config: OddsConfig,
}

impl OddsClient {
  pub fn new(config: OddsConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, endpoint: Endpoint) -> String {
    format!(
      "{}/sports/{}/{}/",
      self.config.base_url.trim_end_matches('/'),
      self.config.sport,
      endpoint.as_str()
    )
  }

  /// `GET /sports/{sport}/{endpoint}/`
  async fn get(&self, endpoint: Endpoint, days_from: Option<u32>) -> Result<Vec<Game>> {
    let mut query = vec![
      ("regions", self.config.regions.clone()),
      ("apiKey", self.config.api_key.clone()),
    ];
    if let Some(days) = days_from {
      query.push(("daysFrom", days.to_string()));
    }

    let resp = self
      .client
      .get(self.url(endpoint))
      .query(&query)
      .send()
      .await?;

    let status = resp.status();
    log_quota(endpoint, resp.headers());
    if !status.is_success() {
      return Err(Error::Status { endpoint: endpoint.as_str(), status });
    }

    let body = resp.text().await?;
    parse_games(&body)
  }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("?")
}

fn log_quota(endpoint: Endpoint, headers: &HeaderMap) {
  tracing::info!(
    endpoint = endpoint.as_str(),
    used = header_str(headers, "x-requests-used"),
    remaining = header_str(headers, "x-requests-remaining"),
    last = header_str(headers, "x-requests-last"),
    "odds api request",
  );
}

impl EventProvider for OddsClient {
  type Error = Error;

  async fn fetch_events(&self) -> Result<Vec<Game>> {
    self.get(Endpoint::Events, None).await
  }

  async fn fetch_results(&self, days_from: u32) -> Result<Vec<Game>> {
    self.get(Endpoint::Scores, Some(days_from)).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn endpoint_urls() {
    let client = OddsClient::new(OddsConfig {
      base_url: "https://odds.example/v4/".into(),
      ..OddsConfig::default()
    })
    .unwrap();
    assert_eq!(
      client.url(Endpoint::Events),
      "https://odds.example/v4/sports/americanfootball_nfl/events/"
    );
    assert_eq!(
      client.url(Endpoint::Scores),
      "https://odds.example/v4/sports/americanfootball_nfl/scores/"
    );
  }

  #[test]
  fn missing_quota_headers_log_placeholder() {
    let headers = HeaderMap::new();
    assert_eq!(header_str(&headers, "x-requests-used"), "?");
  }

  #[tokio::test]
  async fn unreachable_host_is_transient() {
    use commish_core::store::Classify as _;

    let client = OddsClient::new(OddsConfig {
      base_url:     "http://127.0.0.1:9".into(),
      timeout_secs: 2,
      ..OddsConfig::default()
    })
    .unwrap();
    let err = client.fetch_events().await.unwrap_err();
    assert!(err.is_transient(), "{err}");
  }
}
