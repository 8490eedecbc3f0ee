//! Capped exponential backoff for transient collaborator failures.

use std::{fmt, future::Future, time::Duration};

use commish_core::store::Classify;
use serde::Deserialize;

/// Retry settings. Only errors classified as transient are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  pub base_delay_ms: u64,
  pub max_delay_ms:  u64,
  /// Total attempts including the first.
  pub max_attempts:  u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { base_delay_ms: 1_000, max_delay_ms: 90_000, max_attempts: 6 }
  }
}

impl RetryPolicy {
  /// No retries at all.
  pub fn none() -> Self { Self { base_delay_ms: 0, max_delay_ms: 0, max_attempts: 1 } }

  /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
  /// capped at `max_delay_ms`.
  pub fn delay(&self, attempt: u32) -> Duration {
    let factor = 1_u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
  }

  /// Run `op` until it succeeds, fails with a non-transient error, or runs
  /// out of attempts.
  pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
  {
    let max_attempts = self.max_attempts.max(1);
    let mut attempt = 0;
    loop {
      attempt += 1;
      match op().await {
        Ok(value) => return Ok(value),
        Err(e) if attempt < max_attempts && e.is_transient() => {
          let delay = self.delay(attempt);
          tracing::warn!(
            what,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "transient failure, retrying",
          );
          tokio::time::sleep(delay).await;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  };

  use commish_core::store::FailureKind;

  use super::*;

  #[derive(Debug)]
  struct Flaky(FailureKind);

  impl fmt::Display for Flaky {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.0) }
  }

  impl Classify for Flaky {
    fn failure_kind(&self) -> FailureKind { self.0 }
  }

  fn fast() -> RetryPolicy { RetryPolicy { base_delay_ms: 1, max_delay_ms: 4, max_attempts: 3 } }

  #[test]
  fn delays_double_up_to_the_cap() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(1), Duration::from_secs(1));
    assert_eq!(policy.delay(2), Duration::from_secs(2));
    assert_eq!(policy.delay(6), Duration::from_secs(32));
    assert_eq!(policy.delay(7), Duration::from_secs(64));
    assert_eq!(policy.delay(8), Duration::from_secs(90));
    assert_eq!(policy.delay(200), Duration::from_secs(90));
  }

  #[tokio::test]
  async fn transient_failures_are_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<u32, Flaky> = fast()
      .run("flaky op", move || {
        let counter = counter.clone();
        async move {
          let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
          if n < 3 { Err(Flaky(FailureKind::Transient)) } else { Ok(n) }
        }
      })
      .await;
    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<(), Flaky> = fast()
      .run("always busy", move || {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          Err(Flaky(FailureKind::Transient))
        }
      })
      .await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn permanent_failures_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<(), Flaky> = fast()
      .run("duplicate", move || {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          Err(Flaky(FailureKind::Duplicate))
        }
      })
      .await;
    assert!(matches!(result, Err(Flaky(FailureKind::Duplicate))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
