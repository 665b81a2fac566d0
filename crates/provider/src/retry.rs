//! Bounded retry of API calls
//!
//! Transient failures (throttling, 5xx, connection errors) are repeated with
//! an incrementally growing wait until the operation deadline passes.
//! Anything else is returned to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use alinas_common::{Error, Result};
use tokio::time::Instant;
use tracing::warn;

use crate::config::RetryConfig;

/// Wait schedule: `first`, `first + increment`, ... capped at `max`
#[derive(Debug, Clone)]
pub struct IncrementalWait {
    next: Duration,
    increment: Duration,
    max: Duration,
}

impl IncrementalWait {
    pub fn new(first: Duration, increment: Duration, max: Duration) -> Self {
        Self {
            next: first.min(max),
            increment,
            max,
        }
    }
}

impl From<&RetryConfig> for IncrementalWait {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.first_wait_ms),
            Duration::from_millis(config.increment_ms),
            Duration::from_millis(config.max_wait_ms),
        )
    }
}

impl Iterator for IncrementalWait {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = (self.next + self.increment).min(self.max);
        Some(current)
    }
}

/// Run `op` until it succeeds, fails permanently, or `timeout` elapses
pub async fn retry<T, F, Fut>(
    policy: &RetryConfig,
    timeout: Duration,
    action: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Instant::now() + timeout;
    let mut waits = IncrementalWait::from(policy);
    let mut attempt = 1u32;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::RetryTimeout {
                action: action.to_string(),
                seconds: timeout.as_secs(),
                last: Box::new(err),
            });
        }

        let wait = waits.next().unwrap_or_default().min(deadline - now);
        warn!(action, attempt, wait_ms = wait.as_millis() as u64, "retrying after transient error: {}", err);
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            first_wait_ms: 1,
            increment_ms: 1,
            max_wait_ms: 5,
        }
    }

    #[test]
    fn test_incremental_wait_grows_then_caps() {
        let waits: Vec<u64> = IncrementalWait::from(&RetryConfig::default())
            .take(12)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(waits, vec![3, 6, 9, 12, 15, 18, 21, 24, 27, 30, 30, 30]);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry(&fast(), Duration::from_secs(5), "CreateAccessRule", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Transport("connection reset".into()))
            } else {
                Ok("done")
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = retry(&fast(), Duration::from_secs(5), "ModifyAccessRule", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::InvalidConfig("priority".into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_returns_last_error() {
        let err = retry(&fast(), Duration::from_millis(20), "DeleteAccessRule", || async {
            Err::<(), _>(Error::Transport("timed out".into()))
        })
        .await
        .unwrap_err();

        match err {
            Error::RetryTimeout { action, last, .. } => {
                assert_eq!(action, "DeleteAccessRule");
                assert!(matches!(*last, Error::Transport(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
