// src/crawler/retry.rs
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed number of attempts with a fixed pause in between. No backoff growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` until it yields a value or attempts run out.
    ///
    /// `op` receives the 1-based attempt number and returns `Ok(Some(_))` on
    /// success, `Ok(None)` when the expected state is not there yet, `Err(_)`
    /// on failure. Both of the latter are retried.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        for attempt in 1..=self.max_attempts {
            match op(attempt).await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => debug!(label, attempt, "not ready, retrying"),
                Err(e) => warn!(label, attempt, error = %format!("{e:#}"), "attempt failed"),
            }

            if attempt < self.max_attempts && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!(label, attempts = self.max_attempts, "giving up after repeated attempts");
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn stops_at_first_success() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;
        let result = policy
            .run("test", |attempt| {
                calls += 1;
                async move {
                    if attempt == 3 {
                        Ok(Some(attempt))
                    } else {
                        Ok(None)
                    }
                }
            })
            .await;

        assert_eq!(result, Some(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;
        let result: Option<()> = policy
            .run("test", |_| {
                calls += 1;
                async { Err(anyhow!("control unresponsive")) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn waits_between_attempts_only() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let started = std::time::Instant::now();
        let _: Option<()> = policy.run("test", |_| async { Ok(None) }).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[test]
    fn defaults_match_load_more_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.interval(), Duration::from_secs(1));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
