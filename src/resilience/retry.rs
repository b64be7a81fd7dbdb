use std::fmt::Display;

use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::settings::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<Option<&RetryConfig>> for RetrySettings {
    fn from(retry: Option<&RetryConfig>) -> Self {
        Self {
            attempts: retry.and_then(|r| r.attempts).unwrap_or(1).max(1),
            base_delay_ms: retry.and_then(|r| r.base_delay_ms).unwrap_or(500),
            max_delay_ms: retry.and_then(|r| r.max_delay_ms).unwrap_or(5000),
        }
    }
}

impl RetrySettings {
    /// Re-runs `operation` with exponential backoff while `is_retryable` approves the error.
    /// A non-retryable error is returned immediately, and so is the last error when `cancel`
    /// fires during a backoff pause.
    pub async fn run_with_retry_if<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        is_retryable: P,
        cancel: &CancellationToken,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    tokio::select! {
                        _ = sleep(Duration::from_millis(delay)) => {}
                        _ = cancel.cancelled() => {
                            warn!("retry abandoned on shutdown after attempt {attempt}/{attempts}");
                            return Err(e);
                        }
                    }
                    delay = delay.saturating_mul(2).min(self.max_delay_ms);
                }
                Err(e) => {
                    error!("giving up after attempt {attempt}/{attempts}: {e}");
                    return Err(e);
                }
            }
        }
        unreachable!("Retry loop exhausted unexpectedly")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn settings(attempts: u32) -> RetrySettings {
        RetrySettings {
            attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = settings(3)
            .run_with_retry_if(
                || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 { Err("transient".to_owned()) } else { Ok(n) }
                },
                |_| true,
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = settings(5)
            .run_with_retry_if(
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_owned())
                },
                |e| e != "fatal",
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let slow = RetrySettings {
            attempts: 5,
            base_delay_ms: 30_000,
            max_delay_ms: 60_000,
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result: Result<(), String> = slow
            .run_with_retry_if(
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("transient".to_owned())
                },
                |_| true,
                &cancel,
            )
            .await;

        assert_eq!(result, Err("transient".to_owned()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_config_still_runs_once() {
        let retry = RetryConfig {
            attempts: Some(0),
            base_delay_ms: None,
            max_delay_ms: None,
        };
        assert_eq!(RetrySettings::from(Some(&retry)).attempts, 1);
    }
}
