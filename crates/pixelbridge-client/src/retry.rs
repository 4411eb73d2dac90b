use std::{future::Future, time::Duration};

use rand::Rng;
use tracing::warn;

use pixelbridge_core::{config::RetryConfig, TrackerError};

/// Backoff before zero-indexed attempt `attempt` (>= 1):
/// `base * 2^attempt` plus uniform jitter in `[0, max_jitter]`.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let base = config.base_delay_ms.saturating_mul(factor);
    let jitter = if config.max_jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=config.max_jitter_ms)
    };
    Duration::from_millis(base.saturating_add(jitter))
}

/// Run `action` up to `max_attempts` times.
///
/// Only network and API failures are retried; any other error, and the
/// last error once attempts run out, is returned unchanged.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut action: F) -> Result<T, TrackerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TrackerError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(config, attempt)).await;
        }
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    error = %err,
                    trace_id = err.trace_id().unwrap_or(""),
                    "conversion request failed; retrying"
                );
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    fn config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 10,
            max_jitter_ms: 1000,
        }
    }

    #[test]
    fn delay_grows_exponentially_within_jitter() {
        let cfg = config(5);
        for attempt in 1..4u32 {
            let delay = backoff_delay(&cfg, attempt).as_millis() as u64;
            let floor = 10 * (1 << attempt);
            assert!(delay >= floor && delay <= floor + 1000, "attempt {attempt}: {delay}ms");
        }
        let no_jitter = RetryConfig {
            max_jitter_ms: 0,
            ..cfg
        };
        assert_eq!(backoff_delay(&no_jitter, 3), Duration::from_millis(80));
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let delay = backoff_delay(&config(3), 200);
        assert_eq!(delay, Duration::from_millis(u64::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = with_retry(&config(3), || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TrackerError::network("connection reset"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn last_error_is_returned_unchanged() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_retry(&config(2), || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(TrackerError::Api {
                    status: 500,
                    message: format!("failure {n}"),
                    trace_id: Some("T".to_string()),
                })
            }
        })
        .await;
        assert_eq!(
            result,
            Err(TrackerError::Api {
                status: 500,
                message: "failure 1".to_string(),
                trace_id: Some("T".to_string()),
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_retry(&config(5), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TrackerError::validation("bad"))
            }
        })
        .await;
        assert!(matches!(result, Err(TrackerError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parse_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_retry(&config(5), || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TrackerError::parse("garbage"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
