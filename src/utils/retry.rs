//! Bounded exponential backoff
//!
//! Shared by the related-terms enricher and the page store client. The caller
//! supplies a predicate that decides whether a failure is transient.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times to retry a transient failure and how long to wait between tries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
        }
    }

    /// Delays to sleep before each retry, doubling from `base_delay` up to `max_delay`
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.base_delay,
            max: self.max_delay,
            remaining: self.max_retries,
        }
    }
}

/// Finite sequence of retry delays
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    remaining: u32,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next.min(self.max);
        self.next = current.saturating_mul(2);
        Some(current)
    }
}

/// Run `operation` until it succeeds, fails permanently, or the backoff runs out
///
/// ```no_run
/// use keyword_radar::utils::retry::{with_retry_if, RetryConfig};
///
/// # async fn fetch() -> Result<String, std::io::Error> { Ok(String::new()) }
/// # async fn run() -> Result<(), std::io::Error> {
/// let body = with_retry_if(
///     &RetryConfig::with_delays(2, 100, 1_000),
///     fetch,
///     |e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    is_transient: P,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut delays = config.backoff();
    let mut tries = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if tries > 1 {
                    debug!(tries, "Recovered after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_transient(&err) {
            return Err(err);
        }

        let Some(delay) = delays.next() else {
            warn!(tries, error = %err, "Giving up");
            return Err(err);
        };

        warn!(
            tries,
            wait_ms = delay.as_millis() as u64,
            error = %err,
            "Transient failure"
        );
        tokio::time::sleep(delay).await;
        tries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum Failure {
        Timeout,
        BadRequest,
    }

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn is_timeout(e: &Failure) -> bool {
        *e == Failure::Timeout
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let delays: Vec<u64> = RetryConfig::with_delays(5, 100, 500)
            .backoff()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn test_backoff_empty_without_retries() {
        assert_eq!(RetryConfig::with_delays(0, 100, 500).backoff().count(), 0);
    }

    #[test]
    fn test_cap_never_below_base() {
        let config = RetryConfig::with_delays(1, 300, 10);
        assert_eq!(config.max_delay, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_recovers_from_timeouts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry_if(
            &RetryConfig::with_delays(3, 1, 2),
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Failure::Timeout)
                } else {
                    Ok("page")
                }
            },
            is_timeout,
        )
        .await;

        assert_eq!(result, Ok("page"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_last_retry() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry_if(
            &RetryConfig::with_delays(2, 1, 2),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Failure::Timeout)
            },
            is_timeout,
        )
        .await;

        assert_eq!(result, Err(Failure::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry_if(
            &RetryConfig::with_delays(4, 1, 2),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Failure::BadRequest)
            },
            is_timeout,
        )
        .await;

        assert_eq!(result, Err(Failure::BadRequest));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
