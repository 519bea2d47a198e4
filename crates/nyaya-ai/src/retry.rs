//! Bounded exponential backoff around oracle calls.
//!
//! Only rate-limit failures are retried. Everything else surfaces on the
//! first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::OracleError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. For tests and offline runs.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Wait before retry number `retry` (0-based). A server hint can raise the
    /// wait but the cap always applies. Multipliers below 1 are treated as 1,
    /// and a delay too large to represent becomes the cap.
    pub fn delay_for_retry(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let backoff = Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay));
        hint.map_or(backoff, |h| h.max(backoff)).min(self.max_delay)
    }
}

/// Run `op`, retrying rate-limit failures per `policy`.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, OracleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limit() && retry < policy.max_retries => {
                let wait = policy.delay_for_retry(retry, e.retry_hint());
                warn!(
                    call = label,
                    attempt = retry + 1,
                    of = policy.max_retries + 1,
                    wait_secs = wait.as_secs_f64(),
                    "rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                retry += 1;
            }
            Err(e) => {
                if e.is_rate_limit() {
                    error!(call = label, retries = policy.max_retries, error = %e, "rate limit retries exhausted");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn limited() -> OracleError {
        OracleError::Server {
            status: 429,
            body: "Resource has been exhausted (e.g. check quota).".into(),
        }
    }

    #[test]
    fn delays_grow_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(0, None), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(1, None), Duration::from_secs(4));
        assert_eq!(policy.delay_for_retry(2, None), Duration::from_secs(8));
        assert_eq!(policy.delay_for_retry(10, None), Duration::from_secs(60));
    }

    #[test]
    fn hostile_settings_stay_within_cap() {
        let shrinking = RetryPolicy {
            multiplier: -3.0,
            ..RetryPolicy::default()
        };
        assert_eq!(shrinking.delay_for_retry(1, None), Duration::from_secs(2));

        let runaway = RetryPolicy {
            max_retries: u32::MAX,
            multiplier: 1e10,
            ..RetryPolicy::default()
        };
        assert_eq!(runaway.delay_for_retry(40, None), Duration::from_secs(60));
        assert_eq!(runaway.delay_for_retry(u32::MAX, None), Duration::from_secs(60));

        let undefined = RetryPolicy {
            multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(undefined.delay_for_retry(3, None), Duration::from_secs(2));
    }

    #[test]
    fn hint_raises_but_never_exceeds_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for_retry(0, Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
        assert_eq!(
            policy.delay_for_retry(2, Some(Duration::from_secs(1))),
            Duration::from_secs(8)
        );
        assert_eq!(
            policy.delay_for_retry(0, Some(Duration::from_secs(120))),
            Duration::from_secs(60)
        );
    }

    #[tokio::test]
    async fn recovers_after_transient_rate_limits() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result = with_backoff(&RetryPolicy::immediate(), "test", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(limited())
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<(), _> = with_backoff(&RetryPolicy::immediate(), "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(limited())
        })
        .await;
        assert!(result.unwrap_err().is_rate_limit());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<(), _> = with_backoff(&RetryPolicy::immediate(), "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::Server {
                status: 500,
                body: "boom".into(),
            })
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            OracleError::Server { status: 500, .. }
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
