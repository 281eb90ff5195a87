//! Retry policy for transient Solr failures.

use crate::error::{Result, SolrError};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Backoff strategy between attempts.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Constant delay between retries.
    Constant(Duration),
    /// Exponential backoff: delay multiplies each attempt.
    Exponential {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
    },
}

impl BackoffStrategy {
    /// Calculate delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(d) => *d,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let factor = multiplier.powi(attempt as i32);
                let millis = (initial.as_millis() as f64 * factor) as u64;
                Duration::from_millis(millis).min(*max)
            }
        }
    }
}

/// How many times, and how patiently, to retry a request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay between attempts.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::None,
        }
    }

    /// Exponential backoff starting at 100ms, capped at 5s.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::Exponential {
                initial: Duration::from_millis(100),
                max: Duration::from_secs(5),
                multiplier: 2.0,
            },
        }
    }

    /// Replace the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `op`, retrying while it fails with a retryable error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    debug!(attempt = attempt + 1, error = %e, ?delay, "Retrying Solr request");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) if attempt > 0 && e.is_retryable() => {
                    return Err(SolrError::RetryExhausted {
                        attempts: attempt + 1,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_backoff() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(1),
            multiplier: 2.0,
        };

        assert_eq!(strategy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for_attempt(5), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::exponential(3).with_backoff(BackoffStrategy::None);

        let result = policy
            .run(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SolrError::Connection("refused".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::exponential(2).with_backoff(BackoffStrategy::None);

        let result: Result<()> = policy
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SolrError::Solr {
                    status: 503,
                    message: "down".to_string(),
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(SolrError::RetryExhausted { attempts: 3, .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_fail_fast() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::exponential(5).with_backoff(BackoffStrategy::None);

        let result: Result<()> = policy
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SolrError::Query("bad syntax".to_string()))
            })
            .await;

        assert!(matches!(result, Err(SolrError::Query(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
