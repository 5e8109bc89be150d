//! Bounded exponential backoff shared by every client call.

use super::ClientError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Whether repeating a request is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Reads; safe to repeat
    Idempotent,
    /// Creates and state changes; sent exactly once
    NonIdempotent,
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_)
            | ClientError::Unauthorized { .. }
            | ClientError::Server { .. } => true,
            ClientError::NotFound(_) | ClientError::Rejected { .. } | ClientError::Decode(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each following one
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Default::default()
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op`, retrying retryable failures of idempotent operations.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        idempotency: Idempotency,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_retries = match idempotency {
            Idempotency::Idempotent => self.max_retries,
            Idempotency::NonIdempotent => 0,
        };

        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry < max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    warn!(
                        "{} failed: {}; retry {}/{} in {:?}",
                        operation, e, retry, max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!("{} failed after {} retries: {}", operation, retry, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1))
    }

    #[test]
    fn test_delays_double_and_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_transient_auth_error_retried_twice() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<u32, ClientError> = fast()
            .run("fetch bookings", Idempotency::Idempotent, move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ClientError::Unauthorized {
                        status: 401,
                        message: "token expired".into(),
                    })
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), ClientError> = fast()
            .run("fetch bookings", Idempotency::Idempotent, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Transport("connection reset".into()))
            })
            .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), ClientError> = fast()
            .run("fetch availability", Idempotency::Idempotent, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::NotFound("no such route".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_writes_are_sent_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), ClientError> = fast()
            .run("create booking", Idempotency::NonIdempotent, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Server {
                    status: 503,
                    message: "unavailable".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
