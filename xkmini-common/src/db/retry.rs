//! Lock-contention retry
//!
//! SQLite allows one writer at a time. Writes that bounce off another
//! connection's lock are retried a fixed number of times with a fixed pause;
//! every other error is returned immediately.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Retry parameters for writes that hit a locked database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Policy without pauses, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// Run `operation`, retrying while it fails with lock contention
///
/// After the last attempt still hits a lock the error becomes
/// [`Error::Contention`].
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_lock_contention() => {
                if attempt >= max_attempts {
                    error!(
                        operation = operation_name,
                        attempt,
                        "Database still locked, giving up: {}",
                        err
                    );
                    return Err(Error::Contention {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                    });
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    "Database locked, will retry after backoff"
                );

                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
}
