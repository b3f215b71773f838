//! Bounded retry with deterministic exponential backoff.
//!
//! One loop serves both the plain and the observed entry points; the
//! observer is a pure observability hook and cannot influence retry
//! decisions.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

/// Retry policy.
///
/// The schedule is deterministic, with no jitter: the wait before attempt
/// `k+1` is `min(initial_delay * backoff_factor^(k-1), max_delay)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts made before giving up. Must be at least 1.
    pub max_attempts: u32,
    /// Wait after the first failed attempt. Must be nonzero.
    pub initial_delay: Duration,
    /// Ceiling on any single wait. Must be at least `initial_delay`.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt. Must be
    /// at least 1.0.
    pub backoff_factor: f64,
    /// Overall budget across all attempts and waits. Zero disables the
    /// deadline.
    pub max_total_timeout: Duration,
}

impl Default for RetryConfig {
    /// Policy defaults for provider syncs; deployments override via config.
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            max_total_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_attempts < 1 {
            return Err(SyncError::config("retry max_attempts must be at least 1"));
        }
        if self.initial_delay.is_zero() {
            return Err(SyncError::config("retry initial_delay must be nonzero"));
        }
        if self.max_delay < self.initial_delay {
            return Err(SyncError::config(
                "retry max_delay must be at least initial_delay",
            ));
        }
        if self.backoff_factor < 1.0 {
            return Err(SyncError::config(
                "retry backoff_factor must be at least 1.0",
            ));
        }
        Ok(())
    }

    /// Wait scheduled after failed attempt `attempt` (1-based), capped at
    /// `max_delay`.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let millis = (self.initial_delay.as_millis() as f64) * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Runs operations under a [`RetryConfig`].
///
/// Stateless: nothing is shared across calls, so one executor can serve any
/// number of concurrent syncs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor;

impl RetryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Runs `op` until it succeeds, the attempt budget is exhausted, or the
    /// caller cancels. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        config: &RetryConfig,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        self.run_observed(config, cancel, op, |_attempt, _error, _next_delay| {})
            .await
    }

    /// Same loop, with `observe` invoked after each failed-but-retriable
    /// attempt as `(attempt, error, next_delay)`.
    pub async fn run_observed<T, F, Fut, O>(
        &self,
        config: &RetryConfig,
        cancel: &CancellationToken,
        mut op: F,
        mut observe: O,
    ) -> Result<T, SyncError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
        O: FnMut(u32, &SyncError, Duration),
    {
        config.validate()?;

        let deadline = if config.max_total_timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + config.max_total_timeout)
        };
        let mut last_error: Option<SyncError> = None;

        for attempt in 1..=config.max_attempts {
            // Checked before each attempt so a cancelled caller never
            // triggers another network call.
            if cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(SyncError::Cancelled {
                    attempts: attempt - 1,
                    last_error: last_error.take().map(Box::new),
                });
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(SyncError::Cancelled {
                        attempts: attempt - 1,
                        last_error: last_error.take().map(Box::new),
                    });
                }
                _ = until(deadline) => {
                    return Err(SyncError::Cancelled {
                        attempts: attempt - 1,
                        last_error: last_error.take().map(Box::new),
                    });
                }
                result = op(attempt) => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retriable() => return Err(err),
                Err(err) => err,
            };

            if attempt == config.max_attempts {
                return Err(SyncError::RetryExhausted {
                    attempts: config.max_attempts,
                    source: Box::new(err),
                });
            }

            let delay = config.delay_after_attempt(attempt);
            observe(attempt, &err, delay);
            last_error = Some(err);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(SyncError::Cancelled {
                        attempts: attempt,
                        last_error: last_error.take().map(Box::new),
                    });
                }
                _ = until(deadline) => {
                    return Err(SyncError::Cancelled {
                        attempts: attempt,
                        last_error: last_error.take().map(Box::new),
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        // max_attempts >= 1 guarantees the loop returned.
        unreachable!("retry loop exited without a result")
    }
}

/// Resolves at `deadline`, or never when there is none.
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
