//! Bounded retry policy shared by both walkers.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// An explicit, per-operation failure budget.
///
/// Each logical operation (a page-fetch sequence of auth + request, or
/// a single per-item fetch) gets its own fresh budget; there is no
/// module-level counter shared across nested loops. The budget counts
/// every transport or decode failure, sleeps a fixed delay between
/// attempts, and escalates once spent. Non-retryable errors
/// (authentication rejection, cancellation) escape immediately without
/// consuming further attempts.
#[derive(Debug)]
pub struct RetryBudget {
    remaining: u32,
    failures: u32,
    delay: Duration,
}

impl RetryBudget {
    /// Creates a fresh budget from the retry configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            remaining: config.max_failures,
            failures: 0,
            delay: config.delay,
        }
    }

    /// Returns how many failures this budget has absorbed.
    pub fn failures_consumed(&self) -> u32 {
        self.failures
    }

    /// Runs an operation under this budget.
    ///
    /// The operation is invoked at most `max_failures` times, and
    /// exactly once if the first attempt succeeds.
    pub fn run<T>(&mut self, mut op: impl FnMut() -> SyncResult<T>) -> SyncResult<T> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    self.failures += 1;
                    self.remaining = self.remaining.saturating_sub(1);
                    if self.remaining == 0 {
                        return Err(SyncError::RetriesExhausted {
                            attempts,
                            last: err.to_string(),
                        });
                    }
                    tracing::warn!(attempt = attempts, error = %err, "remote call failed, retrying");
                    std::thread::sleep(self.delay);
                }
            }
        }
    }
}
