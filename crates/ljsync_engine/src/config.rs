//! Configuration for a sync run.

use std::time::Duration;

/// Configuration for one sync run.
///
/// Credentials are immutable for the lifetime of the run; a clean run
/// creates fresh cursors and maps each time.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Account username.
    pub username: String,
    /// Account secret. Never sent in clear text; only its digest
    /// participates in the challenge response.
    pub secret: String,
    /// Host name of the journal server.
    pub host: String,
    /// Retry configuration shared by both walkers.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration for the default host.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            host: "livejournal.com".into(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the host name.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for retry behavior.
///
/// The delay is fixed between attempts, reproducing the reference
/// behavior; exponential backoff would be a compatible improvement.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of failed attempts before an operation is
    /// abandoned and surfaced as fatal.
    pub max_failures: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryConfig {
    /// Creates a retry configuration with the given failure budget.
    pub fn new(max_failures: u32) -> Self {
        Self {
            max_failures: max_failures.max(1),
            delay: Duration::from_millis(500),
        }
    }

    /// Creates a configuration that fails on the first error.
    pub fn no_retry() -> Self {
        Self {
            max_failures: 1,
            delay: Duration::ZERO,
        }
    }

    /// Sets the inter-attempt delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SyncConfig::new("frank", "hunter2")
            .with_host("dreamwidth.org")
            .with_retry(RetryConfig::new(3).with_delay(Duration::from_millis(10)));

        assert_eq!(config.username, "frank");
        assert_eq!(config.host, "dreamwidth.org");
        assert_eq!(config.retry.max_failures, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(10));
    }

    #[test]
    fn default_host_and_budget() {
        let config = SyncConfig::new("frank", "hunter2");
        assert_eq!(config.host, "livejournal.com");
        assert_eq!(config.retry.max_failures, 5);
        assert_eq!(config.retry.delay, Duration::from_millis(500));
    }

    #[test]
    fn zero_budget_clamped_to_one() {
        assert_eq!(RetryConfig::new(0).max_failures, 1);
    }
}
