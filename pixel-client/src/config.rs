//! Client configuration.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PIXELPALS_DEBOUNCE_MS` | `500` | Quiet period before a paint is saved |
//! | `PIXELPALS_REQUEST_TIMEOUT_MS` | `10000` | HTTP request timeout |

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default quiet period before a debounced save fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Exponential backoff for reopening the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first reconnect, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// Delay for a given attempt number (0-indexed), capped at `max_delay_ms`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(63) as i32;
        let base_delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = base_delay.min(self.max_delay_ms as f64).max(0.0) as u64;
        Duration::from_millis(capped)
    }
}

/// Sync client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Debounce quiet period in milliseconds.
    pub debounce_ms: u64,
    /// HTTP request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Feed reconnect backoff.
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `PIXELPALS_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_millis("PIXELPALS_DEBOUNCE_MS") {
            config.debounce_ms = ms;
        }
        if let Some(ms) = env_millis("PIXELPALS_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = ms;
        }
        config
    }

    /// Debounce quiet period.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_millis(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(ms) => Some(ms),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid environment value");
            None
        }
    }
}
