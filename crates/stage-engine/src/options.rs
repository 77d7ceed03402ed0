//! Engine timing options.
//!
//! Read from the same TOML files as driver configs:
//!
//! ```toml
//! [engine]
//! poll_interval = "100ms"
//! settle_timeout = "2m"
//! ```

use serde::{Deserialize, Serialize};
use stage_core::limits::{DEFAULT_SETTLE_TIMEOUT, POLL_INTERVAL};
use std::time::Duration;

/// Polling and timeout settings for one axis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Delay between readiness polls.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Longest wait for the drive to report ready before failing with a timeout.
    #[serde(with = "humantime_serde")]
    pub settle_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }
}

impl EngineOptions {
    /// Parse from a TOML table.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Replace the settle timeout.
    #[must_use]
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Replace the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
