//! Operational modes for the mock backend.
//!
//! - **Instant**: motion completes immediately, for unit tests
//! - **Realistic**: motion takes `distance / speed`, for integration tests
//! - **Chaos**: realistic timing plus random failures from the error config

use serde::Deserialize;

/// Operational modes for mock axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockMode {
    /// Zero delays, deterministic - for unit tests
    #[default]
    Instant,
    /// Controller-like timing - for integration tests
    Realistic,
    /// Realistic timing with injected failures - for resilience testing
    Chaos,
}

impl MockMode {
    /// True when motion and exchanges take time.
    #[must_use]
    pub fn is_timed(self) -> bool {
        !matches!(self, MockMode::Instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode() {
        assert_eq!(MockMode::default(), MockMode::Instant);
        assert!(!MockMode::Instant.is_timed());
        assert!(MockMode::Chaos.is_timed());
    }

    #[test]
    fn test_mode_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: MockMode,
        }
        let w: Wrapper = toml::from_str("mode = \"realistic\"").unwrap();
        assert_eq!(w.mode, MockMode::Realistic);
    }
}
