//! Timing configuration for realistic mode.

use std::time::Duration;

/// Controller-like delays for realistic mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Round trip of one command/response exchange on the shared channel
    pub communication_delay_ms: u64,
    /// Time the drive stays not-ready after motion ends
    pub settling_time_ms: u64,
    /// Motion simulation step
    pub motion_tick_ms: u64,
}

impl TimingConfig {
    /// Serial stepper controller defaults
    pub fn stepper() -> Self {
        Self {
            communication_delay_ms: 2,
            settling_time_ms: 20,
            motion_tick_ms: 10,
        }
    }

    /// Exchange delay as a `Duration`
    #[must_use]
    pub fn communication_delay(&self) -> Duration {
        Duration::from_millis(self.communication_delay_ms)
    }

    /// Settling delay as a `Duration`
    #[must_use]
    pub fn settling_time(&self) -> Duration {
        Duration::from_millis(self.settling_time_ms)
    }

    /// Motion step as a `Duration`
    #[must_use]
    pub fn motion_tick(&self) -> Duration {
        Duration::from_millis(self.motion_tick_ms.max(1))
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::stepper()
    }
}
