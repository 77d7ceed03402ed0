//! Shared timing constants.
//!
//! Centralizes the polling interval and timeouts used by the engine and the
//! caller-side "wait for done" helpers so both poll at the same rate.

use std::time::Duration;

/// Delay between readiness polls (100 ms).
///
/// Applied in composite operations after the blocking backend call returns,
/// and in `wait_ready`.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest time a composite operation waits for the drive to report ready
/// (120 seconds). Long homing runs on slow rotary stages fit comfortably.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(120);
