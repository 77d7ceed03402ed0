//! Mock positioning-stage backend
//!
//! Simulated stepper axes for testing the axis engine without hardware.
//! All waiting uses `tokio::time`, so tests can run on a paused clock.
//!
//! # Available Types
//!
//! - [`MockAxisBackend`] - Simulated axis implementing `AxisBackend`
//! - [`SharedChannel`] - Simulated controller line shared by several axes,
//!   with a transaction log for assertions
//! - [`MockAxisFactory`] - Builds axes from TOML tables
//!
//! # Modes
//!
//! - Instant: motion completes inside the command, no delays
//! - Realistic: motion advances at the configured speed, channel exchanges and
//!   settling take time
//! - Chaos: realistic plus random communication failures
//!
//! ```rust,ignore
//! use stage_driver_mock::{MockAxisBackend, SharedChannel};
//!
//! let channel = SharedChannel::new();
//! let x = MockAxisBackend::builder().axis(1).channel(channel.clone()).build();
//! let y = MockAxisBackend::builder().axis(2).channel(channel.clone()).build();
//! ```

pub mod channel;
pub mod common;
mod mock_axis;

pub use channel::{SharedChannel, Transaction};
pub use common::{ErrorConfig, ErrorScenario, MockMode, MockRng, TimingConfig};
pub use mock_axis::{MockAxisBackend, MockAxisBuilder, MockAxisConfig, MockAxisFactory};
