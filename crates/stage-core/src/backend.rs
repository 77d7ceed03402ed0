//! Backend contract.
//!
//! [`AxisBackend`] is the only interface the engine needs from a hardware
//! driver. Everything is in raw units. Command syntax, register maps and
//! framing stay private to the driver.
//!
//! # Contract
//!
//! - `is_ready` means not moving AND drive OK; `is_stopped` means not moving.
//! - `move_absolute_raw`, `move_relative_raw` and the `find_*` searches block
//!   until the motion completes, or return early once `stop` is raised.
//! - `set_target_raw` writes a commanded destination and returns without
//!   waiting for motion.
//! - `abort_move` / `stop_move` issue the controller's deceleration command.
//! - Operations a driver cannot perform return [`BackendError::NotSupported`].
//!   The engine propagates that error and never retries.
//!
//! # Thread Safety
//!
//! Several axes may share one controller channel (serial line, Modbus/TCP
//! session). Drivers serialize their own channel access so each method call
//! is atomic from the engine's point of view.

use crate::error::BackendError;
use crate::stop::StopSignal;
use async_trait::async_trait;

/// Convenience alias for backend results.
pub type BackendResult<T> = Result<T, BackendError>;

/// State of the travel switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Switches {
    /// Upper end-of-travel switch active.
    pub upper: bool,
    /// Lower end-of-travel switch active.
    pub lower: bool,
    /// Home switch active.
    pub home: bool,
}

impl Switches {
    /// `[upper, lower, home]`.
    #[must_use]
    pub fn to_array(self) -> [bool; 3] {
        [self.upper, self.lower, self.home]
    }

    /// Swap upper and lower, as seen from the scaled side of an inverted axis.
    #[must_use]
    pub fn inverted(self) -> Self {
        Self {
            upper: self.lower,
            lower: self.upper,
            home: self.home,
        }
    }
}

impl From<[bool; 3]> for Switches {
    fn from([upper, lower, home]: [bool; 3]) -> Self {
        Self { upper, lower, home }
    }
}

/// Hardware access for one physical axis.
#[async_trait]
pub trait AxisBackend: Send + Sync {
    /// Driver label used in log fields (e.g. `"mock"`, `"stepper"`).
    fn driver_type(&self) -> &str;

    /// Drive power stage enabled.
    async fn is_enabled(&self) -> BackendResult<bool>;

    /// Enable the drive.
    async fn enable(&self) -> BackendResult<()>;

    /// Disable the drive. Does not stop motion by itself.
    async fn disable(&self) -> BackendResult<()>;

    /// Current switch state.
    async fn switches(&self) -> BackendResult<Switches>;

    /// Not moving and drive OK.
    async fn is_ready(&self) -> BackendResult<bool>;

    /// Not moving.
    async fn is_stopped(&self) -> BackendResult<bool>;

    /// Controller holds a valid home reference.
    async fn is_initialized(&self) -> BackendResult<bool>;

    /// Mark the home reference valid or invalid.
    async fn set_initialized(&self, initialized: bool) -> BackendResult<()>;

    /// Actual position.
    async fn position_raw(&self) -> BackendResult<f64>;

    /// Redefine the actual position without moving.
    async fn set_position_raw(&self, raw: f64) -> BackendResult<()>;

    /// Configured speed.
    async fn speed_raw(&self) -> BackendResult<f64>;

    /// Set speed for subsequent moves.
    async fn set_speed_raw(&self, raw: f64) -> BackendResult<()>;

    /// Configured acceleration.
    async fn acceleration_raw(&self) -> BackendResult<f64>;

    /// Set acceleration for subsequent moves.
    async fn set_acceleration_raw(&self, raw: f64) -> BackendResult<()>;

    /// Last commanded destination.
    async fn target_raw(&self) -> BackendResult<f64>;

    /// Command a new destination without waiting for motion.
    async fn set_target_raw(&self, raw: f64) -> BackendResult<()>;

    /// Move to `dest`, blocking until done or `stop` is raised.
    async fn move_absolute_raw(&self, dest: f64, stop: &StopSignal) -> BackendResult<()>;

    /// Move by `dist`, blocking until done or `stop` is raised.
    async fn move_relative_raw(&self, dist: f64, stop: &StopSignal) -> BackendResult<()>;

    /// Abrupt stop.
    async fn abort_move(&self) -> BackendResult<()>;

    /// Controlled deceleration.
    async fn stop_move(&self) -> BackendResult<()>;

    /// Search the home switch.
    async fn find_home(&self, speed: f64, stop: &StopSignal) -> BackendResult<()>;

    /// Search the encoder index.
    async fn find_index(&self, speed: f64, stop: &StopSignal) -> BackendResult<()>;

    /// Search the raw-lower end switch.
    async fn find_lower_limit(&self, speed: f64, stop: &StopSignal) -> BackendResult<()>;

    /// Search the raw-upper end switch.
    async fn find_upper_limit(&self, speed: f64, stop: &StopSignal) -> BackendResult<()>;

    /// Auxiliary encoder reading.
    ///
    /// # Default Implementation
    /// Returns `NotSupported`.
    async fn aux_encoder_raw(&self) -> BackendResult<f64> {
        Err(BackendError::NotSupported("aux_encoder_raw"))
    }

    /// Release the communication resource. Called once at axis teardown.
    ///
    /// # Default Implementation
    /// Does nothing.
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }
}
