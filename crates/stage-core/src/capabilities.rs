//! Axis capability contract.
//!
//! [`Positioner`] is what callers see of an axis: configuration getters and
//! setters in scaled units, asynchronous composite operations returning
//! [`OperationHandle`]s, the non-blocking target path, and stop/abort.
//!
//! # Contract
//!
//! - Positions, speeds and limits are in scaled units unless the method name
//!   ends in `_raw`.
//! - Composite operations never block the caller. If another operation holds
//!   the axis the returned handle is already resolved with
//!   [`StatusCode::Locked`].
//! - `find_*` calls fail synchronously with [`AxisError::NotSupported`] when
//!   the axis lacks the capability, before the axis lock is touched.
//! - Logical outcomes are [`StatusCode`]s; only backend failures are errors.
//! - Configuration setters are not gated by the axis lock and persist
//!   immediately.
//!
//! # Thread Safety
//! All methods take `&self`; implementations use interior mutability.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn home_and_move<P: Positioner + ?Sized>(axis: &P) -> AxisResult<StatusCode> {
//!     match axis.initialize().await? {
//!         StatusCode::Ok => axis.move_absolute(25.0).await,
//!         refused => Ok(refused),
//!     }
//! }
//! ```

use crate::backend::Switches;
use crate::error::AxisError;
use crate::operation::OperationHandle;
use crate::status::StatusCode;
use crate::units::AxisConfig;
use async_trait::async_trait;

/// Convenience alias for axis results.
pub type AxisResult<T> = Result<T, AxisError>;

/// Public surface of one positioning axis.
#[async_trait]
pub trait Positioner: Send + Sync {
    /// Axis name (also the persistence record name).
    fn name(&self) -> &str;

    /// Snapshot of the current configuration.
    fn config(&self) -> AxisConfig;

    // ------------------------------------------------------------------
    // Drive state
    // ------------------------------------------------------------------

    /// Drive enabled.
    async fn is_enabled(&self) -> AxisResult<bool>;

    /// Enable the drive.
    async fn enable(&self) -> AxisResult<()>;

    /// Disable the drive. Does not stop a motion in progress.
    async fn disable(&self) -> AxisResult<()>;

    /// Not moving and drive OK.
    async fn is_ready(&self) -> AxisResult<bool>;

    /// Not moving.
    async fn is_stopped(&self) -> AxisResult<bool>;

    /// Home reference established.
    async fn is_initialized(&self) -> AxisResult<bool>;

    /// Switch state seen from the scaled side (upper/lower swapped when inverted).
    async fn switches(&self) -> AxisResult<Switches>;

    /// Poll readiness until the axis is ready.
    async fn wait_ready(&self) -> AxisResult<()>;

    // ------------------------------------------------------------------
    // Position, speed, acceleration
    // ------------------------------------------------------------------

    /// Actual position.
    async fn position(&self) -> AxisResult<f64>;

    /// Redefine the actual position without moving.
    async fn set_position(&self, scaled: f64) -> AxisResult<()>;

    /// Last commanded destination.
    async fn target(&self) -> AxisResult<f64>;

    /// Speed magnitude.
    async fn speed(&self) -> AxisResult<f64>;

    /// Set speed magnitude. Takes effect on the next backend motion command.
    async fn set_speed(&self, scaled: f64) -> AxisResult<()>;

    /// Acceleration magnitude.
    async fn acceleration(&self) -> AxisResult<f64>;

    /// Set acceleration magnitude.
    async fn set_acceleration(&self, scaled: f64) -> AxisResult<()>;

    /// Position read from the auxiliary encoder, or the primary position
    /// when the axis has none.
    async fn aux_encoder_position(&self) -> AxisResult<f64>;

    // ------------------------------------------------------------------
    // Composite operations
    // ------------------------------------------------------------------

    /// Home the axis (home switch, then index when fitted).
    fn initialize(&self) -> OperationHandle;

    /// Move to a scaled destination.
    fn move_absolute(&self, dest: f64) -> OperationHandle;

    /// Move by a scaled distance.
    fn move_relative(&self, dist: f64) -> OperationHandle;

    /// Move to a raw destination, with initialized and soft-limit checks.
    fn move_absolute_raw(&self, dest_raw: f64) -> OperationHandle;

    /// Move by a raw distance, with initialized and soft-limit checks.
    fn move_relative_raw(&self, dist_raw: f64) -> OperationHandle;

    /// Raw absolute move skipping initialized and soft-limit checks (calibration).
    fn move_absolute_raw_no_check(&self, dest_raw: f64) -> OperationHandle;

    /// Raw relative move skipping initialized and soft-limit checks (calibration).
    fn move_relative_raw_no_check(&self, dist_raw: f64) -> OperationHandle;

    /// Search the home switch at a scaled speed.
    fn find_home(&self, speed: f64) -> AxisResult<OperationHandle>;

    /// Search the encoder index at a scaled speed.
    fn find_index(&self, speed: f64) -> AxisResult<OperationHandle>;

    /// Search the scaled-lower end switch.
    fn find_lower_limit(&self, speed: f64) -> AxisResult<OperationHandle>;

    /// Search the scaled-upper end switch.
    fn find_upper_limit(&self, speed: f64) -> AxisResult<OperationHandle>;

    /// The operation currently in flight, if any.
    fn current_operation(&self) -> Option<OperationHandle>;

    // ------------------------------------------------------------------
    // Target tracking and stop
    // ------------------------------------------------------------------

    /// Command a scaled destination without waiting for motion.
    async fn set_target(&self, dest: f64) -> AxisResult<StatusCode>;

    /// Command a raw destination without waiting for motion.
    async fn set_target_raw(&self, dest_raw: f64) -> AxisResult<StatusCode>;

    /// Abrupt stop. Returns once the command is issued, not when motion ends.
    async fn abort_move(&self) -> AxisResult<StatusCode>;

    /// Controlled stop. Returns once the command is issued, not when motion ends.
    async fn stop_move(&self) -> AxisResult<StatusCode>;

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Set the unit label.
    fn set_axis_units(&self, units: &str);

    /// Set the scale. Zero is coerced to a tiny epsilon.
    fn set_scale(&self, scale: f64);

    /// Set the raw offset.
    fn set_offset_raw(&self, offset_raw: f64);

    /// Set the scaled lower soft limit. Returns a Dest* code when refused.
    fn set_lower_limit_soft(&self, scaled: f64) -> StatusCode;

    /// Set the scaled upper soft limit. Returns a Dest* code when refused.
    fn set_upper_limit_soft(&self, scaled: f64) -> StatusCode;

    /// Set the homing speed (raw).
    fn set_initialize_speed_raw(&self, raw: f64);

    /// Set the default speed restored after composite operations (raw).
    fn set_default_speed_raw(&self, raw: f64);

    /// Set the default acceleration restored after composite operations (raw).
    fn set_default_acceleration_raw(&self, raw: f64);

    /// Unit label.
    fn axis_units(&self) -> String {
        self.config().axis_units
    }

    /// Raw units per scaled unit.
    fn scale(&self) -> f64 {
        self.config().scale()
    }

    /// Raw offset.
    fn offset_raw(&self) -> f64 {
        self.config().offset_raw()
    }

    /// Scaled lower soft limit.
    fn lower_limit_soft(&self) -> f64 {
        self.config().lower_limit_soft()
    }

    /// Scaled upper soft limit.
    fn upper_limit_soft(&self) -> f64 {
        self.config().upper_limit_soft()
    }

    /// Scaled lower hard limit.
    fn lower_limit_hard(&self) -> f64 {
        self.config().lower_limit_hard()
    }

    /// Scaled upper hard limit.
    fn upper_limit_hard(&self) -> f64 {
        self.config().upper_limit_hard()
    }
}
