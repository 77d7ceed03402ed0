//! `stage-core`
//!
//! Core types and traits for single-axis positioning stages (linear and
//! rotary) in a scientific instrument.
//!
//! ## Layers
//!
//! - **Backend contract** ([`AxisBackend`]): raw-unit primitives a hardware
//!   driver provides (moves, homing searches, switches, enable/disable).
//! - **Unit & limit model** ([`AxisConfig`]): raw/scaled transform with axis
//!   inversion, soft and hard limits, auxiliary encoder fallback.
//! - **Capability contract** ([`Positioner`]): what callers use, in scaled
//!   units, with asynchronous [`OperationHandle`]s resolving to a
//!   [`StatusCode`].
//! - **Persistence port** ([`ConfigStore`]): key/value record per axis.
//!
//! The stateful engine that ties these together lives in `stage-engine`.
//!
//! ## Two result channels
//!
//! Expected outcomes (disabled, uninitialized, busy, locked, out of range,
//! stopped) are [`StatusCode`] values. Communication and hardware failures
//! are [`AxisError`]s.

pub mod backend;
pub mod capabilities;
pub mod error;
pub mod limits;
pub mod operation;
pub mod persistence;
pub mod status;
pub mod stop;
pub mod units;

pub use backend::{AxisBackend, BackendResult, Switches};
pub use capabilities::{AxisResult, Positioner};
pub use error::{AxisError, BackendError, StoreError};
pub use operation::{OperationCompleter, OperationHandle, OperationKind, OperationResult};
pub use persistence::{ConfigStore, MemoryStore, TomlFileStore};
pub use status::StatusCode;
pub use stop::StopSignal;
pub use units::AxisConfig;
