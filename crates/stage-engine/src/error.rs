//! Engine construction errors.
//!
//! Operation failures use [`stage_core::AxisError`]; this type only covers
//! building an [`AxisEngine`](crate::AxisEngine).

use stage_core::StoreError;
use thiserror::Error;

/// Failure to construct an axis engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration store could not be read.
    #[error("config store error: {0}")]
    Store(#[from] StoreError),

    /// The stored record does not deserialize into an axis configuration.
    #[error("stored configuration for axis '{axis}' is invalid: {reason}")]
    InvalidConfig {
        /// Axis name.
        axis: String,
        /// Deserializer message.
        reason: String,
    },

    /// Constructed outside a tokio runtime.
    #[error("axis engine requires a tokio runtime: {0}")]
    NoRuntime(String),
}
