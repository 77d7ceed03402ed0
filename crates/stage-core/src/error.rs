//! Error types for stage control.
//!
//! Failures travel on a channel separate from [`StatusCode`](crate::StatusCode):
//!
//! - **`BackendError`**: raised by a hardware driver. Covers communication
//!   failures on the serial line or network session, hardware faults, driver
//!   timeouts, and operations the driver does not implement.
//! - **`AxisError`**: what the engine surfaces to callers. Wraps backend
//!   failures, adds capability checks that fail before any hardware is
//!   touched, the settle timeout, and worker task failures.
//! - **`StoreError`**: configuration persistence failures. The engine logs
//!   these and carries on; they never abort an axis operation.
//!
//! All three are `Clone` so a finished operation result can be observed from
//! several clones of one operation handle.

use thiserror::Error;

/// Failure reported by an [`AxisBackend`](crate::AxisBackend).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The communication channel failed (write, read, framing, disconnect).
    #[error("communication failure: {0}")]
    Communication(String),

    /// The controller reported a fault.
    #[error("hardware fault: {0}")]
    Hardware(String),

    /// The controller did not answer in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The driver does not implement this operation (e.g. no home switch).
    #[error("operation '{0}' not supported by this backend")]
    NotSupported(&'static str),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => BackendError::Timeout(err.to_string()),
            _ => BackendError::Communication(err.to_string()),
        }
    }
}

/// Failure of an engine operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AxisError {
    /// The backend failed; the composite operation was aborted.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The axis configuration lacks the capability the call needs.
    ///
    /// Raised synchronously, before the operation lock is touched.
    #[error("axis '{axis}' does not support {operation}")]
    NotSupported {
        /// Axis name.
        axis: String,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// The axis did not report ready within the settle timeout.
    #[error("axis '{axis}' not ready after {waited_ms} ms")]
    Timeout {
        /// Axis name.
        axis: String,
        /// How long the engine waited.
        waited_ms: u64,
    },

    /// The worker task running the operation panicked or was dropped.
    #[error("operation task failed: {0}")]
    TaskFailed(String),
}

impl AxisError {
    /// True when the failure came from the communication channel.
    #[must_use]
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            AxisError::Backend(BackendError::Communication(_) | BackendError::Timeout(_))
        )
    }
}

/// Failure of a [`ConfigStore`](crate::ConfigStore).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("config store I/O error: {0}")]
    Io(String),

    /// Stored content could not be parsed.
    #[error("config store parse error: {0}")]
    Parse(String),

    /// A value could not be converted for storage.
    #[error("config store serialization error: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_communication_or_timeout() {
        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert!(matches!(
            BackendError::from(broken),
            BackendError::Communication(_)
        ));

        let slow = std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply");
        assert!(matches!(BackendError::from(slow), BackendError::Timeout(_)));
    }

    #[test]
    fn communication_classification() {
        let err = AxisError::from(BackendError::Communication("eof".into()));
        assert!(err.is_communication());

        let err = AxisError::from(BackendError::NotSupported("find_index"));
        assert!(!err.is_communication());
        assert_eq!(
            err.to_string(),
            "backend error: operation 'find_index' not supported by this backend"
        );
    }

    #[test]
    fn not_supported_message_names_axis() {
        let err = AxisError::NotSupported {
            axis: "focus".into(),
            operation: "find_home",
        };
        assert_eq!(err.to_string(), "axis 'focus' does not support find_home");
    }
}
