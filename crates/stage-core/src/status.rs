//! Operation outcome vocabulary.
//!
//! Every move, initialize, find and stop operation resolves to one of these
//! codes. They describe expected, recoverable outcomes of a well-formed
//! request (wrong axis state, out-of-range destination, contention) and are
//! returned as ordinary values, never as errors.
//!
//! The integer values are fixed: remote wrappers forward them verbatim, so
//! `1` stays unassigned.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of an axis operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum StatusCode {
    /// Operation completed.
    Ok = 0,
    /// Axis is moving or the drive is not ready.
    Busy = 2,
    /// Destination lies below the lower soft limit.
    DestBelowLowerLimit = 3,
    /// Destination lies above the upper soft limit.
    DestAboveUpperLimit = 4,
    /// Operation ended early because a stop was requested.
    Stopped = 5,
    /// Another operation holds the axis.
    Locked = 6,
    /// Drive is disabled.
    Disabled = 7,
    /// Axis has not been homed.
    Uninitialized = 8,
}

impl StatusCode {
    /// All codes in ascending integer order.
    pub const ALL: [StatusCode; 8] = [
        StatusCode::Ok,
        StatusCode::Busy,
        StatusCode::DestBelowLowerLimit,
        StatusCode::DestAboveUpperLimit,
        StatusCode::Stopped,
        StatusCode::Locked,
        StatusCode::Disabled,
        StatusCode::Uninitialized,
    ];

    /// Wire value of this code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// True only for [`StatusCode::Ok`].
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    /// Short snake_case label used in log fields.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::Busy => "busy",
            StatusCode::DestBelowLowerLimit => "dest_below_lower_limit",
            StatusCode::DestAboveUpperLimit => "dest_above_upper_limit",
            StatusCode::Stopped => "stopped",
            StatusCode::Locked => "locked",
            StatusCode::Disabled => "disabled",
            StatusCode::Uninitialized => "uninitialized",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.as_i32())
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> Self {
        code.as_i32()
    }
}

/// Raised when an integer does not name a [`StatusCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown status code {0}")]
pub struct UnknownStatusCode(pub i32);

impl TryFrom<i32> for StatusCode {
    type Error = UnknownStatusCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        StatusCode::ALL
            .into_iter()
            .find(|code| code.as_i32() == value)
            .ok_or(UnknownStatusCode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_fixed() {
        let values: Vec<i32> = StatusCode::ALL.iter().map(|c| c.as_i32()).collect();
        assert_eq!(values, vec![0, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn try_from_rejects_gap_and_out_of_range() {
        assert_eq!(StatusCode::try_from(6), Ok(StatusCode::Locked));
        assert_eq!(StatusCode::try_from(1), Err(UnknownStatusCode(1)));
        assert_eq!(StatusCode::try_from(9), Err(UnknownStatusCode(9)));
        assert_eq!(StatusCode::try_from(-1), Err(UnknownStatusCode(-1)));
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&StatusCode::DestAboveUpperLimit).unwrap();
        assert_eq!(json, "4");

        let parsed: StatusCode = serde_json::from_str("8").unwrap();
        assert_eq!(parsed, StatusCode::Uninitialized);
        assert!(serde_json::from_str::<StatusCode>("1").is_err());
    }

    #[test]
    fn display_includes_label_and_value() {
        assert_eq!(StatusCode::Stopped.to_string(), "stopped (5)");
    }
}
