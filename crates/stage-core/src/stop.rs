//! Cooperative stop flag.
//!
//! One [`StopSignal`] exists per axis. The engine raises it on abort/stop,
//! checks it between the steps of a composite operation, and hands it to
//! every blocking backend call so drivers can return early. Nothing is ever
//! interrupted forcibly: cutting a controller exchange in half would leave
//! the line protocol out of frame.
//!
//! The flag is cleared only when the next operation takes the axis lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop request flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    /// New, not requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` if it was already raised.
    pub fn request(&self) -> bool {
        self.requested.swap(true, Ordering::AcqRel)
    }

    /// True once a stop has been requested and not yet cleared.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Lower the flag. Only the owner of the axis lock should call this.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }
}
