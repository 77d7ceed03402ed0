//! Asynchronous operation handles.
//!
//! Composite operations (initialize, moves, limit/home/index searches) run on
//! a background task. The initiating call returns an [`OperationHandle`]
//! straight away; the handle resolves to a [`StatusCode`] or fails with an
//! [`AxisError`] when the backend fails.
//!
//! Handles are cheap to clone. Every clone observes the same result, which is
//! how the engine keeps its "current operation" slot while the caller awaits
//! the same operation.
//!
//! ```rust,ignore
//! let handle = axis.move_absolute(12.5);
//! // ... later
//! match handle.await? {
//!     StatusCode::Ok => {}
//!     other => tracing::warn!("move ended with {other}"),
//! }
//! ```

use crate::error::AxisError;
use crate::status::StatusCode;
use crate::stop::StopSignal;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::watch;

/// Final result of an operation.
pub type OperationResult = Result<StatusCode, AxisError>;

/// Which composite operation a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Homing sequence.
    Initialize,
    /// Absolute move.
    MoveAbsolute,
    /// Relative move.
    MoveRelative,
    /// Home switch search.
    FindHome,
    /// Encoder index search.
    FindIndex,
    /// Lower end switch search (scaled direction).
    FindLowerLimit,
    /// Upper end switch search (scaled direction).
    FindUpperLimit,
}

impl OperationKind {
    /// Label used in log fields.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            OperationKind::Initialize => "initialize",
            OperationKind::MoveAbsolute => "move_absolute",
            OperationKind::MoveRelative => "move_relative",
            OperationKind::FindHome => "find_home",
            OperationKind::FindIndex => "find_index",
            OperationKind::FindLowerLimit => "find_lower_limit",
            OperationKind::FindUpperLimit => "find_upper_limit",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Handle to a running or finished operation.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    kind: OperationKind,
    result: watch::Receiver<Option<OperationResult>>,
    gate: Option<Arc<CancelGate>>,
}

/// Links a handle to the axis stop flag until its operation retires.
///
/// The stop flag is shared by every operation on the axis, so a handle may
/// only raise it while its own operation still owns the axis.
#[derive(Debug)]
struct CancelGate {
    stop: StopSignal,
    retired: Mutex<bool>,
}

/// Write side of an [`OperationHandle`], held by the worker task.
///
/// Dropping it without calling [`complete`](Self::complete) makes every
/// waiter fail with [`AxisError::TaskFailed`].
#[derive(Debug)]
pub struct OperationCompleter {
    kind: OperationKind,
    result: watch::Sender<Option<OperationResult>>,
    gate: Arc<CancelGate>,
}

impl OperationCompleter {
    /// Detach the handles from the stop flag.
    ///
    /// Call before giving up the axis lock; from then on `cancel()` on this
    /// operation's handles no longer touches the flag.
    pub fn retire(&self) {
        *self.gate.retired.lock() = true;
    }

    /// Publish the final result. Retires the operation if not done already.
    pub fn complete(self, result: OperationResult) {
        self.retire();
        // No receivers left just means nobody is waiting.
        let _ = self.result.send(Some(result));
    }

    /// Operation this completer belongs to.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl OperationHandle {
    /// A handle for an operation about to run, cancellable through `stop`.
    #[must_use]
    pub fn pending(kind: OperationKind, stop: StopSignal) -> (Self, OperationCompleter) {
        let (tx, rx) = watch::channel(None);
        let gate = Arc::new(CancelGate {
            stop,
            retired: Mutex::new(false),
        });
        (
            Self {
                kind,
                result: rx,
                gate: Some(Arc::clone(&gate)),
            },
            OperationCompleter {
                kind,
                result: tx,
                gate,
            },
        )
    }

    /// A handle that is already finished, e.g. refused with [`StatusCode::Locked`].
    #[must_use]
    pub fn resolved(kind: OperationKind, status: StatusCode) -> Self {
        let (_tx, rx) = watch::channel(Some(Ok(status)));
        Self {
            kind,
            result: rx,
            gate: None,
        }
    }

    /// Operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// True once a result has been published.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.result.borrow().is_some()
    }

    /// The result, if finished.
    #[must_use]
    pub fn try_result(&self) -> Option<OperationResult> {
        self.result.borrow().clone()
    }

    /// Wait for the result.
    pub async fn wait(&self) -> OperationResult {
        let mut rx = self.result.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            Err(AxisError::TaskFailed(format!(
                "{} ended without a result",
                self.kind
            )))
        })
    }

    /// Ask the operation to stop at its next checkpoint.
    ///
    /// Only raises the axis stop flag; no controller command is sent (use
    /// the axis `abort_move`/`stop_move` for that). Returns
    /// [`StatusCode::Stopped`] without doing anything if the operation has
    /// already finished or released the axis, [`StatusCode::Ok`] otherwise.
    pub fn cancel(&self) -> StatusCode {
        if self.is_finished() {
            return StatusCode::Stopped;
        }
        let Some(gate) = &self.gate else {
            return StatusCode::Stopped;
        };
        // Held across the request so retirement cannot slip in between.
        let retired = gate.retired.lock();
        if *retired {
            return StatusCode::Stopped;
        }
        gate.stop.request();
        StatusCode::Ok
    }
}

impl IntoFuture for OperationHandle {
    type Output = OperationResult;
    type IntoFuture = BoxFuture<'static, OperationResult>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[tokio::test]
    async fn resolved_handle_is_finished() {
        let handle = OperationHandle::resolved(OperationKind::MoveAbsolute, StatusCode::Locked);
        assert!(handle.is_finished());
        assert_eq!(handle.try_result(), Some(Ok(StatusCode::Locked)));
        assert_eq!(handle.clone().await, Ok(StatusCode::Locked));
        assert_eq!(handle.cancel(), StatusCode::Stopped);
    }

    #[tokio::test]
    async fn clones_observe_same_result() {
        let stop = StopSignal::new();
        let (handle, completer) = OperationHandle::pending(OperationKind::Initialize, stop);
        let other = handle.clone();
        assert!(!handle.is_finished());

        let waiter = tokio::spawn(async move { other.wait().await });
        completer.complete(Ok(StatusCode::Ok));

        assert_eq!(waiter.await.unwrap(), Ok(StatusCode::Ok));
        assert_eq!(handle.wait().await, Ok(StatusCode::Ok));
    }

    #[tokio::test]
    async fn cancel_raises_stop_only_while_running() {
        let stop = StopSignal::new();
        let (handle, completer) = OperationHandle::pending(OperationKind::FindHome, stop.clone());

        assert_eq!(handle.cancel(), StatusCode::Ok);
        assert!(stop.is_requested());

        stop.clear();
        completer.complete(Ok(StatusCode::Stopped));
        assert_eq!(handle.cancel(), StatusCode::Stopped);
        assert!(!stop.is_requested());
    }

    #[tokio::test]
    async fn retired_operation_cannot_stop_its_successor() {
        let stop = StopSignal::new();
        let (old, completer) = OperationHandle::pending(OperationKind::MoveAbsolute, stop.clone());

        // Lock released, result not yet published.
        completer.retire();
        assert!(!old.is_finished());

        let (_next, _next_completer) =
            OperationHandle::pending(OperationKind::MoveAbsolute, stop.clone());
        assert_eq!(old.cancel(), StatusCode::Stopped);
        assert!(!stop.is_requested());

        completer.complete(Ok(StatusCode::Ok));
        assert_eq!(old.wait().await, Ok(StatusCode::Ok));
    }

    #[tokio::test]
    async fn dropped_completer_fails_waiters() {
        let (handle, completer) =
            OperationHandle::pending(OperationKind::MoveRelative, StopSignal::new());
        drop(completer);
        assert!(matches!(handle.wait().await, Err(AxisError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn backend_failure_is_an_error_not_a_status() {
        let (handle, completer) =
            OperationHandle::pending(OperationKind::MoveAbsolute, StopSignal::new());
        completer.complete(Err(BackendError::Communication("eof".into()).into()));
        let err = handle.await.unwrap_err();
        assert!(err.is_communication());
    }
}
