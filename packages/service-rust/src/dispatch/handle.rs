//! Caller-facing cancellation handle.

use keyops_core::CancellationToken;

use super::DispatchId;

/// Returned by [`OperationDispatcher::start`](super::OperationDispatcher::start).
///
/// Dropping the handle does not cancel anything. Cancelling after the
/// dispatch has finished is a no-op.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    id: DispatchId,
    token: CancellationToken,
}

impl OperationHandle {
    pub(crate) fn new(id: DispatchId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    /// Request cancellation. Idempotent.
    ///
    /// If the worker has not begun the operation yet, the operation never runs
    /// and the callback receives `CancelledBeforeStart`. Otherwise only
    /// cancellable operations that poll their token will notice.
    pub fn cancel(&self) {
        if self.token.cancel() {
            tracing::debug!(dispatch_id = self.id.0, "cancellation requested");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
