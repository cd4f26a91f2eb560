//! Observer contract implemented by callers of the dispatcher.

use keyops_core::{OperationResult, ProgressLabel};

/// Terminal state of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation ran and produced a result (which may itself be a
    /// captured failure).
    Completed(OperationResult),
    /// The handle was cancelled before the operation body began; nothing ran.
    CancelledBeforeStart,
}

impl OperationOutcome {
    /// The result, if the operation ran.
    #[must_use]
    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::CancelledBeforeStart => None,
        }
    }

    #[must_use]
    pub fn into_result(self) -> Option<OperationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::CancelledBeforeStart => None,
        }
    }
}

/// Receives progress and the terminal outcome of one dispatch.
///
/// All methods are invoked from the dispatcher's delivery task, one at a
/// time and in emission order. `finished` is called exactly once and nothing
/// is delivered after it.
pub trait OperationCallback: Send + 'static {
    /// Whether the caller shows a progress surface that needs the quiescence
    /// window before the first signal.
    ///
    /// Queried once, on the caller's side inside `OperationDispatcher::start`;
    /// the answer is captured at submission and later changes are not seen by
    /// the worker.
    fn needs_progress_ui(&self) -> bool;

    fn progress(&mut self, label: Option<ProgressLabel>, current: u32, total: u32);

    /// The operation can no longer be cancelled; stop offering cancellation.
    fn prevent_cancel(&mut self);

    fn finished(&mut self, outcome: OperationOutcome);
}
