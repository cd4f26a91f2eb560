//! Progress reporting contract between an executing operation and its caller.

use std::fmt;

use serde::Serialize;

/// Identifier of a progress message (e.g. `"progress.signing"`).
///
/// Presentation layers map labels to localized text; the dispatcher carries
/// them through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProgressLabel(pub &'static str);

impl fmt::Display for ProgressLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A coarse progress sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub label: Option<ProgressLabel>,
    pub current: u32,
    pub total: u32,
}

/// Sink an operation reports progress through.
///
/// Calls may come from any thread; implementations must preserve call order
/// per sink.
pub trait Progressable: Send + Sync {
    /// Report a progress sample.
    fn set_progress(&self, label: Option<ProgressLabel>, current: u32, total: u32);

    /// Signal that the operation entered a phase that must not be cancelled.
    fn set_prevent_cancel(&self);
}

/// Progress sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progressable for NoProgress {
    fn set_progress(&self, _label: Option<ProgressLabel>, _current: u32, _total: u32) {}

    fn set_prevent_cancel(&self) {}
}
