use std::time::Duration;

/// Default quiescence window before an operation with a progress UI starts.
pub const DEFAULT_QUIESCENCE_DELAY: Duration = Duration::from_millis(200);

/// Dispatcher-level configuration.
///
/// Controls the startup grace period for progress surfaces and how progress
/// signals are delivered to callers.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long the worker waits before resolving an operation whose caller
    /// reported `needs_progress_ui() == true`. Zero disables the wait.
    pub initial_quiescence_delay: Duration,
    /// Collapse runs of pending progress updates for the same dispatch into
    /// the latest one when the caller's context falls behind.
    pub coalesce_progress: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            initial_quiescence_delay: DEFAULT_QUIESCENCE_DELAY,
            coalesce_progress: false,
        }
    }
}
