//! Operation dispatch: registry lookup, serialized execution, progress and
//! cancellation plumbing.
//!
//! 1. **Registry** (`registry`): `OperationKind` -> `OperationFactory`
//! 2. **Queue** (`queue`): single-worker FIFO; at most one operation runs
//! 3. **Progress** (`progress`): worker -> caller signal delivery
//! 4. **Handle** (`handle`): caller-side cooperative cancellation
//! 5. **Dispatcher** (`dispatcher`): `start(request, input, callback)` entry point

pub mod callback;
pub mod config;
pub mod dispatcher;
pub mod handle;
pub mod progress;
pub mod queue;
pub mod registry;

// Re-export key types for convenient access.
pub use callback::{OperationCallback, OperationOutcome};
pub use config::DispatcherConfig;
pub use dispatcher::OperationDispatcher;
pub use handle::OperationHandle;
pub use progress::{OperationEvent, ProgressChannel, ProgressSink};
pub use queue::{ExecutionQueue, QueueError, QueueRunnable};
pub use registry::{OperationFactory, OperationRegistry};

/// Identifier assigned to each `start` call, unique per dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchId(pub u64);
