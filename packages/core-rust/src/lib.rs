//! keyops core — operation requests, results, progress and cancellation contracts.

pub mod cancel;
pub mod progress;
pub mod request;
pub mod result;
pub mod traits;

pub use cancel::CancellationToken;
pub use progress::{NoProgress, ProgressLabel, ProgressUpdate, Progressable};
pub use request::{CryptoInput, OperationKind, OperationRequest, Payload};
pub use result::{LogEntry, LogLevel, OperationFailure, OperationResult, ResultStatus};
pub use traits::{ExecutableOperation, KeyRepository, OperationEnv, StoredKeyring};
