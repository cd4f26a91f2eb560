//! keyops service — serialized operation dispatch with progress reporting and
//! cooperative cancellation.

pub mod dispatch;
pub mod repository;
pub mod telemetry;

pub use dispatch::{
    DispatcherConfig, OperationCallback, OperationDispatcher, OperationHandle, OperationOutcome,
    OperationRegistry,
};
pub use repository::MemoryKeyRepository;

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
