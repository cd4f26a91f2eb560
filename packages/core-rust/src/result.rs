//! Operation results.
//!
//! Business failures never cross the dispatch boundary as errors: they are
//! captured in [`ResultStatus::Failed`] and delivered like any other result.

use serde::{Deserialize, Serialize};

use crate::request::OperationKind;

/// Failure captured inside an [`OperationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum OperationFailure {
    #[error("bad passphrase")]
    BadPassphrase,
    #[error("key {master_key_id:#018x} not found")]
    KeyNotFound { master_key_id: u64 },
    #[error("repository error: {0}")]
    Repository(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Terminal status of an executed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Ok,
    /// The operation observed its cancellation token and stopped early.
    Cancelled,
    Failed(OperationFailure),
}

/// Severity of an [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One line of the operation log returned with a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Outcome of an operation that actually ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    kind: OperationKind,
    status: ResultStatus,
    log: Vec<LogEntry>,
}

impl OperationResult {
    #[must_use]
    pub fn ok(kind: OperationKind) -> Self {
        Self::with_status(kind, ResultStatus::Ok)
    }

    #[must_use]
    pub fn cancelled(kind: OperationKind) -> Self {
        Self::with_status(kind, ResultStatus::Cancelled)
    }

    #[must_use]
    pub fn failed(kind: OperationKind, failure: OperationFailure) -> Self {
        Self::with_status(kind, ResultStatus::Failed(failure))
    }

    fn with_status(kind: OperationKind, status: ResultStatus) -> Self {
        Self {
            kind,
            status,
            log: Vec::new(),
        }
    }

    /// Appends an entry to the operation log.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log.push(LogEntry {
            level,
            message: message.into(),
        });
    }

    /// Builder-style variant of [`OperationResult::log`].
    #[must_use]
    pub fn with_log(mut self, level: LogLevel, message: impl Into<String>) -> Self {
        self.log(level, message);
        self
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> &ResultStatus {
        &self.status
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self.status, ResultStatus::Ok)
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// Short outcome label for logging: `ok`, `cancelled` or `failed`.
    #[must_use]
    pub fn outcome_label(&self) -> &'static str {
        match self.status {
            ResultStatus::Ok => "ok",
            ResultStatus::Cancelled => "cancelled",
            ResultStatus::Failed(_) => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_keeps_failure_and_log() {
        let result = OperationResult::failed(OperationKind::Import, OperationFailure::BadPassphrase)
            .with_log(LogLevel::Error, "passphrase rejected");

        assert!(!result.is_ok());
        assert_eq!(result.kind(), OperationKind::Import);
        assert_eq!(
            result.status(),
            &ResultStatus::Failed(OperationFailure::BadPassphrase)
        );
        assert_eq!(result.entries().len(), 1);
        assert_eq!(result.outcome_label(), "failed");
    }

    #[test]
    fn key_not_found_message_is_hex() {
        let failure = OperationFailure::KeyNotFound {
            master_key_id: 0xABCD,
        };
        assert_eq!(failure.to_string(), "key 0x000000000000abcd not found");
    }
}
