//! Collaborator contracts: the keyring repository and the executable operation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::progress::Progressable;
use crate::request::{CryptoInput, OperationRequest};
use crate::result::OperationResult;

/// Opaque serialized keyring as held by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeyring {
    /// Raw bytes of the encoded keyring.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Shared key store every operation reads and mutates.
///
/// Implementations do not have to guard against concurrent writers: the
/// dispatcher runs at most one operation at a time against a given
/// repository, and nothing else may call operations directly.
pub trait KeyRepository: Send + Sync {
    /// Load a keyring by master key id.
    fn load(&self, master_key_id: u64) -> anyhow::Result<Option<StoredKeyring>>;

    /// Insert or replace a keyring.
    fn save(&self, master_key_id: u64, keyring: StoredKeyring) -> anyhow::Result<()>;

    /// Remove a keyring. Returns whether it existed.
    fn delete(&self, master_key_id: u64) -> anyhow::Result<bool>;

    /// All master key ids currently stored, in ascending order.
    fn master_key_ids(&self) -> anyhow::Result<Vec<u64>>;
}

/// Everything an operation is constructed with.
#[derive(Clone)]
pub struct OperationEnv {
    pub repository: Arc<dyn KeyRepository>,
    pub progress: Arc<dyn Progressable>,
    /// Present only for cancellable kinds
    /// (see [`OperationKind::is_cancellable`](crate::OperationKind::is_cancellable)).
    pub cancellation: Option<CancellationToken>,
}

impl OperationEnv {
    /// Whether the caller asked this operation to stop. Always `false` for
    /// operations that were not handed a token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// One discrete business action against the repository.
///
/// `execute` runs synchronously on a blocking thread. Failures are returned
/// inside the [`OperationResult`], never raised. Cancellable operations
/// should poll [`OperationEnv::is_cancelled`] between internal steps.
pub trait ExecutableOperation: Send {
    fn execute(&mut self, request: OperationRequest, crypto_input: CryptoInput) -> OperationResult;
}
