//! Operation requests: the closed set of kinds the dispatcher understands.
//!
//! Each [`OperationRequest`] variant carries an opaque [`Payload`]; only the
//! variant tag is meaningful to the dispatch machinery. The payload contents
//! belong to the operation that consumes them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque operation-specific parameters.
///
/// The dispatch layer never inspects these bytes; they are handed to the
/// resolved operation unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Raw bytes of the serialized parcel.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Payload {
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// Discriminant for the supported operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
    SignEncrypt,
    DecryptVerify,
    SaveKeyring,
    ChangeUnlock,
    Revoke,
    Certify,
    Delete,
    Promote,
    Import,
    Backup,
    Upload,
    InputData,
    Benchmark,
    KeySync,
}

impl OperationKind {
    /// Every kind, in declaration order.
    pub const ALL: [OperationKind; 14] = [
        OperationKind::SignEncrypt,
        OperationKind::DecryptVerify,
        OperationKind::SaveKeyring,
        OperationKind::ChangeUnlock,
        OperationKind::Revoke,
        OperationKind::Certify,
        OperationKind::Delete,
        OperationKind::Promote,
        OperationKind::Import,
        OperationKind::Backup,
        OperationKind::Upload,
        OperationKind::InputData,
        OperationKind::Benchmark,
        OperationKind::KeySync,
    ];

    /// Stable lowercase name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignEncrypt => "sign_encrypt",
            Self::DecryptVerify => "decrypt_verify",
            Self::SaveKeyring => "save_keyring",
            Self::ChangeUnlock => "change_unlock",
            Self::Revoke => "revoke",
            Self::Certify => "certify",
            Self::Delete => "delete",
            Self::Promote => "promote",
            Self::Import => "import",
            Self::Backup => "backup",
            Self::Upload => "upload",
            Self::InputData => "input_data",
            Self::Benchmark => "benchmark",
            Self::KeySync => "key_sync",
        }
    }

    /// Whether operations of this kind are handed the cancellation token.
    ///
    /// Non-cancellable kinds can still be suppressed before they start; they
    /// just never observe the token while running.
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        match self {
            Self::SignEncrypt
            | Self::SaveKeyring
            | Self::Certify
            | Self::Promote
            | Self::Import
            | Self::Backup
            | Self::Upload
            | Self::KeySync => true,
            Self::DecryptVerify
            | Self::ChangeUnlock
            | Self::Revoke
            | Self::Delete
            | Self::InputData
            | Self::Benchmark => false,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A request to run one operation. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum OperationRequest {
    SignEncrypt(Payload),
    DecryptVerify(Payload),
    SaveKeyring(Payload),
    ChangeUnlock(Payload),
    Revoke(Payload),
    Certify(Payload),
    Delete(Payload),
    Promote(Payload),
    Import(Payload),
    Backup(Payload),
    Upload(Payload),
    InputData(Payload),
    Benchmark(Payload),
    KeySync(Payload),
}

impl OperationRequest {
    /// Builds a request of the given kind around `payload`.
    #[must_use]
    pub fn new(kind: OperationKind, payload: Payload) -> Self {
        match kind {
            OperationKind::SignEncrypt => Self::SignEncrypt(payload),
            OperationKind::DecryptVerify => Self::DecryptVerify(payload),
            OperationKind::SaveKeyring => Self::SaveKeyring(payload),
            OperationKind::ChangeUnlock => Self::ChangeUnlock(payload),
            OperationKind::Revoke => Self::Revoke(payload),
            OperationKind::Certify => Self::Certify(payload),
            OperationKind::Delete => Self::Delete(payload),
            OperationKind::Promote => Self::Promote(payload),
            OperationKind::Import => Self::Import(payload),
            OperationKind::Backup => Self::Backup(payload),
            OperationKind::Upload => Self::Upload(payload),
            OperationKind::InputData => Self::InputData(payload),
            OperationKind::Benchmark => Self::Benchmark(payload),
            OperationKind::KeySync => Self::KeySync(payload),
        }
    }

    /// Returns the kind tag of this request.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SignEncrypt(_) => OperationKind::SignEncrypt,
            Self::DecryptVerify(_) => OperationKind::DecryptVerify,
            Self::SaveKeyring(_) => OperationKind::SaveKeyring,
            Self::ChangeUnlock(_) => OperationKind::ChangeUnlock,
            Self::Revoke(_) => OperationKind::Revoke,
            Self::Certify(_) => OperationKind::Certify,
            Self::Delete(_) => OperationKind::Delete,
            Self::Promote(_) => OperationKind::Promote,
            Self::Import(_) => OperationKind::Import,
            Self::Backup(_) => OperationKind::Backup,
            Self::Upload(_) => OperationKind::Upload,
            Self::InputData(_) => OperationKind::InputData,
            Self::Benchmark(_) => OperationKind::Benchmark,
            Self::KeySync(_) => OperationKind::KeySync,
        }
    }

    /// Borrow the opaque payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        match self {
            Self::SignEncrypt(p)
            | Self::DecryptVerify(p)
            | Self::SaveKeyring(p)
            | Self::ChangeUnlock(p)
            | Self::Revoke(p)
            | Self::Certify(p)
            | Self::Delete(p)
            | Self::Promote(p)
            | Self::Import(p)
            | Self::Backup(p)
            | Self::Upload(p)
            | Self::InputData(p)
            | Self::Benchmark(p)
            | Self::KeySync(p) => p,
        }
    }
}

/// Auxiliary input passed through to the operation unchanged.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoInput {
    /// Passphrase supplied by the caller, if any.
    pub passphrase: Option<String>,
    /// Previously obtained crypto results (e.g. security-token signatures),
    /// keyed by the hash they were produced for.
    pub crypto_data: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Signature creation time in milliseconds since Unix epoch.
    pub signature_time_millis: Option<u64>,
}

impl CryptoInput {
    #[must_use]
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(passphrase.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for CryptoInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoInput")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("crypto_data", &self.crypto_data.len())
            .field("signature_time_millis", &self.signature_time_millis)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
