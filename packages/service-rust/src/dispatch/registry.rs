use std::fmt;
use std::sync::Arc;

use keyops_core::{ExecutableOperation, OperationEnv, OperationKind};

// ---------------------------------------------------------------------------
// OperationFactory trait
// ---------------------------------------------------------------------------

/// Constructs a fresh operation for one dispatch.
///
/// Closures of the shape `Fn(OperationEnv) -> Box<dyn ExecutableOperation>`
/// implement this trait directly.
pub trait OperationFactory: Send + Sync + 'static {
    fn create(&self, env: OperationEnv) -> Box<dyn ExecutableOperation>;
}

impl<F> OperationFactory for F
where
    F: Fn(OperationEnv) -> Box<dyn ExecutableOperation> + Send + Sync + 'static,
{
    fn create(&self, env: OperationEnv) -> Box<dyn ExecutableOperation> {
        self(env)
    }
}

type FactorySlot = Option<Arc<dyn OperationFactory>>;

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Closed mapping from [`OperationKind`] to the factory that builds it.
///
/// There is exactly one slot per kind and every lookup goes through an
/// exhaustive `match`, so adding a kind without deciding where it is stored
/// does not compile. Resolving a kind whose slot was never filled is a
/// programming error and panics.
#[derive(Default)]
pub struct OperationRegistry {
    sign_encrypt: FactorySlot,
    decrypt_verify: FactorySlot,
    save_keyring: FactorySlot,
    change_unlock: FactorySlot,
    revoke: FactorySlot,
    certify: FactorySlot,
    delete: FactorySlot,
    promote: FactorySlot,
    import: FactorySlot,
    backup: FactorySlot,
    upload: FactorySlot,
    input_data: FactorySlot,
    benchmark: FactorySlot,
    key_sync: FactorySlot,
}

impl OperationRegistry {
    /// Creates a registry with no factories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry where every kind resolves to `factory`.
    #[must_use]
    pub fn with_all<F: OperationFactory>(factory: F) -> Self {
        let shared: Arc<dyn OperationFactory> = Arc::new(factory);
        let mut registry = Self::new();
        for kind in OperationKind::ALL {
            *registry.slot_mut(kind) = Some(Arc::clone(&shared));
        }
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F: OperationFactory>(&mut self, kind: OperationKind, factory: F) -> &mut Self {
        *self.slot_mut(kind) = Some(Arc::new(factory));
        self
    }

    /// Whether a factory is registered for `kind`.
    #[must_use]
    pub fn supports(&self, kind: OperationKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Select the factory for `kind`.
    ///
    /// # Panics
    ///
    /// Panics if no factory was registered for `kind`. Dispatching a kind the
    /// registry cannot build is a bug in the caller, not an operation failure.
    #[must_use]
    pub fn resolve(&self, kind: OperationKind) -> &dyn OperationFactory {
        match self.slot(kind) {
            Some(factory) => factory.as_ref(),
            None => panic!("unrecognized operation request: {kind}"),
        }
    }

    fn slot(&self, kind: OperationKind) -> &FactorySlot {
        match kind {
            OperationKind::SignEncrypt => &self.sign_encrypt,
            OperationKind::DecryptVerify => &self.decrypt_verify,
            OperationKind::SaveKeyring => &self.save_keyring,
            OperationKind::ChangeUnlock => &self.change_unlock,
            OperationKind::Revoke => &self.revoke,
            OperationKind::Certify => &self.certify,
            OperationKind::Delete => &self.delete,
            OperationKind::Promote => &self.promote,
            OperationKind::Import => &self.import,
            OperationKind::Backup => &self.backup,
            OperationKind::Upload => &self.upload,
            OperationKind::InputData => &self.input_data,
            OperationKind::Benchmark => &self.benchmark,
            OperationKind::KeySync => &self.key_sync,
        }
    }

    fn slot_mut(&mut self, kind: OperationKind) -> &mut FactorySlot {
        match kind {
            OperationKind::SignEncrypt => &mut self.sign_encrypt,
            OperationKind::DecryptVerify => &mut self.decrypt_verify,
            OperationKind::SaveKeyring => &mut self.save_keyring,
            OperationKind::ChangeUnlock => &mut self.change_unlock,
            OperationKind::Revoke => &mut self.revoke,
            OperationKind::Certify => &mut self.certify,
            OperationKind::Delete => &mut self.delete,
            OperationKind::Promote => &mut self.promote,
            OperationKind::Import => &mut self.import,
            OperationKind::Backup => &mut self.backup,
            OperationKind::Upload => &mut self.upload,
            OperationKind::InputData => &mut self.input_data,
            OperationKind::Benchmark => &mut self.benchmark,
            OperationKind::KeySync => &mut self.key_sync,
        }
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<_> = OperationKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect();
        f.debug_struct("OperationRegistry")
            .field("registered", &registered)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
