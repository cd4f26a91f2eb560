//! In-memory [`KeyRepository`] implementation backed by [`DashMap`].
//!
//! Suitable for tests and for embedding where keyrings do not need to
//! outlive the process.

use dashmap::DashMap;
use keyops_core::{KeyRepository, StoredKeyring};

/// In-memory keyring store keyed by master key id.
#[derive(Debug, Default)]
pub struct MemoryKeyRepository {
    entries: DashMap<u64, StoredKeyring>,
}

impl MemoryKeyRepository {
    /// Creates a new, empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyRepository for MemoryKeyRepository {
    fn load(&self, master_key_id: u64) -> anyhow::Result<Option<StoredKeyring>> {
        Ok(self.entries.get(&master_key_id).map(|r| r.value().clone()))
    }

    fn save(&self, master_key_id: u64, keyring: StoredKeyring) -> anyhow::Result<()> {
        self.entries.insert(master_key_id, keyring);
        Ok(())
    }

    fn delete(&self, master_key_id: u64) -> anyhow::Result<bool> {
        Ok(self.entries.remove(&master_key_id).is_some())
    }

    fn master_key_ids(&self) -> anyhow::Result<Vec<u64>> {
        let mut ids: Vec<u64> = self.entries.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
