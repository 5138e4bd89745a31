use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use kubecred_core::IssuedCredential;

use crate::error::StoreError;
use crate::{CredentialStore, InsertOutcome};

/// In-process credential store.
///
/// Uniqueness is enforced through the map's entry API, which holds the shard
/// lock for the id across the existence check and the write.
pub struct MemoryStore {
    /// Credential id → issued record.
    records: DashMap<String, IssuedCredential>,
    connected: AtomicBool,
}

impl MemoryStore {
    /// Create an empty, connected store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            connected: AtomicBool::new(true),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<IssuedCredential>, StoreError> {
        self.ensure_connected()?;
        Ok(self.records.get(id).map(|e| e.value().clone()))
    }

    async fn insert_unique(&self, record: &IssuedCredential) -> Result<InsertOutcome, StoreError> {
        self.ensure_connected()?;
        match self.records.entry(record.id().to_string()) {
            Entry::Occupied(_) => Ok(InsertOutcome::DuplicateKey),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                tracing::debug!(credential_id = record.id(), "record inserted");
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.connected.store(false, Ordering::Release);
        tracing::info!(records = self.records.len(), "memory store closed");
        Ok(())
    }
}
