//! Store wrapper with injectable failures.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use kubecred_core::IssuedCredential;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::{CredentialStore, InsertOutcome};

/// Failure mode applied to the next operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// `find_by_id` fails with this message.
    FindFails(String),
    /// `insert_unique` fails with this message.
    InsertFails(String),
    /// `find_by_id` reports nothing, as if another writer committed the id
    /// right after our read.
    HideExisting,
}

/// A [`MemoryStore`] that can be told to misbehave and counts calls.
#[derive(Default)]
pub struct FaultStore {
    inner: MemoryStore,
    fault: Mutex<Fault>,
    finds: AtomicUsize,
    inserts: AtomicUsize,
}

impl FaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(fault: Fault) -> Self {
        let store = Self::default();
        store.set_fault(fault);
        store
    }

    pub fn set_fault(&self, fault: Fault) {
        if let Ok(mut guard) = self.fault.lock() {
            *guard = fault;
        }
    }

    /// The wrapped store, bypassing faults.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn find_calls(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn fault(&self) -> Fault {
        self.fault.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CredentialStore for FaultStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<IssuedCredential>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::FindFails(msg) => Err(StoreError::Unavailable(msg)),
            Fault::HideExisting => Ok(None),
            _ => self.inner.find_by_id(id).await,
        }
    }

    async fn insert_unique(&self, record: &IssuedCredential) -> Result<InsertOutcome, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::InsertFails(msg) => Err(StoreError::Unavailable(msg)),
            _ => self.inner.insert_unique(record).await,
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}
