//! Kubecred Store: persistence for issued credentials.
//!
//! Every backend enforces "at most one record per id" itself, atomically, at
//! insert time. Callers never need a prior read for correctness.

use async_trait::async_trait;

use kubecred_core::IssuedCredential;

pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod fault;
pub mod memory;
pub mod rocks;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use rocks::RocksStore;

/// Result of a unique insert that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted,
    /// A record with the same id already exists; nothing was written.
    DuplicateKey,
}

/// Uniqueness-constrained mapping from credential id to issued record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a record by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<IssuedCredential>, StoreError>;

    /// Insert `record` unless a record with the same id exists.
    async fn insert_unique(&self, record: &IssuedCredential) -> Result<InsertOutcome, StoreError>;

    /// Disconnect. Later calls fail with [`StoreError::NotConnected`].
    async fn close(&self) -> Result<(), StoreError>;
}
