//! RocksDB backend.
//!
//! Records live in the `issued_credentials` column family as JSON, keyed by
//! credential id. Unique inserts run inside a pessimistic transaction:
//! `get_for_update` takes the key lock, so two writers of the same id are
//! serialized by RocksDB and the second one sees the first one's commit.
//!
//! Only one process may hold the database for writing. Other processes (the
//! verification service) open it as a read-only secondary instance that
//! catches up with the primary before every read.

use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, TransactionDB, TransactionDBOptions, DB};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kubecred_core::IssuedCredential;

use crate::error::StoreError;
use crate::{CredentialStore, InsertOutcome};

/// Column family holding issued credentials.
pub const CF_ISSUED: &str = "issued_credentials";

enum Engine {
    Primary(TransactionDB),
    Secondary(DB),
}

/// RocksDB-backed credential store.
pub struct RocksStore {
    engine: Mutex<Option<Arc<Engine>>>,
    path: PathBuf,
}

impl RocksStore {
    /// Open or create the database at `path`.
    ///
    /// `lock_timeout` bounds how long an insert waits on a concurrent writer
    /// of the same id before failing as unavailable.
    pub fn open(path: &Path, lock_timeout: Duration) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(lock_timeout_millis(lock_timeout));

        let cfs = vec![ColumnFamilyDescriptor::new(CF_ISSUED, Options::default())];
        let db: TransactionDB = TransactionDB::open_cf_descriptors(&opts, &txn_opts, path, cfs)?;

        tracing::info!(path = %path.display(), "rocksdb store opened");
        Ok(Self::with_engine(Engine::Primary(db), path))
    }

    /// Open a read-only view of the primary database at `primary`, keeping
    /// the secondary instance's own files under `secondary`.
    ///
    /// An empty primary is created first when none exists yet.
    pub fn open_secondary(primary: &Path, secondary: &Path) -> Result<Self, StoreError> {
        ensure_primary(primary)?;
        std::fs::create_dir_all(secondary).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut opts = Options::default();
        opts.set_max_open_files(-1);
        let db = DB::open_cf_as_secondary(&opts, primary, secondary, [CF_ISSUED])?;

        tracing::info!(
            primary = %primary.display(),
            secondary = %secondary.display(),
            "rocksdb store opened read-only"
        );
        Ok(Self::with_engine(Engine::Secondary(db), primary))
    }

    fn with_engine(engine: Engine, path: &Path) -> Self {
        Self {
            engine: Mutex::new(Some(Arc::new(engine))),
            path: path.to_path_buf(),
        }
    }

    /// Whether this handle can write.
    pub fn is_writable(&self) -> bool {
        matches!(self.handle().as_deref(), Ok(Engine::Primary(_)))
    }

    /// Database directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&self) -> Result<Arc<Engine>, StoreError> {
        let guard = self
            .engine
            .lock()
            .map_err(|_| StoreError::Unavailable("store handle poisoned".into()))?;
        guard.clone().ok_or(StoreError::NotConnected)
    }

    /// Run a blocking RocksDB call off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Engine) -> Result<T, StoreError> + Send + 'static,
    {
        let engine = self.handle()?;
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }
}

/// Negative timeouts mean "wait forever" to RocksDB.
fn lock_timeout_millis(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

fn ensure_primary(primary: &Path) -> Result<(), StoreError> {
    if primary.join("CURRENT").exists() {
        return Ok(());
    }
    std::fs::create_dir_all(primary).map_err(|e| StoreError::Unavailable(e.to_string()))?;

    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);
    let cfs = vec![ColumnFamilyDescriptor::new(CF_ISSUED, Options::default())];
    let db = DB::open_cf_descriptors(&opts, primary, cfs)?;
    drop(db);

    tracing::info!(path = %primary.display(), "created empty primary database");
    Ok(())
}

fn missing_column() -> StoreError {
    StoreError::Unavailable(format!("column family '{}' not found", CF_ISSUED))
}

fn column(db: &TransactionDB) -> Result<&ColumnFamily, StoreError> {
    db.cf_handle(CF_ISSUED).ok_or_else(missing_column)
}

fn decode(bytes: Option<Vec<u8>>) -> Result<Option<IssuedCredential>, StoreError> {
    match bytes {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl CredentialStore for RocksStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<IssuedCredential>, StoreError> {
        let key = id.to_string();
        self.blocking(move |engine| match engine {
            Engine::Primary(db) => decode(db.get_cf(column(db)?, key.as_bytes())?),
            Engine::Secondary(db) => {
                db.try_catch_up_with_primary()?;
                let cf = db.cf_handle(CF_ISSUED).ok_or_else(missing_column)?;
                decode(db.get_cf(cf, key.as_bytes())?)
            }
        })
        .await
    }

    async fn insert_unique(&self, record: &IssuedCredential) -> Result<InsertOutcome, StoreError> {
        let key = record.id().to_string();
        let value = serde_json::to_vec(record)?;
        self.blocking(move |engine| {
            let db = match engine {
                Engine::Primary(db) => db,
                Engine::Secondary(_) => {
                    return Err(StoreError::Unavailable("store opened read-only".into()))
                }
            };
            let cf = column(db)?;
            let txn = db.transaction();
            if txn.get_for_update_cf(cf, key.as_bytes(), true)?.is_some() {
                txn.rollback()?;
                return Ok(InsertOutcome::DuplicateKey);
            }
            txn.put_cf(cf, key.as_bytes(), &value)?;
            txn.commit()?;
            tracing::debug!(credential_id = %key, "record inserted");
            Ok(InsertOutcome::Inserted)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let mut guard = self
            .engine
            .lock()
            .map_err(|_| StoreError::Unavailable("store handle poisoned".into()))?;
        // In-flight operations keep their own Arc; the database closes once they finish.
        guard.take();
        tracing::info!(path = %self.path.display(), "rocksdb store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubecred_core::Credential;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("kubecred-test-{}", rand::random::<u64>()))
    }

    fn open(dir: &Path) -> Arc<RocksStore> {
        Arc::new(RocksStore::open(dir, Duration::from_secs(5)).unwrap())
    }

    fn record(id: &str, worker: &str) -> IssuedCredential {
        IssuedCredential::new(Credential::new(id).with_holder("alice"), worker.into())
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let dir = temp_dir();
        let store = open(&dir);

        let rec = record("vc-001", "w1");
        assert_eq!(store.insert_unique(&rec).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.find_by_id("vc-001").await.unwrap(), Some(rec));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_find_nonexistent() {
        let dir = temp_dir();
        let store = open(&dir);
        assert!(store.find_by_id("nonexistent").await.unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        let dir = temp_dir();
        let store = open(&dir);

        store.insert_unique(&record("vc-002", "first")).await.unwrap();
        let outcome = store.insert_unique(&record("vc-002", "second")).await.unwrap();
        assert_eq!(outcome, InsertOutcome::DuplicateKey);
        let stored = store.find_by_id("vc-002").await.unwrap().unwrap();
        assert_eq!(stored.worker_id, "first");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = temp_dir();
        let rec = record("vc-003", "w1");
        {
            let store = open(&dir);
            store.insert_unique(&rec).await.unwrap();
            store.close().await.unwrap();
        }
        let store = open(&dir);
        assert_eq!(store.find_by_id("vc-003").await.unwrap(), Some(rec));
        assert_eq!(
            store.insert_unique(&record("vc-003", "w2")).await.unwrap(),
            InsertOutcome::DuplicateKey
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_closed_store() {
        let dir = temp_dir();
        let store = open(&dir);
        store.close().await.unwrap();
        assert_eq!(store.find_by_id("x").await, Err(StoreError::NotConnected));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_secondary_follows_primary() {
        let dir = temp_dir();
        let shadow = temp_dir();
        let primary = open(&dir);
        primary.insert_unique(&record("vc-010", "w1")).await.unwrap();

        let secondary = RocksStore::open_secondary(&dir, &shadow).unwrap();
        assert!(!secondary.is_writable());
        assert!(secondary.find_by_id("vc-010").await.unwrap().is_some());

        primary.insert_unique(&record("vc-011", "w1")).await.unwrap();
        assert!(secondary.find_by_id("vc-011").await.unwrap().is_some());

        let err = secondary.insert_unique(&record("vc-012", "w2")).await.unwrap_err();
        assert_eq!(err, StoreError::Unavailable("store opened read-only".into()));

        std::fs::remove_dir_all(&dir).ok();
        std::fs::remove_dir_all(&shadow).ok();
    }

    #[test]
    fn test_lock_timeout_is_clamped() {
        assert_eq!(lock_timeout_millis(Duration::from_millis(5000)), 5000);
        assert_eq!(lock_timeout_millis(Duration::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_secondary_before_primary_exists() {
        let dir = temp_dir();
        let secondary =
            RocksStore::open_secondary(&dir.join("db"), &dir.join("db.secondary")).unwrap();
        assert!(!secondary.is_writable());
        assert!(secondary.find_by_id("cred-1").await.unwrap().is_none());

        let primary = open(&dir.join("db"));
        primary.insert_unique(&record("cred-1", "w1")).await.unwrap();
        let found = secondary.find_by_id("cred-1").await.unwrap().unwrap();
        assert_eq!(found.worker_id, "w1");

        secondary.close().await.unwrap();
        primary.close().await.unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let dir = temp_dir();
        let store = open(&dir);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_unique(&record("contended", &format!("w{}", i)))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let inserted = futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|o| *o.as_ref().unwrap() == InsertOutcome::Inserted)
            .count();
        assert_eq!(inserted, 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
