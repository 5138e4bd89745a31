use std::sync::Arc;

use kubecred_core::{Credential, IssuedCredential, WorkerIdentity};
use kubecred_store::{CredentialStore, InsertOutcome};

use crate::error::CredentialError;

/// Worker label reported when a concurrent issuer won the insert.
pub const UNKNOWN_WORKER: &str = "unknown";

/// Result of an issuance request. Every variant is a success.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// This call wrote the record.
    Issued(IssuedCredential),
    /// The record already existed when this call looked it up.
    AlreadyIssued(IssuedCredential),
    /// The lookup missed but the insert hit the uniqueness constraint: another
    /// caller won between our read and our write. The winner's record is not
    /// re-read, so its attribution is unknown here.
    RaceLost { id: String },
}

impl IssueOutcome {
    /// Whether a record for this id existed before this call's write.
    pub fn already_issued(&self) -> bool {
        !matches!(self, Self::Issued(_))
    }

    /// The known record, if any.
    pub fn record(&self) -> Option<&IssuedCredential> {
        match self {
            Self::Issued(r) | Self::AlreadyIssued(r) => Some(r),
            Self::RaceLost { .. } => None,
        }
    }

    /// Worker attributed with the issuance, or [`UNKNOWN_WORKER`].
    pub fn worker_id(&self) -> &str {
        self.record()
            .map(|r| r.worker_id.as_str())
            .unwrap_or(UNKNOWN_WORKER)
    }
}

/// Records credentials as issued, at most once per id.
pub struct CredentialIssuer {
    store: Arc<dyn CredentialStore>,
    workers: WorkerIdentity,
}

impl CredentialIssuer {
    /// Create a new issuer over `store`.
    pub fn new(store: Arc<dyn CredentialStore>, workers: WorkerIdentity) -> Self {
        Self { store, workers }
    }

    /// The worker identity stamped on new records.
    pub fn workers(&self) -> &WorkerIdentity {
        &self.workers
    }

    /// Issue `credential`.
    ///
    /// A single record per id is guaranteed by the store's uniqueness
    /// constraint. The lookup short-circuits re-issues of known ids.
    pub async fn issue(&self, credential: Credential) -> Result<IssueOutcome, CredentialError> {
        credential.validate()?;

        if let Some(existing) = self.store.find_by_id(&credential.id).await? {
            tracing::debug!(
                credential_id = %existing.id(),
                worker_id = %existing.worker_id,
                "credential already issued"
            );
            return Ok(IssueOutcome::AlreadyIssued(existing));
        }

        let record = IssuedCredential::new(credential, self.workers.resolve());
        match self.store.insert_unique(&record).await? {
            InsertOutcome::Inserted => {
                tracing::info!(
                    credential_id = %record.id(),
                    worker_id = %record.worker_id,
                    issued_at = %record.issued_at_string(),
                    "credential issued"
                );
                Ok(IssueOutcome::Issued(record))
            }
            InsertOutcome::DuplicateKey => {
                tracing::info!(
                    credential_id = %record.id(),
                    "credential issued concurrently by another worker"
                );
                Ok(IssueOutcome::RaceLost {
                    id: record.credential.id,
                })
            }
        }
    }
}
