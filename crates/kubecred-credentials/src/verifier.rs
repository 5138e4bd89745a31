use std::sync::Arc;

use kubecred_core::{IssuedCredential, WorkerIdentity};
use kubecred_store::CredentialStore;

use crate::error::CredentialError;

/// Result of a verification lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// Whether a record exists for the id.
    pub found: bool,
    /// The stored record, when found.
    pub record: Option<IssuedCredential>,
}

impl VerificationResult {
    fn from_lookup(record: Option<IssuedCredential>) -> Self {
        Self {
            found: record.is_some(),
            record,
        }
    }
}

/// Answers whether a credential id has been issued. Read-only.
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    workers: WorkerIdentity,
}

impl CredentialVerifier {
    /// Create a new verifier over `store`.
    pub fn new(store: Arc<dyn CredentialStore>, workers: WorkerIdentity) -> Self {
        Self { store, workers }
    }

    /// Identity of the verifying worker.
    pub fn workers(&self) -> &WorkerIdentity {
        &self.workers
    }

    /// Look up `id`. Not found is a normal outcome, not an error.
    pub async fn verify(&self, id: &str) -> Result<VerificationResult, CredentialError> {
        if id.is_empty() {
            return Err(CredentialError::InvalidInput("credential id required".into()));
        }

        let result = VerificationResult::from_lookup(self.store.find_by_id(id).await?);
        tracing::debug!(credential_id = id, found = result.found, "credential verified");
        Ok(result)
    }
}
