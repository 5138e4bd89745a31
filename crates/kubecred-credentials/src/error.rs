use kubecred_core::CoreError;
use kubecred_store::StoreError;

/// Issuance and verification errors.
///
/// A uniqueness violation during issuance is never one of these; it is a
/// successful [`IssueOutcome::RaceLost`](crate::IssueOutcome::RaceLost).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store's message, unchanged.
    #[error("{0}")]
    StoreUnavailable(String),
}

impl From<CoreError> for CredentialError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
        }
    }
}

impl From<StoreError> for CredentialError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}
