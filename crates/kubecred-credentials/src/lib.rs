//! Kubecred Credentials: issuance and verification protocols.

pub mod error;
pub mod issuer;
pub mod verifier;

pub use error::CredentialError;
pub use issuer::{CredentialIssuer, IssueOutcome, UNKNOWN_WORKER};
pub use verifier::{CredentialVerifier, VerificationResult};
