//! Kubecred Core: credential records and the worker identity label shared by
//! the issuance and verification services.

pub mod error;
pub mod types;
pub mod worker;

pub use error::CoreError;
pub use types::{Credential, IssuedCredential};
pub use worker::WorkerIdentity;
