/// Credential store errors. None of these is a uniqueness violation: that
/// outcome is reported as [`InsertOutcome::DuplicateKey`](crate::InsertOutcome).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend failure; the message is the backend's own.
    #[error("{0}")]
    Unavailable(String),

    #[error("store not connected")]
    NotConnected,

    #[error("corrupt record: {0}")]
    Codec(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Unavailable(e.into_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}
