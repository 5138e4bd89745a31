//! Worker identity labels attached to issued records.
//!
//! A configured identity is returned verbatim on every call. Without one, a
//! fresh `worker-<0..999>` label is drawn per call, so two issuances from the
//! same process may carry different labels. The label is diagnostic only.

use rand::Rng;

/// Upper bound (exclusive) of the random label suffix.
pub const RANDOM_LABEL_RANGE: u32 = 1000;

/// Resolves the worker label for an issuance or verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerIdentity {
    fixed: Option<String>,
}

impl WorkerIdentity {
    /// Always resolve to `id`.
    pub fn fixed(id: impl Into<String>) -> Self {
        Self {
            fixed: Some(id.into()),
        }
    }

    /// Draw a random label on each call.
    pub fn ephemeral() -> Self {
        Self { fixed: None }
    }

    /// Build from an optional configured value. Blank values count as unset.
    pub fn from_config(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.trim().is_empty() => Self::fixed(id.trim()),
            _ => Self::ephemeral(),
        }
    }

    /// The configured identity, if any.
    pub fn configured(&self) -> Option<&str> {
        self.fixed.as_deref()
    }

    /// Resolve the label for one operation.
    pub fn resolve(&self) -> String {
        match &self.fixed {
            Some(id) => id.clone(),
            None => format!(
                "worker-{}",
                rand::thread_rng().gen_range(0..RANDOM_LABEL_RANGE)
            ),
        }
    }
}
