use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// An unissued credential as submitted by a caller.
///
/// `id` is an opaque, caller-chosen unique key. Any top-level fields other
/// than `id`, `holder` and `metadata` are kept in `extra` and carried onto the
/// issued record unchanged. So are a `holder` that is not a string and a
/// `metadata` that is not an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Credential {
    /// Caller-supplied unique key.
    pub id: String,
    /// Holder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    /// Opaque key-value metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Remaining caller fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    /// Create a credential with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            holder: None,
            metadata: None,
            extra: Map::new(),
        }
    }

    /// Set the holder.
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = Some(holder.into());
        self
    }

    /// Set the metadata map.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Parse a credential from an arbitrary JSON body.
    ///
    /// The body must be an object whose `id` is a non-empty string. Nothing
    /// else about its shape is checked.
    pub fn from_json(body: Value) -> Result<Self, CoreError> {
        match body {
            Value::Object(map) => Self::try_from(map),
            _ => Err(CoreError::InvalidInput("missing id".into())),
        }
    }

    /// Check the credential can be issued.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.is_empty() {
            return Err(CoreError::InvalidInput("empty id".into()));
        }
        Ok(())
    }
}

impl TryFrom<Map<String, Value>> for Credential {
    type Error = CoreError;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::String(_)) => return Err(CoreError::InvalidInput("empty id".into())),
            Some(Value::Null) => return Err(CoreError::InvalidInput("null id".into())),
            Some(other) => {
                return Err(CoreError::InvalidInput(format!(
                    "id must be a string, got {}",
                    other
                )))
            }
            None => return Err(CoreError::InvalidInput("missing id".into())),
        };

        let holder = match fields.remove("holder") {
            Some(Value::String(h)) => Some(h),
            None | Some(Value::Null) => None,
            Some(other) => {
                fields.insert("holder".into(), other);
                None
            }
        };
        let metadata = match fields.remove("metadata") {
            Some(Value::Object(m)) => Some(m),
            None | Some(Value::Null) => None,
            Some(other) => {
                fields.insert("metadata".into(), other);
                None
            }
        };

        Ok(Self {
            id,
            holder,
            metadata,
            extra: fields,
        })
    }
}

const SERVER_FIELDS: [&str; 2] = ["issuedAt", "workerId"];

/// A credential recorded as issued. This is the only entity persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCredential {
    #[serde(flatten)]
    pub credential: Credential,
    /// Time of first successful insertion. Millisecond precision, UTC.
    #[serde(rename = "issuedAt", with = "iso8601")]
    pub issued_at: DateTime<Utc>,
    /// Worker that performed the insertion.
    #[serde(rename = "workerId")]
    pub worker_id: String,
}

impl IssuedCredential {
    /// Stamp a credential as issued now by `worker_id`.
    pub fn new(credential: Credential, worker_id: String) -> Self {
        Self::issued_at(credential, worker_id, Utc::now())
    }

    /// Stamp a credential with an explicit issuance time.
    ///
    /// Caller-supplied `issuedAt`/`workerId` fields are dropped in favour of
    /// the server-assigned values.
    pub fn issued_at(mut credential: Credential, worker_id: String, at: DateTime<Utc>) -> Self {
        for key in SERVER_FIELDS {
            credential.extra.remove(key);
        }
        Self {
            credential,
            issued_at: at.trunc_subsecs(3),
            worker_id,
        }
    }

    /// The credential id.
    pub fn id(&self) -> &str {
        &self.credential.id
    }

    /// `issuedAt` as it appears on the wire.
    pub fn issued_at_string(&self) -> String {
        iso8601::format(&self.issued_at)
    }
}

/// ISO-8601 timestamps in the `2024-01-31T12:00:00.123Z` shape.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
