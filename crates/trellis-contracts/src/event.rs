//! Audit events and the server-stamped envelope that wraps them.
//!
//! An `Event` is what a caller submits. The log service stamps it with
//! `received_at` (and echoes any signature material) to form an
//! `EventEnvelope`, whose canonical bytes are what the service hashes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TrellisError, TrellisResult};

/// Names of the fixed event fields, in canonical (lexicographic) order.
///
/// Custom-schema fields may not reuse any of these names.
pub const STANDARD_FIELDS: [&str; 10] = [
    "action",
    "actor",
    "message",
    "new",
    "old",
    "source",
    "status",
    "target",
    "tenant_id",
    "timestamp",
];

/// A `message`, `old`, or `new` value.
///
/// The service may store these as opaque strings, so a structured value is
/// always reduced to its canonical JSON string before hashing or signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventField {
    /// Free-form text, hashed as-is.
    Text(String),
    /// A JSON value, hashed as its canonical JSON string.
    Structured(Value),
}

impl EventField {
    /// Serialize any `Serialize` type into a structured field.
    pub fn structured<T: Serialize>(value: &T) -> TrellisResult<Self> {
        serde_json::to_value(value)
            .map(EventField::Structured)
            .map_err(|e| TrellisError::EncodingError {
                reason: format!("structured field is not representable as JSON: {e}"),
            })
    }
}

impl From<&str> for EventField {
    fn from(s: &str) -> Self {
        EventField::Text(s.to_string())
    }
}

impl From<String> for EventField {
    fn from(s: String) -> Self {
        EventField::Text(s)
    }
}

impl From<Value> for EventField {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => EventField::Text(s),
            other => EventField::Structured(other),
        }
    }
}

/// A structured description of one auditable activity.
///
/// Every field is optional. Absent fields are omitted from the canonical
/// encoding entirely. Fields outside the standard set are carried in
/// `custom` for services configured with a custom schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Who performed the activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// What happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Whether the activity succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Where the activity originated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// The record the activity targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Detailed account of what happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<EventField>,

    /// Value before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<EventField>,

    /// Value after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<EventField>,

    /// Tenant the activity belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Client-side time of the activity (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Custom-schema fields.
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Value>,
}

impl Event {
    /// Start an event with just a message.
    pub fn new(message: impl Into<EventField>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_old(mut self, old: impl Into<EventField>) -> Self {
        self.old = Some(old.into());
        self
    }

    pub fn with_new(mut self, new: impl Into<EventField>) -> Self {
        self.new = Some(new.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Attach a custom-schema field.
    pub fn with_custom(mut self, name: impl Into<String>, value: Value) -> Self {
        self.custom.insert(name.into(), value);
        self
    }
}

/// The server-issued wrapper around a submitted event.
///
/// `received_at` is authoritative server time and is part of the hash
/// domain, so an envelope cannot be replayed under a different timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The event exactly as the service recorded it.
    pub event: Event,

    /// Base64 signature over the canonical event, if the caller signed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Public key material for `signature`: a JSON object with a `key`
    /// member, or a bare key string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Server receipt time (RFC 3339).
    pub received_at: String,
}
