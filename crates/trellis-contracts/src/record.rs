//! Log, search, and result payloads exchanged with the log service.
//!
//! `AuditRecord` is created per search/results response and is mutated only
//! by the verification engine, which attaches the three outcome fields.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    event::{Event, EventEnvelope},
    hash::Hash,
    root::Root,
    verification::{Verification, VerificationOutcome},
};

/// One entry of a search or results response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// The server-stamped envelope.
    pub envelope: EventEnvelope,

    /// SHA-256 of the canonical envelope, as asserted by the service.
    pub hash: Hash,

    /// Inclusion proof for this leaf, as a comma-separated list of hex
    /// node hashes (optionally side-tagged `l:`/`r:`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_proof: Option<String>,

    /// Zero-based position of the leaf in the tree.
    #[serde(
        default,
        deserialize_with = "deserialize_leaf_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub leaf_index: Option<u64>,

    /// Whether the membership proof is relative to the published root.
    #[serde(default)]
    pub published: bool,

    #[serde(default)]
    pub signature_verification: Verification,

    #[serde(default)]
    pub membership_verification: Verification,

    #[serde(default)]
    pub consistency_verification: Verification,
}

impl AuditRecord {
    /// Attach engine outcomes to the record.
    pub fn apply(&mut self, outcome: &VerificationOutcome) {
        self.signature_verification = outcome.signature;
        self.membership_verification = outcome.membership;
        self.consistency_verification = outcome.consistency;
    }
}

/// Leaf indices arrive either as JSON numbers or as decimal strings.
fn deserialize_leaf_index<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IndexRepr {
        Number(u64),
        Text(String),
    }

    match Option::<IndexRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IndexRepr::Number(n)) => Ok(Some(n)),
        Some(IndexRepr::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid leaf_index '{s}': {e}"))),
    }
}

/// Body sent to the log collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRequest {
    pub event: Event,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// The session's previous unpublished root; asks the service for a
    /// consistency proof relative to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_root: Option<Hash>,

    /// Ask for the envelope and proofs in the response.
    #[serde(default)]
    pub verbose: bool,
}

/// Response from the log collaborator.
///
/// Non-verbose responses carry only `hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogResponse {
    pub hash: Hash,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<EventEnvelope>,

    /// The service's current (unpublished) root after appending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpublished_root: Option<Hash>,

    /// Tree size `unpublished_root` summarizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_size: Option<u64>,

    /// Position of the new leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_proof: Option<String>,

    /// Proof from the request's `prev_root` to `unpublished_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_proof: Option<Vec<String>>,
}

/// Body sent to the search collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Keywords with optional `field:value` qualifiers.
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    /// Ask for hashes, proofs, and roots in the response.
    #[serde(default)]
    pub verbose: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Body sent to fetch a further page of a previous search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsRequest {
    pub id: String,
    pub limit: u32,
    pub offset: u32,
}

/// Response from the search and results collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Identifier for paging through results.
    pub id: String,

    /// Total number of matching records.
    pub count: u64,

    pub events: Vec<AuditRecord>,

    /// The published root the service claims, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Root>,

    /// The service's current unpublished root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpublished_root: Option<Root>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl SearchResponse {
    /// The roots this response asserts, detached from its records.
    pub fn roots(&self) -> ResponseRoots {
        ResponseRoots {
            root: self.root.clone(),
            unpublished_root: self.unpublished_root.clone(),
        }
    }
}

/// The pair of roots a search/results response asserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseRoots {
    /// Published root claimed by the service.
    pub root: Option<Root>,
    /// Service-asserted current root.
    pub unpublished_root: Option<Root>,
}
