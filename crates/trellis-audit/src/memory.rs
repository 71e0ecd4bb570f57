//! In-memory reference log service.
//!
//! `InMemoryLog` plays the part of the remote log: it stamps envelopes,
//! maintains an RFC 6962 tree over their content hashes, and answers log,
//! root lookup, search, and results calls with the same payloads a real
//! service returns. It is the collaborator the scenarios and tests run the
//! verification engine against.
//!
//! Two hooks simulate a misbehaving service:
//!
//! - `corrupt_entry` changes a stored event without rehashing, as a
//!   transport fault would.
//! - `rewrite_entry` changes a stored event and rebuilds its leaf, as a
//!   service rewriting history would.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    event::{Event, EventEnvelope},
    hash::Hash,
    record::{
        AuditRecord, LogRequest, LogResponse, ResultsRequest, SearchRequest, SearchResponse,
    },
    root::{Root, RootRequest},
    verification::Verification,
};
use trellis_core::traits::{LogService, RootLookup, SearchService};

use crate::{
    canonical::{event_value, field_text},
    hash::envelope_hash,
    merkle::{encode_proof, leaf_node},
    tree::MerkleTree,
};

const SERVICE: &str = "memory-log";
const DEFAULT_PAGE: u32 = 20;

// ── Internal mutable state ────────────────────────────────────────────────────

struct StoredEntry {
    envelope: EventEnvelope,
    hash: Hash,
}

struct StoredSearch {
    indices: Vec<u64>,
    verbose: bool,
}

struct LogState {
    entries: Vec<StoredEntry>,
    tree: MerkleTree,
    /// Size of the largest published tree state, 0 before the first publish.
    published_size: u64,
    /// Publication metadata per size: `(published_at, url)`.
    published: BTreeMap<u64, (String, String)>,
    searches: HashMap<String, StoredSearch>,
    next_search: u64,
}

// ── Public log ────────────────────────────────────────────────────────────────

/// A single-tree log service held entirely in memory.
///
/// Cloning yields another handle to the same log.
#[derive(Clone)]
pub struct InMemoryLog {
    tree_name: String,
    state: Arc<Mutex<LogState>>,
}

impl InMemoryLog {
    pub fn new(tree_name: impl Into<String>) -> Self {
        let state = LogState {
            entries: Vec::new(),
            tree: MerkleTree::new(),
            published_size: 0,
            published: BTreeMap::new(),
            searches: HashMap::new(),
            next_search: 0,
        };
        Self {
            tree_name: tree_name.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> TrellisResult<u64> {
        Ok(self.lock()?.tree.len())
    }

    pub fn is_empty(&self) -> TrellisResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn published_size(&self) -> TrellisResult<u64> {
        Ok(self.lock()?.published_size)
    }

    /// The root the log currently reports for `size`.
    pub fn root_at(&self, size: u64) -> TrellisResult<Root> {
        let state = self.lock()?;
        self.build_root(&state, size)
    }

    /// Publish every tree state appended since the last publish.
    ///
    /// Returns one published root per newly published size, oldest first,
    /// for the caller to hand to an anchor.
    pub fn publish(&self) -> TrellisResult<Vec<Root>> {
        let mut state = self.lock()?;
        let from = state.published_size + 1;
        let to = state.tree.len();
        let published_at = now();

        let mut roots = Vec::new();
        for size in from..=to {
            let url = format!("memory://{}/{}", self.tree_name, size);
            state.published.insert(size, (published_at.clone(), url));
            roots.push(self.build_root(&state, size)?);
        }
        state.published_size = to;

        info!(
            tree_name = %self.tree_name,
            published_size = to,
            newly_published = roots.len(),
            "roots published"
        );
        Ok(roots)
    }

    /// Replace a stored event without updating its hash or leaf.
    pub fn corrupt_entry(&self, index: u64, event: Event) -> TrellisResult<()> {
        let mut state = self.lock()?;
        let entry = entry_mut(&mut state, index)?;
        entry.envelope.event = event;
        warn!(index, "stored event corrupted in place");
        Ok(())
    }

    /// Replace a stored event and rebuild its leaf, rewriting history.
    ///
    /// Every root the log reports afterwards reflects the rewritten leaf,
    /// while roots published earlier do not.
    pub fn rewrite_entry(&self, index: u64, event: Event) -> TrellisResult<()> {
        let mut state = self.lock()?;
        let entry = entry_mut(&mut state, index)?;
        entry.envelope.event = event;
        entry.hash = envelope_hash(&entry.envelope)?;
        let leaf = leaf_node(&entry.hash);
        state.tree.replace(index, leaf);
        warn!(index, "stored entry rewritten");
        Ok(())
    }

    fn lock(&self) -> TrellisResult<MutexGuard<'_, LogState>> {
        self.state
            .lock()
            .map_err(|e| TrellisError::collaborator(SERVICE, format!("state lock poisoned: {e}")))
    }

    fn build_root(&self, state: &LogState, size: u64) -> TrellisResult<Root> {
        if size == 0 || size > state.tree.len() {
            return Err(TrellisError::collaborator(
                SERVICE,
                format!("tree size {size} is not available (current size {})", state.tree.len()),
            ));
        }

        let consistency_proof = if size > 1 {
            state
                .tree
                .consistency_proof(size - 1, size)
                .map(|p| vec![encode_proof(&p)])
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let (published_at, url) = match state.published.get(&size) {
            Some((at, url)) => (Some(at.clone()), Some(url.clone())),
            None => (None, None),
        };

        Ok(Root {
            tree_name: self.tree_name.clone(),
            size,
            root_hash: state.tree.root(size),
            consistency_proof,
            published_at,
            url,
        })
    }

    fn build_record(&self, state: &LogState, index: u64, verbose: bool) -> TrellisResult<AuditRecord> {
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| state.entries.get(i))
            .ok_or_else(|| TrellisError::collaborator(SERVICE, format!("no entry at {index}")))?;

        let published = index < state.published_size;
        let (membership_proof, leaf_index) = if verbose {
            let size = if published {
                state.published_size
            } else {
                state.tree.len()
            };
            let proof = state.tree.inclusion_proof(index, size).map(|p| encode_proof(&p));
            (proof, Some(index))
        } else {
            (None, None)
        };

        Ok(AuditRecord {
            envelope: entry.envelope.clone(),
            hash: entry.hash,
            membership_proof,
            leaf_index,
            published,
            signature_verification: Verification::NotVerified,
            membership_verification: Verification::NotVerified,
            consistency_verification: Verification::NotVerified,
        })
    }

    fn page(&self, state: &LogState, id: &str, offset: u32, limit: u32) -> TrellisResult<SearchResponse> {
        let search = state.searches.get(id).ok_or_else(|| {
            TrellisError::collaborator(SERVICE, format!("unknown search id '{id}'"))
        })?;

        let events = search
            .indices
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|&i| self.build_record(state, i, search.verbose))
            .collect::<TrellisResult<Vec<_>>>()?;

        let (root, unpublished_root) = if search.verbose && !state.tree.is_empty() {
            let root = match state.published_size {
                0 => None,
                size => Some(self.build_root(state, size)?),
            };
            (root, Some(self.build_root(state, state.tree.len())?))
        } else {
            (None, None)
        };

        Ok(SearchResponse {
            id: id.to_string(),
            count: search.indices.len() as u64,
            events,
            root,
            unpublished_root,
            expires_at: None,
        })
    }
}

fn entry_mut(state: &mut LogState, index: u64) -> TrellisResult<&mut StoredEntry> {
    usize::try_from(index)
        .ok()
        .and_then(|i| state.entries.get_mut(i))
        .ok_or_else(|| TrellisError::collaborator(SERVICE, format!("no entry at {index}")))
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whether `event` satisfies every token of `query`.
///
/// `field:value` tokens require an exact field match; bare tokens must
/// appear in some field's text.
fn matches_query(event: &Event, query: &str) -> bool {
    let fields = match event_value(event) {
        Ok(Value::Object(map)) => map,
        _ => return false,
    };
    let text_of = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    query.split_whitespace().all(|token| match token.split_once(':') {
        Some((field, wanted)) => fields
            .get(field)
            .map(|v| text_of(v) == wanted)
            .unwrap_or(false),
        None => fields.values().any(|v| text_of(v).contains(token)),
    })
}

// ── Collaborator impls ────────────────────────────────────────────────────────

impl LogService for InMemoryLog {
    fn log(&self, request: &LogRequest) -> TrellisResult<LogResponse> {
        let mut state = self.lock()?;

        let envelope = EventEnvelope {
            event: request.event.clone(),
            signature: request.signature.clone(),
            public_key: request.public_key.clone(),
            received_at: now(),
        };
        let hash = envelope_hash(&envelope)?;
        let leaf_index = state.tree.push(leaf_node(&hash));
        state.entries.push(StoredEntry {
            envelope: envelope.clone(),
            hash,
        });
        let size = state.tree.len();

        debug!(
            leaf_index,
            tree_size = size,
            hash = %hash,
            message = ?request.event.message.as_ref().and_then(|m| field_text(m).ok()),
            "entry appended"
        );

        if !request.verbose {
            return Ok(LogResponse {
                hash,
                envelope: None,
                unpublished_root: None,
                tree_size: None,
                leaf_index: None,
                membership_proof: None,
                consistency_proof: None,
            });
        }

        // Locate the caller's previous root among the states this log has
        // been in; an unknown root gets no proof.
        let consistency_proof = request.prev_root.and_then(|prev| {
            (1..size)
                .rev()
                .find(|&s| state.tree.root(s) == prev)
                .and_then(|old_size| state.tree.consistency_proof(old_size, size))
                .map(|p| vec![encode_proof(&p)])
        });

        Ok(LogResponse {
            hash,
            envelope: Some(envelope),
            unpublished_root: Some(state.tree.root(size)),
            tree_size: Some(size),
            leaf_index: Some(leaf_index),
            membership_proof: state
                .tree
                .inclusion_proof(leaf_index, size)
                .map(|p| encode_proof(&p)),
            consistency_proof,
        })
    }
}

impl RootLookup for InMemoryLog {
    fn root(&self, request: &RootRequest) -> TrellisResult<Root> {
        let state = self.lock()?;
        let size = request.tree_size.unwrap_or_else(|| state.tree.len());
        self.build_root(&state, size)
    }
}

impl SearchService for InMemoryLog {
    fn search(&self, request: &SearchRequest) -> TrellisResult<SearchResponse> {
        let mut state = self.lock()?;

        let mut indices: Vec<u64> = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches_query(&entry.envelope.event, &request.query))
            .map(|(i, _)| i as u64)
            .collect();
        // Entries are stored in receipt order.
        if request.order.as_deref() != Some("asc") {
            indices.reverse();
        }
        if let Some(max) = request.max_results {
            indices.truncate(max as usize);
        }

        let id = format!("pit_{}", state.next_search);
        state.next_search += 1;
        state.searches.insert(
            id.clone(),
            StoredSearch {
                indices,
                verbose: request.verbose,
            },
        );

        let limit = request.limit.unwrap_or(DEFAULT_PAGE);
        self.page(&state, &id, 0, limit)
    }

    fn results(&self, request: &ResultsRequest) -> TrellisResult<SearchResponse> {
        let state = self.lock()?;
        self.page(&state, &request.id, request.offset, request.limit)
    }
}
