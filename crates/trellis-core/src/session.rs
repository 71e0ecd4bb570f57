//! Per-client verification session.
//!
//! A `VerificationSession` remembers the most recent unpublished root the
//! client has observed so the next verified log call can ask the service
//! for a consistency proof relative to it.
//!
//! The session is owned by one client. Only one log-and-verify cycle may be
//! in flight at a time: interleaved cycles would corrupt the `prev_root`
//! chain. `begin()` hands out a `SessionCycle` that holds the session lock
//! for the whole cycle.

use std::sync::{Mutex, MutexGuard};

use tracing::info;

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    hash::Hash,
    root::TreeHead,
};

/// Per-client state threading consistency checks across log submissions.
#[derive(Debug, Default)]
pub struct VerificationSession {
    prev_root: Mutex<Option<TreeHead>>,
}

impl VerificationSession {
    /// A session that has never observed a root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session from a root observed earlier.
    pub fn resume(head: TreeHead) -> Self {
        Self {
            prev_root: Mutex::new(Some(head)),
        }
    }

    /// Start a log-and-verify cycle, blocking until no other cycle holds
    /// the session.
    pub fn begin(&self) -> TrellisResult<SessionCycle<'_>> {
        let guard = self.prev_root.lock().map_err(|e| TrellisError::SessionError {
            reason: format!("session lock poisoned: {e}"),
        })?;
        Ok(SessionCycle { guard })
    }

    /// The last recorded root, if any.
    pub fn prev_root(&self) -> TrellisResult<Option<TreeHead>> {
        Ok(*self.begin()?.guard)
    }
}

/// Exclusive access to a session for the duration of one log call.
pub struct SessionCycle<'a> {
    guard: MutexGuard<'a, Option<TreeHead>>,
}

impl SessionCycle<'_> {
    /// The root to send as `prev_root`, if the session has seen one.
    pub fn prev_root(&self) -> Option<TreeHead> {
        *self.guard
    }

    /// The hash portion of the previous root, as sent on the wire.
    pub fn prev_root_hash(&self) -> Option<Hash> {
        self.guard.map(|head| head.root_hash)
    }

    /// Replace the stored root with `head`.
    pub fn advance(&mut self, head: TreeHead) {
        info!(
            root_hash = %head.root_hash,
            tree_size = head.size,
            previous_size = ?self.guard.map(|h| h.size),
            "verification session advanced"
        );
        *self.guard = Some(head);
    }
}
