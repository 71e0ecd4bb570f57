//! Per-call options for log and search operations.

use serde::{Deserialize, Serialize};

/// Options for a single log submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    /// Return the envelope, hash, and membership proof.
    #[serde(default)]
    pub verbose: bool,

    /// Verify membership and consistency of the new entry. Implies
    /// `verbose` and sends the session's previous root.
    #[serde(default)]
    pub verify: bool,

    /// Skip hash and signature checks on the returned envelope.
    #[serde(default)]
    pub skip_event_verification: bool,

    /// Sign the event locally with the client's signer before submitting.
    #[serde(default)]
    pub sign_local: bool,
}

impl LogOptions {
    /// Whether the request must ask for a verbose response.
    pub fn wants_verbose(&self) -> bool {
        self.verbose || self.verify
    }
}

/// Options for search and results calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Reconcile roots and verify membership and consistency of every
    /// returned record. Implies a verbose search.
    #[serde(default)]
    pub verify_consistency: bool,

    /// Skip hash and signature checks on returned envelopes.
    #[serde(default)]
    pub skip_event_verification: bool,
}
