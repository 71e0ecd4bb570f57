//! Error types for the TRELLIS verification pipeline.
//!
//! All fallible operations return `TrellisResult<T>`. Only conditions that
//! must abort a trust decision are errors; proof and signature outcomes are
//! reported as [`Verification`](crate::verification::Verification) values.

use thiserror::Error;

use crate::event::EventEnvelope;

/// The unified error type for TRELLIS.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// An event could not be reduced to canonical bytes.
    ///
    /// Fatal for the enclosing operation: nothing that cannot be
    /// canonicalized may be hashed or signed.
    #[error("event encoding error: {reason}")]
    EncodingError { reason: String },

    /// The recomputed envelope hash differs from the one the service asserted.
    ///
    /// Signals transport corruption or tampering. Carries the offending
    /// envelope for operator diagnostics.
    #[error("envelope hash mismatch: service asserted {expected}, recomputed {computed}")]
    HashMismatch {
        expected: String,
        computed: String,
        envelope: Box<EventEnvelope>,
    },

    /// A proof string could not be decoded into node hashes.
    #[error("malformed proof: {reason}")]
    MalformedProof { reason: String },

    /// A value that should be a 32-byte hex digest is not one.
    #[error("invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// An external collaborator (log, root lookup, search, anchor) failed.
    #[error("{service} collaborator failed: {reason}")]
    Collaborator { service: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Local signing failed or a signer is misconfigured.
    #[error("signature error: {reason}")]
    SignatureError { reason: String },

    /// The verification session is unusable (e.g. its lock was poisoned).
    #[error("session error: {reason}")]
    SessionError { reason: String },

    /// A different root was offered for a tree size whose published root
    /// has already been observed.
    #[error("conflicting published root for tree '{tree_name}' at size {size}")]
    RootConflict { tree_name: String, size: u64 },
}

impl TrellisError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(service: impl Into<String>, reason: impl ToString) -> Self {
        Self::Collaborator {
            service: service.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the TRELLIS crates.
pub type TrellisResult<T> = Result<T, TrellisError>;
