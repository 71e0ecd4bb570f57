//! Envelope content hashing.
//!
//! The service binds each entry to `SHA-256(canonicalize_envelope(envelope))`
//! and reports that digest as the record `hash`. Recomputing it is the first
//! authenticity check: the envelope in hand must be exactly the bytes that
//! were hashed.
//!
//! Hash input layout: the canonical JSON of the envelope, covering the event,
//! `public_key`, `received_at`, and `signature`.

use sha2::{Digest, Sha256};
use tracing::warn;

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    event::EventEnvelope,
    hash::Hash,
};

use crate::canonical::canonicalize_envelope;

/// Compute the content hash of an envelope.
pub fn envelope_hash(envelope: &EventEnvelope) -> TrellisResult<Hash> {
    let bytes = canonicalize_envelope(envelope)?;
    Ok(Hash(Sha256::digest(&bytes).into()))
}

/// Check that `envelope` hashes to `expected`.
///
/// Returns `HashMismatch` carrying the envelope when it does not. A mismatch
/// is never downgraded to a soft outcome: it means the envelope was corrupted
/// in transit or tampered with.
pub fn verify_leaf_hash(envelope: &EventEnvelope, expected: &Hash) -> TrellisResult<()> {
    let computed = envelope_hash(envelope)?;
    if computed != *expected {
        warn!(
            expected = %expected,
            computed = %computed,
            received_at = %envelope.received_at,
            "envelope hash mismatch"
        );
        return Err(TrellisError::HashMismatch {
            expected: expected.to_hex(),
            computed: computed.to_hex(),
            envelope: Box::new(envelope.clone()),
        });
    }
    Ok(())
}
