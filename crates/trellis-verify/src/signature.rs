//! Event signature verification and local signing.
//!
//! `SignatureVerifier` checks the optional signature an envelope carries
//! over the canonical bytes of its event. Algorithms are pluggable: each
//! `SignatureBackend` is registered under an algorithm name, and the name
//! embedded in the envelope's `public_key` selects it. Ed25519 is
//! registered by default.
//!
//! Verification never returns an error. Every way a signature can be
//! wrong (missing half of the pair, unparseable key, unknown algorithm, bad
//! bytes) is reported as `Verification::Fail`.

use std::collections::{BTreeMap, HashMap};

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{
    pkcs8::DecodePublicKey, Signature, Signer, SigningKey, VerifyingKey,
};
use serde_json::Value;
use tracing::{debug, warn};

use trellis_audit::canonical::{canonical_json, canonicalize_event};
use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    event::{Event, EventEnvelope},
    verification::Verification,
};
use trellis_core::traits::{EventSigner, SignatureBackend};

/// Algorithm name assumed when the public key does not name one.
pub const DEFAULT_ALGORITHM: &str = "ED25519";

// ── Verifier ──────────────────────────────────────────────────────────────────

/// Registry of signature backends keyed by upper-case algorithm name.
pub struct SignatureVerifier {
    backends: HashMap<String, Box<dyn SignatureBackend>>,
}

impl SignatureVerifier {
    /// A verifier with the Ed25519 backend registered.
    pub fn new() -> Self {
        let mut verifier = Self::empty();
        verifier.register_backend(DEFAULT_ALGORITHM, Box::new(Ed25519Backend));
        verifier
    }

    /// A verifier with no backends; every signed envelope fails.
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Register `backend` for `algorithm`. Names are case-insensitive;
    /// registering a name twice replaces the earlier backend.
    pub fn register_backend(&mut self, algorithm: &str, backend: Box<dyn SignatureBackend>) {
        self.backends.insert(algorithm.to_ascii_uppercase(), backend);
    }

    /// Check the signature on `envelope`.
    ///
    /// Unsigned envelopes (no signature and no public key) are
    /// `NotVerified`. An envelope carrying only one of the two is `Fail`.
    pub fn verify_signature(&self, envelope: &EventEnvelope) -> Verification {
        let (signature, public_key) = match (&envelope.signature, &envelope.public_key) {
            (None, None) => return Verification::NotVerified,
            (Some(s), Some(k)) => (s, k),
            _ => {
                warn!(
                    received_at = %envelope.received_at,
                    "envelope carries only one of signature and public key"
                );
                return Verification::Fail;
            }
        };

        match self.check(envelope, signature, public_key) {
            Ok(true) => Verification::Pass,
            Ok(false) => {
                warn!(received_at = %envelope.received_at, "event signature does not match");
                Verification::Fail
            }
            Err(e) => {
                warn!(received_at = %envelope.received_at, error = %e, "event signature unverifiable");
                Verification::Fail
            }
        }
    }

    fn check(&self, envelope: &EventEnvelope, signature: &str, public_key: &str) -> TrellisResult<bool> {
        let (algorithm, key) = parse_public_key(public_key)?;
        let backend = self.backends.get(&algorithm).ok_or_else(|| TrellisError::SignatureError {
            reason: format!("no backend registered for algorithm '{algorithm}'"),
        })?;
        let signature = STANDARD
            .decode(signature.trim())
            .map_err(|e| TrellisError::SignatureError {
                reason: format!("signature is not base64: {e}"),
            })?;
        let data = canonicalize_event(&envelope.event)?;

        debug!(algorithm = %algorithm, bytes = data.len(), "verifying event signature");
        backend.verify(&key, &data, &signature)
    }
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Split an envelope's `public_key` into `(ALGORITHM, key)`.
///
/// Accepts a JSON object with a `key` member (and optional `algorithm`), or
/// a bare key string.
fn parse_public_key(public_key: &str) -> TrellisResult<(String, String)> {
    match serde_json::from_str::<Value>(public_key) {
        Ok(Value::Object(map)) => {
            let key = map.get("key").and_then(Value::as_str).ok_or_else(|| {
                TrellisError::SignatureError {
                    reason: "public key object has no string 'key' member".to_string(),
                }
            })?;
            let algorithm = map
                .get("algorithm")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_ALGORITHM)
                .to_ascii_uppercase();
            Ok((algorithm, key.to_string()))
        }
        Ok(Value::String(key)) => Ok((DEFAULT_ALGORITHM.to_string(), key)),
        _ => Ok((DEFAULT_ALGORITHM.to_string(), public_key.to_string())),
    }
}

// ── Ed25519 ───────────────────────────────────────────────────────────────────

/// Ed25519 verification. Keys are PEM SPKI or base64 of the raw 32 bytes;
/// signatures are the raw 64 bytes.
pub struct Ed25519Backend;

impl Ed25519Backend {
    fn verifying_key(public_key: &str) -> TrellisResult<VerifyingKey> {
        let key = public_key.trim();
        if key.starts_with("-----") {
            return VerifyingKey::from_public_key_pem(key).map_err(|e| TrellisError::SignatureError {
                reason: format!("invalid Ed25519 PEM public key: {e}"),
            });
        }

        let bytes = STANDARD.decode(key).map_err(|e| TrellisError::SignatureError {
            reason: format!("public key is not base64: {e}"),
        })?;
        let raw: [u8; 32] = bytes.as_slice().try_into().map_err(|_| TrellisError::SignatureError {
            reason: format!("Ed25519 public key must be 32 bytes, got {}", bytes.len()),
        })?;
        VerifyingKey::from_bytes(&raw).map_err(|e| TrellisError::SignatureError {
            reason: format!("invalid Ed25519 public key: {e}"),
        })
    }
}

impl SignatureBackend for Ed25519Backend {
    fn verify(&self, public_key: &str, data: &[u8], signature: &[u8]) -> TrellisResult<bool> {
        let key = Self::verifying_key(public_key)?;
        let signature = Signature::from_slice(signature).map_err(|e| TrellisError::SignatureError {
            reason: format!("Ed25519 signature must be 64 bytes: {e}"),
        })?;
        // Strict: rejects small-order keys and non-canonical signatures.
        Ok(key.verify_strict(data, &signature).is_ok())
    }
}

/// Local Ed25519 signer.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> TrellisResult<Self> {
        let seed: [u8; 32] = seed.try_into().map_err(|_| TrellisError::SignatureError {
            reason: format!("Ed25519 seed must be 32 bytes, got {}", seed.len()),
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl EventSigner for Ed25519Signer {
    fn algorithm(&self) -> &str {
        DEFAULT_ALGORITHM
    }

    fn public_key(&self) -> TrellisResult<String> {
        Ok(STANDARD.encode(self.signing_key.verifying_key().to_bytes()))
    }

    fn sign(&self, data: &[u8]) -> TrellisResult<Vec<u8>> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }
}

// ── Signing ───────────────────────────────────────────────────────────────────

/// Signature material to attach to a log request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEvent {
    /// Base64 signature over the canonical event.
    pub signature: String,
    /// Canonical JSON `{"algorithm", "key", ...key_info}`.
    pub public_key: String,
}

/// Sign `event` with `signer`.
///
/// `key_info` entries are merged into the public key object; they cannot
/// replace `algorithm` or `key`.
pub fn sign_event(
    signer: &dyn EventSigner,
    event: &Event,
    key_info: &BTreeMap<String, Value>,
) -> TrellisResult<SignedEvent> {
    let data = canonicalize_event(event)?;
    let signature = STANDARD.encode(signer.sign(&data)?);

    let mut key_object = serde_json::Map::new();
    for (name, value) in key_info {
        key_object.insert(name.clone(), value.clone());
    }
    key_object.insert("algorithm".to_string(), Value::String(signer.algorithm().to_string()));
    key_object.insert("key".to_string(), Value::String(signer.public_key()?));

    Ok(SignedEvent {
        signature,
        public_key: canonical_json(&Value::Object(key_object))?,
    })
}
