//! Trait definitions for the TRELLIS trust boundary.
//!
//! The engine trusts nothing it receives from these collaborators:
//!
//! - `LogService`         : untrusted: appends events, returns proofs
//! - `RootLookup`         : untrusted: reports service-asserted roots
//! - `SearchService`      : untrusted: returns records plus asserted roots
//! - `PublishedRootSource`: independent: roots anchored outside the service
//! - `EventSigner`        : trusted, local: signs canonical event bytes
//! - `SignatureBackend`   : trusted, local: checks one signature algorithm
//!
//! Transport concerns (retries, timeouts, polling) live entirely inside
//! implementations of these traits.

use std::collections::BTreeMap;

use trellis_contracts::{
    error::TrellisResult,
    record::{LogRequest, LogResponse, ResultsRequest, SearchRequest, SearchResponse},
    root::{Root, RootRequest},
};

/// The log submission endpoint.
pub trait LogService: Send + Sync {
    /// Append one event and return the service's view of the new entry.
    ///
    /// When `request.prev_root` is set and `request.verbose` is true, the
    /// service is expected to include a consistency proof from that root.
    fn log(&self, request: &LogRequest) -> TrellisResult<LogResponse>;
}

/// The service-side root lookup endpoint.
pub trait RootLookup: Send + Sync {
    /// Return the unpublished root at `request.tree_size`, or the current
    /// root when no size is given.
    fn root(&self, request: &RootRequest) -> TrellisResult<Root>;
}

/// The search and paged-results endpoints.
pub trait SearchService: Send + Sync {
    fn search(&self, request: &SearchRequest) -> TrellisResult<SearchResponse>;

    fn results(&self, request: &ResultsRequest) -> TrellisResult<SearchResponse>;
}

/// Roots anchored to an external immutable medium.
///
/// Implementations return whatever subset of `sizes` they can supply.
/// A size that has not been published is simply absent from the map.
pub trait PublishedRootSource: Send + Sync {
    fn published_roots(&self, tree_name: &str, sizes: &[u64]) -> TrellisResult<BTreeMap<u64, Root>>;
}

/// A local signer for canonical event bytes.
pub trait EventSigner: Send + Sync {
    /// Algorithm name recorded next to the public key (e.g. `"ED25519"`).
    fn algorithm(&self) -> &str;

    /// Public key in a form `SignatureBackend::verify` accepts.
    fn public_key(&self) -> TrellisResult<String>;

    /// Sign `data`, returning raw signature bytes.
    fn sign(&self, data: &[u8]) -> TrellisResult<Vec<u8>>;
}

/// Verification for one signature algorithm.
pub trait SignatureBackend: Send + Sync {
    /// Check `signature` over `data` with `public_key`.
    ///
    /// `Ok(false)` means the signature does not match; `Err` means the key
    /// or signature could not be parsed. Callers treat both as failure.
    fn verify(&self, public_key: &str, data: &[u8], signature: &[u8]) -> TrellisResult<bool>;
}
