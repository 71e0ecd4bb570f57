//! # trellis-ref
//!
//! Reference collaborators and end-to-end scenarios for the TRELLIS client
//! verifier.
//!
//! Every scenario runs the real client and verification engine against an
//! in-memory log service and a static anchor:
//!
//! 1. **Session Chaining**: each verified log call proves the log only grew
//!    since the previous one, including entries other clients added.
//! 2. **Tamper Detection**: a corrupted envelope aborts the search with a
//!    hash mismatch; rewritten history fails membership under the anchored
//!    root.
//! 3. **Batch Reconciliation**: search results are checked against anchored
//!    roots, and an anchor outage degrades them to "not verified".
//!
//! All data is hardcoded and fictional. No network calls are made.

pub mod anchor;
pub mod mock_data;
pub mod scenarios;
