//! # trellis-verify
//!
//! Verification for the TRELLIS audit client.
//!
//! This crate provides:
//!
//! - [`signature::SignatureVerifier`], a registry of signature backends with
//!   Ed25519 built in, plus the local [`signature::Ed25519Signer`].
//! - [`reconcile::RootReconciler`], which gathers anchored roots (and
//!   optionally service roots) for a batch of records.
//! - [`engine::VerificationEngine`], which checks hash, signature,
//!   membership, and consistency for records and log responses.
//! - [`client::AuditClient`], which runs log and search calls through the
//!   engine and keeps the client's verification session.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use trellis_verify::client::AuditClient;
//! use trellis_contracts::{event::Event, options::LogOptions};
//!
//! let client = AuditClient::new(service).with_anchor(anchor);
//! let options = LogOptions { verify: true, ..LogOptions::default() };
//! let result = client.log(Event::new("user logged in"), &options)?;
//! println!("{}", result.outcome);
//! ```

pub mod client;
pub mod engine;
pub mod reconcile;
pub mod signature;

pub use client::{AuditClient, LogResult, SearchResult};
pub use engine::{BatchContext, VerificationEngine};
pub use reconcile::{PublishedRootCache, RootReconciler, RootSource};
pub use signature::{sign_event, Ed25519Backend, Ed25519Signer, SignatureVerifier};

// ── Tests ─────────────────────────────────────────────────────────────────────
