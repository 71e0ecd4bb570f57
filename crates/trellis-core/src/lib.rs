//! # trellis-core
//!
//! The trust boundary of the TRELLIS verifier.
//!
//! This crate provides:
//! - The collaborator and signer traits (`LogService`, `RootLookup`,
//!   `SearchService`, `PublishedRootSource`, `EventSigner`, `SignatureBackend`)
//! - `VerificationSession`, the per-client previous-root state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_core::{VerificationSession, traits::{LogService, RootLookup}};
//! ```

pub mod session;
pub mod traits;

pub use session::{SessionCycle, VerificationSession};
