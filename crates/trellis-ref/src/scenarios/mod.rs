//! TRELLIS reference scenarios.
//!
//! Each scenario is a self-contained module that wires an `AuditClient` to
//! an `InMemoryLog` (and, where roots need anchoring, a `StaticAnchor`) and
//! walks through one verification property.

use std::sync::Arc;

use trellis_audit::InMemoryLog;
use trellis_contracts::error::TrellisResult;
use trellis_verify::{AuditClient, Ed25519Signer};

use crate::mock_data::{CLIENT_CONFIG, SIGNER_SEED};

pub mod batch_reconcile;
pub mod session_chaining;
pub mod tamper_detection;

/// A client configured from the embedded TOML with the scenario signer.
pub fn configured_client(log: Arc<InMemoryLog>) -> TrellisResult<AuditClient> {
    let config = trellis_config::load_str(CLIENT_CONFIG)?;
    let signer = Ed25519Signer::from_seed(&SIGNER_SEED)?;
    Ok(AuditClient::new(log)
        .configure(&config)
        .with_signer(Box::new(signer)))
}
