//! Scenario 1: Session Chaining
//!
//! An operations client logs a day of activity with `verify` on. Each log
//! call sends the root the client last observed, and the service must prove
//! the new tree extends it.
//!
//! Walk-through:
//!   1. First call: nothing observed yet, consistency is "not verified"
//!   2. Later calls: consistency passes against the previous root
//!   3. A second client logs entries in between
//!   4. The first client's next call still chains across those entries

use std::sync::Arc;

use trellis_audit::InMemoryLog;
use trellis_contracts::{error::TrellisResult, event::Event, verification::Verification};
use trellis_verify::{AuditClient, LogResult};

use crate::{mock_data::{operations_events, TREE_NAME}, scenarios::configured_client};

fn log_and_print(client: &AuditClient, label: &str, event: Event) -> TrellisResult<LogResult> {
    let action = event.action.clone().unwrap_or_default();
    let result = client.log(event, &client.log_defaults())?;
    println!(
        "  [{label}] {action:<14} leaf={:<2} size={:<2} {}",
        result.response.leaf_index.unwrap_or_default(),
        result.response.tree_size.unwrap_or_default(),
        result.outcome
    );
    Ok(result)
}

pub fn run_scenario() -> TrellisResult<()> {
    println!("=== Scenario 1: Session Chaining ===");
    println!();

    let log = Arc::new(InMemoryLog::new(TREE_NAME));
    let ops = configured_client(log.clone())?;
    let other = configured_client(log.clone())?;

    let mut events = operations_events().into_iter();

    println!("  ops client logs its first entries:");
    for event in events.by_ref().take(4) {
        log_and_print(&ops, "ops", event)?;
    }

    println!();
    println!("  another client logs in between:");
    for event in events.by_ref().take(2) {
        log_and_print(&other, "other", event)?;
    }

    println!();
    println!("  ops client resumes:");
    let mut chained = Verification::Pass;
    for event in events {
        let result = log_and_print(&ops, "ops", event)?;
        chained = chained.worst(result.outcome.consistency);
    }

    println!();
    if let Some(head) = ops.session().prev_root()? {
        println!("  Session root: {} (size {})", head.root_hash, head.size);
    }
    println!("  Chained across other writers: {chained}");
    println!();
    println!("Scenario 1 complete.");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
