//! Scenario 2: Tamper Detection
//!
//! A compromised log service changes a config-change entry after the fact.
//! Two variants:
//!
//!   A. The stored event is edited but its hash is left alone. The client
//!      recomputes the envelope hash and the whole search is rejected.
//!   B. The entry is rewritten consistently (new hash, new leaf, new roots).
//!      The service's proofs are self-consistent, but they no longer lead to
//!      the root that was anchored before the rewrite, so membership fails.
//!
//! Finally the anchor refuses to accept the rewritten root.

use std::sync::Arc;

use trellis_audit::InMemoryLog;
use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    record::SearchRequest,
};
use trellis_verify::AuditClient;

use crate::{
    anchor::StaticAnchor,
    mock_data::{forged_config_change, operations_events, TREE_NAME},
    scenarios::configured_client,
};

/// Index of the config change in `operations_events`.
const TARGET_INDEX: u64 = 2;

/// Log every sample event, publish, and anchor the published roots.
fn anchored_log() -> TrellisResult<(Arc<InMemoryLog>, Arc<StaticAnchor>, AuditClient)> {
    let log = Arc::new(InMemoryLog::new(TREE_NAME));
    let anchor = Arc::new(StaticAnchor::new());
    let client = configured_client(log.clone())?.with_anchor(anchor.clone());
    for event in operations_events() {
        client.log(event, &client.log_defaults())?;
    }
    anchor.publish_all(log.publish()?)?;
    Ok((log, anchor, client))
}

pub fn run_scenario() -> TrellisResult<()> {
    println!("=== Scenario 2: Tamper Detection ===");
    println!();

    // ── A: edited in place ───────────────────────────────────────────────────
    println!("  A. Stored event edited without rehashing");
    let (log, _anchor, client) = anchored_log()?;
    log.corrupt_entry(TARGET_INDEX, forged_config_change())?;

    match client.search(SearchRequest::new(""), &client.search_defaults()) {
        Err(TrellisError::HashMismatch {
            expected,
            computed,
            envelope,
        }) => {
            println!("  Detected:  hash mismatch, search rejected");
            println!("  Asserted:  {expected}");
            println!("  Computed:  {computed}");
            println!(
                "  Actor:     {}",
                envelope.event.actor.as_deref().unwrap_or("-")
            );
        }
        Err(e) => return Err(e),
        Ok(_) => println!("  WARNING: corrupted entry was not detected"),
    }
    println!();

    // ── B: history rewritten ─────────────────────────────────────────────────
    println!("  B. Entry rewritten with a fresh hash and leaf");
    let (log, anchor, client) = anchored_log()?;
    log.rewrite_entry(TARGET_INDEX, forged_config_change())?;

    let result = client.search(
        SearchRequest::new("action:config_change"),
        &client.search_defaults(),
    )?;
    for (record, outcome) in result.response.events.iter().zip(&result.outcomes) {
        println!(
            "  Record {}:  {}",
            record.leaf_index.unwrap_or_default(),
            outcome
        );
    }
    println!("  Summary:   {}", result.summary());
    println!();

    // ── Anchor refuses the rewritten root ────────────────────────────────────
    let size = TARGET_INDEX + 1;
    match anchor.publish(log.root_at(size)?) {
        Err(e @ TrellisError::RootConflict { .. }) => println!("  Anchor:    {e}"),
        Err(e) => return Err(e),
        Ok(()) => println!("  WARNING: anchor accepted a rewritten root"),
    }

    println!();
    println!("Scenario 2 complete.");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_contracts::verification::Verification;

    #[test]
    fn test_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_edited_entry_aborts_search() {
        let (log, _anchor, client) = anchored_log().unwrap();
        log.corrupt_entry(TARGET_INDEX, forged_config_change()).unwrap();

        let err = client
            .search(SearchRequest::new(""), &client.search_defaults())
            .unwrap_err();
        assert!(
            matches!(err, TrellisError::HashMismatch { .. }),
            "expected HashMismatch, got {err:?}"
        );
    }

    #[test]
    fn test_rewritten_entry_fails_under_anchored_root() {
        let (log, _anchor, client) = anchored_log().unwrap();
        log.rewrite_entry(TARGET_INDEX, forged_config_change()).unwrap();

        let result = client
            .search(
                SearchRequest::new("action:config_change"),
                &client.search_defaults(),
            )
            .unwrap();
        assert_eq!(result.outcomes.len(), 1);
        let outcome = result.outcomes[0];
        assert_eq!(outcome.hash, Verification::Pass, "rewrite is self-consistent");
        assert_eq!(
            outcome.signature,
            Verification::Fail,
            "original signature does not cover the forged event"
        );
        assert_eq!(outcome.membership, Verification::Fail);
        assert!(result.summary().is_fail());
    }

    #[test]
    fn test_untouched_log_passes() {
        let (_log, _anchor, client) = anchored_log().unwrap();
        let result = client
            .search(SearchRequest::new(""), &client.search_defaults())
            .unwrap();
        assert_eq!(result.outcomes.len(), operations_events().len());
        assert_eq!(result.summary(), Verification::Pass);
    }

    #[test]
    fn test_anchor_rejects_rewritten_root() {
        let (log, anchor, _client) = anchored_log().unwrap();
        log.rewrite_entry(TARGET_INDEX, forged_config_change()).unwrap();

        let err = anchor.publish(log.root_at(TARGET_INDEX + 1).unwrap()).unwrap_err();
        assert!(matches!(err, TrellisError::RootConflict { size: 3, .. }));
    }
}
