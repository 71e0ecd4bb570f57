//! # trellis-audit
//!
//! Byte-level building blocks of the TRELLIS verifier: canonical event
//! encoding, envelope hashing, and RFC 6962 Merkle proofs.
//!
//! ## Overview
//!
//! An event is reduced to canonical JSON before it is signed, and the
//! server-stamped envelope is reduced to canonical JSON before it is hashed.
//! The envelope hash becomes a Merkle leaf; inclusion and consistency proofs
//! over those leaves tie a record to a tree state and tree states to each
//! other.
//!
//! `InMemoryLog` is a reference log service built from the same pieces.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_audit::{verify_inclusion, verify_leaf_hash, leaf_node};
//!
//! verify_leaf_hash(&record.envelope, &record.hash)?;
//! let ok = verify_inclusion(&leaf_node(&record.hash), index, size, &proof, &root);
//! ```

pub mod canonical;
pub mod hash;
pub mod memory;
pub mod merkle;
pub mod tree;

pub use canonical::{canonical_json, canonicalize_envelope, canonicalize_event};
pub use hash::{envelope_hash, verify_leaf_hash};
pub use memory::InMemoryLog;
pub use merkle::{
    decode_proof, decode_proof_list, encode_proof, leaf_hash, leaf_node, node_hash,
    verify_consistency, verify_inclusion,
};
pub use tree::MerkleTree;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use trellis_contracts::{
        error::TrellisError,
        event::Event,
        hash::Hash,
        record::{LogRequest, ResultsRequest, SearchRequest},
        root::RootRequest,
        verification::Verification,
    };
    use trellis_core::traits::{LogService, RootLookup, SearchService};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn request(event: Event, verbose: bool, prev_root: Option<Hash>) -> LogRequest {
        LogRequest {
            event,
            signature: None,
            public_key: None,
            prev_root,
            verbose,
        }
    }

    fn login(actor: &str) -> Event {
        Event::new(format!("{actor} logged in"))
            .with_actor(actor)
            .with_action("login")
    }

    fn populated(n: usize) -> InMemoryLog {
        let log = InMemoryLog::new("test-tree");
        for i in 0..n {
            log.log(&request(login(&format!("user{i}")), false, None)).unwrap();
        }
        log
    }

    // ── Log ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_non_verbose_log_returns_only_hash() {
        let log = InMemoryLog::new("t");
        let response = log.log(&request(login("alice"), false, None)).unwrap();

        assert!(response.envelope.is_none());
        assert!(response.unpublished_root.is_none());
        assert!(response.membership_proof.is_none());
        assert_eq!(log.len().unwrap(), 1);
    }

    #[test]
    fn test_verbose_log_proves_membership_of_new_leaf() {
        let log = populated(4);
        let response = log.log(&request(login("bob"), true, None)).unwrap();

        let envelope = response.envelope.as_ref().unwrap();
        verify_leaf_hash(envelope, &response.hash).unwrap();

        let proof = decode_proof(response.membership_proof.as_deref().unwrap()).unwrap();
        assert!(
            verify_inclusion(
                &leaf_node(&response.hash),
                response.leaf_index.unwrap(),
                response.tree_size.unwrap(),
                &proof,
                &response.unpublished_root.unwrap(),
            ),
            "fresh entry must be included in the reported root"
        );
        assert_eq!(response.leaf_index, Some(4));
        assert_eq!(response.tree_size, Some(5));
    }

    #[test]
    fn test_log_returns_consistency_proof_from_prev_root() {
        let log = populated(3);
        let first = log.log(&request(login("a"), true, None)).unwrap();
        assert!(first.consistency_proof.is_none());

        let prev = first.unpublished_root.unwrap();
        let second = log.log(&request(login("b"), true, Some(prev))).unwrap();

        let proof = decode_proof_list(second.consistency_proof.as_ref().unwrap()).unwrap();
        assert_eq!(
            verify_consistency(
                &prev,
                first.tree_size.unwrap(),
                &second.unpublished_root.unwrap(),
                second.tree_size.unwrap(),
                &proof,
            ),
            Verification::Pass
        );
    }

    #[test]
    fn test_unknown_prev_root_gets_no_proof() {
        let log = populated(2);
        let response = log
            .log(&request(login("a"), true, Some(Hash([0xaa; 32]))))
            .unwrap();
        assert!(response.consistency_proof.is_none());
    }

    // ── Roots ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_root_lookup_current_and_sized() {
        let log = populated(5);
        let current = log.root(&RootRequest::default()).unwrap();
        assert_eq!(current.size, 5);
        assert!(current.published_at.is_none());

        let earlier = log.root(&RootRequest::at_size(3)).unwrap();
        assert_eq!(earlier.size, 3);
        let proof = decode_proof_list(&earlier.consistency_proof).unwrap();
        let two = log.root_at(2).unwrap();
        assert_eq!(
            verify_consistency(&two.root_hash, 2, &earlier.root_hash, 3, &proof),
            Verification::Pass,
            "root carries a proof from the previous size"
        );

        assert!(matches!(
            log.root(&RootRequest::at_size(9)),
            Err(TrellisError::Collaborator { .. })
        ));
    }

    #[test]
    fn test_publish_covers_every_new_size() {
        let log = populated(3);
        let roots = log.publish().unwrap();
        assert_eq!(roots.iter().map(|r| r.size).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(roots.iter().all(|r| r.published_at.is_some()));
        assert_eq!(roots[2].url.as_deref(), Some("memory://test-tree/3"));

        log.log(&request(login("late"), false, None)).unwrap();
        let roots = log.publish().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].size, 4);
        assert_eq!(log.published_size().unwrap(), 4);
    }

    // ── Search ────────────────────────────────────────────────────────────────

    #[test]
    fn test_search_filters_and_pages() {
        let log = populated(5);
        log.log(&request(login("alice"), false, None)).unwrap();
        log.log(&request(login("alice"), false, None)).unwrap();

        let mut search = SearchRequest::new("actor:alice");
        search.limit = Some(1);
        search.verbose = true;
        let first = log.search(&search).unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.events.len(), 1);
        assert!(first.unpublished_root.is_some());

        let second = log
            .results(&ResultsRequest {
                id: first.id.clone(),
                limit: 10,
                offset: 1,
            })
            .unwrap();
        assert_eq!(second.events.len(), 1);
        assert_ne!(first.events[0].leaf_index, second.events[0].leaf_index);
    }

    #[test]
    fn test_search_marks_published_records() {
        let log = populated(3);
        log.publish().unwrap();
        log.log(&request(login("fresh"), false, None)).unwrap();

        let mut search = SearchRequest::new("");
        search.verbose = true;
        search.order = Some("asc".to_string());
        let response = log.search(&search).unwrap();

        let flags: Vec<bool> = response.events.iter().map(|r| r.published).collect();
        assert_eq!(flags, vec![true, true, true, false]);
        assert_eq!(response.root.as_ref().unwrap().size, 3);
        assert_eq!(response.unpublished_root.as_ref().unwrap().size, 4);
    }

    #[test]
    fn test_results_with_unknown_id_fails() {
        let log = populated(1);
        let err = log
            .results(&ResultsRequest {
                id: "nope".to_string(),
                limit: 1,
                offset: 0,
            })
            .unwrap_err();
        assert!(matches!(err, TrellisError::Collaborator { .. }));
    }

    // ── Tampering hooks ───────────────────────────────────────────────────────

    #[test]
    fn test_corrupted_entry_fails_hash_check() {
        let log = populated(2);
        log.corrupt_entry(0, login("mallory")).unwrap();

        let mut search = SearchRequest::new("actor:mallory");
        search.verbose = true;
        let response = log.search(&search).unwrap();
        let record = &response.events[0];
        assert!(matches!(
            verify_leaf_hash(&record.envelope, &record.hash),
            Err(TrellisError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_rewritten_entry_breaks_consistency_with_published_root() {
        let log = populated(4);
        let published = log.publish().unwrap().pop().unwrap();
        log.rewrite_entry(1, login("mallory")).unwrap();
        log.log(&request(login("later"), false, None)).unwrap();

        let current = log.root_at(5).unwrap();
        let proof = decode_proof_list(&current.consistency_proof).unwrap();
        assert_eq!(
            verify_consistency(&published.root_hash, 4, &current.root_hash, 5, &proof),
            Verification::Fail,
            "a rewritten leaf cannot be proven consistent with the published root"
        );
    }
}
