//! # trellis-contracts
//!
//! Shared types, outcomes, and error contracts for TRELLIS, the client-side
//! verifier for a Merkle-tree audit log.
//!
//! All crates in the workspace import from here. No verification logic
//! lives in this crate: only data definitions and error types.

pub mod error;
pub mod event;
pub mod hash;
pub mod options;
pub mod record;
pub mod root;
pub mod verification;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use error::TrellisError;
    use event::{Event, EventEnvelope, EventField};
    use hash::Hash;
    use options::LogOptions;
    use record::AuditRecord;
    use root::RootRequest;
    use verification::{Verification, VerificationOutcome};

    const SAMPLE_HASH: &str = "3f0c6a3a0b8e7f2a9b1d2c3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f3a";

    fn envelope() -> EventEnvelope {
        EventEnvelope {
            event: Event::new("hello").with_actor("alice"),
            signature: None,
            public_key: None,
            received_at: "2024-01-01T00:00:00.000000Z".to_string(),
        }
    }

    // ── Hash ─────────────────────────────────────────────────────────────────

    #[test]
    fn hash_parses_and_renders_lowercase_hex() {
        let upper = SAMPLE_HASH.to_uppercase();
        let hash = Hash::from_hex(&upper).unwrap();
        assert_eq!(hash.to_hex(), SAMPLE_HASH);
        assert_eq!(hash.to_string(), SAMPLE_HASH);
    }

    #[test]
    fn hash_rejects_wrong_length_and_non_hex() {
        assert!(matches!(
            Hash::from_hex("abcd"),
            Err(TrellisError::InvalidHash { .. })
        ));
        assert!(matches!(
            Hash::from_hex(&"zz".repeat(32)),
            Err(TrellisError::InvalidHash { .. })
        ));
    }

    #[test]
    fn hash_serializes_as_hex_string() {
        let hash = Hash::from_hex(SAMPLE_HASH).unwrap();
        let json = serde_json::to_value(hash).unwrap();
        assert_eq!(json, json!(SAMPLE_HASH));
        let back: Hash = serde_json::from_value(json).unwrap();
        assert_eq!(back, hash);
    }

    // ── EventField ───────────────────────────────────────────────────────────

    #[test]
    fn event_field_deserializes_strings_as_text_and_objects_as_structured() {
        let event: Event = serde_json::from_value(json!({
            "message": "plain",
            "new": { "b": 2, "a": 1 },
        }))
        .unwrap();

        assert_eq!(event.message, Some(EventField::Text("plain".to_string())));
        assert!(matches!(event.new, Some(EventField::Structured(_))));
        assert!(event.old.is_none());
    }

    #[test]
    fn event_collects_unknown_fields_as_custom() {
        let event: Event = serde_json::from_value(json!({
            "message": "m",
            "field_int": 1,
            "field_bool": true,
        }))
        .unwrap();

        assert_eq!(event.custom.len(), 2);
        assert_eq!(event.custom["field_int"], json!(1));
    }

    #[test]
    fn event_skips_absent_fields_when_serialized() {
        let value = serde_json::to_value(Event::new("m").with_actor("a")).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(!obj.contains_key("target"));
    }

    // ── AuditRecord ──────────────────────────────────────────────────────────

    #[test]
    fn audit_record_accepts_string_leaf_index() {
        let record: AuditRecord = serde_json::from_value(json!({
            "envelope": envelope(),
            "hash": SAMPLE_HASH,
            "leaf_index": "17",
            "published": true,
        }))
        .unwrap();

        assert_eq!(record.leaf_index, Some(17));
        assert!(record.published);
        assert_eq!(record.membership_verification, Verification::NotVerified);
    }

    #[test]
    fn audit_record_accepts_numeric_or_missing_leaf_index() {
        let numeric: AuditRecord = serde_json::from_value(json!({
            "envelope": envelope(),
            "hash": SAMPLE_HASH,
            "leaf_index": 4,
        }))
        .unwrap();
        assert_eq!(numeric.leaf_index, Some(4));
        assert!(!numeric.published);

        let missing: AuditRecord = serde_json::from_value(json!({
            "envelope": envelope(),
            "hash": SAMPLE_HASH,
        }))
        .unwrap();
        assert_eq!(missing.leaf_index, None);
    }

    // ── Verification ─────────────────────────────────────────────────────────

    #[test]
    fn verification_uses_service_vocabulary() {
        assert_eq!(serde_json::to_value(Verification::Pass).unwrap(), json!("pass"));
        assert_eq!(serde_json::to_value(Verification::Fail).unwrap(), json!("fail"));
        assert_eq!(
            serde_json::to_value(Verification::NotVerified).unwrap(),
            json!("none")
        );
        assert_eq!(Verification::NotVerified.to_string(), "none");
    }

    #[test]
    fn fail_dominates_not_verified_which_dominates_pass() {
        assert_eq!(
            Verification::Pass.worst(Verification::NotVerified),
            Verification::NotVerified
        );
        assert_eq!(
            Verification::NotVerified.worst(Verification::Fail),
            Verification::Fail
        );
        assert_eq!(Verification::Fail.worst(Verification::Pass), Verification::Fail);
    }

    #[test]
    fn unanchored_pass_is_capped_but_fail_is_kept() {
        assert_eq!(
            Verification::Pass.cap_unanchored(false),
            Verification::NotVerified
        );
        assert_eq!(Verification::Pass.cap_unanchored(true), Verification::Pass);
        assert_eq!(Verification::Fail.cap_unanchored(false), Verification::Fail);
    }

    #[test]
    fn outcome_summary_reports_failure_distinctly() {
        let outcome = VerificationOutcome {
            hash: Verification::Pass,
            signature: Verification::NotVerified,
            membership: Verification::Fail,
            consistency: Verification::Pass,
        };
        assert_eq!(outcome.summary(), Verification::Fail);
        assert!(outcome.has_failure());

        let weak = VerificationOutcome {
            membership: Verification::Pass,
            ..outcome
        };
        assert_eq!(weak.summary(), Verification::NotVerified);
        assert!(!weak.has_failure());
    }

    // ── Requests & options ───────────────────────────────────────────────────

    #[test]
    fn root_request_zero_means_current() {
        assert_eq!(RootRequest::at_size(0).tree_size, None);
        assert_eq!(RootRequest::at_size(9).tree_size, Some(9));
    }

    #[test]
    fn verify_implies_verbose() {
        let opts = LogOptions {
            verify: true,
            ..LogOptions::default()
        };
        assert!(opts.wants_verbose());
        assert!(!LogOptions::default().wants_verbose());
    }

    // ── TrellisError display messages ────────────────────────────────────────

    #[test]
    fn error_hash_mismatch_display() {
        let err = TrellisError::HashMismatch {
            expected: "aa".to_string(),
            computed: "bb".to_string(),
            envelope: Box::new(envelope()),
        };
        let msg = err.to_string();
        assert!(msg.contains("hash mismatch"));
        assert!(msg.contains("aa"));
        assert!(msg.contains("bb"));
    }

    #[test]
    fn error_encoding_display() {
        let err = TrellisError::EncodingError {
            reason: "custom field 'actor' collides".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("encoding error"));
        assert!(msg.contains("actor"));
    }

    #[test]
    fn error_collaborator_display() {
        let err = TrellisError::collaborator("anchor", "timeout");
        let msg = err.to_string();
        assert!(msg.contains("anchor"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn error_root_conflict_display() {
        let err = TrellisError::RootConflict {
            tree_name: "tree-a".to_string(),
            size: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("tree-a"));
        assert!(msg.contains("12"));
    }
}
