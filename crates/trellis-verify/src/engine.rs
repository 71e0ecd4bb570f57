//! The TRELLIS verification engine.
//!
//! `VerificationEngine` turns a record (or a log response) and the roots it
//! claims into a `VerificationOutcome`. Checks run in a fixed order:
//!
//! 1. **Hash**: the envelope must hash to the asserted content hash. A
//!    mismatch is the one hard error: it aborts the whole call.
//! 2. **Signature**: tri-state, never an error.
//! 3. **Membership**: inclusion of the leaf under the applicable root.
//! 4. **Consistency**: the tree state that first contained the leaf must
//!    be a prefix of the next one.
//!
//! Batches are reconciled once and then verified in parallel with `rayon`.

use rayon::prelude::*;
use tracing::{debug, warn};

use trellis_audit::{
    hash::verify_leaf_hash,
    merkle::{decode_proof, decode_proof_list, leaf_node, verify_consistency, verify_inclusion},
};
use trellis_contracts::{
    error::TrellisResult,
    event::EventEnvelope,
    hash::Hash,
    options::{LogOptions, SearchOptions},
    record::{AuditRecord, LogResponse, ResponseRoots},
    root::{Root, TreeHead},
    verification::{Verification, VerificationOutcome},
};

use crate::{
    reconcile::{PublishedRootCache, RootReconciler, RootSource},
    signature::SignatureVerifier,
};

/// Everything `verify_entry` needs beyond the record itself.
#[derive(Debug, Default)]
pub struct BatchContext {
    /// Roots the response asserted.
    pub roots: ResponseRoots,
    /// Roots reconciled for this batch.
    pub cache: PublishedRootCache,
    pub options: SearchOptions,
}

impl BatchContext {
    fn tree_name(&self) -> Option<&str> {
        self.roots
            .root
            .as_ref()
            .or(self.roots.unpublished_root.as_ref())
            .map(|r| r.tree_name.as_str())
    }

    /// The root a record's membership proof is relative to, resolved once.
    ///
    /// Published records prove against the anchored root at the response's
    /// size, never against the service's copy of it.
    fn root_source(&self, record: &AuditRecord) -> Option<RootSource> {
        if record.published {
            let size = self.roots.root.as_ref()?.size;
            self.cache
                .published(self.tree_name()?, size)
                .cloned()
                .map(RootSource::Published)
        } else {
            self.roots.unpublished_root.clone().map(RootSource::Unpublished)
        }
    }
}

/// Verifies records and log responses.
pub struct VerificationEngine {
    signatures: SignatureVerifier,
    reconciler: Option<RootReconciler>,
}

impl VerificationEngine {
    pub fn new(signatures: SignatureVerifier) -> Self {
        Self {
            signatures,
            reconciler: None,
        }
    }

    /// Reconcile batch roots through `reconciler`. Without one, published
    /// records have no anchored roots and verify as `NotVerified`.
    pub fn with_reconciler(mut self, reconciler: RootReconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Replace (or remove) the reconciler.
    pub fn set_reconciler(&mut self, reconciler: Option<RootReconciler>) {
        self.reconciler = reconciler;
    }

    /// Verify one record of a search/results response.
    pub fn verify_entry(
        &self,
        record: &AuditRecord,
        context: &BatchContext,
    ) -> TrellisResult<VerificationOutcome> {
        let (hash, signature) = self.check_envelope(
            &record.envelope,
            &record.hash,
            context.options.skip_event_verification,
        )?;

        if !context.options.verify_consistency {
            return Ok(VerificationOutcome {
                hash,
                signature,
                ..VerificationOutcome::default()
            });
        }

        let source = context.root_source(record);
        let membership = match &source {
            Some(source) => membership(record, source.root()),
            None => Verification::NotVerified,
        };
        let consistency = consistency(record, context);

        debug!(
            leaf_index = ?record.leaf_index,
            published = record.published,
            %membership,
            %consistency,
            "record verified"
        );

        Ok(VerificationOutcome {
            hash,
            signature,
            membership,
            consistency,
        })
    }

    /// Verify every record of one response.
    ///
    /// Roots are reconciled once for the batch, then records are verified in
    /// parallel. Outcomes are returned in record order. Any `HashMismatch`
    /// aborts the batch.
    pub fn verify_batch(
        &self,
        records: &[AuditRecord],
        roots: &ResponseRoots,
        options: &SearchOptions,
    ) -> TrellisResult<Vec<VerificationOutcome>> {
        let cache = match (&self.reconciler, options.verify_consistency) {
            (Some(reconciler), true) => reconciler.reconcile(records, roots),
            _ => PublishedRootCache::new(),
        };
        let context = BatchContext {
            roots: roots.clone(),
            cache,
            options: *options,
        };

        records
            .par_iter()
            .map(|record| self.verify_entry(record, &context))
            .collect()
    }

    /// Verify the response to a log call.
    ///
    /// `prev` is the root the session held when the request was sent.
    pub fn verify_log_response(
        &self,
        response: &LogResponse,
        prev: Option<TreeHead>,
        options: &LogOptions,
    ) -> TrellisResult<VerificationOutcome> {
        let (hash, signature) = match &response.envelope {
            Some(envelope) => {
                self.check_envelope(envelope, &response.hash, options.skip_event_verification)?
            }
            None => (Verification::NotVerified, Verification::NotVerified),
        };

        if !options.verify {
            return Ok(VerificationOutcome {
                hash,
                signature,
                ..VerificationOutcome::default()
            });
        }

        let new_head = match (response.unpublished_root, response.tree_size) {
            (Some(root_hash), Some(size)) => Some(TreeHead { root_hash, size }),
            _ => None,
        };

        let membership = match (
            new_head,
            response.leaf_index,
            response.membership_proof.as_deref(),
        ) {
            (Some(head), Some(index), Some(proof)) => {
                inclusion(&response.hash, index, head.size, proof, &head.root_hash)
            }
            _ => Verification::NotVerified,
        };

        let consistency = match (prev, new_head) {
            (Some(old), Some(new)) => match &response.consistency_proof {
                Some(proof) => chain(&old, &new, proof),
                None if old.size == new.size => chain(&old, &new, &[]),
                // prev_root was sent, so the proof is owed.
                None => {
                    warn!(
                        prev_size = old.size,
                        new_size = new.size,
                        "log response omitted the consistency proof"
                    );
                    Verification::Fail
                }
            },
            _ => Verification::NotVerified,
        };

        debug!(
            leaf_index = ?response.leaf_index,
            tree_size = ?response.tree_size,
            %membership,
            %consistency,
            "log response verified"
        );

        Ok(VerificationOutcome {
            hash,
            signature,
            membership,
            consistency,
        })
    }

    fn check_envelope(
        &self,
        envelope: &EventEnvelope,
        hash: &Hash,
        skip: bool,
    ) -> TrellisResult<(Verification, Verification)> {
        if skip {
            return Ok((Verification::NotVerified, Verification::NotVerified));
        }
        verify_leaf_hash(envelope, hash)?;
        Ok((Verification::Pass, self.signatures.verify_signature(envelope)))
    }
}

fn inclusion(content: &Hash, index: u64, size: u64, proof: &str, root: &Hash) -> Verification {
    match decode_proof(proof) {
        Ok(nodes) => {
            let ok = verify_inclusion(&leaf_node(content), index, size, &nodes, root);
            if !ok {
                warn!(leaf_index = index, tree_size = size, "membership proof does not verify");
            }
            Verification::from_check(ok)
        }
        Err(e) => {
            warn!(leaf_index = index, error = %e, "membership proof is malformed");
            Verification::Fail
        }
    }
}

fn chain(old: &TreeHead, new: &TreeHead, proof: &[String]) -> Verification {
    match decode_proof_list(proof) {
        Ok(nodes) => {
            let outcome =
                verify_consistency(&old.root_hash, old.size, &new.root_hash, new.size, &nodes);
            if outcome.is_fail() {
                warn!(
                    old_size = old.size,
                    new_size = new.size,
                    "consistency proof does not verify"
                );
            }
            outcome
        }
        Err(e) => {
            warn!(old_size = old.size, new_size = new.size, error = %e, "consistency proof is malformed");
            Verification::Fail
        }
    }
}

fn membership(record: &AuditRecord, root: &Root) -> Verification {
    match (record.leaf_index, record.membership_proof.as_deref()) {
        (Some(index), Some(proof)) => inclusion(&record.hash, index, root.size, proof, &root.root_hash),
        _ => Verification::NotVerified,
    }
}

/// Chain the roots at `leaf_index` and `leaf_index + 1`.
///
/// Only published records are chained. A backfilled root at either end
/// caps a passing proof at `NotVerified`.
fn consistency(record: &AuditRecord, context: &BatchContext) -> Verification {
    if !record.published {
        return Verification::NotVerified;
    }
    let (Some(index), Some(tree_name)) = (record.leaf_index, context.tree_name()) else {
        return Verification::NotVerified;
    };
    if index == 0 {
        return Verification::Pass;
    }
    // No tree can hold a leaf at u64::MAX.
    let Some(next) = index.checked_add(1) else {
        warn!(leaf_index = index, "leaf index out of range");
        return Verification::Fail;
    };

    let (Some(old), Some(new)) = (
        context.cache.get(tree_name, index),
        context.cache.get(tree_name, next),
    ) else {
        return Verification::NotVerified;
    };

    let anchored = old.is_published() && new.is_published();
    chain(&old.root().head(), &new.root().head(), &new.root().consistency_proof)
        .cap_unanchored(anchored)
}
