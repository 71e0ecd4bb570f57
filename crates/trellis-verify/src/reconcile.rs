//! Root reconciliation between the log service and the anchor.
//!
//! The service asserts roots; the anchor publishes them somewhere the
//! service cannot rewrite. For each search/results batch the reconciler
//! works out which tree sizes the batch needs, asks the anchor for those
//! sizes, and optionally backfills the rest from the service's root lookup.
//! The result is a `PublishedRootCache` scoped to that one batch.
//!
//! Every cached root is tagged with where it came from. Backfilled roots are
//! usable for chaining but never count as published.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    record::{AuditRecord, ResponseRoots},
    root::{Root, RootRequest},
};
use trellis_core::traits::{PublishedRootSource, RootLookup};

/// A root together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSource {
    /// Anchored outside the service; authoritative.
    Published(Root),
    /// Asserted by the service only.
    Unpublished(Root),
}

impl RootSource {
    pub fn root(&self) -> &Root {
        match self {
            RootSource::Published(root) | RootSource::Unpublished(root) => root,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, RootSource::Published(_))
    }
}

/// Roots for one batch, keyed by tree name and size.
#[derive(Debug, Default)]
pub struct PublishedRootCache {
    trees: HashMap<String, BTreeMap<u64, RootSource>>,
}

impl PublishedRootCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root.
    ///
    /// A published root replaces an unpublished one for the same size, and
    /// an unpublished root never replaces a published one. Offering a
    /// published root whose hash differs from the one already observed is
    /// a `RootConflict`; the cached root is left in place.
    pub fn insert(&mut self, source: RootSource) -> TrellisResult<()> {
        let size = source.root().size;
        let sizes = self
            .trees
            .entry(source.root().tree_name.clone())
            .or_default();

        match sizes.get(&size) {
            Some(RootSource::Published(existing)) => match &source {
                RootSource::Published(offered) if offered.root_hash != existing.root_hash => {
                    Err(TrellisError::RootConflict {
                        tree_name: existing.tree_name.clone(),
                        size: existing.size,
                    })
                }
                _ => Ok(()),
            },
            Some(RootSource::Unpublished(_)) if !source.is_published() => Ok(()),
            _ => {
                sizes.insert(size, source);
                Ok(())
            }
        }
    }

    pub fn get(&self, tree_name: &str, size: u64) -> Option<&RootSource> {
        self.trees.get(tree_name)?.get(&size)
    }

    /// The published root for `size`, ignoring backfilled ones.
    pub fn published(&self, tree_name: &str, size: u64) -> Option<&Root> {
        match self.get(tree_name, size)? {
            RootSource::Published(root) => Some(root),
            RootSource::Unpublished(_) => None,
        }
    }

    pub fn contains(&self, tree_name: &str, size: u64) -> bool {
        self.get(tree_name, size).is_some()
    }

    pub fn len(&self) -> usize {
        self.trees.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Gathers the roots a batch of records needs.
pub struct RootReconciler {
    anchor: Arc<dyn PublishedRootSource>,
    fallback: Option<Arc<dyn RootLookup>>,
}

impl RootReconciler {
    /// Reconcile against `anchor` only.
    pub fn new(anchor: Arc<dyn PublishedRootSource>) -> Self {
        Self {
            anchor,
            fallback: None,
        }
    }

    /// Backfill sizes the anchor cannot supply from `lookup`.
    pub fn with_fallback(mut self, lookup: Arc<dyn RootLookup>) -> Self {
        self.fallback = Some(lookup);
        self
    }

    /// Tree sizes a batch needs: the published root's size, plus
    /// `leaf_index + 1` and (when positive) `leaf_index` for every record.
    pub fn required_sizes(records: &[AuditRecord], roots: &ResponseRoots) -> BTreeSet<u64> {
        let mut sizes = BTreeSet::new();
        if let Some(root) = &roots.root {
            sizes.insert(root.size);
        }
        for index in records.iter().filter_map(|r| r.leaf_index) {
            let Some(next) = index.checked_add(1) else {
                warn!(leaf_index = index, "leaf index has no successor tree size; skipping");
                continue;
            };
            sizes.insert(next);
            if index > 0 {
                sizes.insert(index);
            }
        }
        sizes.remove(&0);
        sizes
    }

    /// Build the root cache for one batch.
    ///
    /// Anchor and lookup failures are logged and leave the affected sizes
    /// absent; the records depending on them then verify as `NotVerified`.
    pub fn reconcile(&self, records: &[AuditRecord], roots: &ResponseRoots) -> PublishedRootCache {
        let mut cache = PublishedRootCache::new();

        let Some(tree_name) = roots
            .root
            .as_ref()
            .or(roots.unpublished_root.as_ref())
            .map(|r| r.tree_name.clone())
        else {
            debug!("response asserts no root; nothing to reconcile");
            return cache;
        };

        let sizes: Vec<u64> = Self::required_sizes(records, roots).into_iter().collect();

        match self.anchor.published_roots(&tree_name, &sizes) {
            Ok(published) => {
                for (size, root) in published {
                    if root.size != size || root.tree_name != tree_name {
                        warn!(
                            tree_name = %tree_name,
                            requested_size = size,
                            returned_size = root.size,
                            "anchor returned a root for the wrong tree state; ignoring it"
                        );
                        continue;
                    }
                    remember(&mut cache, RootSource::Published(root));
                }
            }
            Err(e) => {
                warn!(tree_name = %tree_name, error = %e, "anchor unavailable; published roots missing");
            }
        }

        if let Some(unpublished) = &roots.unpublished_root {
            remember(&mut cache, RootSource::Unpublished(unpublished.clone()));
        }

        if let Some(lookup) = &self.fallback {
            let missing: Vec<u64> = sizes
                .iter()
                .copied()
                .filter(|&size| !cache.contains(&tree_name, size))
                .collect();

            let fetched: Vec<(u64, TrellisResult<Root>)> = missing
                .par_iter()
                .map(|&size| (size, lookup.root(&RootRequest::at_size(size))))
                .collect();

            for (size, result) in fetched {
                match result {
                    Ok(root) if root.size == size => {
                        remember(&mut cache, RootSource::Unpublished(root));
                    }
                    Ok(root) => warn!(
                        requested_size = size,
                        returned_size = root.size,
                        "root lookup returned the wrong size; ignoring it"
                    ),
                    Err(e) => warn!(size, error = %e, "root lookup failed"),
                }
            }
        }

        debug!(
            tree_name = %tree_name,
            requested = sizes.len(),
            cached = cache.len(),
            "roots reconciled"
        );
        cache
    }
}

/// Insert into `cache`, keeping the first root on conflict.
fn remember(cache: &mut PublishedRootCache, source: RootSource) {
    if let Err(e) = cache.insert(source) {
        warn!(error = %e, "keeping the first published root observed");
    }
}
