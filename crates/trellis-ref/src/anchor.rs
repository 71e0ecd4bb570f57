//! In-memory published-root store.
//!
//! `StaticAnchor` stands in for an external immutable medium. Roots are
//! added once and never replaced: publishing a different root for a size
//! that already has one is rejected with `RootConflict`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    root::Root,
};
use trellis_core::traits::PublishedRootSource;

struct AnchorState {
    trees: HashMap<String, BTreeMap<u64, Root>>,
    online: bool,
}

pub struct StaticAnchor {
    state: Mutex<AnchorState>,
}

impl StaticAnchor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AnchorState {
                trees: HashMap::new(),
                online: true,
            }),
        }
    }

    /// Record a published root.
    ///
    /// Re-publishing an identical root is a no-op.
    pub fn publish(&self, root: Root) -> TrellisResult<()> {
        let mut state = self.lock()?;
        let sizes = state.trees.entry(root.tree_name.clone()).or_default();
        if let Some(existing) = sizes.get(&root.size) {
            if existing.root_hash != root.root_hash {
                warn!(
                    tree_name = %root.tree_name,
                    size = root.size,
                    "refusing to overwrite an anchored root"
                );
                return Err(TrellisError::RootConflict {
                    tree_name: root.tree_name,
                    size: root.size,
                });
            }
            return Ok(());
        }
        debug!(tree_name = %root.tree_name, size = root.size, "root anchored");
        sizes.insert(root.size, root);
        Ok(())
    }

    pub fn publish_all(&self, roots: impl IntoIterator<Item = Root>) -> TrellisResult<()> {
        roots.into_iter().try_for_each(|root| self.publish(root))
    }

    /// Simulate the anchor becoming reachable or unreachable.
    pub fn set_online(&self, online: bool) -> TrellisResult<()> {
        self.lock()?.online = online;
        Ok(())
    }

    pub fn len(&self, tree_name: &str) -> TrellisResult<usize> {
        Ok(self.lock()?.trees.get(tree_name).map_or(0, BTreeMap::len))
    }

    fn lock(&self) -> TrellisResult<MutexGuard<'_, AnchorState>> {
        self.state
            .lock()
            .map_err(|e| TrellisError::collaborator("anchor", format!("state lock poisoned: {e}")))
    }
}

impl Default for StaticAnchor {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishedRootSource for StaticAnchor {
    fn published_roots(&self, tree_name: &str, sizes: &[u64]) -> TrellisResult<BTreeMap<u64, Root>> {
        let state = self.lock()?;
        if !state.online {
            return Err(TrellisError::collaborator("anchor", "anchor is offline"));
        }
        let Some(tree) = state.trees.get(tree_name) else {
            return Ok(BTreeMap::new());
        };
        Ok(sizes
            .iter()
            .filter_map(|size| tree.get(size).map(|root| (*size, root.clone())))
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_contracts::hash::Hash;

    fn root(tree: &str, size: u64, byte: u8) -> Root {
        Root {
            tree_name: tree.to_string(),
            size,
            root_hash: Hash::from_bytes([byte; 32]),
            consistency_proof: Vec::new(),
            published_at: Some("2026-03-01T12:00:00.000000Z".to_string()),
            url: None,
        }
    }

    #[test]
    fn test_returns_only_requested_sizes() {
        let anchor = StaticAnchor::new();
        anchor
            .publish_all(vec![root("ops", 1, 1), root("ops", 2, 2), root("ops", 3, 3)])
            .unwrap();

        let found = anchor.published_roots("ops", &[2, 3, 9]).unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(found[&2].root_hash, Hash::from_bytes([2; 32]));
    }

    #[test]
    fn test_unknown_tree_is_empty_not_an_error() {
        let anchor = StaticAnchor::new();
        anchor.publish(root("ops", 1, 1)).unwrap();
        assert!(anchor.published_roots("billing", &[1]).unwrap().is_empty());
    }

    #[test]
    fn test_republishing_identical_root_is_accepted() {
        let anchor = StaticAnchor::new();
        anchor.publish(root("ops", 4, 7)).unwrap();
        anchor.publish(root("ops", 4, 7)).unwrap();
        assert_eq!(anchor.len("ops").unwrap(), 1);
    }

    #[test]
    fn test_conflicting_root_is_rejected_and_original_kept() {
        let anchor = StaticAnchor::new();
        anchor.publish(root("ops", 4, 7)).unwrap();

        let err = anchor.publish(root("ops", 4, 8)).unwrap_err();
        assert!(
            matches!(err, TrellisError::RootConflict { size: 4, .. }),
            "expected RootConflict, got {err:?}"
        );
        let kept = anchor.published_roots("ops", &[4]).unwrap();
        assert_eq!(kept[&4].root_hash, Hash::from_bytes([7; 32]));
    }

    #[test]
    fn test_publish_all_stops_at_first_conflict() {
        let anchor = StaticAnchor::new();
        anchor.publish(root("ops", 2, 2)).unwrap();

        let result = anchor.publish_all(vec![root("ops", 1, 1), root("ops", 2, 9), root("ops", 3, 3)]);
        assert!(result.is_err());
        assert_eq!(anchor.len("ops").unwrap(), 2, "size 3 must not be anchored");
    }

    #[test]
    fn test_offline_anchor_reports_collaborator_error() {
        let anchor = StaticAnchor::new();
        anchor.publish(root("ops", 1, 1)).unwrap();
        anchor.set_online(false).unwrap();

        let err = anchor.published_roots("ops", &[1]).unwrap_err();
        assert!(matches!(err, TrellisError::Collaborator { .. }));

        anchor.set_online(true).unwrap();
        assert_eq!(anchor.published_roots("ops", &[1]).unwrap().len(), 1);
    }
}
