//! Tree roots and root lookup requests.

use serde::{Deserialize, Serialize};

use crate::hash::Hash;

/// The root of one tree state, as reported by the log service or an
/// external anchor.
///
/// The same `(tree_name, size)` pair may exist in two flavors: an
/// unpublished root asserted by the service, and a published root anchored
/// to an external immutable medium. Once a published root for a size has
/// been observed it must never be silently replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Name of the tree this root belongs to.
    pub tree_name: String,

    /// Number of leaves in the tree state.
    pub size: u64,

    /// Merkle root hash at `size`.
    pub root_hash: Hash,

    /// Proof that the tree at `size - 1` is a prefix of this tree state.
    /// Each element is a comma-separated list of (optionally side-tagged)
    /// hex node hashes; the list is flattened in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consistency_proof: Vec<String>,

    /// When the root was anchored, if it has been published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    /// Location of the anchored copy, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Root {
    /// The `(hash, size)` pair consistency checks operate on.
    pub fn head(&self) -> TreeHead {
        TreeHead {
            root_hash: self.root_hash,
            size: self.size,
        }
    }
}

/// A root hash together with the tree size it summarizes.
///
/// Consistency proofs are anchored at specific sizes, so a root hash on its
/// own is not enough to check that a later tree extends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeHead {
    pub root_hash: Hash,
    pub size: u64,
}

/// Request to the root lookup collaborator.
///
/// `tree_size` absent (or zero) asks for the current root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_size: Option<u64>,
}

impl RootRequest {
    /// Ask for the root at `size`; zero means "current".
    pub fn at_size(size: u64) -> Self {
        Self {
            tree_size: (size > 0).then_some(size),
        }
    }
}
