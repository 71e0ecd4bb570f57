//! An append-only Merkle tree over leaf nodes.
//!
//! Used by the in-memory log to produce the roots and proofs a real service
//! would return. Roots and proofs can be taken at any earlier size, so the
//! tree doubles as a history of every state it has been in.

use trellis_contracts::hash::Hash;

use crate::merkle::{empty_root, node_hash};

/// Leaf nodes in append order. Each entry is already `leaf_node(content)`.
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    leaves: Vec<Hash>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf node and return its index.
    pub fn push(&mut self, leaf: Hash) -> u64 {
        self.leaves.push(leaf);
        self.leaves.len() as u64 - 1
    }

    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, index: u64) -> Option<Hash> {
        self.leaves.get(usize::try_from(index).ok()?).copied()
    }

    /// Overwrite the leaf at `index`. Returns `false` if out of range.
    pub fn replace(&mut self, index: u64, leaf: Hash) -> bool {
        match usize::try_from(index).ok().and_then(|i| self.leaves.get_mut(i)) {
            Some(slot) => {
                *slot = leaf;
                true
            }
            None => false,
        }
    }

    /// Root of the first `size` leaves. `size` is clamped to the tree length.
    pub fn root(&self, size: u64) -> Hash {
        subtree_root(self.prefix(size))
    }

    /// Audit path for `index` in the tree of the first `size` leaves.
    pub fn inclusion_proof(&self, index: u64, size: u64) -> Option<Vec<Hash>> {
        if index >= size || size > self.len() {
            return None;
        }
        let mut proof = Vec::new();
        audit_path(index as usize, self.prefix(size), &mut proof);
        Some(proof)
    }

    /// Proof that the tree at `old_size` is a prefix of the tree at
    /// `new_size`. Empty when the sizes are equal.
    pub fn consistency_proof(&self, old_size: u64, new_size: u64) -> Option<Vec<Hash>> {
        if old_size == 0 || old_size > new_size || new_size > self.len() {
            return None;
        }
        let mut proof = Vec::new();
        if old_size < new_size {
            subproof(old_size as usize, self.prefix(new_size), true, &mut proof);
        }
        Some(proof)
    }

    fn prefix(&self, size: u64) -> &[Hash] {
        let end = usize::try_from(size).unwrap_or(usize::MAX).min(self.leaves.len());
        &self.leaves[..end]
    }
}

/// Largest power of two strictly less than `n` (for `n >= 2`).
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k << 1 < n {
        k <<= 1;
    }
    k
}

fn subtree_root(leaves: &[Hash]) -> Hash {
    match leaves.len() {
        0 => empty_root(),
        1 => leaves[0],
        n => {
            let k = split_point(n);
            node_hash(&subtree_root(&leaves[..k]), &subtree_root(&leaves[k..]))
        }
    }
}

fn audit_path(index: usize, leaves: &[Hash], out: &mut Vec<Hash>) {
    let n = leaves.len();
    if n <= 1 {
        return;
    }
    let k = split_point(n);
    if index < k {
        audit_path(index, &leaves[..k], out);
        out.push(subtree_root(&leaves[k..]));
    } else {
        audit_path(index - k, &leaves[k..], out);
        out.push(subtree_root(&leaves[..k]));
    }
}

fn subproof(m: usize, leaves: &[Hash], complete: bool, out: &mut Vec<Hash>) {
    let n = leaves.len();
    if m == n {
        if !complete {
            out.push(subtree_root(leaves));
        }
        return;
    }
    let k = split_point(n);
    if m <= k {
        subproof(m, &leaves[..k], complete, out);
        out.push(subtree_root(&leaves[k..]));
    } else {
        subproof(m - k, &leaves[k..], false, out);
        out.push(subtree_root(&leaves[..k]));
    }
}
