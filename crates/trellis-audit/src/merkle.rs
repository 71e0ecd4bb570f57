//! RFC 6962 Merkle proof verification.
//!
//! Node hashing uses SHA-256 with domain separation:
//!
//!   leaf     = SHA-256(0x00 || data)
//!   interior = SHA-256(0x01 || left || right)
//!
//! The prefixes keep a leaf from ever being reinterpreted as an interior
//! node (and vice versa), which blocks second-preimage forgeries.
//!
//! A record's content hash is the leaf *data*: the tree leaf for a record is
//! `leaf_node(record.hash)`.
//!
//! Both verifiers are pure functions over byte arrays. They do no I/O and
//! hold no state, so callers may run them on any number of threads.

use sha2::{Digest, Sha256};

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    hash::Hash,
    verification::Verification,
};

/// Domain prefix for leaf hashes.
pub const LEAF_PREFIX: u8 = 0x00;

/// Domain prefix for interior node hashes.
pub const NODE_PREFIX: u8 = 0x01;

/// `SHA-256(0x00 || data)`.
pub fn leaf_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    Hash(hasher.finalize().into())
}

/// The tree leaf for a record whose content hash is `content`.
pub fn leaf_node(content: &Hash) -> Hash {
    leaf_hash(content.as_bytes())
}

/// `SHA-256(0x01 || left || right)`.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash(hasher.finalize().into())
}

/// Root of the empty tree: `SHA-256("")`.
pub fn empty_root() -> Hash {
    Hash(Sha256::digest(b"").into())
}

/// Verify that `leaf` sits at `leaf_index` in the tree of `tree_size`
/// leaves whose root is `expected_root`.
///
/// Walks the audit path bottom-up. At each level the low bit of the node
/// index decides which side the sibling is on; when the node is the last one
/// of an odd-sized level it has no sibling, and the walk climbs until it
/// becomes a right child. Any out-of-range index, a proof that is too short
/// or too long, or a root mismatch yields `false`.
pub fn verify_inclusion(
    leaf: &Hash,
    leaf_index: u64,
    tree_size: u64,
    proof: &[Hash],
    expected_root: &Hash,
) -> bool {
    match root_from_inclusion_proof(leaf, leaf_index, tree_size, proof) {
        Some(root) => root == *expected_root,
        None => false,
    }
}

/// Recompute the root implied by an inclusion proof, or `None` when the
/// proof shape does not fit `(leaf_index, tree_size)`.
pub fn root_from_inclusion_proof(
    leaf: &Hash,
    leaf_index: u64,
    tree_size: u64,
    proof: &[Hash],
) -> Option<Hash> {
    if leaf_index >= tree_size {
        return None;
    }

    let mut fnode = leaf_index;
    let mut snode = tree_size - 1;
    let mut running = *leaf;

    for sibling in proof {
        if snode == 0 {
            // Proof is longer than the path to the root.
            return None;
        }
        if fnode & 1 == 1 || fnode == snode {
            running = node_hash(sibling, &running);
            if fnode & 1 == 0 {
                // Rightmost node of an odd level: no sibling on these levels.
                while fnode & 1 == 0 && fnode != 0 {
                    fnode >>= 1;
                    snode >>= 1;
                }
            }
        } else {
            running = node_hash(&running, sibling);
        }
        fnode >>= 1;
        snode >>= 1;
    }

    // A proof that is too short leaves levels unclimbed.
    (snode == 0).then_some(running)
}

/// Verify that the tree of `old_size` leaves with root `old_root` is a
/// prefix of the tree of `new_size` leaves with root `new_root`.
///
/// Both roots are rebuilt from the same proof by walking the subtree
/// boundaries `old_size` implies inside `new_size`'s shape; the check passes
/// only if both reconstructions match.
///
/// - `old_size == 0` is `NotVerified`: there is no earlier state to compare.
/// - `old_size == new_size` requires an empty proof and equal roots.
/// - `old_size > new_size` is `Fail`: a tree cannot shrink.
pub fn verify_consistency(
    old_root: &Hash,
    old_size: u64,
    new_root: &Hash,
    new_size: u64,
    proof: &[Hash],
) -> Verification {
    if old_size == 0 {
        return Verification::NotVerified;
    }
    if old_size == new_size {
        return Verification::from_check(proof.is_empty() && old_root == new_root);
    }
    if old_size > new_size || proof.is_empty() {
        return Verification::Fail;
    }

    // When the old tree is a complete subtree its root is the first node of
    // the path and the service omits it.
    let mut nodes: Vec<Hash> = Vec::with_capacity(proof.len() + 1);
    if old_size.is_power_of_two() {
        nodes.push(*old_root);
    }
    nodes.extend_from_slice(proof);

    let mut fnode = old_size - 1;
    let mut snode = new_size - 1;
    while fnode & 1 == 1 {
        fnode >>= 1;
        snode >>= 1;
    }

    let mut old_acc = nodes[0];
    let mut new_acc = nodes[0];

    for node in &nodes[1..] {
        if snode == 0 {
            return Verification::Fail;
        }
        if fnode & 1 == 1 || fnode == snode {
            old_acc = node_hash(node, &old_acc);
            new_acc = node_hash(node, &new_acc);
            if fnode & 1 == 0 {
                while fnode & 1 == 0 && fnode != 0 {
                    fnode >>= 1;
                    snode >>= 1;
                }
            }
        } else {
            new_acc = node_hash(&new_acc, node);
        }
        fnode >>= 1;
        snode >>= 1;
    }

    Verification::from_check(snode == 0 && old_acc == *old_root && new_acc == *new_root)
}

// ── Wire format ───────────────────────────────────────────────────────────────

/// Decode a proof string: comma-separated hex node hashes, each optionally
/// tagged `l:`, `r:`, or `x:`.
///
/// Tags are accepted for compatibility and ignored; node positions follow
/// from the leaf index and tree size. An empty string is an empty proof.
pub fn decode_proof(s: &str) -> TrellisResult<Vec<Hash>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }

    s.split(',')
        .map(|item| {
            let item = item.trim();
            let hex_part = match item.split_once(':') {
                Some(("l" | "r" | "x", rest)) => rest,
                Some((tag, _)) => {
                    return Err(TrellisError::MalformedProof {
                        reason: format!("unknown proof node tag '{tag}'"),
                    })
                }
                None => item,
            };
            Hash::from_hex(hex_part).map_err(|e| TrellisError::MalformedProof {
                reason: format!("bad proof node '{item}': {e}"),
            })
        })
        .collect()
}

/// Decode a list of proof strings, flattening them in order.
pub fn decode_proof_list(items: &[String]) -> TrellisResult<Vec<Hash>> {
    let mut nodes = Vec::new();
    for item in items {
        nodes.extend(decode_proof(item)?);
    }
    Ok(nodes)
}

/// Encode nodes as a comma-separated hex proof string.
pub fn encode_proof(nodes: &[Hash]) -> String {
    nodes
        .iter()
        .map(Hash::to_hex)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MerkleTree;

    fn tree_of(n: u8) -> MerkleTree {
        let mut tree = MerkleTree::new();
        for i in 0..n {
            tree.push(leaf_hash(&[i]));
        }
        tree
    }

    fn flip(hash: &Hash, byte: usize) -> Hash {
        let mut out = *hash;
        out.0[byte] ^= 0x01;
        out
    }

    // ── Hashing ───────────────────────────────────────────────────────────────

    #[test]
    fn leaf_and_node_hashes_are_domain_separated() {
        let left = Hash([0u8; 32]);
        let right = Hash([0u8; 32]);
        let mut concatenated = Vec::new();
        concatenated.push(NODE_PREFIX);
        concatenated.extend_from_slice(left.as_bytes());
        concatenated.extend_from_slice(right.as_bytes());

        // Same 65 bytes hashed as a leaf must not collide with the node.
        assert_ne!(leaf_hash(&concatenated[1..]), node_hash(&left, &right));
        assert_ne!(leaf_hash(&[]), empty_root());
    }

    // ── Inclusion ─────────────────────────────────────────────────────────────

    #[test]
    fn every_leaf_of_size_8_tree_verifies() {
        let tree = tree_of(8);
        let root = tree.root(8);
        for index in 0..8 {
            let proof = tree.inclusion_proof(index, 8).unwrap();
            assert_eq!(proof.len(), 3);
            assert!(
                verify_inclusion(&tree.leaf(index).unwrap(), index, 8, &proof, &root),
                "leaf {index} should verify"
            );
        }
    }

    #[test]
    fn flipping_any_byte_breaks_inclusion() {
        let tree = tree_of(8);
        let root = tree.root(8);
        for index in 0..8 {
            let leaf = tree.leaf(index).unwrap();
            let proof = tree.inclusion_proof(index, 8).unwrap();

            for byte in [0usize, 15, 31] {
                assert!(!verify_inclusion(&flip(&leaf, byte), index, 8, &proof, &root));
                assert!(!verify_inclusion(&leaf, index, 8, &proof, &flip(&root, byte)));
                for p in 0..proof.len() {
                    let mut bad = proof.clone();
                    bad[p] = flip(&bad[p], byte);
                    assert!(
                        !verify_inclusion(&leaf, index, 8, &bad, &root),
                        "leaf {index}: flipped proof node {p} byte {byte} must fail"
                    );
                }
            }
        }
    }

    #[test]
    fn odd_sized_trees_verify_every_leaf() {
        for size in 1..=13u8 {
            let tree = tree_of(size);
            let root = tree.root(size as u64);
            for index in 0..size as u64 {
                let proof = tree.inclusion_proof(index, size as u64).unwrap();
                assert!(
                    verify_inclusion(&tree.leaf(index).unwrap(), index, size as u64, &proof, &root),
                    "size {size} leaf {index}"
                );
            }
        }
    }

    #[test]
    fn proofs_at_earlier_sizes_verify_against_earlier_roots() {
        let tree = tree_of(11);
        for size in 1..=11u64 {
            let root = tree.root(size);
            for index in 0..size {
                let proof = tree.inclusion_proof(index, size).unwrap();
                assert!(verify_inclusion(&tree.leaf(index).unwrap(), index, size, &proof, &root));
            }
        }
    }

    #[test]
    fn index_out_of_range_is_false() {
        let tree = tree_of(8);
        let root = tree.root(8);
        let proof = tree.inclusion_proof(7, 8).unwrap();
        assert!(!verify_inclusion(&tree.leaf(7).unwrap(), 8, 8, &proof, &root));
        assert!(!verify_inclusion(&tree.leaf(7).unwrap(), 9, 8, &proof, &root));
        assert!(!verify_inclusion(&tree.leaf(0).unwrap(), 0, 0, &[], &root));
    }

    #[test]
    fn wrong_proof_length_is_false() {
        let tree = tree_of(8);
        let root = tree.root(8);
        let leaf = tree.leaf(2).unwrap();
        let proof = tree.inclusion_proof(2, 8).unwrap();

        assert!(!verify_inclusion(&leaf, 2, 8, &proof[..2], &root));

        let mut long = proof.clone();
        long.push(root);
        assert!(!verify_inclusion(&leaf, 2, 8, &long, &root));
    }

    #[test]
    fn single_leaf_tree_root_is_the_leaf() {
        let tree = tree_of(1);
        let leaf = tree.leaf(0).unwrap();
        assert_eq!(tree.root(1), leaf);
        assert!(verify_inclusion(&leaf, 0, 1, &[], &leaf));
    }

    // ── Consistency ───────────────────────────────────────────────────────────

    #[test]
    fn appended_tree_is_consistent() {
        let tree = tree_of(8);
        let proof = tree.consistency_proof(4, 8).unwrap();
        assert_eq!(
            verify_consistency(&tree.root(4), 4, &tree.root(8), 8, &proof),
            Verification::Pass
        );
    }

    #[test]
    fn rewritten_history_is_inconsistent() {
        let original = tree_of(8);
        let root4 = original.root(4);

        // Alter leaf 1 and rebuild the size-8 tree from scratch.
        let mut rewritten = MerkleTree::new();
        for i in 0..8u8 {
            let data = if i == 1 { [0xffu8] } else { [i] };
            rewritten.push(leaf_hash(&data));
        }
        let proof = rewritten.consistency_proof(4, 8).unwrap();

        assert_eq!(
            verify_consistency(&root4, 4, &rewritten.root(8), 8, &proof),
            Verification::Fail
        );
    }

    #[test]
    fn all_size_pairs_are_consistent() {
        let tree = tree_of(17);
        for new_size in 1..=17u64 {
            for old_size in 1..=new_size {
                let proof = tree.consistency_proof(old_size, new_size).unwrap();
                assert_eq!(
                    verify_consistency(
                        &tree.root(old_size),
                        old_size,
                        &tree.root(new_size),
                        new_size,
                        &proof
                    ),
                    Verification::Pass,
                    "{old_size} -> {new_size}"
                );
            }
        }
    }

    #[test]
    fn tampered_consistency_proof_fails() {
        let tree = tree_of(7);
        let proof = tree.consistency_proof(3, 7).unwrap();
        for p in 0..proof.len() {
            let mut bad = proof.clone();
            bad[p] = flip(&bad[p], 4);
            assert_eq!(
                verify_consistency(&tree.root(3), 3, &tree.root(7), 7, &bad),
                Verification::Fail
            );
        }
        assert_eq!(
            verify_consistency(&tree.root(3), 3, &tree.root(7), 7, &[]),
            Verification::Fail
        );
    }

    #[test]
    fn reflexive_consistency_passes_only_with_empty_proof() {
        let tree = tree_of(5);
        let root = tree.root(5);
        assert_eq!(verify_consistency(&root, 5, &root, 5, &[]), Verification::Pass);
        assert_eq!(
            verify_consistency(&root, 5, &root, 5, &[root]),
            Verification::Fail
        );
        assert_eq!(
            verify_consistency(&root, 5, &tree.root(4), 5, &[]),
            Verification::Fail
        );
    }

    #[test]
    fn unknown_old_size_is_not_verified() {
        let tree = tree_of(4);
        assert_eq!(
            verify_consistency(&empty_root(), 0, &tree.root(4), 4, &[]),
            Verification::NotVerified
        );
    }

    #[test]
    fn shrinking_tree_fails() {
        let tree = tree_of(6);
        let proof = tree.consistency_proof(3, 6).unwrap();
        assert_eq!(
            verify_consistency(&tree.root(6), 6, &tree.root(3), 3, &proof),
            Verification::Fail
        );
    }

    // ── Wire format ───────────────────────────────────────────────────────────

    #[test]
    fn decode_accepts_tagged_and_bare_nodes() {
        let a = leaf_hash(b"a");
        let b = leaf_hash(b"b");
        let wire = format!("l:{},r:{}, {}", a, b, a);
        assert_eq!(decode_proof(&wire).unwrap(), vec![a, b, a]);
        assert_eq!(decode_proof("").unwrap(), Vec::<Hash>::new());
        assert_eq!(decode_proof(&encode_proof(&[a, b])).unwrap(), vec![a, b]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_proof("q:00"),
            Err(TrellisError::MalformedProof { .. })
        ));
        assert!(matches!(
            decode_proof("l:nothex"),
            Err(TrellisError::MalformedProof { .. })
        ));
    }

    #[test]
    fn decode_list_flattens_in_order() {
        let a = leaf_hash(b"a");
        let b = leaf_hash(b"b");
        let c = leaf_hash(b"c");
        let list = vec![format!("x:{a},l:{b}"), c.to_hex()];
        assert_eq!(decode_proof_list(&list).unwrap(), vec![a, b, c]);
    }
}
