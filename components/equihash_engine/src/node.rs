use crate::{hasher::IndexHasher, minimal::expand_array, params::Params};

/// A subtree of an Equihash solution: the XOR of its leaf digests (with the
/// collision windows already resolved trimmed off) and its leaf indices in
/// canonical order.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) hash: Vec<u8>,
    pub(crate) indices: Vec<u32>,
}

impl Node {
    pub(crate) fn new<H: IndexHasher>(p: &Params, hasher: &H, i: u32) -> Self {
        let mut digest = vec![0; p.digest_len()];
        hasher.leaf_digest(i, &mut digest);
        Node::from_digest(p, &digest, i)
    }

    pub(crate) fn from_digest(p: &Params, digest: &[u8], i: u32) -> Self {
        Node {
            hash: expand_array(digest, p.collision_bit_length(), 0),
            indices: vec![i],
        }
    }

    pub(crate) fn from_children(a: Node, b: Node, trim: usize) -> Self {
        let hash = xor_trimmed(&a.hash, &b.hash, trim);
        let indices = if a.indices_before(&b) {
            let mut indices = a.indices;
            indices.extend(b.indices.iter());
            indices
        } else {
            let mut indices = b.indices;
            indices.extend(a.indices.iter());
            indices
        };
        Node { hash, indices }
    }

    pub(crate) fn from_children_ref(a: &Node, b: &Node, trim: usize) -> Self {
        let hash = xor_trimmed(&a.hash, &b.hash, trim);
        let mut indices = Vec::with_capacity(a.indices.len() + b.indices.len());
        if a.indices_before(b) {
            indices.extend(a.indices.iter());
            indices.extend(b.indices.iter());
        } else {
            indices.extend(b.indices.iter());
            indices.extend(a.indices.iter());
        }
        Node { hash, indices }
    }

    /// Canonical ordering only compares the first index of each subtree, which
    /// is also the smallest.
    pub(crate) fn indices_before(&self, other: &Node) -> bool {
        self.indices[0] < other.indices[0]
    }

    pub(crate) fn is_zero(&self, len: usize) -> bool {
        self.hash.iter().take(len).all(|v| *v == 0)
    }
}

pub(crate) fn xor_trimmed(a: &[u8], b: &[u8], trim: usize) -> Vec<u8> {
    a.iter()
        .zip(b.iter())
        .skip(trim)
        .map(|(a, b)| a ^ b)
        .collect()
}

pub(crate) fn has_collision(a: &Node, b: &Node, len: usize) -> bool {
    a.hash
        .iter()
        .zip(b.hash.iter())
        .take(len)
        .all(|(a, b)| a == b)
}

pub(crate) fn distinct_indices(a: &Node, b: &Node) -> bool {
    for i in &(a.indices) {
        for j in &(b.indices) {
            if i == j {
                return false;
            }
        }
    }
    true
}
