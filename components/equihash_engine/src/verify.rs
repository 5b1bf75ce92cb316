//! Verification functions for the [Equihash] proof-of-work algorithm.
//!
//! [Equihash]: https://zips.z.cash/protocol/protocol.pdf#equihash

use std::fmt;

use tracing::debug;

use crate::{
    hasher::{Blake2bHasher, IndexHasher},
    minimal::{indices_from_minimal, CodecError},
    node::{distinct_indices, has_collision, Node},
    params::{InvalidParams, Params},
};

/// An Equihash solution failed to verify.
#[derive(Debug)]
pub struct Error(pub(crate) Kind);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid solution: {}", self.0)
    }
}

impl std::error::Error for Error {}

impl From<InvalidParams> for Error {
    fn from(_: InvalidParams) -> Self {
        Error(Kind::InvalidParams)
    }
}

impl From<CodecError> for Error {
    fn from(_: CodecError) -> Self {
        Error(Kind::InvalidParams)
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum Kind {
    InvalidParams,
    Collision,
    OutOfOrder,
    DuplicateIdxs,
    NonZeroRootHash,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::InvalidParams => f.write_str("invalid parameters"),
            Kind::Collision => f.write_str("invalid collision length between StepRows"),
            Kind::OutOfOrder => f.write_str("Index tree incorrectly ordered"),
            Kind::DuplicateIdxs => f.write_str("duplicate indices"),
            Kind::NonZeroRootHash => f.write_str("root hash of tree is non-zero"),
        }
    }
}

fn validate_subtrees(p: &Params, a: &Node, b: &Node) -> Result<(), Kind> {
    if !has_collision(a, b, p.collision_byte_length()) {
        Err(Kind::Collision)
    } else if b.indices_before(a) {
        Err(Kind::OutOfOrder)
    } else if !distinct_indices(a, b) {
        Err(Kind::DuplicateIdxs)
    } else {
        Ok(())
    }
}

/// Rejects a solution that repeats a leaf, before any digest is computed.
fn check_distinct(indices: &[u32]) -> Result<(), Error> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        Err(Error(Kind::DuplicateIdxs))
    } else {
        Ok(())
    }
}

#[cfg(test)]
fn is_valid_solution_iterative<H: IndexHasher>(hasher: &H, indices: &[u32]) -> Result<(), Error> {
    let p = hasher.params();

    let mut rows = Vec::new();
    for i in indices {
        rows.push(Node::new(&p, hasher, *i));
    }

    let mut hash_len = p.hash_length();
    while rows.len() > 1 {
        let mut cur_rows = Vec::new();
        for pair in rows.chunks(2) {
            let a = &pair[0];
            let b = &pair[1];
            validate_subtrees(&p, a, b).map_err(Error)?;
            cur_rows.push(Node::from_children_ref(a, b, p.collision_byte_length()));
        }
        rows = cur_rows;
        hash_len -= p.collision_byte_length();
    }

    assert!(rows.len() == 1);

    if rows[0].is_zero(hash_len) {
        Ok(())
    } else {
        Err(Error(Kind::NonZeroRootHash))
    }
}

fn tree_validator<H: IndexHasher>(p: &Params, hasher: &H, indices: &[u32]) -> Result<Node, Error> {
    if indices.len() > 1 {
        let end = indices.len();
        let mid = end / 2;
        let a = tree_validator(p, hasher, &indices[0..mid])?;
        let b = tree_validator(p, hasher, &indices[mid..end])?;
        validate_subtrees(p, &a, &b).map_err(Error)?;
        Ok(Node::from_children(a, b, p.collision_byte_length()))
    } else {
        Ok(Node::new(p, hasher, indices[0]))
    }
}

fn is_valid_solution_recursive<H: IndexHasher>(hasher: &H, indices: &[u32]) -> Result<(), Error> {
    let p = hasher.params();
    let root = tree_validator(&p, hasher, indices)?;

    // Hashes were trimmed, so only need to check remaining length
    if root.is_zero(p.collision_byte_length()) {
        Ok(())
    } else {
        Err(Error(Kind::NonZeroRootHash))
    }
}

/// Checks whether the minimally-encoded `soln` is a valid solution for the
/// leaf digests produced by `hasher`.
pub fn is_valid_solution_with<H: IndexHasher>(hasher: &H, soln: &[u8]) -> Result<(), Error> {
    let indices = indices_from_minimal(hasher.params(), soln)?;
    check_distinct(&indices)?;

    // Recursive validation is faster
    is_valid_solution_recursive(hasher, &indices)
}

/// Checks whether `soln` is a valid solution for `(input, nonce)` with the
/// parameters `(n, k)`.
pub fn is_valid_solution(
    n: u32,
    k: u32,
    input: &[u8],
    nonce: &[u8],
    soln: &[u8],
) -> Result<(), Error> {
    let hasher = Blake2bHasher::for_input(n, k, input, nonce)?;
    is_valid_solution_with(&hasher, soln)
}

/// Returns `true` if `soln` is a valid solution for `(input, nonce)` with the
/// parameters `(n, k)`.
///
/// Every failure, including invalid parameters and malformed encodings, maps
/// to `false`.
pub fn is_valid(n: u32, k: u32, input: &[u8], nonce: &[u8], soln: &[u8]) -> bool {
    match is_valid_solution(n, k, input, nonce, soln) {
        Ok(()) => true,
        Err(e) => {
            debug!("Equihash solution validation failed: {}", e);
            false
        }
    }
}
