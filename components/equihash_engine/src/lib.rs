//! Equihash is a Proof-of-Work algorithm, based on a generalization of the Birthday
//! problem which finds colliding hash values. It was designed to be memory-hard; more
//! specifically, the bottle-neck for parallel implementations of Equihash solvers would
//! be memory bandwidth.
//!
//! This crate implements both sides of Equihash as specified for the Zcash consensus
//! rules:
//!
//! - [`is_valid`] and [`is_valid_solution`] verify a minimally-encoded solution for any
//!   valid `(n, k)` parameters whose collision bit length `n / (k + 1)` is between 8
//!   and 24.
//! - [`BasicSolver`] and [`OptimisedSolver`] enumerate every solution for a given input
//!   and nonce, handing each one to a callback.
//!
//! Leaf digests are produced by an [`IndexHasher`]; [`Blake2bHasher`] is the
//! consensus implementation.
//!
//! This crate requires `std`.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
//!
//! References
//! ==========
//! - [Section 7.6.1: Equihash.] Zcash Protocol Specification, version 2020.1.10 or later.
//! - Alex Biryukov and Dmitry Khovratovich.
//!   [*Equihash: Asymmetric Proof-of-Work Based on the Generalized Birthday Problem.*][BK16]
//!   NDSS ’16.
//!
//! [Section 7.6.1: Equihash.]: https://zips.z.cash/protocol/protocol.pdf#equihash
//! [BK16]: https://www.internetsociety.org/sites/default/files/blogs-media/equihash-asymmetric-proof-of-work-based-generalized-birthday-problem.pdf

// Catch documentation errors caused by code changes.
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod hasher;
mod minimal;
mod node;
mod params;
pub mod solver;
mod verify;

#[cfg(test)]
mod test_vectors;

pub use hasher::{Blake2bHasher, IndexHasher};
pub use minimal::{indices_from_minimal, minimal_from_indices, CodecError};
pub use params::{InvalidParams, Params};
pub use solver::{
    basic_solve, optimised_solve, BasicSolver, CancelCheck, CancelToken, OptimisedSolver, Solver,
    SolverError, SolverStage,
};
pub use verify::{is_valid, is_valid_solution, is_valid_solution_with, Error};
