//! Solvers for the Equihash generalized birthday problem.
//!
//! Both solvers find the same set of solutions. [`BasicSolver`] is a direct
//! rendition of the algorithm and is mainly useful as a reference;
//! [`OptimisedSolver`] buckets rows by collision window, tracks provenance with
//! parent pointers, and merges buckets in parallel when the `multicore`
//! feature is enabled.
//!
//! Solutions are handed to a callback in their minimal encoding. The callback
//! returns `true` to stop the search, in which case no further solutions are
//! delivered.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{
    hasher::{Blake2bHasher, IndexHasher},
    params::InvalidParams,
};

mod basic;
mod optimised;

pub use basic::BasicSolver;
pub use optimised::OptimisedSolver;

/// The points at which a solver polls for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStage {
    ListGeneration,
    ListSorting,
    ListColliding,
    RoundEnd,
    FinalSorting,
    FinalColliding,
}

/// A cooperative cancellation check.
///
/// Checks may be polled concurrently from the optimised solver's worker
/// threads.
pub trait CancelCheck: Sync {
    fn is_cancelled(&self, stage: SolverStage) -> bool;
}

impl<F: Fn(SolverStage) -> bool + Sync> CancelCheck for F {
    fn is_cancelled(&self, stage: SolverStage) -> bool {
        self(stage)
    }
}

/// A cancellation flag that can be shared between the thread running a solver
/// and the threads that may want to stop it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl CancelCheck for CancelToken {
    fn is_cancelled(&self, _: SolverStage) -> bool {
        CancelToken::is_cancelled(self)
    }
}

/// Errors that can occur while solving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverError {
    InvalidParams(InvalidParams),
    /// The cancellation check fired at the given stage.
    Cancelled(SolverStage),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::InvalidParams(e) => e.fmt(f),
            SolverError::Cancelled(stage) => write!(f, "Equihash solver cancelled during {:?}", stage),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<InvalidParams> for SolverError {
    fn from(e: InvalidParams) -> Self {
        SolverError::InvalidParams(e)
    }
}

/// A procedure that enumerates the solutions for the leaf digests of a hasher.
pub trait Solver {
    /// Searches for solutions, passing each one in its minimal encoding to
    /// `on_solution`.
    ///
    /// Returns `Ok(true)` if `on_solution` returned `true` and stopped the
    /// search, or `Ok(false)` once the search space is exhausted.
    fn solve<H, C, F>(&self, hasher: &H, cancel: &C, on_solution: F) -> Result<bool, SolverError>
    where
        H: IndexHasher,
        C: CancelCheck + ?Sized,
        F: FnMut(Vec<u8>) -> bool;
}

pub(crate) fn check_cancelled<C: CancelCheck + ?Sized>(
    cancel: &C,
    stage: SolverStage,
) -> Result<(), SolverError> {
    if cancel.is_cancelled(stage) {
        tracing::trace!("Equihash solver cancelled during {:?}", stage);
        Err(SolverError::Cancelled(stage))
    } else {
        Ok(())
    }
}

fn never_cancelled(_: SolverStage) -> bool {
    false
}

fn solve_uncancellable<S: Solver>(
    solver: &S,
    n: u32,
    k: u32,
    input: &[u8],
    nonce: &[u8],
    on_solution: impl FnMut(Vec<u8>) -> bool,
) -> Result<bool, SolverError> {
    let hasher = Blake2bHasher::for_input(n, k, input, nonce)?;
    solver.solve(&hasher, &never_cancelled, on_solution)
}

/// Runs [`BasicSolver`] on `(input, nonce)` with the parameters `(n, k)`.
pub fn basic_solve(
    n: u32,
    k: u32,
    input: &[u8],
    nonce: &[u8],
    on_solution: impl FnMut(Vec<u8>) -> bool,
) -> Result<bool, SolverError> {
    solve_uncancellable(&BasicSolver, n, k, input, nonce, on_solution)
}

/// Runs [`OptimisedSolver`] on `(input, nonce)` with the parameters `(n, k)`.
pub fn optimised_solve(
    n: u32,
    k: u32,
    input: &[u8],
    nonce: &[u8],
    on_solution: impl FnMut(Vec<u8>) -> bool,
) -> Result<bool, SolverError> {
    solve_uncancellable(&OptimisedSolver::default(), n, k, input, nonce, on_solution)
}
