use tracing::debug;

use super::{check_cancelled, CancelCheck, Solver, SolverError, SolverStage};
use crate::{
    hasher::IndexHasher,
    minimal::minimal_from_indices,
    node::{distinct_indices, has_collision, Node},
};

/// The reference Equihash solver.
///
/// Every row carries its full expanded hash and leaf index list, and each
/// round sorts the whole list and merges every pair of rows that collide on
/// the next window.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicSolver;

impl Solver for BasicSolver {
    fn solve<H, C, F>(&self, hasher: &H, cancel: &C, mut on_solution: F) -> Result<bool, SolverError>
    where
        H: IndexHasher,
        C: CancelCheck + ?Sized,
        F: FnMut(Vec<u8>) -> bool,
    {
        let p = hasher.params();
        let collision_len = p.collision_byte_length();

        // 1) Generate first list
        check_cancelled(cancel, SolverStage::ListGeneration)?;
        let mut digests = vec![0; p.leaf_count() as usize * p.digest_len()];
        hasher.leaf_digests(0, &mut digests);
        let mut rows: Vec<Node> = digests
            .chunks_exact(p.digest_len())
            .zip(0..)
            .map(|(digest, i)| Node::from_digest(&p, digest, i))
            .collect();
        drop(digests);

        // 2) Merge rows colliding on the next n/(k+1) bits, until 2n/(k+1)
        //    bits remain
        for r in 1..p.k() {
            check_cancelled(cancel, SolverStage::ListSorting)?;
            rows.sort_by(|a, b| a.hash[..collision_len].cmp(&b.hash[..collision_len]));

            check_cancelled(cancel, SolverStage::ListColliding)?;
            let mut next = Vec::with_capacity(rows.len());
            for group in rows.chunk_by(|a, b| has_collision(a, b, collision_len)) {
                for (l, a) in group.iter().enumerate() {
                    for b in &group[l + 1..] {
                        if distinct_indices(a, b) {
                            next.push(Node::from_children_ref(a, b, collision_len));
                        }
                    }
                }
            }
            rows = next;

            debug!(round = r, rows = rows.len(), "Basic Equihash round complete");
            check_cancelled(cancel, SolverStage::RoundEnd)?;
        }

        // 3) Find collisions on the last 2n/(k+1) bits
        check_cancelled(cancel, SolverStage::FinalSorting)?;
        rows.sort_by(|a, b| a.hash.cmp(&b.hash));

        check_cancelled(cancel, SolverStage::FinalColliding)?;
        let mut found = 0;
        for group in rows.chunk_by(|a, b| a.hash == b.hash) {
            for (l, a) in group.iter().enumerate() {
                for b in &group[l + 1..] {
                    if !distinct_indices(a, b) {
                        continue;
                    }
                    let root = Node::from_children_ref(a, b, 0);
                    let soln = minimal_from_indices(p, &root.indices)
                        .expect("solver only produces in-range indices of the correct length");
                    found += 1;
                    if on_solution(soln) {
                        debug!(solutions = found, "Basic Equihash solver stopped");
                        return Ok(true);
                    }
                }
            }
        }

        debug!(solutions = found, "Basic Equihash solver exhausted");
        Ok(false)
    }
}
