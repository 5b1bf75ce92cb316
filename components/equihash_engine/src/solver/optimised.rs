use std::cmp::Ordering;
use std::ops::Range;
use std::sync::atomic::{self, AtomicBool};

use maybe_rayon::prelude::*;
use tracing::debug;

use super::{check_cancelled, CancelCheck, Solver, SolverError, SolverStage};
use crate::{
    hasher::IndexHasher,
    minimal::{expand_array, minimal_from_indices},
};

/// The number of leaves hashed by each parallel task.
const LEAF_CHUNK: usize = 4096;

/// Parent pointers for the rows produced by one round: row `i` is the merge of
/// rows `links[i][0]` and `links[i][1]` of the previous round's table.
type Links = Vec<[u32; 2]>;

/// The rows of one round, stored contiguously. Windows that have already been
/// resolved are trimmed off, so every row is `width` bytes. Each row also
/// carries its leaf indices in ascending order, `leaf_width` per row.
struct Table {
    width: usize,
    hashes: Vec<u8>,
    leaf_width: usize,
    leaves: Vec<u32>,
}

impl Table {
    fn len(&self) -> usize {
        self.hashes.len() / self.width
    }

    fn row(&self, i: u32) -> &[u8] {
        let start = i as usize * self.width;
        &self.hashes[start..start + self.width]
    }

    fn leaves(&self, i: u32) -> &[u32] {
        let start = i as usize * self.leaf_width;
        &self.leaves[start..start + self.leaf_width]
    }
}

/// Rows grouped by the value of their leading `key_len` bytes. Only groups
/// with at least two members are kept, since a lone row cannot collide.
struct Buckets {
    rows: Vec<u32>,
    ranges: Vec<Range<usize>>,
}

impl Buckets {
    fn new(table: &Table, key_len: usize) -> Self {
        let mut keyed: Vec<(u64, u32)> = (0..table.len() as u32)
            .map(|i| (window_key(&table.row(i)[..key_len]), i))
            .collect();
        keyed.sort_unstable();

        let mut ranges = vec![];
        let mut start = 0;
        for end in 1..=keyed.len() {
            if end == keyed.len() || keyed[end].0 != keyed[start].0 {
                if end - start > 1 {
                    ranges.push(start..end);
                }
                start = end;
            }
        }

        Buckets {
            rows: keyed.into_iter().map(|(_, i)| i).collect(),
            ranges,
        }
    }
}

fn window_key(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b))
}

/// Appends the union of two ascending leaf sets to `out`, keeping it sorted.
///
/// Returns `false`, leaving `out` unchanged, if the sets share a leaf.
fn merge_disjoint(a: &[u32], b: &[u32], out: &mut Vec<u32>) -> bool {
    let start = out.len();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.truncate(start);
                return false;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    true
}

/// The rows merged from one bucket.
#[derive(Default)]
struct Merged {
    hashes: Vec<u8>,
    leaves: Vec<u32>,
    links: Links,
}

/// Merges every pair of rows in one bucket that have no leaf in common,
/// trimming the resolved window.
fn collide_bucket(table: &Table, bucket: &[u32], trim: usize) -> Merged {
    let mut merged = Merged::default();
    for (l, &a) in bucket.iter().enumerate() {
        for &b in &bucket[l + 1..] {
            if !merge_disjoint(table.leaves(a), table.leaves(b), &mut merged.leaves) {
                continue;
            }
            merged.hashes.extend(
                table.row(a)[trim..]
                    .iter()
                    .zip(&table.row(b)[trim..])
                    .map(|(x, y)| x ^ y),
            );
            merged.links.push([a, b]);
        }
    }
    merged
}

/// Expands a row of the table produced by `rounds.len()` merges into its leaf
/// indices, in canonical order.
fn leaf_indices(rounds: &[Links], row: u32) -> Vec<u32> {
    match rounds.split_last() {
        None => vec![row],
        Some((links, earlier)) => {
            let [a, b] = links[row as usize];
            join_canonical(leaf_indices(earlier, a), leaf_indices(earlier, b))
        }
    }
}

fn join_canonical(mut left: Vec<u32>, mut right: Vec<u32>) -> Vec<u32> {
    if right[0] < left[0] {
        std::mem::swap(&mut left, &mut right);
    }
    left.extend(right);
    left
}

/// An Equihash solver that buckets rows by collision window and merges the
/// buckets of each round in parallel.
///
/// Rows carry their remaining hash bytes, their leaf set in ascending order and
/// a pair of parent pointers; the canonical leaf order is only reconstructed
/// for solutions. It finds the same solutions as
/// [`BasicSolver`](super::BasicSolver), delivering each distinct solution once,
/// in ascending order of its leaf indices.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptimisedSolver;

impl OptimisedSolver {
    fn merge_round<C: CancelCheck + ?Sized>(
        table: &Table,
        collision_len: usize,
        cancel: &C,
    ) -> Result<(Table, Links), SolverError> {
        check_cancelled(cancel, SolverStage::ListSorting)?;
        let buckets = Buckets::new(table, collision_len);

        check_cancelled(cancel, SolverStage::ListColliding)?;
        let aborted = AtomicBool::new(false);
        let merged: Vec<Merged> = buckets
            .ranges
            .clone()
            .into_par_iter()
            .map(|range| {
                if aborted.load(atomic::Ordering::Relaxed)
                    || cancel.is_cancelled(SolverStage::ListColliding)
                {
                    aborted.store(true, atomic::Ordering::Relaxed);
                    return Merged::default();
                }
                collide_bucket(table, &buckets.rows[range], collision_len)
            })
            .collect();
        if aborted.load(atomic::Ordering::Relaxed) {
            return Err(SolverError::Cancelled(SolverStage::ListColliding));
        }

        // Barrier: concatenate the buckets in key order to form the next table.
        let rows: usize = merged.iter().map(|m| m.links.len()).sum();
        let width = table.width - collision_len;
        let leaf_width = table.leaf_width * 2;
        let mut next = Table {
            width,
            hashes: Vec::with_capacity(rows * width),
            leaf_width,
            leaves: Vec::with_capacity(rows * leaf_width),
        };
        let mut next_links = Vec::with_capacity(rows);
        for m in merged {
            next.hashes.extend(m.hashes);
            next.leaves.extend(m.leaves);
            next_links.extend(m.links);
        }

        Ok((next, next_links))
    }

    fn final_round<C: CancelCheck + ?Sized>(
        table: &Table,
        rounds: &[Links],
        cancel: &C,
    ) -> Result<Vec<Vec<u32>>, SolverError> {
        check_cancelled(cancel, SolverStage::FinalSorting)?;
        let buckets = Buckets::new(table, table.width);

        check_cancelled(cancel, SolverStage::FinalColliding)?;
        let aborted = AtomicBool::new(false);
        let candidates: Vec<Vec<Vec<u32>>> = buckets
            .ranges
            .clone()
            .into_par_iter()
            .map(|range| {
                if aborted.load(atomic::Ordering::Relaxed)
                    || cancel.is_cancelled(SolverStage::FinalColliding)
                {
                    aborted.store(true, atomic::Ordering::Relaxed);
                    return vec![];
                }
                let bucket = &buckets.rows[range];
                let mut union = Vec::with_capacity(table.leaf_width * 2);
                let mut found = vec![];
                for (l, &a) in bucket.iter().enumerate() {
                    for &b in &bucket[l + 1..] {
                        union.clear();
                        if merge_disjoint(table.leaves(a), table.leaves(b), &mut union) {
                            found.push(join_canonical(
                                leaf_indices(rounds, a),
                                leaf_indices(rounds, b),
                            ));
                        }
                    }
                }
                found
            })
            .collect();
        if aborted.load(atomic::Ordering::Relaxed) {
            return Err(SolverError::Cancelled(SolverStage::FinalColliding));
        }

        let mut solutions: Vec<Vec<u32>> = candidates.into_iter().flatten().collect();
        solutions.sort_unstable();
        solutions.dedup();
        Ok(solutions)
    }
}

impl Solver for OptimisedSolver {
    fn solve<H, C, F>(&self, hasher: &H, cancel: &C, mut on_solution: F) -> Result<bool, SolverError>
    where
        H: IndexHasher,
        C: CancelCheck + ?Sized,
        F: FnMut(Vec<u8>) -> bool,
    {
        let p = hasher.params();
        let collision_len = p.collision_byte_length();

        check_cancelled(cancel, SolverStage::ListGeneration)?;
        let digest_len = p.digest_len();
        let mut digests = vec![0; p.leaf_count() as usize * digest_len];
        digests
            .par_chunks_mut(LEAF_CHUNK * digest_len)
            .enumerate()
            .for_each(|(c, chunk)| hasher.leaf_digests((c * LEAF_CHUNK) as u32, chunk));

        // Each digest is a whole number of windows, so the concatenated digests
        // can be expanded in one pass.
        let mut table = Table {
            width: p.hash_length(),
            hashes: expand_array(&digests, p.collision_bit_length(), 0),
            leaf_width: 1,
            leaves: (0..p.leaf_count()).collect(),
        };
        drop(digests);

        let mut rounds: Vec<Links> = Vec::with_capacity(p.k() as usize - 1);
        for r in 1..p.k() {
            let (next, links) = Self::merge_round(&table, collision_len, cancel)?;
            table = next;
            rounds.push(links);

            debug!(round = r, rows = table.len(), "Optimised Equihash round complete");
            check_cancelled(cancel, SolverStage::RoundEnd)?;
        }

        let solutions = Self::final_round(&table, &rounds, cancel)?;
        debug!(solutions = solutions.len(), "Optimised Equihash search complete");

        for indices in solutions {
            let soln = minimal_from_indices(p, &indices)
                .expect("solver only produces in-range indices of the correct length");
            if on_solution(soln) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
