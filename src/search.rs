//! # Search
//!
//! Brute-force ranking of every occupied slot against a query vector.
//!
//! A search has two phases:
//!
//! 1. **Scoring**: cosine similarity of the query against each occupied row. This phase
//!    is read-only and may fan out across worker threads according to a [`Parallelism`]
//!    hint.
//! 2. **Ranking**: a single, sequential, *stable* sort of the collected
//!    `(index, score)` pairs, followed by truncation to `n`.
//!
//! Scoring always yields pairs in ascending slot order (rayon's `collect` preserves
//! the source order), so the stable sort resolves ties by slot index and the returned
//! ranking is identical for every parallelism hint.
//!
//! A row with a non-finite component (e.g. `inf`) scores NaN. NaN scores rank after
//! every real score in both directions and keep slot order among themselves.

use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::similarity::{l2_norm, score_with_norm};
use crate::slots::{Entry, SlotArray, SlotState};

/// A ranked hit: the slot index and its cosine similarity to the query.
///
/// `id` is only meaningful until the next compaction of the store that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: usize,
    pub score: f32,
}

/// How the scoring phase of a search is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Score on the calling thread.
    #[default]
    Sequential,
    /// Score on rayon's global pool.
    Auto,
    /// Score on a dedicated pool with this many workers.
    Threads(NonZeroUsize),
}

impl Parallelism {
    /// Map a thread count to a hint: `0` is [`Parallelism::Auto`], `1` is
    /// [`Parallelism::Sequential`], anything larger a dedicated pool.
    pub fn from_thread_count(threads: usize) -> Self {
        match threads {
            0 => Parallelism::Auto,
            1 => Parallelism::Sequential,
            n => NonZeroUsize::new(n).map_or(Parallelism::Auto, Parallelism::Threads),
        }
    }
}

/// Lazily built dedicated rayon pool, rebuilt when the requested size changes.
#[derive(Default)]
pub(crate) struct ScoringPool {
    cached: Mutex<Option<(usize, Arc<rayon::ThreadPool>)>>,
}

impl ScoringPool {
    pub(crate) fn get(&self, threads: usize) -> Result<Arc<rayon::ThreadPool>, StoreError> {
        let mut cached = self.cached.lock();
        if let Some((size, pool)) = cached.as_ref() {
            if *size == threads {
                return Ok(Arc::clone(pool));
            }
        }
        debug!(threads, "building scoring pool");
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("avs-score-{i}"))
                .build()?,
        );
        *cached = Some((threads, Arc::clone(&pool)));
        Ok(pool)
    }
}

/// Rank the occupied slots of `slots` against `query`.
///
/// Returns at most `n` results ordered by score, descending when `most_similar` is
/// true and ascending otherwise; NaN scores come last either way. Ties keep ascending
/// slot order. `n == 0` yields an empty ranking; `n` larger than the occupied count
/// yields every occupied slot.
///
/// # Errors
/// [`StoreError::DimensionMismatch`] when `query` has the wrong length, and
/// [`StoreError::ThreadPool`] when a dedicated pool cannot be started.
pub(crate) fn rank(
    slots: &SlotArray,
    pool: &ScoringPool,
    query: &[f32],
    n: usize,
    most_similar: bool,
    parallelism: Parallelism,
) -> Result<Vec<SearchResult>, StoreError> {
    StoreError::check_dimension(slots.dimension(), query.len())?;
    if n == 0 || slots.count() == 0 {
        return Ok(Vec::new());
    }

    let query_norm = l2_norm(query);
    let mut scored = match parallelism {
        Parallelism::Sequential => score_sequential(slots, query, query_norm),
        Parallelism::Auto => score_parallel(slots, query, query_norm),
        Parallelism::Threads(threads) => {
            let pool = pool.get(threads.get())?;
            pool.install(|| score_parallel(slots, query, query_norm))
        }
    };

    scored.sort_by(|a, b| compare_scores(a.score, b.score, most_similar));
    scored.truncate(n);

    debug!(
        scored = slots.count(),
        returned = scored.len(),
        most_similar,
        ?parallelism,
        "search complete"
    );
    Ok(scored)
}

/// Ranking order of two scores. NaN (only reachable from non-finite input) always
/// sorts after every real score, in either direction, so the real scores stay monotone.
fn compare_scores(a: f32, b: f32, most_similar: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if most_similar { ord.reverse() } else { ord }
        }
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}

fn score_sequential(slots: &SlotArray, query: &[f32], query_norm: f64) -> Vec<SearchResult> {
    slots
        .entries()
        .filter_map(|(id, entry)| match entry {
            Entry::Occupied(row) => Some(SearchResult {
                id,
                score: score_with_norm(query, query_norm, row),
            }),
            Entry::Tombstone => None,
        })
        .collect()
}

fn score_parallel(slots: &SlotArray, query: &[f32], query_norm: f64) -> Vec<SearchResult> {
    let (data, states) = slots.rows();
    data.par_chunks_exact(slots.dimension())
        .zip(states.par_iter())
        .enumerate()
        .filter_map(|(id, (row, state))| match state {
            SlotState::Occupied => Some(SearchResult {
                id,
                score: score_with_norm(query, query_norm, row),
            }),
            SlotState::Tombstone => None,
        })
        .collect()
}
