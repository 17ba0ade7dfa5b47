//! # VectorStore
//!
//! In-process embedding store with brute-force cosine search.
//!
//! A [`VectorStore`] owns a [`SlotArray`] of fixed-dimension vectors behind a
//! reader/writer lock and exposes the full slot lifecycle:
//!
//! - **append**: place a vector, optionally reusing the lowest tombstoned slot.
//! - **delete**: tombstone a slot in place; other indices do not move.
//! - **replace**: overwrite a slot, reviving it if it was a tombstone.
//! - **compact**: drop every tombstone and renumber the survivors.
//! - **search**: rank all occupied slots by cosine similarity to a query.
//!
//! ## Concurrency
//! Mutations take the write lock; `search`, `count`, `get` and `is_tombstoned` take the
//! read lock. A search therefore never sees a half-applied mutation, and any number of
//! searches can run at once. The store is `Send + Sync`; share it with `Arc`.
//!
//! ## Index stability
//! Ids returned by `append` and `search` stay valid through `append`, `delete` and
//! `replace`. After `compact` they must be discarded.
//!
//! ## Quick Example
//! ```rust
//! use awful_vectors::vector_store::VectorStore;
//! use awful_vectors::search::Parallelism;
//!
//! # fn main() -> Result<(), awful_vectors::error::StoreError> {
//! let store = VectorStore::new(2)?;
//! store.append(&[1.0, 0.0], false)?;
//! store.append(&[0.0, 1.0], false)?;
//! store.append(&[1.0, 0.0], false)?;
//! store.delete(1)?;
//! assert_eq!(store.append(&[0.0, 1.0], true)?, 1);
//!
//! let hits = store.search(&[1.0, 0.0], 2, true, Parallelism::Sequential)?;
//! let ids: Vec<usize> = hits.iter().map(|h| h.id).collect();
//! assert_eq!(ids, vec![0, 2]);
//! # Ok(()) }
//! ```

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::error::StoreError;
use crate::search::{self, Parallelism, ScoringPool, SearchResult};
use crate::similarity::cosine_similarity;
use crate::slots::{Entry, SlotArray};

/// Thread-safe vector store over a [`SlotArray`].
pub struct VectorStore {
    /// Dimensionality every vector must have; immutable for the store's lifetime.
    dimension: usize,
    slots: RwLock<SlotArray>,
    /// Dedicated pool for [`Parallelism::Threads`] searches, built on first use.
    pool: ScoringPool,
}

impl VectorStore {
    /// Create an empty store for vectors of `dimension` components.
    ///
    /// # Errors
    /// [`StoreError::InvalidDimension`] when `dimension` is zero.
    ///
    /// # Example
    /// ```rust
    /// # use awful_vectors::vector_store::VectorStore;
    /// let store = VectorStore::new(1024).unwrap();
    /// assert_eq!(store.count(), 0);
    /// ```
    pub fn new(dimension: usize) -> Result<Self, StoreError> {
        let slots = SlotArray::new(dimension)?;
        debug!(dimension, "created vector store");
        Ok(Self {
            dimension,
            slots: RwLock::new(slots),
            pool: ScoringPool::default(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.slots.read().count()
    }

    /// Number of slots, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Store `vector` and return its index.
    ///
    /// With `reuse`, the lowest-indexed tombstone is filled when one exists; otherwise
    /// (or when there is none) the store grows by one slot and the new highest index is
    /// returned.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] when `vector.len() != dimension`. The store is
    /// left unchanged.
    pub fn append(&self, vector: &[f32], reuse: bool) -> Result<usize, StoreError> {
        let id = self.slots.write().append(vector, reuse)?;
        debug!(id, reuse, "appended vector");
        Ok(id)
    }

    /// Embed `input` with `embedder` and append the result.
    ///
    /// The embedder runs before the write lock is taken, so a slow model never blocks
    /// concurrent searches.
    ///
    /// # Errors
    /// Whatever the embedder reports, then the same contract as [`append`](Self::append).
    pub fn embed_and_append<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        input: &str,
        reuse: bool,
    ) -> Result<usize, StoreError> {
        let vector = embedder.embed(input)?;
        self.append(&vector, reuse)
    }

    /// Tombstone slot `index`. Deleting an existing tombstone is a no-op.
    ///
    /// # Errors
    /// [`StoreError::IndexOutOfRange`] when `index >= len()`.
    pub fn delete(&self, index: usize) -> Result<(), StoreError> {
        self.slots.write().delete(index)?;
        debug!(index, "deleted vector");
        Ok(())
    }

    /// Overwrite slot `index` with `vector`, whatever it held before.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] or [`StoreError::IndexOutOfRange`]. The store is
    /// left unchanged on failure.
    pub fn replace(&self, index: usize, vector: &[f32]) -> Result<(), StoreError> {
        self.slots.write().replace(index, vector)?;
        debug!(index, "replaced vector");
        Ok(())
    }

    /// Whether slot `index` is a tombstone.
    ///
    /// # Errors
    /// [`StoreError::IndexOutOfRange`] when `index >= len()`.
    pub fn is_tombstoned(&self, index: usize) -> Result<bool, StoreError> {
        self.slots.read().is_tombstoned(index)
    }

    /// Copy of the vector at `index`; `None` for tombstones and unknown indices.
    pub fn get(&self, index: usize) -> Option<Vec<f32>> {
        match self.slots.read().entry(index)? {
            Entry::Occupied(row) => Some(row.to_vec()),
            Entry::Tombstone => None,
        }
    }

    /// Remove every tombstone, renumbering surviving slots to `0..count()` in their
    /// original relative order. Returns how many slots were reclaimed.
    ///
    /// Indices obtained before this call are invalid afterwards.
    pub fn compact(&self) -> usize {
        let mut slots = self.slots.write();
        let reclaimed = slots.compact();
        info!(reclaimed, remaining = slots.count(), "compacted vector store");
        reclaimed
    }

    /// Rank occupied slots by cosine similarity to `query`.
    ///
    /// Returns at most `n` results: highest scores first when `most_similar`, lowest
    /// first otherwise. Ties keep ascending slot order, whatever `parallelism` is used.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] when `query.len() != dimension`, and
    /// [`StoreError::ThreadPool`] if a dedicated scoring pool cannot be started.
    pub fn search(
        &self,
        query: &[f32],
        n: usize,
        most_similar: bool,
        parallelism: Parallelism,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let slots = self.slots.read();
        search::rank(&slots, &self.pool, query, n, most_similar, parallelism)
    }

    /// Cosine similarity of two vectors of this store's dimension.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] when either operand has the wrong length.
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32, StoreError> {
        StoreError::check_dimension(self.dimension, a.len())?;
        StoreError::check_dimension(self.dimension, b.len())?;
        Ok(cosine_similarity(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        fn embed(&self, input: &str) -> Result<Vec<f32>, StoreError> {
            match input {
                "x" => Ok(vec![1.0, 0.0]),
                "y" => Ok(vec![0.0, 1.0]),
                other => Err(StoreError::Embedding(format!("unknown token {other}"))),
            }
        }
    }

    #[test]
    fn test_lifecycle_scenario() -> Result<(), StoreError> {
        let store = VectorStore::new(2)?;
        assert_eq!(store.append(&[1.0, 0.0], false)?, 0);
        assert_eq!(store.append(&[0.0, 1.0], false)?, 1);
        assert_eq!(store.append(&[1.0, 0.0], false)?, 2);

        store.delete(1)?;
        assert!(store.is_tombstoned(1)?);
        assert_eq!(store.count(), 2);

        assert_eq!(store.append(&[0.0, 1.0], true)?, 1);
        assert_eq!(store.count(), 3);

        let hits = store.search(&[1.0, 0.0], 2, true, Parallelism::Sequential)?;
        assert_eq!(
            hits,
            vec![
                SearchResult { id: 0, score: 1.0 },
                SearchResult { id: 2, score: 1.0 },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_count_tracks_occupied_slots() -> Result<(), StoreError> {
        let store = VectorStore::new(3)?;
        for k in 0..12 {
            store.append(&[k as f32, 1.0, -1.0], false)?;
        }
        assert_eq!(store.count(), 12);
        store.delete(3)?;
        store.delete(3)?;
        store.delete(11)?;
        assert_eq!(store.count(), 10);
        assert_eq!(store.len(), 12);
        Ok(())
    }

    #[test]
    fn test_compact_renumbers_and_preserves_count() -> Result<(), StoreError> {
        let store = VectorStore::new(2)?;
        for k in 0..6 {
            store.append(&[k as f32, 1.0], false)?;
        }
        store.delete(1)?;
        store.delete(4)?;
        store.delete(5)?;

        assert_eq!(store.compact(), 3);
        assert_eq!(store.count(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(0), Some(vec![0.0, 1.0]));
        assert_eq!(store.get(1), Some(vec![2.0, 1.0]));
        assert_eq!(store.get(2), Some(vec![3.0, 1.0]));

        assert_eq!(store.compact(), 0);
        assert_eq!(store.count(), 3);
        Ok(())
    }

    #[test]
    fn test_get_tombstone_and_out_of_range() -> Result<(), StoreError> {
        let store = VectorStore::new(2)?;
        store.append(&[1.0, 2.0], false)?;
        store.delete(0)?;
        assert_eq!(store.get(0), None);
        assert_eq!(store.get(9), None);
        assert!(matches!(
            store.is_tombstoned(1),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        ));
        Ok(())
    }

    #[test]
    fn test_failed_replace_leaves_store_unchanged() -> Result<(), StoreError> {
        let store = VectorStore::new(2)?;
        store.append(&[1.0, 2.0], false)?;
        assert!(store.replace(0, &[1.0]).is_err());
        assert!(store.replace(4, &[1.0, 1.0]).is_err());
        assert_eq!(store.get(0), Some(vec![1.0, 2.0]));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_similarity_checks_dimension() -> Result<(), StoreError> {
        let store = VectorStore::new(2)?;
        assert!((store.similarity(&[1.0, 1.0], &[2.0, 2.0])? - 1.0).abs() < 1e-6);
        assert!(matches!(
            store.similarity(&[1.0, 1.0], &[2.0]),
            Err(StoreError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        Ok(())
    }

    #[test]
    fn test_embed_and_append() -> Result<(), StoreError> {
        let store = VectorStore::new(2)?;
        assert_eq!(store.embed_and_append(&AxisEmbedder, "x", false)?, 0);
        assert_eq!(store.embed_and_append(&AxisEmbedder, "y", false)?, 1);
        assert!(matches!(
            store.embed_and_append(&AxisEmbedder, "z", false),
            Err(StoreError::Embedding(_))
        ));
        assert_eq!(store.count(), 2);
        Ok(())
    }

    #[test]
    fn test_concurrent_searches_and_appends() -> Result<(), StoreError> {
        let store = Arc::new(VectorStore::new(4)?);
        for k in 0..64 {
            store.append(&[k as f32, 1.0, 0.5, -0.5], false)?;
        }

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..20 {
                        if t == 0 {
                            store.append(&[1.0, 1.0, 1.0, 1.0], true).unwrap();
                        } else {
                            let hits = store
                                .search(&[1.0, 0.0, 0.0, 0.0], 5, true, Parallelism::Auto)
                                .unwrap();
                            assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }
        assert_eq!(store.count(), 84);
        Ok(())
    }
}
