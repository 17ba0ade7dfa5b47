//! # Slot array
//!
//! Stable-index storage for fixed-dimension vectors.
//!
//! Rows are kept by value in a single row-major `Vec<f32>` (slot `i` occupies
//! `data[i * dimension..(i + 1) * dimension]`) next to one [`SlotState`] tag per slot.
//! A deleted slot keeps its position as a [`SlotState::Tombstone`] so the indices of
//! every other slot stay valid; only [`SlotArray::compact`] renumbers.
//!
//! The slot array performs no locking. [`VectorStore`](crate::vector_store::VectorStore)
//! wraps it in a reader/writer lock and is the type most callers want.
//!
//! ```rust
//! use awful_vectors::slots::{Entry, SlotArray};
//!
//! # fn main() -> Result<(), awful_vectors::error::StoreError> {
//! let mut slots = SlotArray::new(2)?;
//! let a = slots.append(&[1.0, 0.0], false)?;
//! let b = slots.append(&[0.0, 1.0], false)?;
//! slots.delete(a)?;
//! assert_eq!(slots.entry(a), Some(Entry::Tombstone));
//! assert_eq!(slots.entry(b), Some(Entry::Occupied(&[0.0, 1.0][..])));
//! assert_eq!(slots.append(&[2.0, 2.0], true)?, a);
//! # Ok(()) }
//! ```

use tracing::debug;

use crate::error::StoreError;

/// Occupancy tag of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Occupied,
    Tombstone,
}

/// Borrowed view of one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    /// A live vector of the array's dimension.
    Occupied(&'a [f32]),
    /// A logically deleted slot awaiting reuse or compaction.
    Tombstone,
}

impl Entry<'_> {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }
}

/// Ordered, index-addressable sequence of occupied slots and tombstones.
#[derive(Debug, Clone)]
pub struct SlotArray {
    dimension: usize,
    data: Vec<f32>,
    states: Vec<SlotState>,
    occupied: usize,
}

impl SlotArray {
    /// Create an empty array for vectors of `dimension` components.
    ///
    /// # Errors
    /// [`StoreError::InvalidDimension`] when `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
            states: Vec::new(),
            occupied: 0,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of slots, tombstones included.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.occupied
    }

    /// View of slot `index`, or `None` when it is out of range.
    pub fn entry(&self, index: usize) -> Option<Entry<'_>> {
        match self.states.get(index)? {
            SlotState::Occupied => Some(Entry::Occupied(self.row(index))),
            SlotState::Tombstone => Some(Entry::Tombstone),
        }
    }

    /// Iterate `(index, entry)` over every slot in ascending index order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, Entry<'_>)> + '_ {
        self.data
            .chunks_exact(self.dimension)
            .zip(&self.states)
            .enumerate()
            .map(|(index, (row, state))| match state {
                SlotState::Occupied => (index, Entry::Occupied(row)),
                SlotState::Tombstone => (index, Entry::Tombstone),
            })
    }

    /// Raw rows and their tags, for the parallel scorer.
    pub(crate) fn rows(&self) -> (&[f32], &[SlotState]) {
        (&self.data, &self.states)
    }

    /// Whether slot `index` is a tombstone.
    ///
    /// # Errors
    /// [`StoreError::IndexOutOfRange`] when `index >= len()`.
    pub fn is_tombstoned(&self, index: usize) -> Result<bool, StoreError> {
        self.entry(index)
            .map(|entry| entry.is_tombstone())
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Place `vector` and return its index.
    ///
    /// With `reuse`, the lowest-indexed tombstone is filled if one exists; otherwise the
    /// array grows by one slot.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] when `vector.len()` differs from the dimension.
    /// Nothing is modified in that case.
    pub fn append(&mut self, vector: &[f32], reuse: bool) -> Result<usize, StoreError> {
        StoreError::check_dimension(self.dimension, vector.len())?;

        let reusable = if reuse {
            self.states.iter().position(|s| *s == SlotState::Tombstone)
        } else {
            None
        };

        let index = match reusable {
            Some(index) => {
                self.row_mut(index).copy_from_slice(vector);
                self.states[index] = SlotState::Occupied;
                debug!(index, "filled tombstone");
                index
            }
            None => {
                self.data.extend_from_slice(vector);
                self.states.push(SlotState::Occupied);
                self.states.len() - 1
            }
        };
        self.occupied += 1;
        Ok(index)
    }

    /// Turn slot `index` into a tombstone. Deleting a tombstone is a no-op.
    ///
    /// # Errors
    /// [`StoreError::IndexOutOfRange`] when `index >= len()`.
    pub fn delete(&mut self, index: usize) -> Result<(), StoreError> {
        let len = self.len();
        let state = self
            .states
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;
        if *state == SlotState::Occupied {
            *state = SlotState::Tombstone;
            self.occupied -= 1;
            self.row_mut(index).fill(0.0);
        }
        Ok(())
    }

    /// Overwrite slot `index` with `vector`, whatever it held before.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] or [`StoreError::IndexOutOfRange`]; the dimension
    /// is checked first and nothing is modified on failure.
    pub fn replace(&mut self, index: usize, vector: &[f32]) -> Result<(), StoreError> {
        StoreError::check_dimension(self.dimension, vector.len())?;
        let len = self.len();
        let state = self
            .states
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;
        if *state == SlotState::Tombstone {
            *state = SlotState::Occupied;
            self.occupied += 1;
        }
        self.row_mut(index).copy_from_slice(vector);
        Ok(())
    }

    /// Remove every tombstone and renumber the survivors to `0..count()`.
    ///
    /// Trailing tombstones are dropped first by shrinking the array; the remaining
    /// occupied rows are then moved down over interior tombstones, keeping their
    /// relative order. Returns the number of slots reclaimed.
    pub fn compact(&mut self) -> usize {
        let before = self.len();

        while self.states.last() == Some(&SlotState::Tombstone) {
            self.states.pop();
        }
        self.data.truncate(self.states.len() * self.dimension);

        let dim = self.dimension;
        let mut write = 0;
        for read in 0..self.states.len() {
            if self.states[read] == SlotState::Tombstone {
                continue;
            }
            if write != read {
                self.data.copy_within(read * dim..(read + 1) * dim, write * dim);
            }
            write += 1;
        }
        self.states.truncate(write);
        self.states.fill(SlotState::Occupied);
        self.data.truncate(write * dim);

        debug_assert_eq!(write, self.occupied);
        before - write
    }

    fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn row_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.dimension;
        &mut self.data[start..start + self.dimension]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(rows: &[[f32; 2]]) -> SlotArray {
        let mut slots = SlotArray::new(2).unwrap();
        for row in rows {
            slots.append(row, false).unwrap();
        }
        slots
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(SlotArray::new(0), Err(StoreError::InvalidDimension)));
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut slots = SlotArray::new(3).unwrap();
        for k in 0..10 {
            let id = slots.append(&[k as f32, 1.0, 2.0], false).unwrap();
            assert_eq!(id, k);
        }
        assert_eq!(slots.count(), 10);
        assert_eq!(slots.len(), 10);
    }

    #[test]
    fn test_append_dimension_mismatch_leaves_array_untouched() {
        let mut slots = filled(&[[1.0, 0.0]]);
        let err = slots.append(&[1.0, 2.0, 3.0], true).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.count(), 1);
    }

    #[test]
    fn test_delete_tombstones_and_is_idempotent() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0]]);
        slots.delete(0).unwrap();
        assert!(slots.is_tombstoned(0).unwrap());
        assert!(!slots.is_tombstoned(1).unwrap());
        assert_eq!(slots.count(), 1);

        slots.delete(0).unwrap();
        assert_eq!(slots.count(), 1);
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn test_out_of_range_indices() {
        let mut slots = filled(&[[1.0, 0.0]]);
        assert!(matches!(
            slots.is_tombstoned(1),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            slots.delete(5),
            Err(StoreError::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert!(matches!(
            slots.replace(1, &[0.0, 0.0]),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(slots.count(), 1);
        assert_eq!(slots.entry(7), None);
    }

    #[test]
    fn test_reuse_fills_lowest_tombstone() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 0.0]]);
        slots.delete(2).unwrap();
        slots.delete(1).unwrap();

        assert_eq!(slots.append(&[5.0, 5.0], true).unwrap(), 1);
        assert_eq!(slots.append(&[6.0, 6.0], true).unwrap(), 2);
        // no tombstones left, so reuse falls back to growing
        assert_eq!(slots.append(&[7.0, 7.0], true).unwrap(), 4);
        assert_eq!(slots.count(), 5);
        assert_eq!(slots.entry(1), Some(Entry::Occupied(&[5.0, 5.0][..])));
    }

    #[test]
    fn test_append_without_reuse_grows_past_tombstones() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0]]);
        slots.delete(0).unwrap();
        assert_eq!(slots.append(&[3.0, 3.0], false).unwrap(), 2);
        assert!(slots.is_tombstoned(0).unwrap());
    }

    #[test]
    fn test_replace_revives_tombstone() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0]]);
        slots.delete(1).unwrap();
        slots.replace(1, &[4.0, 4.0]).unwrap();
        assert_eq!(slots.count(), 2);
        assert_eq!(slots.entry(1), Some(Entry::Occupied(&[4.0, 4.0][..])));

        slots.replace(0, &[9.0, 9.0]).unwrap();
        assert_eq!(slots.count(), 2);
        assert_eq!(slots.entry(0), Some(Entry::Occupied(&[9.0, 9.0][..])));
    }

    #[test]
    fn test_zero_vector_stays_occupied() {
        let mut slots = filled(&[[0.0, 0.0]]);
        assert!(!slots.is_tombstoned(0).unwrap());
        assert_eq!(slots.append(&[1.0, 1.0], true).unwrap(), 1);
    }

    #[test]
    fn test_compact_renumbers_in_relative_order() {
        let mut slots = filled(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]]);
        slots.delete(0).unwrap();
        slots.delete(2).unwrap();
        slots.delete(4).unwrap();

        assert_eq!(slots.compact(), 3);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.count(), 2);
        assert_eq!(slots.entry(0), Some(Entry::Occupied(&[1.0, 1.0][..])));
        assert_eq!(slots.entry(1), Some(Entry::Occupied(&[3.0, 3.0][..])));
    }

    #[test]
    fn test_compact_is_idempotent() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        slots.delete(1).unwrap();
        slots.compact();
        let once: Vec<_> = slots.entries().map(|(i, e)| (i, format!("{e:?}"))).collect();

        assert_eq!(slots.compact(), 0);
        let twice: Vec<_> = slots.entries().map(|(i, e)| (i, format!("{e:?}"))).collect();
        assert_eq!(once, twice);
        assert!(slots.entries().all(|(_, e)| !e.is_tombstone()));
    }

    #[test]
    fn test_compact_all_tombstones_empties_array() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0]]);
        slots.delete(0).unwrap();
        slots.delete(1).unwrap();
        assert_eq!(slots.compact(), 2);
        assert!(slots.is_empty());
        assert_eq!(slots.count(), 0);
        assert_eq!(slots.append(&[1.0, 1.0], true).unwrap(), 0);
    }

    #[test]
    fn test_entries_visits_every_slot() {
        let mut slots = filled(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        slots.delete(1).unwrap();
        let tags: Vec<bool> = slots.entries().map(|(_, e)| e.is_tombstone()).collect();
        assert_eq!(tags, vec![false, true, false]);
    }
}
