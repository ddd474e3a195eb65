//! Sparse set storage for a single component type.
//!
//! A [`SparseSet`] maps an external index (the entity index) to a value kept
//! in a contiguous dense array:
//!
//! - `sparse[i]` holds the dense position of index `i`, or [`EMPTY`].
//! - `dense[p]` holds the value plus a backlink to the index that owns it.
//!
//! Insert, overwrite and removal are all O(1). Removal swaps the vacated slot
//! with the last dense slot, so dense order is not stable across removals.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Sentinel stored in the sparse array for an index that holds no value.
pub const EMPTY: usize = usize::MAX;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// One dense entry: the owning sparse index and the stored value.
///
/// The value sits in an `UnsafeCell` so that a store running a system can
/// hand out `&mut T` for distinct indices while only sharing the column.
struct Slot<T> {
    owner: usize,
    value: UnsafeCell<T>,
}

// ---------------------------------------------------------------------------
// SparseSet
// ---------------------------------------------------------------------------

/// Dense/sparse index structure holding at most one `T` per index.
pub struct SparseSet<T> {
    sparse: Vec<usize>,
    dense: Vec<Slot<T>>,
}

// SAFETY: through `&SparseSet<T>` the safe API only yields `&T`. The one
// path to `&mut T` from a shared reference is `cell`, which is crate-private
// and only used by `Store` while it is borrowed mutably, for pairwise
// distinct indices. Handing those references to other threads needs
// `T: Send` (for `&mut T`) and `T: Sync` (for `&T`).
#[allow(unsafe_code)]
unsafe impl<T: Send + Sync> Sync for SparseSet<T> {}

impl<T> SparseSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Grow the sparse array so that indices `[0, len)` are addressable.
    ///
    /// Never shrinks. New slots start out empty.
    pub fn reserve(&mut self, len: usize) {
        if len > self.sparse.len() {
            self.sparse.resize(len, EMPTY);
        }
    }

    /// Store `value` at `index`.
    ///
    /// If `index` already holds a value it is overwritten in place (its dense
    /// position does not change) and the previous value is returned.
    /// Indices beyond the reserved range grow the sparse array.
    ///
    /// # Panics
    ///
    /// Panics if `index` is [`EMPTY`], which is reserved as the sentinel.
    pub fn insert(&mut self, index: usize, value: T) -> Option<T> {
        assert!(index != EMPTY, "sparse index {EMPTY} is reserved as the empty sentinel");
        self.reserve(index + 1);
        match self.sparse[index] {
            EMPTY => {
                self.sparse[index] = self.dense.len();
                self.dense.push(Slot {
                    owner: index,
                    value: UnsafeCell::new(value),
                });
                None
            }
            pos => Some(std::mem::replace(self.dense[pos].value.get_mut(), value)),
        }
    }

    /// Remove and return the value at `index`. No-op if the index is empty.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let pos = self.position(index)?;
        let removed = self.dense.swap_remove(pos);

        // The former last entry now lives at `pos`; repoint its sparse slot.
        if let Some(moved) = self.dense.get(pos) {
            debug_assert_eq!(self.sparse[moved.owner], self.dense.len());
            self.sparse[moved.owner] = pos;
        }
        self.sparse[index] = EMPTY;
        Some(removed.value.into_inner())
    }

    /// Shared reference to the value at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        let pos = self.position(index)?;
        // SAFETY: `&self` rules out `&mut self`. A `&mut T` obtained through
        // `cell` only exists while the owning store is mutably borrowed, and
        // then no caller can reach this set through `&self`.
        #[allow(unsafe_code)]
        let value = unsafe { &*self.dense[pos].value.get() };
        Some(value)
    }

    /// Mutable reference to the value at `index`, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let pos = self.position(index)?;
        Some(self.dense[pos].value.get_mut())
    }

    /// Whether `index` currently holds a value.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.position(index).is_some()
    }

    /// Dense position of `index`, or `None` if it holds no value.
    #[inline]
    pub fn position(&self, index: usize) -> Option<usize> {
        match self.sparse.get(index).copied() {
            None | Some(EMPTY) => None,
            Some(pos) => {
                debug_assert!(pos < self.dense.len());
                Some(pos)
            }
        }
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether no values are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Size of the addressable index range.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    /// Remove every value. The addressable range is kept.
    pub fn clear(&mut self) {
        self.sparse.fill(EMPTY);
        self.dense.clear();
    }

    /// Iterate `(index, &value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.dense.iter().map(|slot| {
            // SAFETY: see `get`.
            #[allow(unsafe_code)]
            let value = unsafe { &*slot.value.get() };
            (slot.owner, value)
        })
    }

    /// Iterate `(index, &mut value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> + '_ {
        self.dense
            .iter_mut()
            .map(|slot| (slot.owner, slot.value.get_mut()))
    }

    /// Indices currently holding a value, in dense order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.dense.iter().map(|slot| slot.owner)
    }

    /// The cell holding the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` holds no value. The store only calls this after its
    /// type mask said the value is present, so a panic here means the mask
    /// and the column disagree.
    pub(crate) fn cell(&self, index: usize) -> &UnsafeCell<T> {
        match self.position(index) {
            Some(pos) => &self.dense[pos].value,
            None => panic!(
                "column for {} has no value at index {index}; type mask out of sync",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Check every structural invariant. Used by tests.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let present = self.sparse.iter().filter(|&&p| p != EMPTY).count();
        assert_eq!(present, self.dense.len(), "dense length != present indices");
        for (index, &pos) in self.sparse.iter().enumerate() {
            if pos != EMPTY {
                assert!(pos < self.dense.len());
                assert_eq!(self.dense[pos].owner, index, "broken backlink");
            }
        }
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T> Index<usize> for SparseSet<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `index` is out of range or holds no value.
    fn index(&self, index: usize) -> &T {
        assert!(
            index < self.sparse.len(),
            "sparse index {index} out of range (capacity {})",
            self.sparse.len()
        );
        match self.get(index) {
            Some(value) => value,
            None => panic!("no value stored at sparse index {index}"),
        }
    }
}

impl<T> IndexMut<usize> for SparseSet<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(
            index < self.sparse.len(),
            "sparse index {index} out of range (capacity {})",
            self.sparse.len()
        );
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("no value stored at sparse index {index}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut set = SparseSet::new();
        set.reserve(8);
        assert_eq!(set.insert(3, "three"), None);
        assert_eq!(set.insert(7, "seven"), None);
        assert_eq!(set[3], "three");
        assert_eq!(set.get(7), Some(&"seven"));
        assert_eq!(set.get(4), None);
        assert_eq!(set.len(), 2);
        set.assert_consistent();
    }

    #[test]
    fn overwrite_keeps_dense_position() {
        let mut set = SparseSet::new();
        set.insert(0, 10);
        set.insert(5, 50);
        let before = set.position(5);

        assert_eq!(set.insert(5, 55), Some(50));
        assert_eq!(set.position(5), before);
        assert_eq!(set[5], 55);
        assert_eq!(set.len(), 2);
        set.assert_consistent();
    }

    #[test]
    fn remove_repairs_moved_backlink() {
        let mut set = SparseSet::new();
        for i in 0..5 {
            set.insert(i, i * 100);
        }
        // Index 4 sits last in dense order and moves into the hole.
        assert_eq!(set.remove(1), Some(100));
        assert_eq!(set.position(4), Some(1));
        assert_eq!(set[4], 400);
        assert!(!set.contains(1));
        set.assert_consistent();

        assert_eq!(set.remove(4), Some(400));
        assert_eq!(set.remove(0), Some(0));
        set.assert_consistent();
        let mut rest: Vec<_> = set.iter().map(|(i, v)| (i, *v)).collect();
        rest.sort();
        assert_eq!(rest, vec![(2, 200), (3, 300)]);
    }

    #[test]
    fn remove_last_and_absent_are_fine() {
        let mut set = SparseSet::new();
        set.insert(2, 'a');
        assert_eq!(set.remove(2), Some('a'));
        assert_eq!(set.remove(2), None);
        assert_eq!(set.remove(1_000), None);
        assert!(set.is_empty());
        set.assert_consistent();
    }

    #[test]
    fn reserve_never_shrinks() {
        let mut set: SparseSet<u8> = SparseSet::new();
        set.reserve(16);
        set.reserve(4);
        assert_eq!(set.capacity(), 16);
    }

    #[test]
    fn insert_past_capacity_grows() {
        let mut set = SparseSet::new();
        set.insert(40, 1u32);
        assert!(set.capacity() > 40);
        assert_eq!(set[40], 1);
    }

    #[test]
    fn mutation_through_index_mut_and_iter_mut() {
        let mut set = SparseSet::new();
        set.insert(1, 1);
        set.insert(2, 2);
        set[1] += 10;
        for (_, v) in set.iter_mut() {
            *v *= 2;
        }
        assert_eq!(set[1], 22);
        assert_eq!(set[2], 4);
    }

    #[test]
    fn clear_keeps_range() {
        let mut set = SparseSet::new();
        set.insert(3, ());
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 4);
        assert!(!set.contains(3));
        set.assert_consistent();
    }

    #[test]
    #[should_panic(expected = "no value stored at sparse index 2")]
    fn index_on_empty_slot_panics() {
        let mut set = SparseSet::new();
        set.reserve(4);
        set.insert(1, 0u8);
        let _ = set[2];
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_out_of_range_panics() {
        let set: SparseSet<u8> = SparseSet::new();
        let _ = set[0];
    }

    #[test]
    fn values_are_dropped_on_remove_and_clear() {
        use std::rc::Rc;

        let token = Rc::new(());
        let mut set = SparseSet::new();
        set.insert(0, Rc::clone(&token));
        set.insert(1, Rc::clone(&token));
        set.insert(2, Rc::clone(&token));
        assert_eq!(Rc::strong_count(&token), 4);

        drop(set.remove(1));
        assert_eq!(Rc::strong_count(&token), 3);
        set.insert(0, Rc::clone(&token));
        assert_eq!(Rc::strong_count(&token), 3);
        set.clear();
        assert_eq!(Rc::strong_count(&token), 1);
    }
}
