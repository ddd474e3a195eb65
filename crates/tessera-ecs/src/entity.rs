//! Entity identifiers and slot allocation.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and a slot *index* in the low 32 bits. The generation is
//! bumped every time a slot is recycled, so a handle issued before a destroy
//! stays invalid even after `create` reuses its index. Generations wrap, so
//! after 2^32 recycles of one slot an old handle matches again.
//!
//! The [`EntityAllocator`] owns the per-slot [`TypeMask`]s, the generations and
//! the FIFO free list. The alive bit of a slot's mask is set iff the slot is
//! not on the free list.

use std::collections::VecDeque;
use std::fmt;

use crate::mask::TypeMask;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle. Only a [`Store`](crate::store::Store) issues
/// them.
///
/// Layout: `[generation: u32 | index: u32]`
///
/// The generation is a wrapping `u32`. A stale handle is rejected until its
/// slot has been recycled 2^32 times, at which point it compares equal to the
/// slot's current id again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Issues and recycles entity slots.
///
/// Free slots are reused in FIFO order so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug)]
pub struct EntityAllocator {
    /// The alive bit of the owning component set.
    alive: TypeMask,
    /// Type mask per slot. Zero for a slot on the free list.
    masks: Vec<TypeMask>,
    /// Current generation per slot.
    generations: Vec<u32>,
    /// Free-list of recyclable slots (FIFO queue).
    free_indices: VecDeque<u32>,
}

impl EntityAllocator {
    /// Create an empty allocator using `alive` as the liveness bit.
    pub fn new(alive: TypeMask) -> Self {
        debug_assert_eq!(alive.count(), 1, "alive mask must be a single bit");
        Self {
            alive,
            masks: Vec::new(),
            generations: Vec::new(),
            free_indices: VecDeque::new(),
        }
    }

    /// Make room for `total` slots without reallocating.
    pub fn reserve(&mut self, total: usize) {
        let additional = total.saturating_sub(self.masks.len());
        self.masks.reserve(additional);
        self.generations.reserve(additional);
    }

    /// Allocate a slot whose mask becomes `mask` (the alive bit is added).
    ///
    /// Reuses the oldest freed slot if any; the generation was already bumped
    /// when it was freed.
    pub fn allocate(&mut self, mask: TypeMask) -> EntityId {
        let mask = mask | self.alive;
        if let Some(index) = self.free_indices.pop_front() {
            let slot = index as usize;
            debug_assert!(self.masks[slot].is_empty());
            self.masks[slot] = mask;
            tracing::trace!(index, generation = self.generations[slot], "recycled entity slot");
            EntityId::new(index, self.generations[slot])
        } else {
            let index = u32::try_from(self.masks.len())
                .ok()
                .filter(|&i| i != u32::MAX)
                .unwrap_or_else(|| panic!("entity slot space exhausted"));
            self.masks.push(mask);
            self.generations.push(0);
            EntityId::new(index, 0)
        }
    }

    /// Free the slot of `id`: its mask is zeroed, its generation bumped and
    /// the index queued for reuse.
    ///
    /// Returns `false` if `id` was not alive.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = id.slot();
        self.masks[slot] = TypeMask::EMPTY;
        // Wraps after 2^32 recycles of this slot.
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free_indices.push_back(id.index());
        true
    }

    /// Whether `id` refers to a live slot with a matching generation.
    #[inline]
    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.slot();
        slot < self.masks.len()
            && self.masks[slot].contains(self.alive)
            && self.generations[slot] == id.generation()
    }

    /// Mask of a live entity.
    #[inline]
    pub fn mask(&self, id: EntityId) -> Option<TypeMask> {
        self.is_alive(id).then(|| self.masks[id.slot()])
    }

    /// Mutable mask of a live entity.
    #[inline]
    pub fn mask_mut(&mut self, id: EntityId) -> Option<&mut TypeMask> {
        if self.is_alive(id) {
            Some(&mut self.masks[id.slot()])
        } else {
            None
        }
    }

    /// All slot masks, indexed by slot.
    #[inline]
    pub fn masks(&self) -> &[TypeMask] {
        &self.masks
    }

    /// The live handle currently occupying `slot`, if any.
    pub fn id_at(&self, slot: usize) -> Option<EntityId> {
        let mask = self.masks.get(slot)?;
        mask.contains(self.alive)
            .then(|| EntityId::new(slot as u32, self.generations[slot]))
    }

    /// Total slots ever issued (live + free).
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.masks.len()
    }

    /// Number of live entities.
    #[inline]
    pub fn alive_count(&self) -> usize {
        self.masks.len() - self.free_indices.len()
    }

    /// Number of slots waiting on the free list.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Check that the alive bit and the free list agree. O(slots).
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violation found.
    pub fn assert_invariants(&self) {
        assert_eq!(self.masks.len(), self.generations.len());
        let mut on_free_list = vec![false; self.masks.len()];
        for &index in &self.free_indices {
            let slot = index as usize;
            assert!(slot < self.masks.len(), "free index {index} out of range");
            assert!(!on_free_list[slot], "index {index} freed twice");
            on_free_list[slot] = true;
        }
        for (slot, mask) in self.masks.iter().enumerate() {
            assert_eq!(
                mask.contains(self.alive),
                !on_free_list[slot],
                "slot {slot}: alive bit disagrees with free list"
            );
            if on_free_list[slot] {
                assert!(mask.is_empty(), "slot {slot}: freed slot keeps type bits");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc() -> EntityAllocator {
        EntityAllocator::new(TypeMask::bit(4))
    }

    #[test]
    fn allocate_unique_ids() {
        let mut alloc = alloc();
        let ids: Vec<EntityId> = (0..100).map(|_| alloc.allocate(TypeMask::EMPTY)).collect();
        let mut indices: Vec<u32> = ids.iter().map(|id| id.index()).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), 100);
        alloc.assert_invariants();
    }

    #[test]
    fn generation_increments_on_recycle() {
        let mut alloc = alloc();
        let e0 = alloc.allocate(TypeMask::bit(0));
        assert_eq!(e0.generation(), 0);
        assert!(alloc.deallocate(e0));
        let e1 = alloc.allocate(TypeMask::bit(1));
        // Same index, higher generation.
        assert_eq!(e1.index(), e0.index());
        assert_eq!(e1.generation(), 1);
        assert_eq!(alloc.mask(e1), Some(TypeMask::bit(1) | TypeMask::bit(4)));
    }

    #[test]
    fn stale_id_detection() {
        let mut alloc = alloc();
        let e0 = alloc.allocate(TypeMask::EMPTY);
        assert!(alloc.is_alive(e0));
        assert!(alloc.deallocate(e0));
        assert!(!alloc.is_alive(e0), "stale ID should not be alive");
        let _e1 = alloc.allocate(TypeMask::EMPTY);
        assert!(
            !alloc.is_alive(e0),
            "stale ID still not alive after recycle"
        );
        assert_eq!(alloc.mask(e0), None);
    }

    #[test]
    fn free_list_is_fifo() {
        let mut alloc = alloc();
        let ids: Vec<_> = (0..3).map(|_| alloc.allocate(TypeMask::EMPTY)).collect();
        alloc.deallocate(ids[2]);
        alloc.deallocate(ids[0]);
        assert_eq!(alloc.allocate(TypeMask::EMPTY).index(), 2);
        assert_eq!(alloc.allocate(TypeMask::EMPTY).index(), 0);
        assert_eq!(alloc.allocate(TypeMask::EMPTY).index(), 3);
        alloc.assert_invariants();
    }

    #[test]
    fn double_deallocate_returns_false() {
        let mut alloc = alloc();
        let e = alloc.allocate(TypeMask::EMPTY);
        assert!(alloc.deallocate(e));
        assert!(!alloc.deallocate(e));
    }

    #[test]
    fn counts_track_correctly() {
        let mut alloc = alloc();
        let e0 = alloc.allocate(TypeMask::EMPTY);
        let _e1 = alloc.allocate(TypeMask::EMPTY);
        assert_eq!(alloc.alive_count(), 2);
        alloc.deallocate(e0);
        assert_eq!(alloc.alive_count(), 1);
        assert_eq!(alloc.free_count(), 1);
        assert_eq!(alloc.slot_count(), 2);
        assert!(alloc.masks()[0].is_empty());
        assert_eq!(alloc.id_at(0), None);
        assert!(alloc.id_at(1).is_some());
        alloc.assert_invariants();
    }

    #[test]
    fn entity_id_layout() {
        let id = EntityId::new(42, 7);
        assert_eq!(id.index(), 42);
        assert_eq!(id.generation(), 7);
        assert_eq!(format!("{id:?}"), "EntityId(42v7)");
        assert_eq!(id.to_string(), "42v7");
    }

    #[test]
    fn generation_wraps_after_u32_max() {
        let mut a = alloc();
        let first = a.allocate(TypeMask::EMPTY);
        a.generations[first.slot()] = u32::MAX;
        let last = EntityId::new(first.index(), u32::MAX);
        assert!(a.is_alive(last));
        assert!(!a.is_alive(first));

        assert!(a.deallocate(last));
        let wrapped = a.allocate(TypeMask::EMPTY);
        assert_eq!(wrapped.generation(), 0);
        assert_eq!(wrapped, first);
        assert!(a.is_alive(first));
    }

    #[test]
    fn out_of_range_id_is_not_alive() {
        let alloc = alloc();
        assert!(!alloc.is_alive(EntityId::new(5, 0)));
    }
}
