//! The entity/query engine.
//!
//! A [`Store`] owns the component columns of one [`ComponentSet`] and the
//! [`EntityAllocator`] holding every slot's [`TypeMask`]. Systems run over
//! every slot whose mask contains the query's bits and the alive bit.
//!
//! Mutation goes through `&mut self`, so no structural change can overlap a
//! running system.

use crate::component::{Bundle, Component, ComponentSet, Signature};
use crate::config::StoreConfig;
use crate::entity::{EntityAllocator, EntityId};
use crate::executor::{Executor, SerialExecutor};
use crate::mask::TypeMask;
use crate::query::{Query, System};
use crate::EcsError;

/// Typed entity/component store over the component set `S`.
#[derive(Debug)]
pub struct Store<S: ComponentSet> {
    components: S,
    entities: EntityAllocator,
}

impl<S: ComponentSet> Default for Store<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ComponentSet> Store<S> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            components: S::default(),
            entities: EntityAllocator::new(TypeMask::alive::<S>()),
        }
    }

    /// Create an empty store pre-sized from `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        let mut store = Self::new();
        store.reserve(config.initial_capacity);
        store
    }

    /// Make room for `len` entity slots in every column.
    pub fn reserve(&mut self, len: usize) {
        self.components.reserve(len);
        self.entities.reserve(len);
    }

    // -- lifecycle ----------------------------------------------------------

    /// Create an entity holding the components of `bundle`.
    ///
    /// Reuses the oldest removed slot if there is one.
    ///
    /// # Panics
    ///
    /// Panics if `bundle` lists the same component type twice.
    pub fn create<B: Bundle<S>>(&mut self, bundle: B) -> EntityId {
        let id = self.entities.allocate(B::mask());
        bundle.insert_into(&mut self.components, id.slot());
        tracing::trace!(entity = %id, "created entity");
        id
    }

    /// Attach the components of `bundle` to a live entity, overwriting values
    /// of types it already has.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn add_components<B: Bundle<S>>(&mut self, id: EntityId, bundle: B) {
        if let Err(err) = self.try_add_components(id, bundle) {
            panic!("add_components: {err}");
        }
    }

    /// Fallible form of [`add_components`](Self::add_components).
    pub fn try_add_components<B: Bundle<S>>(
        &mut self,
        id: EntityId,
        bundle: B,
    ) -> Result<(), EcsError> {
        let added = B::mask();
        let Some(mask) = self.entities.mask_mut(id) else {
            tracing::warn!(entity = %id, "add_components on stale entity");
            return Err(EcsError::StaleEntity { entity: id });
        };
        mask.insert(added);
        bundle.insert_into(&mut self.components, id.slot());
        Ok(())
    }

    /// Detach the component types `G` from a live entity. Types it does not
    /// have are ignored. The entity stays alive even if nothing is left.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn remove_components<G: Signature<S>>(&mut self, id: EntityId) {
        if let Err(err) = self.try_remove_components::<G>(id) {
            panic!("remove_components: {err}");
        }
    }

    /// Fallible form of [`remove_components`](Self::remove_components).
    pub fn try_remove_components<G: Signature<S>>(&mut self, id: EntityId) -> Result<(), EcsError> {
        let removed = G::mask();
        let Some(mask) = self.entities.mask_mut(id) else {
            tracing::warn!(entity = %id, "remove_components on stale entity");
            return Err(EcsError::StaleEntity { entity: id });
        };
        mask.remove(removed);
        mask.insert(TypeMask::alive::<S>());
        G::remove_from(&mut self.components, id.slot());
        Ok(())
    }

    /// Destroy an entity: every component is dropped and the slot is queued
    /// for reuse. `id` is stale afterwards.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn remove(&mut self, id: EntityId) {
        if let Err(err) = self.try_remove(id) {
            panic!("remove: {err}");
        }
    }

    /// Fallible form of [`remove`](Self::remove).
    pub fn try_remove(&mut self, id: EntityId) -> Result<(), EcsError> {
        if !self.entities.deallocate(id) {
            tracing::warn!(entity = %id, "remove on stale entity");
            return Err(EcsError::StaleEntity { entity: id });
        }
        self.components.clear_index(id.slot());
        tracing::trace!(entity = %id, "removed entity");
        Ok(())
    }

    // -- lookup -------------------------------------------------------------

    /// Whether `id` refers to a live entity.
    #[inline]
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.alive_count()
    }

    /// Whether no entity is alive.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots ever issued, live or free.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.entities.slot_count()
    }

    /// Type mask of a live entity, alive bit included.
    #[inline]
    pub fn mask(&self, id: EntityId) -> Option<TypeMask> {
        self.entities.mask(id)
    }

    /// Whether a live entity has component `T`.
    pub fn has<T: Component<S>>(&self, id: EntityId) -> bool {
        self.mask(id).is_some_and(|mask| mask.contains(T::mask()))
    }

    /// Component `T` of a live entity, if it has one.
    pub fn get<T: Component<S>>(&self, id: EntityId) -> Option<&T> {
        if !self.is_valid(id) {
            return None;
        }
        T::column(&self.components).get(id.slot())
    }

    /// Mutable access to component `T` of a live entity.
    pub fn get_mut<T: Component<S>>(&mut self, id: EntityId) -> Option<&mut T> {
        if !self.is_valid(id) {
            return None;
        }
        T::column_mut(&mut self.components).get_mut(id.slot())
    }

    /// Live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.slot_count()).filter_map(|slot| self.entities.id_at(slot))
    }

    /// The component columns.
    #[inline]
    pub fn components(&self) -> &S {
        &self.components
    }

    /// Check the alive-bit/free-list agreement and that every type bit is
    /// backed by a stored value.
    ///
    /// # Panics
    ///
    /// Panics on the first violation.
    pub fn assert_invariants(&self) {
        self.entities.assert_invariants();
        let alive = TypeMask::alive::<S>();
        for (slot, &mask) in self.entities.masks().iter().enumerate() {
            assert_eq!(
                self.components.stored_mask(slot),
                mask & !alive,
                "slot {slot}: type bits disagree with stored components"
            );
        }
        assert_eq!(
            self.entities().count(),
            self.len(),
            "live entity count disagrees with the free list"
        );
    }

    // -- systems ------------------------------------------------------------

    /// Run `system` over every matching entity on the calling thread, in slot
    /// order.
    pub fn run<'w, Q, F>(&'w mut self, system: F)
    where
        Q: Query<'w, S>,
        F: Fn(Q) + Sync,
    {
        self.run_with(system, &SerialExecutor);
    }

    /// Run `system` over every matching entity using `executor`.
    ///
    /// Each matching entity is visited exactly once. Only a serial executor
    /// guarantees slot order.
    ///
    /// # Panics
    ///
    /// Panics if `Q` aliases a component mutably, or if `system` panics.
    pub fn run_with<'w, Q, F, E>(&'w mut self, system: F, executor: &E)
    where
        Q: Query<'w, S>,
        F: Fn(Q) + Sync,
        E: Executor,
    {
        Q::validate_access();
        let required = Q::mask() | TypeMask::alive::<S>();
        let this: &'w Self = self;
        let components = &this.components;
        let masks = this.entities.masks();
        executor.run(masks.len(), |index| {
            if masks[index].contains(required) {
                // SAFETY: `self` is mutably borrowed for 'w, the mask
                // guarantees every referenced column holds `index`, the access
                // check rules out aliasing within one item, and `Executor`
                // implementors promise to hand out each index at most once.
                #[allow(unsafe_code)]
                let item = unsafe { Q::fetch(components, index) };
                system(item);
            }
        });
    }

    /// Run a stateful system over every matching entity in slot order.
    pub fn run_sequenced<'w, Q, F>(&'w mut self, mut system: F)
    where
        Q: Query<'w, S>,
        F: FnMut(Q),
    {
        Q::validate_access();
        let required = Q::mask() | TypeMask::alive::<S>();
        let this: &'w Self = self;
        for (index, mask) in this.entities.masks().iter().enumerate() {
            if mask.contains(required) {
                // SAFETY: as in `run_with`; indices are visited once.
                #[allow(unsafe_code)]
                let item = unsafe { Q::fetch(&this.components, index) };
                system(item);
            }
        }
    }

    /// Run a named [`System`] serially.
    pub fn run_system<'w, Y: System<'w, S>>(&'w mut self, system: &Y) {
        self.run_system_with(system, &SerialExecutor);
    }

    /// Run a named [`System`] using `executor`.
    pub fn run_system_with<'w, Y, E>(&'w mut self, system: &Y, executor: &E)
    where
        Y: System<'w, S>,
        E: Executor,
    {
        self.run_with(|item: Y::Query| system.run(item), executor);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
