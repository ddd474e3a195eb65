//! Queries and systems.
//!
//! A query is a tuple of component references, e.g. `(&mut Position, &Velocity)`.
//! Its [`mask`](Query::mask) is the OR of the referenced types' bits; an
//! entity matches when its mask contains that plus the alive bit.
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug)]
//! struct Position(f32);
//! #[derive(Debug)]
//! struct Velocity(f32);
//!
//! component_set! {
//!     struct Motion {
//!         position: Position,
//!         velocity: Velocity,
//!     }
//! }
//!
//! let mut store = Store::<Motion>::new();
//! let moving = store.create((Position(0.0), Velocity(2.0)));
//! let still = store.create((Position(5.0),));
//!
//! store.run::<(&mut Position, &Velocity), _>(|(p, v)| p.0 += v.0);
//!
//! assert_eq!(store.get::<Position>(moving).unwrap().0, 2.0);
//! assert_eq!(store.get::<Position>(still).unwrap().0, 5.0);
//! ```

use crate::component::{Component, ComponentSet};
use crate::mask::TypeMask;

mod sealed {
    pub trait Sealed {}

    impl<T> Sealed for &T {}
    impl<T> Sealed for &mut T {}

    macro_rules! impl_sealed {
        ($($name:ident),*) => {
            impl<$($name),*> Sealed for ($($name,)*) {}
        };
    }

    impl_sealed!();
    impl_sealed!(A);
    impl_sealed!(A, B);
    impl_sealed!(A, B, C);
    impl_sealed!(A, B, C, D);
    impl_sealed!(A, B, C, D, E);
    impl_sealed!(A, B, C, D, E, F);
    impl_sealed!(A, B, C, D, E, F, G);
    impl_sealed!(A, B, C, D, E, F, G, H);
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// One element of a query: `&T` or `&mut T` for a component `T` of set `S`.
pub trait Fetch<'w, S: ComponentSet>: Sized + sealed::Sealed {
    /// Bit of the referenced component type.
    const BIT: u32;
    /// Whether the element is a mutable reference.
    const MUTABLE: bool;

    /// Borrow the component stored at `index`.
    ///
    /// # Safety
    ///
    /// `index` must hold a value of the referenced type, and for mutable
    /// elements no other reference to that value may be alive for `'w`.
    unsafe fn fetch(set: &'w S, index: usize) -> Self;
}

impl<'w, S: ComponentSet, T: Component<S>> Fetch<'w, S> for &'w T {
    const BIT: u32 = T::BIT;
    const MUTABLE: bool = false;

    #[inline]
    unsafe fn fetch(set: &'w S, index: usize) -> Self {
        // SAFETY: no mutable reference to this slot is alive (caller contract).
        unsafe { &*T::column(set).cell(index).get() }
    }
}

impl<'w, S: ComponentSet, T: Component<S>> Fetch<'w, S> for &'w mut T {
    const BIT: u32 = T::BIT;
    const MUTABLE: bool = true;

    #[inline]
    unsafe fn fetch(set: &'w S, index: usize) -> Self {
        // SAFETY: this is the only reference to this slot (caller contract).
        unsafe { &mut *T::column(set).cell(index).get() }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A tuple of up to eight [`Fetch`] elements.
pub trait Query<'w, S: ComponentSet>: Sized + sealed::Sealed {
    /// OR of the referenced component bits (without the alive bit).
    fn mask() -> TypeMask;

    /// Panic if the query would alias a component mutably.
    fn validate_access();

    /// Borrow every referenced component stored at `index`.
    ///
    /// # Safety
    ///
    /// The entity at `index` must match [`mask`](Query::mask), the query must
    /// have passed [`validate_access`](Query::validate_access), and `index`
    /// must not be fetched again while the result is alive.
    unsafe fn fetch(set: &'w S, index: usize) -> Self;
}

/// Panic if a component type is accessed mutably more than once, or both
/// mutably and immutably.
fn validate_no_access_conflicts(items: &[(u32, bool)]) {
    let mut mutable = TypeMask::EMPTY;
    let mut read = TypeMask::EMPTY;
    for &(bit, is_mutable) in items {
        let bit = TypeMask::bit(bit);
        if is_mutable {
            if mutable.contains(bit) {
                panic!("query contains duplicate mutable access to the same component type");
            }
            if read.contains(bit) {
                panic!(
                    "query contains overlapping read and mutable access to the same component type"
                );
            }
            mutable |= bit;
        } else {
            if mutable.contains(bit) {
                panic!(
                    "query contains overlapping read and mutable access to the same component type"
                );
            }
            read |= bit;
        }
    }
}

macro_rules! impl_query {
    ($($name:ident),*) => {
        impl<'w, S: ComponentSet, $($name: Fetch<'w, S>),*> Query<'w, S> for ($($name,)*) {
            #[allow(unused_mut)]
            #[inline]
            fn mask() -> TypeMask {
                let mut mask = TypeMask::EMPTY;
                $(mask |= TypeMask::bit($name::BIT);)*
                mask
            }

            fn validate_access() {
                validate_no_access_conflicts(&[$(($name::BIT, $name::MUTABLE)),*]);
            }

            #[allow(unused_variables, clippy::unused_unit)]
            #[inline]
            unsafe fn fetch(set: &'w S, index: usize) -> Self {
                // SAFETY: forwarded caller contract; elements name distinct
                // types or are all shared.
                ($(unsafe { $name::fetch(set, index) },)*)
            }
        }
    };
}

impl_query!();
impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);
impl_query!(A, B, C, D, E, F, G);
impl_query!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A named, reusable system.
///
/// ```
/// use tessera_ecs::prelude::*;
///
/// struct Health(u32);
/// struct Poison(u32);
///
/// component_set! {
///     struct Status {
///         health: Health,
///         poison: Poison,
///     }
/// }
///
/// struct ApplyPoison;
///
/// impl<'w> System<'w, Status> for ApplyPoison {
///     type Query = (&'w mut Health, &'w Poison);
///
///     fn run(&self, (health, poison): Self::Query) {
///         health.0 = health.0.saturating_sub(poison.0);
///     }
/// }
///
/// let mut store = Store::<Status>::new();
/// let e = store.create((Health(10), Poison(3)));
/// store.run_system(&ApplyPoison);
/// assert_eq!(store.get::<Health>(e).unwrap().0, 7);
/// ```
pub trait System<'w, S: ComponentSet>: Sync {
    type Query: Query<'w, S>;

    /// Called once per matching entity.
    fn run(&self, item: Self::Query);
}
