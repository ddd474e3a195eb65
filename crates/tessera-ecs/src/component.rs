//! Component sets, component membership, signatures and bundles.
//!
//! A store works over a fixed list of component types declared once with
//! [`component_set!`](crate::component_set). The macro generates a struct
//! holding one [`SparseSet`] column per type and implements:
//!
//! - [`ComponentSet`] for the struct (type count, bulk reserve, bulk clear);
//! - [`Component<Set>`] for each declared type, carrying its bit position.
//!
//! Using a type that was not declared is a compile error because the
//! `Component<Set>` impl does not exist. Declaring the same type twice is also
//! a compile error (conflicting impls).
//!
//! [`Signature`] and [`Bundle`] are implemented for tuples of up to eight
//! component types / values and describe "these types" and "these values".

use crate::mask::TypeMask;
use crate::sparse_set::SparseSet;

// ---------------------------------------------------------------------------
// ComponentSet / Component
// ---------------------------------------------------------------------------

/// The column storage for a fixed list of component types.
///
/// Implemented by [`component_set!`](crate::component_set); not meant to be
/// implemented by hand.
pub trait ComponentSet: Default + Send + Sync + 'static {
    /// Number of declared component types. Also the position of the alive bit.
    const COUNT: u32;

    /// Make indices `[0, len)` addressable in every column.
    fn reserve(&mut self, len: usize);

    /// Remove the value at `index` from every column that holds one.
    fn clear_index(&mut self, index: usize);

    /// Bits of the columns that hold a value at `index`.
    fn stored_mask(&self, index: usize) -> TypeMask;
}

/// A component type declared in set `S`.
pub trait Component<S: ComponentSet>: Sized + Send + Sync + 'static {
    /// Bit position assigned by declaration order (first type is bit 0).
    const BIT: u32;

    /// This type's column.
    fn column(set: &S) -> &SparseSet<Self>;

    /// This type's column, mutably.
    fn column_mut(set: &mut S) -> &mut SparseSet<Self>;

    /// Mask with only this type's bit set.
    #[inline]
    fn mask() -> TypeMask {
        TypeMask::bit(Self::BIT)
    }
}

// ---------------------------------------------------------------------------
// Signature / Bundle
// ---------------------------------------------------------------------------

/// A list of component types of set `S`, written as a tuple: `(A, B)`.
pub trait Signature<S: ComponentSet> {
    /// OR of the bits of every listed type (without the alive bit).
    ///
    /// # Panics
    ///
    /// Panics if the same type is listed twice.
    fn mask() -> TypeMask;

    /// Remove the listed components stored at `index`.
    fn remove_from(set: &mut S, index: usize);
}

/// A tuple of component values of set `S`: `(Position { .. }, Velocity { .. })`.
pub trait Bundle<S: ComponentSet>: Signature<S> {
    /// Store every value at `index`, overwriting existing values of the same
    /// types.
    fn insert_into(self, set: &mut S, index: usize);
}

macro_rules! impl_tuples {
    ($($name:ident),*) => {
        impl<S: ComponentSet, $($name: Component<S>),*> Signature<S> for ($($name,)*) {
            #[allow(unused_mut)]
            fn mask() -> TypeMask {
                let mut mask = TypeMask::EMPTY;
                $(
                    let bit = <$name as Component<S>>::mask();
                    assert!(
                        !mask.contains(bit),
                        "component type {} appears twice in one signature",
                        std::any::type_name::<$name>()
                    );
                    mask |= bit;
                )*
                mask
            }

            #[allow(unused_variables)]
            fn remove_from(set: &mut S, index: usize) {
                $(<$name as Component<S>>::column_mut(set).remove(index);)*
            }
        }

        impl<S: ComponentSet, $($name: Component<S>),*> Bundle<S> for ($($name,)*) {
            #[allow(non_snake_case, unused_variables)]
            fn insert_into(self, set: &mut S, index: usize) {
                let ($($name,)*) = self;
                $(<$name as Component<S>>::column_mut(set).insert(index, $name);)*
            }
        }
    };
}

impl_tuples!();
impl_tuples!(A);
impl_tuples!(A, B);
impl_tuples!(A, B, C);
impl_tuples!(A, B, C, D);
impl_tuples!(A, B, C, D, E);
impl_tuples!(A, B, C, D, E, F);
impl_tuples!(A, B, C, D, E, F, G);
impl_tuples!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// component_set!
// ---------------------------------------------------------------------------

/// Declare the fixed list of component types a store works with.
///
/// Each entry is `field: Type`. The field names the generated column; the
/// order of entries assigns bit positions.
///
/// ```
/// use tessera_ecs::{component_set, Component, ComponentSet};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Position { x: f64, y: f64 }
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Velocity { dx: f64, dy: f64 }
///
/// component_set! {
///     /// Columns for the physics demo.
///     pub struct Physics {
///         position: Position,
///         velocity: Velocity,
///     }
/// }
///
/// assert_eq!(<Physics as ComponentSet>::COUNT, 2);
/// assert_eq!(<Position as Component<Physics>>::BIT, 0);
/// assert_eq!(<Velocity as Component<Physics>>::BIT, 1);
/// ```
#[macro_export]
macro_rules! component_set {
    (@bits $set:ident, $bit:expr, ) => {};
    (@bits $set:ident, $bit:expr, $field:ident : $ty:ty, $($rest:tt)*) => {
        impl $crate::Component<$set> for $ty {
            const BIT: u32 = $bit;

            #[inline]
            fn column(set: &$set) -> &$crate::SparseSet<Self> {
                &set.$field
            }

            #[inline]
            fn column_mut(set: &mut $set) -> &mut $crate::SparseSet<Self> {
                &mut set.$field
            }
        }

        $crate::component_set!(@bits $set, $bit + 1, $($rest)*);
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($field: $crate::SparseSet<$ty>,)+
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $crate::SparseSet::new(),)+
                }
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(::core::stringify!($name))
                    $(.field(::core::stringify!($field), &self.$field.len()))+
                    .finish()
            }
        }

        impl $crate::ComponentSet for $name {
            const COUNT: u32 = [$(::core::stringify!($field)),+].len() as u32;

            fn reserve(&mut self, len: usize) {
                $(self.$field.reserve(len);)+
            }

            fn clear_index(&mut self, index: usize) {
                $(self.$field.remove(index);)+
            }

            fn stored_mask(&self, index: usize) -> $crate::TypeMask {
                let mut mask = $crate::TypeMask::EMPTY;
                $(
                    if self.$field.contains(index) {
                        mask |= <$ty as $crate::Component<Self>>::mask();
                    }
                )+
                mask
            }
        }

        const _: () = ::core::assert!(
            <$name as $crate::ComponentSet>::COUNT < $crate::TypeMask::BITS,
            "a component set can declare at most 63 component types"
        );

        $crate::component_set!(@bits $name, 0u32, $($field : $ty,)+);
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
