//! Fixed-width component type bitmasks.
//!
//! Every declared component type owns one bit, assigned by its position in
//! the [`component_set!`](crate::component_set) declaration. The bit right
//! after the last declared type is the *alive* bit: it is set for every slot
//! that currently holds a live entity and clear for recycled slots.
//!
//! An entity matches a query iff `entity_mask.contains(required)`.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use crate::component::{ComponentSet, Signature};

/// A set of component type bits plus the alive bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeMask(u64);

impl TypeMask {
    /// Width of the mask. A component set may declare `BITS - 1` types.
    pub const BITS: u32 = u64::BITS;

    /// The mask with no bits set.
    pub const EMPTY: Self = Self(0);

    /// The mask with only `bit` set.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= TypeMask::BITS`.
    #[inline]
    pub const fn bit(bit: u32) -> Self {
        assert!(bit < Self::BITS, "type mask bit out of range");
        Self(1u64 << bit)
    }

    /// The alive bit for component set `S`.
    #[inline]
    pub const fn alive<S: ComponentSet>() -> Self {
        Self::bit(S::COUNT)
    }

    /// Bits of every type in signature `G`, plus the alive bit of `S`.
    ///
    /// This is the mask an entity needs to match a query over `G`.
    #[inline]
    pub fn of<S: ComponentSet, G: Signature<S>>() -> Self {
        G::mask() | Self::alive::<S>()
    }

    /// Raw bit pattern.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether every bit of `other` is also set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `bit` is set.
    #[inline]
    pub const fn has_bit(self, bit: u32) -> bool {
        bit < Self::BITS && self.0 & (1u64 << bit) != 0
    }

    /// Whether no bit is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Set every bit of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear every bit of `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl fmt::Debug for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeMask({:#b})", self.0)
    }
}

impl BitOr for TypeMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TypeMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TypeMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for TypeMask {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for TypeMask {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
