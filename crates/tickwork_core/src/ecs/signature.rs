//! # Signatures
//!
//! A signature is a 32-bit mask naming a set of component types: the ones an
//! entity carries, or the ones a system requires.
//!
//! ```text
//! bit:   31 ........................ 3   2        1       0
//!        [ user components / events ]  [OnCreate][Entity][DeltaTime]
//! ```
//!
//! The low [`Signature::RESERVED_BITS`] bits belong to framework-owned
//! pseudo-components and are set on every live entity. User types receive
//! the remaining bits in registration order.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::error::{EcsError, EcsResult};

/// Bitmask of component types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Signature(u32);

impl Signature {
    /// Width of the signature word.
    pub const MAX_BITS: u32 = u32::BITS;

    /// Number of low bits reserved for framework pseudo-components.
    pub const RESERVED_BITS: u32 = 3;

    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Bit of the [`DeltaTime`](super::DeltaTime) singleton.
    pub const DELTA_TIME: Self = Self(1 << 0);

    /// Bit of the per-entity [`Entity`](super::Entity) record.
    pub const ENTITY: Self = Self(1 << 1);

    /// Bit of the per-entity event latch ([`OnCreate`](super::OnCreate)).
    pub const EVENTS: Self = Self(1 << 2);

    /// All reserved bits. Every live entity carries these.
    pub const RESERVED: Self = Self((1 << Self::RESERVED_BITS) - 1);

    /// Signature with only `bit` set.
    ///
    /// # Panics
    ///
    /// Panics if `bit` is not below [`Signature::MAX_BITS`].
    #[inline]
    #[must_use]
    pub const fn from_bit(bit: u32) -> Self {
        assert!(bit < Self::MAX_BITS, "signature bit out of range");
        Self(1 << bit)
    }

    /// Raw mask value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if every bit of `required` is also set in `self`.
    ///
    /// This is the membership test: a system with signature `required`
    /// accepts an entity with signature `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// `true` if the two sets share at least one bit.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Set union.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Bits of `self` that are not in `other`.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of component types in the set.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl BitOr for Signature {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Signature {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Signature {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#034b}", self.0)
    }
}

/// Hands out signature bits in registration order, past the reserved bits.
#[derive(Debug)]
pub(crate) struct BitAllocator {
    next: u32,
}

impl BitAllocator {
    pub(crate) const fn new() -> Self {
        Self {
            next: Signature::RESERVED_BITS,
        }
    }

    /// Returns the next free bit.
    pub(crate) fn next_bit(&mut self, name: &'static str) -> EcsResult<Signature> {
        if self.next >= Signature::MAX_BITS {
            return Err(EcsError::SignatureBitsExhausted {
                name,
                max: Signature::MAX_BITS,
            });
        }
        let signature = Signature::from_bit(self.next);
        self.next += 1;
        Ok(signature)
    }

    /// Number of bits still available to user types.
    pub(crate) const fn remaining(&self) -> u32 {
        Signature::MAX_BITS - self.next
    }
}
