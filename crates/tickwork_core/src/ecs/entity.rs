//! # Entity Management
//!
//! Entities are plain indices into the component arrays. All entity state
//! lives in the component slots at that index; the only per-entity record
//! the framework keeps is the [`Entity`] pseudo-component holding the id and
//! the current signature.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use super::component::Component;
use super::signature::Signature;
use super::storage::Dense;

/// Identifier of an entity: an index in `[0, max_entities)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity id from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as a slot index into component arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-entity record kept by the framework.
///
/// Systems may request `&mut Entity` to learn which entity they are
/// processing. The record mirrors the manager's own signature table: a
/// system that overwrites it is corrected after its run, and the manager
/// never reads lifecycle state back from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    signature: Signature,
}

impl Entity {
    /// Creates a live record.
    #[inline]
    #[must_use]
    pub(crate) const fn live(id: EntityId, signature: Signature) -> Self {
        Self { id, signature }
    }

    /// The entity's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's current signature.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// Whether the slot holds a live entity.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.signature.is_empty()
    }

    #[inline]
    pub(crate) fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }
}

impl Component for Entity {
    type Storage = Dense<Self>;
}

/// Pool of free entity ids.
///
/// A min-heap, so the smallest free id is always handed out first and live
/// ids stay dense at the front of the component arrays. The heap is sized to
/// the full capacity up front; returning ids never reallocates.
pub(crate) struct IdPool {
    free: BinaryHeap<Reverse<u32>>,
    capacity: usize,
}

impl IdPool {
    /// Creates a pool with every id in `[0, capacity)` free.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= u32::MAX as usize, "capacity exceeds id space");
        let ids: Vec<Reverse<u32>> = (0..capacity as u32).map(Reverse).collect();
        Self {
            free: BinaryHeap::from(ids),
            capacity,
        }
    }

    /// Takes the smallest free id.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<EntityId> {
        self.free.pop().map(|Reverse(index)| EntityId::new(index))
    }

    /// Returns an id to the pool.
    #[inline]
    pub(crate) fn push(&mut self, id: EntityId) {
        debug_assert!(id.index() < self.capacity, "id out of range");
        self.free.push(Reverse(id.raw()));
    }

    /// Number of ids currently free.
    #[inline]
    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }
}
