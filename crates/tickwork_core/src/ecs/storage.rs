//! # Component Storage
//!
//! Pre-allocated storage with zero runtime allocations.
//!
//! - [`Dense<T>`] holds `capacity` slots, indexed by entity id. Slots of
//!   free ids hold default values that no system ever reads.
//! - [`Single<T>`] holds at most one instance, shared by every entity that
//!   depends on it. It is bound empty and constructed exactly once.
//!
//! The [`Registry`](crate::Registry) keeps every storage behind the
//! type-erased [`AnyStorage`] trait and downcasts back to the concrete type
//! when a system or accessor needs it.

use std::any::Any;

use super::component::Component;
use crate::error::{EcsError, EcsResult};

/// How a component type is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// One slot per entity id.
    Dense,
    /// One shared instance.
    Single,
}

/// Type-erased view of a storage, as held by the registry.
pub trait AnyStorage: Any {
    /// Upcast for downcasting to the concrete storage.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete storage.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Storage kind.
    fn kind(&self) -> StorageKind;

    /// Number of per-entity slots, or `None` for a singleton.
    fn slot_count(&self) -> Option<usize>;

    /// Whether the storage can hand out references. Always `true` for dense
    /// storage; `true` for a singleton once it is constructed.
    fn is_ready(&self) -> bool;

    /// Resets per-tick instances (events, latches).
    fn end_tick(&mut self);

    /// Restores the slot of a deleted entity to its default value.
    fn reset_slot(&mut self, index: usize);
}

/// Typed storage for component `T`.
pub trait Storage<T>: AnyStorage + Sized {
    /// Storage kind, known at compile time.
    const KIND: StorageKind;

    /// Creates the storage for `capacity` entities. Singletons start empty.
    fn allocate(capacity: usize) -> Self;

    /// Reference to the value for `index`, if any.
    fn get(&self, index: usize) -> Option<&T>;

    /// Mutable reference to the value for `index`, if any.
    fn get_mut(&mut self, index: usize) -> Option<&mut T>;

    /// Mutable reference used by the dispatch loop.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the singleton is not constructed.
    fn slot(&mut self, index: usize) -> &mut T;

    /// Writes the initial value of an entity's slot.
    ///
    /// Singletons ignore per-entity values: only the dependency is recorded.
    fn insert(&mut self, index: usize, value: T);
}

// ============================================================================
// DENSE STORAGE
// ============================================================================

/// One pre-allocated slot per entity id.
///
/// # Example
///
/// ```rust
/// use tickwork_core::{Component, Dense, Storage};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Mass(f32);
///
/// impl Component for Mass {
///     type Storage = Dense<Self>;
/// }
///
/// let mut masses: Dense<Mass> = Dense::new(16);
/// masses.insert(3, Mass(2.5));
/// assert_eq!(masses.get(3), Some(&Mass(2.5)));
/// ```
pub struct Dense<T> {
    data: Box<[T]>,
}

impl<T: Default> Dense<T> {
    /// Creates storage of `capacity` default-initialized slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        let data = (0..capacity).map(|_| T::default()).collect();
        Self { data }
    }
}

impl<T> Dense<T> {
    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// All slots, live or not.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterates over all slots with their indices.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.data.iter().enumerate()
    }
}

impl<T: Component + Default> AnyStorage for Dense<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Dense
    }

    fn slot_count(&self) -> Option<usize> {
        Some(self.data.len())
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn end_tick(&mut self) {
        if T::PER_TICK {
            for slot in self.data.iter_mut() {
                slot.end_tick();
            }
        }
    }

    fn reset_slot(&mut self, index: usize) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = T::default();
        }
    }
}

impl<T: Component + Default> Storage<T> for Dense<T> {
    const KIND: StorageKind = StorageKind::Dense;

    fn allocate(capacity: usize) -> Self {
        Self::new(capacity)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    #[inline]
    fn slot(&mut self, index: usize) -> &mut T {
        let capacity = self.data.len();
        match self.data.get_mut(index) {
            Some(slot) => slot,
            None => panic!(
                "{}",
                EcsError::EntityOutOfRange {
                    id: index as u32,
                    capacity,
                }
            ),
        }
    }

    #[inline]
    fn insert(&mut self, index: usize, value: T) {
        *self.slot(index) = value;
    }
}

// ============================================================================
// SINGLETON STORAGE
// ============================================================================

/// Exactly one instance, shared by every entity that depends on it.
pub struct Single<T> {
    value: Option<T>,
}

impl<T> Single<T> {
    /// Creates empty singleton storage.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Creates storage that already holds its instance.
    #[must_use]
    pub const fn with_value(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Whether the instance exists.
    #[inline]
    #[must_use]
    pub const fn is_constructed(&self) -> bool {
        self.value.is_some()
    }

    /// The shared instance, if constructed.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The shared instance, if constructed.
    #[inline]
    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }
}

impl<T: Component> Single<T> {
    /// Constructs the instance.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonAlreadyConstructed`] if it already exists.
    pub fn construct(&mut self, value: T) -> EcsResult<()> {
        if self.value.is_some() {
            return Err(EcsError::SingletonAlreadyConstructed(T::name()));
        }
        self.value = Some(value);
        Ok(())
    }
}

impl<T> Default for Single<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> AnyStorage for Single<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Single
    }

    fn slot_count(&self) -> Option<usize> {
        None
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn end_tick(&mut self) {
        if T::PER_TICK {
            if let Some(value) = self.value.as_mut() {
                value.end_tick();
            }
        }
    }

    fn reset_slot(&mut self, _index: usize) {}
}

impl<T: Component> Storage<T> for Single<T> {
    const KIND: StorageKind = StorageKind::Single;

    fn allocate(_capacity: usize) -> Self {
        Self::new()
    }

    #[inline]
    fn get(&self, _index: usize) -> Option<&T> {
        self.value.as_ref()
    }

    #[inline]
    fn get_mut(&mut self, _index: usize) -> Option<&mut T> {
        self.value.as_mut()
    }

    #[inline]
    fn slot(&mut self, _index: usize) -> &mut T {
        match self.value.as_mut() {
            Some(value) => value,
            None => panic!("{}", EcsError::SingletonNotConstructed(T::name())),
        }
    }

    #[inline]
    fn insert(&mut self, _index: usize, _value: T) {}
}
