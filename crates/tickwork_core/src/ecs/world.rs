//! # ECS World
//!
//! The container of every component storage.
//!
//! The world maps each component type to its signature bit and its bound
//! storage. All storages are allocated when they are bound, sized to the
//! entity capacity, so nothing is allocated while entities come and go.
//!
//! Four framework-owned types are bound when the world is created:
//!
//! | Type          | Bit                      | Storage    |
//! |---------------|--------------------------|------------|
//! | [`DeltaTime`] | [`Signature::DELTA_TIME`]| singleton  |
//! | [`Entity`]    | [`Signature::ENTITY`]    | dense      |
//! | [`OnCreate`]  | [`Signature::EVENTS`]    | dense      |
//! | [`Commands`]  | none                     | singleton  |

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use super::commands::Commands;
use super::component::{Component, DeltaTime};
use super::entity::Entity;
use super::event::OnCreate;
use super::signature::{BitAllocator, Signature};
use super::storage::{AnyStorage, Dense, Single, Storage, StorageKind};
use crate::error::{EcsError, EcsResult};

/// Registration record of one component type.
#[derive(Clone, Copy, Debug)]
struct ComponentInfo {
    name: &'static str,
    signature: Signature,
    kind: StorageKind,
    per_tick: bool,
    reserved: bool,
    bound: bool,
}

/// A resolved system parameter: which storage to borrow and which bit it
/// contributes to the system's signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamInfo {
    index: usize,
    signature: Signature,
    kind: StorageKind,
    name: &'static str,
}

impl ParamInfo {
    /// Position of the storage inside the world.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Bit contributed to the system signature (empty for [`Commands`]).
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// Storage kind of the parameter.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Component type name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// All component storages of one ECS instance.
pub struct World {
    capacity: usize,
    bits: BitAllocator,
    types: HashMap<TypeId, usize>,
    infos: Vec<ComponentInfo>,
    /// `None` while unbound, or while a system has the storage checked out.
    storages: Vec<Option<Box<dyn AnyStorage>>>,
}

impl World {
    /// Creates a world for `capacity` entities with the framework types bound.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let mut world = Self {
            capacity,
            bits: BitAllocator::new(),
            types: HashMap::new(),
            infos: Vec::new(),
            storages: Vec::new(),
        };

        world.bind_reserved::<DeltaTime>(
            Signature::DELTA_TIME,
            Single::with_value(DeltaTime::default()),
        );
        world.bind_reserved::<Entity>(Signature::ENTITY, Dense::new(capacity));
        world.bind_reserved::<OnCreate>(Signature::EVENTS, Dense::new(capacity));
        world.bind_reserved::<Commands>(
            Signature::EMPTY,
            Single::with_value(Commands::with_capacity(capacity)),
        );

        world
    }

    fn bind_reserved<T: Component>(&mut self, signature: Signature, storage: T::Storage) {
        let index = self.infos.len();
        self.types.insert(TypeId::of::<T>(), index);
        self.infos.push(ComponentInfo {
            name: T::name(),
            signature,
            kind: <T::Storage as Storage<T>>::KIND,
            per_tick: T::PER_TICK,
            reserved: true,
            bound: true,
        });
        self.storages.push(Some(Box::new(storage)));
    }

    /// Entity capacity every dense storage is sized to.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of known component types, framework types included.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.infos.len()
    }

    /// Signature bits still available to new types.
    #[inline]
    #[must_use]
    pub const fn remaining_bits(&self) -> u32 {
        self.bits.remaining()
    }

    // =========================================================================
    // Signatures
    // =========================================================================

    /// Returns the signature of `T`, assigning the next free bit on first use.
    ///
    /// Idempotent: every later call returns the same bit.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SignatureBitsExhausted`] if no bit is left.
    pub(crate) fn signature_of<T: Component>(&mut self) -> EcsResult<Signature> {
        if let Some(&index) = self.types.get(&TypeId::of::<T>()) {
            return Ok(self.infos[index].signature);
        }

        let signature = self.bits.next_bit(T::name())?;
        let index = self.infos.len();
        self.types.insert(TypeId::of::<T>(), index);
        self.infos.push(ComponentInfo {
            name: T::name(),
            signature,
            kind: <T::Storage as Storage<T>>::KIND,
            per_tick: T::PER_TICK,
            reserved: false,
            bound: false,
        });
        self.storages.push(None);

        debug!(component = T::name(), signature = signature.bits(), "assigned signature bit");
        Ok(signature)
    }

    /// Signature of `T` if it has one, without assigning.
    #[must_use]
    pub fn lookup<T: Component>(&self) -> Option<Signature> {
        self.types
            .get(&TypeId::of::<T>())
            .map(|&index| self.infos[index].signature)
    }

    /// Whether storage for `T` is bound.
    #[must_use]
    pub fn is_bound<T: Component>(&self) -> bool {
        self.types
            .get(&TypeId::of::<T>())
            .is_some_and(|&index| self.infos[index].bound)
    }

    /// Whether `T` is framework-owned.
    #[must_use]
    pub fn is_reserved<T: Component>(&self) -> bool {
        self.types
            .get(&TypeId::of::<T>())
            .is_some_and(|&index| self.infos[index].reserved)
    }

    // =========================================================================
    // Storage binding
    // =========================================================================

    /// Binds the backing storage of `T`. Assigns its bit if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StorageAlreadyBound`] if `T` already has storage,
    /// [`EcsError::StorageCapacityMismatch`] if a dense storage is not sized
    /// to the entity capacity, or [`EcsError::SignatureBitsExhausted`] if `T`
    /// needs a bit and none is left.
    pub(crate) fn bind_storage<T: Component>(&mut self, storage: T::Storage) -> EcsResult<Signature> {
        if let Some(actual) = storage.slot_count() {
            if actual != self.capacity {
                return Err(EcsError::StorageCapacityMismatch {
                    name: T::name(),
                    expected: self.capacity,
                    actual,
                });
            }
        }
        let signature = self.signature_of::<T>()?;
        let index = self.types[&TypeId::of::<T>()];
        let info = &mut self.infos[index];
        if info.bound {
            return Err(EcsError::StorageAlreadyBound(info.name));
        }
        info.bound = true;
        self.storages[index] = Some(Box::new(storage));

        debug!(component = T::name(), kind = ?info.kind, "bound storage");
        Ok(signature)
    }

    fn bound_index<T: Component>(&self) -> EcsResult<usize> {
        let index = *self
            .types
            .get(&TypeId::of::<T>())
            .ok_or(EcsError::Unregistered(T::name()))?;
        if !self.infos[index].bound {
            return Err(EcsError::StorageNotBound(T::name()));
        }
        Ok(index)
    }

    /// Signature of a bound type. Used once registration is closed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] or [`EcsError::StorageNotBound`].
    pub fn bound_signature<T: Component>(&self) -> EcsResult<Signature> {
        let index = self.bound_index::<T>()?;
        Ok(self.infos[index].signature)
    }

    /// Resolves `T` as a system parameter.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] or [`EcsError::StorageNotBound`].
    pub fn param<T: Component>(&self) -> EcsResult<ParamInfo> {
        let index = self.bound_index::<T>()?;
        let info = &self.infos[index];
        Ok(ParamInfo {
            index,
            signature: info.signature,
            kind: info.kind,
            name: info.name,
        })
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    /// The storage of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] or [`EcsError::StorageNotBound`].
    pub fn storage<T: Component>(&self) -> EcsResult<&T::Storage> {
        let index = self.bound_index::<T>()?;
        self.storages[index]
            .as_deref()
            .and_then(|storage| storage.as_any().downcast_ref::<T::Storage>())
            .ok_or(EcsError::StorageNotBound(T::name()))
    }

    /// The storage of `T`, mutably.
    ///
    /// [`DeltaTime`], [`Entity`] and [`OnCreate`] are maintained by the
    /// manager and are read-only here. [`Commands`] stays writable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ReservedComponent`] for the read-only framework
    /// types, or [`EcsError::Unregistered`] or [`EcsError::StorageNotBound`].
    pub fn storage_mut<T: Component>(&mut self) -> EcsResult<&mut T::Storage> {
        if self.is_read_only::<T>() {
            return Err(EcsError::ReservedComponent(T::name()));
        }
        self.framework_storage_mut::<T>()
    }

    /// Whether `T` is a framework type callers may not write.
    #[must_use]
    pub fn is_read_only<T: Component>(&self) -> bool {
        self.is_reserved::<T>() && TypeId::of::<T>() != TypeId::of::<Commands>()
    }

    /// [`World::storage_mut`] without the read-only check.
    pub(crate) fn framework_storage_mut<T: Component>(&mut self) -> EcsResult<&mut T::Storage> {
        let index = self.bound_index::<T>()?;
        self.storages[index]
            .as_deref_mut()
            .and_then(|storage| storage.as_any_mut().downcast_mut::<T::Storage>())
            .ok_or(EcsError::StorageNotBound(T::name()))
    }

    /// The constructed instance of singleton `T`, if any.
    #[must_use]
    pub fn singleton<T: Component>(&self) -> Option<&T> {
        self.storage::<T>().ok()?.get(0)
    }

    /// The constructed instance of singleton `T`, mutably. `None` for the
    /// read-only framework types.
    pub fn singleton_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.storage_mut::<T>().ok()?.get_mut(0)
    }

    /// [`World::singleton_mut`] without the read-only check.
    pub(crate) fn framework_singleton_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.framework_storage_mut::<T>().ok()?.get_mut(0)
    }

    /// Constructs singleton `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotASingleton`] for dense types,
    /// [`EcsError::SingletonAlreadyConstructed`] on a second construction, or
    /// the lookup errors of [`World::storage_mut`].
    pub(crate) fn construct_singleton<T: Component>(&mut self, value: T) -> EcsResult<()> {
        let storage = self.storage_mut::<T>()?;
        let single = storage
            .as_any_mut()
            .downcast_mut::<Single<T>>()
            .ok_or(EcsError::NotASingleton(T::name()))?;
        single.construct(value)?;
        debug!(singleton = T::name(), "constructed singleton");
        Ok(())
    }

    // =========================================================================
    // Dispatch support
    // =========================================================================

    /// Checks out a storage for the duration of one system run.
    ///
    /// # Panics
    ///
    /// Panics if the storage is unbound or already checked out. Parameter
    /// lists are validated at registration, so this indicates a logic bug.
    pub(crate) fn take_storage(&mut self, index: usize) -> Box<dyn AnyStorage> {
        match self.storages.get_mut(index).and_then(Option::take) {
            Some(storage) => storage,
            None => panic!(
                "{}",
                EcsError::StorageNotBound(self.infos.get(index).map_or("?", |info| info.name))
            ),
        }
    }

    /// Returns a storage checked out with [`World::take_storage`].
    pub(crate) fn restore_storage(&mut self, index: usize, storage: Box<dyn AnyStorage>) {
        debug_assert!(self.storages[index].is_none(), "storage restored twice");
        self.storages[index] = Some(storage);
    }

    /// Type-erased storage at `index`.
    pub(crate) fn storage_at(&self, index: usize) -> Option<&dyn AnyStorage> {
        self.storages.get(index).and_then(Option::as_deref)
    }

    /// Whether the storage at `index` can hand out references.
    pub(crate) fn is_ready_at(&self, index: usize) -> bool {
        self.storage_at(index).is_some_and(|storage| storage.is_ready())
    }

    /// Resets the slots of a deleted entity in every dense storage.
    pub(crate) fn reset_entity(&mut self, index: usize) {
        for storage in self.storages.iter_mut().flatten() {
            storage.reset_slot(index);
        }
    }

    /// Clears every event channel and latch.
    pub(crate) fn end_tick(&mut self) {
        for (info, storage) in self.infos.iter().zip(self.storages.iter_mut()) {
            if info.per_tick {
                if let Some(storage) = storage.as_deref_mut() {
                    storage.end_tick();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Position {
        x: f32,
    }

    impl Component for Position {
        type Storage = Dense<Self>;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Velocity {
        x: f32,
    }

    impl Component for Velocity {
        type Storage = Dense<Self>;
    }

    struct Clock(u64);

    impl Component for Clock {
        type Storage = Single<Self>;
    }

    #[test]
    fn test_world_creation() {
        let world = World::new(1000);
        assert_eq!(world.capacity(), 1000);
        assert_eq!(world.component_count(), 4);
        assert_eq!(world.lookup::<DeltaTime>(), Some(Signature::DELTA_TIME));
        assert_eq!(world.lookup::<Entity>(), Some(Signature::ENTITY));
        assert_eq!(world.lookup::<OnCreate>(), Some(Signature::EVENTS));
        assert_eq!(world.lookup::<Commands>(), Some(Signature::EMPTY));
        assert!(world.is_reserved::<Commands>());
    }

    #[test]
    fn test_signature_is_idempotent_and_unique() {
        let mut world = World::new(8);
        let pos = world.signature_of::<Position>().unwrap();
        let vel = world.signature_of::<Velocity>().unwrap();

        assert_eq!(world.signature_of::<Position>().unwrap(), pos);
        assert_ne!(pos, vel);
        assert!(!pos.intersects(Signature::RESERVED));
        assert_eq!(pos.count(), 1);
    }

    #[test]
    fn test_bind_once() {
        let mut world = World::new(8);
        assert!(!world.is_bound::<Position>());

        world.bind_storage::<Position>(Dense::new(8)).unwrap();
        assert!(world.is_bound::<Position>());
        assert_eq!(
            world.bind_storage::<Position>(Dense::new(8)),
            Err(EcsError::StorageAlreadyBound("Position"))
        );
    }

    #[test]
    fn test_bind_rejects_wrong_capacity() {
        let mut world = World::new(8);
        assert_eq!(
            world.bind_storage::<Position>(Dense::new(2)),
            Err(EcsError::StorageCapacityMismatch {
                name: "Position",
                expected: 8,
                actual: 2,
            })
        );
        // A rejected bind leaves the type without a bit.
        assert_eq!(world.lookup::<Position>(), None);
        assert_eq!(world.remaining_bits(), 29);

        world.bind_storage::<Position>(Dense::new(8)).unwrap();
        world.bind_storage::<Clock>(Single::new()).unwrap();
    }

    #[test]
    fn test_framework_types_are_read_only() {
        let mut world = World::new(8);
        assert_eq!(
            world.storage_mut::<Entity>().err(),
            Some(EcsError::ReservedComponent("Entity"))
        );
        assert_eq!(
            world.storage_mut::<OnCreate>().err(),
            Some(EcsError::ReservedComponent("OnCreate"))
        );
        assert!(world.singleton_mut::<DeltaTime>().is_none());
        assert!(world.singleton_mut::<Commands>().is_some());
        assert!(world.storage::<Entity>().is_ok());
        assert!(world.framework_storage_mut::<Entity>().is_ok());
    }

    #[test]
    fn test_unbound_access_fails() {
        let mut world = World::new(8);
        assert_eq!(
            world.storage::<Position>().err(),
            Some(EcsError::Unregistered("Position"))
        );
        world.signature_of::<Position>().unwrap();
        assert_eq!(
            world.param::<Position>().err(),
            Some(EcsError::StorageNotBound("Position"))
        );
    }

    #[test]
    fn test_singleton_construction() {
        let mut world = World::new(8);
        world.bind_storage::<Clock>(Single::new()).unwrap();
        assert!(world.singleton::<Clock>().is_none());

        world.construct_singleton(Clock(3)).unwrap();
        assert_eq!(world.singleton::<Clock>().map(|c| c.0), Some(3));
        assert_eq!(
            world.construct_singleton(Clock(4)),
            Err(EcsError::SingletonAlreadyConstructed("Clock"))
        );

        world.bind_storage::<Position>(Dense::new(8)).unwrap();
        assert_eq!(
            world.construct_singleton(Position::default()),
            Err(EcsError::NotASingleton("Position"))
        );
    }

    #[test]
    fn test_take_and_restore() {
        let mut world = World::new(8);
        world.bind_storage::<Position>(Dense::new(8)).unwrap();
        let index = world.param::<Position>().unwrap().index();

        let storage = world.take_storage(index);
        assert!(world.storage::<Position>().is_err());
        assert!(!world.is_ready_at(index));

        world.restore_storage(index, storage);
        assert!(world.storage::<Position>().is_ok());
        assert!(world.is_ready_at(index));
    }

    #[test]
    fn test_reset_entity_clears_dense_slots() {
        let mut world = World::new(8);
        world.bind_storage::<Position>(Dense::new(8)).unwrap();
        world
            .storage_mut::<Position>()
            .unwrap()
            .insert(2, Position { x: 4.0 });

        world.reset_entity(2);
        assert_eq!(
            world.storage::<Position>().unwrap().get(2),
            Some(&Position::default())
        );
    }
}
