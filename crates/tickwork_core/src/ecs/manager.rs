//! # Entity Manager
//!
//! Entity lifecycle and the per-tick execution loop.
//!
//! Each entity id moves through `FREE → LIVE → PENDING_DELETE → FREE`. Ids
//! come from a min-heap pool, so the smallest free id is always reused first.
//! Deletion is deferred: requests are queued and only applied when the next
//! [`EntityManager::tick`] starts, before any system runs.
//!
//! ## Membership index
//!
//! Every system keeps a dense flag per entity id recording whether that
//! entity satisfies its signature. Flags are updated only when an entity's
//! signature changes, never during dispatch. The list of systems matching a
//! given signature is memoized, so creating many entities of the same shape
//! costs one table scan in total.
//!
//! The manager keeps its own id→signature table. The [`Entity`] records
//! handed to systems are a mirror of it.
//!
//! ## Tick
//!
//! 1. Write `dt` into [`DeltaTime`].
//! 2. Drain the delete queue.
//! 3. Run every system in registration order over its member entities.
//! 4. Clear all event channels and creation latches.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::bundle::{user_signature, Bundle, ComponentSet};
use super::commands::Commands;
use super::component::{Component, DeltaTime};
use super::entity::{Entity, EntityId, IdPool};
use super::event::{Events, OnCreate};
use super::registry::Registry;
use super::signature::Signature;
use super::storage::{Dense, Storage, StorageKind};
use super::system::{SystemId, SystemTable};
use super::world::World;
use crate::config::EcsConfig;
use crate::error::{EcsError, EcsResult};

/// Counters of one [`EntityManager::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Entities reclaimed from the delete queue.
    pub deleted: usize,
    /// Systems that ran.
    pub systems_run: usize,
    /// Systems skipped because a singleton they need is not constructed.
    pub systems_skipped: usize,
    /// Total callback invocations.
    pub invocations: usize,
}

/// Owner of all ECS state once registration is complete.
pub struct EntityManager {
    config: EcsConfig,
    world: World,
    systems: SystemTable,
    pool: IdPool,
    /// Signature of every id; empty while free.
    signatures: Box<[Signature]>,
    /// Ids queued by [`EntityManager::delete_entity`] since the last drain.
    queued: Box<[bool]>,
    /// Matching system indices per distinct signature seen so far.
    memo: HashMap<Signature, Vec<usize>>,
    /// Entities passed to the current system, reused every tick.
    scratch: Vec<EntityId>,
    /// Buffer swapped with the [`Commands`] queue when draining.
    drain: Vec<EntityId>,
    alive: usize,
    ticks: u64,
}

impl EntityManager {
    /// Closes `registry` and prepares the entity pool.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        let (config, world, systems) = registry.into_parts();
        debug!(
            max_entities = config.max_entities,
            systems = systems.len(),
            components = world.component_count(),
            "entity manager ready"
        );

        Self {
            config,
            world,
            systems,
            pool: IdPool::new(config.max_entities),
            signatures: vec![Signature::EMPTY; config.max_entities].into_boxed_slice(),
            queued: vec![false; config.max_entities].into_boxed_slice(),
            memo: HashMap::new(),
            scratch: Vec::with_capacity(config.max_entities),
            drain: Vec::with_capacity(config.max_entities),
            alive: 0,
            ticks: 0,
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Entity capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.config.max_entities
    }

    /// Number of live entities, pending deletes included.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive
    }

    /// Number of ids available to new entities.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    /// Number of ticks run so far.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Read access to the storages.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Number of deletions queued for the next tick.
    #[must_use]
    pub fn pending_deletes(&self) -> usize {
        self.world.singleton::<Commands>().map_or(0, Commands::len)
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        id.index() < self.capacity() && !self.signature_at(id.index()).is_empty()
    }

    /// Current signature of `id`; empty for free ids.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[must_use]
    pub fn signature(&self, id: EntityId) -> Signature {
        match self.check_range(id) {
            Ok(index) => self.signature_at(index),
            Err(err) => panic!("{err}"),
        }
    }

    /// Id of the system registered under `name`.
    #[must_use]
    pub fn system_id(&self, name: &str) -> Option<SystemId> {
        let id = SystemId::of(name);
        self.systems.index_of(id).map(|_| id)
    }

    /// Name of system `id`.
    #[must_use]
    pub fn system_name(&self, id: SystemId) -> Option<&str> {
        let index = self.systems.index_of(id)?;
        self.systems.get(index).map(|entry| entry.name.as_str())
    }

    /// Whether `entity` is currently a member of `system`.
    #[must_use]
    pub fn is_member(&self, system: SystemId, entity: EntityId) -> bool {
        self.systems
            .index_of(system)
            .and_then(|index| self.systems.get(index))
            .and_then(|entry| entry.members.get(entity.index()).copied())
            .unwrap_or(false)
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity carrying `bundle`, plus the framework components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityCapacityExhausted`] if every id is live,
    /// [`EcsError::ReservedComponent`] if the bundle names a framework type,
    /// or the lookup errors for unregistered members.
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> EcsResult<EntityId> {
        let signature = B::signature(&self.world)?;
        let id = self.allocate()?;
        if let Err(err) = bundle.write(&mut self.world, id.index()) {
            self.release(id);
            return Err(err);
        }
        self.activate(id, signature);
        Ok(id)
    }

    /// Starts building an entity one component at a time.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityCapacityExhausted`] if every id is live.
    pub fn spawn(&mut self) -> EcsResult<EntityBuilder<'_>> {
        let id = self.allocate()?;
        Ok(EntityBuilder {
            manager: self,
            id,
            signature: Signature::EMPTY,
            error: None,
            built: false,
        })
    }

    /// Queues `id` for deletion at the start of the next tick.
    ///
    /// Free and already queued ids are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn delete_entity(&mut self, id: EntityId) {
        let index = match self.check_range(id) {
            Ok(index) => index,
            Err(err) => panic!("{err}"),
        };
        if self.signatures[index].is_empty() {
            warn!(entity = id.raw(), "ignoring delete of free entity");
            return;
        }
        if self.queued[index] {
            debug!(entity = id.raw(), "entity already queued for deletion");
            return;
        }

        self.queued[index] = true;
        self.commands_mut().delete(id);
        trace!(entity = id.raw(), "queued entity for deletion");
    }

    /// Queues every id in `ids` for deletion.
    ///
    /// # Panics
    ///
    /// Panics if any id is out of range.
    pub fn delete_entities(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        for id in ids {
            self.delete_entity(id);
        }
    }

    /// Adds the components of `bundle` to a live entity.
    ///
    /// Existing values of the same types are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`], [`EcsError::EntityNotAlive`],
    /// [`EcsError::ReservedComponent`], or the lookup errors.
    pub fn add_components<B: Bundle>(&mut self, id: EntityId, bundle: B) -> EcsResult<()> {
        let index = self.live_index(id)?;
        let added = B::signature(&self.world)?;
        bundle.write(&mut self.world, index)?;

        let old = self.signature_at(index);
        let new = old | added;
        if new != old {
            self.set_signature(index, new);
            self.register_entity_in_systems(index, new);
        }
        Ok(())
    }

    /// Removes the component types in `S` from a live entity.
    ///
    /// Types the entity does not carry are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`], [`EcsError::EntityNotAlive`],
    /// [`EcsError::ReservedComponent`], or the lookup errors.
    pub fn remove_components<S: ComponentSet>(&mut self, id: EntityId) -> EcsResult<()> {
        let index = self.live_index(id)?;
        let removed = S::signature(&self.world)?;

        let old = self.signature_at(index);
        let new = old.difference(removed);
        if new != old {
            self.set_signature(index, new);
            self.unregister_entity_from_systems(index, old, new);
        }
        Ok(())
    }

    // =========================================================================
    // Component access
    // =========================================================================

    /// Component `T` of entity `id`. Singletons ignore `id`.
    ///
    /// # Panics
    ///
    /// Panics with the [`EntityManager::try_component`] error message.
    #[must_use]
    pub fn get_component<T: Component>(&self, id: EntityId) -> &T {
        match self.try_component::<T>(id) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Component `T` of entity `id`, mutably. Singletons ignore `id`.
    ///
    /// # Panics
    ///
    /// Panics with the [`EntityManager::try_component_mut`] error message.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> &mut T {
        match self.try_component_mut::<T>(id) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Component `T` of entity `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityOutOfRange`], the lookup errors,
    /// [`EcsError::MissingComponent`] if the entity never declared a dense
    /// `T`, or [`EcsError::SingletonNotConstructed`].
    pub fn try_component<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        let index = self.component_index::<T>(id)?;
        let capacity = self.capacity();
        self.world
            .storage::<T>()?
            .get(index)
            .ok_or_else(|| vacant::<T>(id, capacity))
    }

    /// Component `T` of entity `id`, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ReservedComponent`] for [`Entity`], [`OnCreate`],
    /// [`DeltaTime`] and [`Commands`], which only the manager writes.
    /// Otherwise see [`EntityManager::try_component`].
    pub fn try_component_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        if self.world.is_reserved::<T>() {
            return Err(EcsError::ReservedComponent(T::name()));
        }
        let index = self.component_index::<T>(id)?;
        let capacity = self.capacity();
        self.world
            .storage_mut::<T>()?
            .get_mut(index)
            .ok_or_else(|| vacant::<T>(id, capacity))
    }

    /// The constructed instance of singleton `T`, if any.
    #[must_use]
    pub fn singleton<T: Component>(&self) -> Option<&T> {
        self.world.singleton::<T>()
    }

    /// The constructed instance of singleton `T`, mutably. `None` for
    /// [`DeltaTime`].
    pub fn singleton_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.world.singleton_mut::<T>()
    }

    /// Constructs a registered singleton that was left empty at startup.
    ///
    /// Systems naming `T` start running from the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonAlreadyConstructed`] on a second call,
    /// [`EcsError::NotASingleton`], or the lookup errors.
    pub fn construct_singleton<T: Component>(&mut self, value: T) -> EcsResult<()> {
        self.world.construct_singleton(value)
    }

    /// Appends `message` to the channel of `E`.
    ///
    /// Visible to every system running later in the current tick, or during
    /// the next tick if called between ticks.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] if no channel for `E` exists.
    pub fn broadcast<E: 'static>(&mut self, message: E) -> EcsResult<()> {
        let channel = self
            .world
            .storage_mut::<Events<E>>()?
            .get_mut(0)
            .ok_or(EcsError::SingletonNotConstructed(Events::<E>::name()))?;
        channel.send(message);
        Ok(())
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs one simulation step.
    pub fn tick(&mut self, dt: f32) -> TickStats {
        self.ticks += 1;
        if let Some(delta) = self.world.framework_singleton_mut::<DeltaTime>() {
            delta.set(dt);
        }

        let deleted = self.drain_deletes();
        let mut stats = self.dispatch();
        self.world.end_tick();

        stats.tick = self.ticks;
        stats.deleted = deleted;
        trace!(
            tick = stats.tick,
            deleted = stats.deleted,
            systems_run = stats.systems_run,
            systems_skipped = stats.systems_skipped,
            invocations = stats.invocations,
            "tick complete"
        );
        stats
    }

    fn drain_deletes(&mut self) -> usize {
        let mut queue = std::mem::take(&mut self.drain);
        self.commands_mut().swap_queue(&mut queue);

        let mut deleted = 0;
        for &id in &queue {
            let index = id.index();
            if index >= self.capacity() {
                warn!(entity = id.raw(), "ignoring delete of out-of-range entity");
                continue;
            }
            self.queued[index] = false;
            let signature = self.signatures[index];
            if signature.is_empty() {
                continue;
            }

            self.release_memberships(index, signature);
            self.world.reset_entity(index);
            self.signatures[index] = Signature::EMPTY;
            self.pool.push(id);
            self.alive -= 1;
            deleted += 1;
            trace!(entity = id.raw(), "deleted entity");
        }

        queue.clear();
        self.drain = queue;
        deleted
    }

    fn dispatch(&mut self) -> TickStats {
        let mut stats = TickStats::default();
        let mut scratch = std::mem::take(&mut self.scratch);

        for entry in self.systems.entries_mut() {
            if !entry.singletons_ready(&self.world) {
                trace!(system = entry.name.as_str(), "singleton missing, skipping system");
                stats.systems_skipped += 1;
                continue;
            }

            scratch.clear();
            for (index, &member) in entry.members.iter().enumerate() {
                if member && entry.predicates_hold(&self.world, index) {
                    scratch.push(EntityId::new(index as u32));
                }
            }

            entry.system.run(&mut self.world, &scratch);
            if entry.refreshes_records {
                refresh_records(&mut self.world, &self.signatures, &scratch);
            }
            stats.systems_run += 1;
            stats.invocations += scratch.len();
        }

        scratch.clear();
        self.scratch = scratch;
        stats
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Sets the membership flag of `index` in every system `signature` satisfies.
    fn register_entity_in_systems(&mut self, index: usize, signature: Signature) {
        let systems = &mut self.systems;
        let matching = self
            .memo
            .entry(signature)
            .or_insert_with(|| systems.matching(signature));
        for &system in matching.iter() {
            if let Some(entry) = systems.get_mut(system) {
                entry.members[index] = true;
            }
        }
    }

    /// Clears the flags of systems satisfied by `old` but not by `new`.
    fn unregister_entity_from_systems(&mut self, index: usize, old: Signature, new: Signature) {
        let systems = &mut self.systems;
        let matching = self
            .memo
            .entry(old)
            .or_insert_with(|| systems.matching(old));
        for &system in matching.iter() {
            if let Some(entry) = systems.get_mut(system) {
                if !new.contains(entry.signature) {
                    entry.members[index] = false;
                }
            }
        }
    }

    /// Clears every flag of a deleted entity.
    fn release_memberships(&mut self, index: usize, signature: Signature) {
        let systems = &mut self.systems;
        let matching = self
            .memo
            .entry(signature)
            .or_insert_with(|| systems.matching(signature));
        for &system in matching.iter() {
            if let Some(entry) = systems.get_mut(system) {
                entry.members[index] = false;
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn allocate(&mut self) -> EcsResult<EntityId> {
        self.pool.pop().ok_or(EcsError::EntityCapacityExhausted {
            capacity: self.capacity(),
        })
    }

    /// Makes a freshly allocated id live.
    fn activate(&mut self, id: EntityId, components: Signature) {
        let index = id.index();
        let signature = Signature::RESERVED | components;
        self.signatures[index] = signature;
        self.entity_table_mut().insert(index, Entity::live(id, signature));
        if let Ok(latches) = self.world.framework_storage_mut::<OnCreate>() {
            latches.insert(index, OnCreate::raised());
        }
        self.register_entity_in_systems(index, signature);
        self.alive += 1;
        trace!(entity = id.raw(), signature = %signature, "created entity");
    }

    /// Returns an allocated but never activated id to the pool.
    fn release(&mut self, id: EntityId) {
        self.world.reset_entity(id.index());
        self.pool.push(id);
    }

    /// Writes one component value into the slot of a not yet live entity.
    fn write_component<T: Component>(&mut self, index: usize, value: T) -> EcsResult<Signature> {
        let signature = <(T,)>::signature(&self.world)?;
        (value,).write(&mut self.world, index)?;
        Ok(signature)
    }

    fn check_range(&self, id: EntityId) -> EcsResult<usize> {
        let index = id.index();
        if index >= self.capacity() {
            return Err(EcsError::EntityOutOfRange {
                id: id.raw(),
                capacity: self.capacity(),
            });
        }
        Ok(index)
    }

    fn live_index(&self, id: EntityId) -> EcsResult<usize> {
        let index = self.check_range(id)?;
        if self.signature_at(index).is_empty() {
            return Err(EcsError::EntityNotAlive(id.raw()));
        }
        Ok(index)
    }

    /// Slot index for reading `T` from `id`: dense types must be declared.
    fn component_index<T: Component>(&self, id: EntityId) -> EcsResult<usize> {
        let index = self.check_range(id)?;
        let param = self.world.param::<T>()?;
        if param.kind() == StorageKind::Dense && !self.signature_at(index).contains(param.signature()) {
            return Err(EcsError::MissingComponent {
                id: id.raw(),
                component: T::name(),
            });
        }
        Ok(index)
    }

    fn entity_table_mut(&mut self) -> &mut Dense<Entity> {
        match self.world.framework_storage_mut::<Entity>() {
            Ok(table) => table,
            Err(err) => panic!("{err}"),
        }
    }

    fn commands_mut(&mut self) -> &mut Commands {
        match self.world.singleton_mut::<Commands>() {
            Some(commands) => commands,
            None => panic!("{}", EcsError::SingletonNotConstructed(Commands::name())),
        }
    }

    #[inline]
    fn signature_at(&self, index: usize) -> Signature {
        self.signatures.get(index).copied().unwrap_or(Signature::EMPTY)
    }

    fn set_signature(&mut self, index: usize, signature: Signature) {
        self.signatures[index] = signature;
        if let Some(record) = self.entity_table_mut().get_mut(index) {
            record.set_signature(signature);
        }
    }
}

/// Error for a slot that holds no value: an unconstructed singleton, or a
/// dense index past the storage end.
fn vacant<T: Component>(id: EntityId, capacity: usize) -> EcsError {
    match <T::Storage as Storage<T>>::KIND {
        StorageKind::Single => EcsError::SingletonNotConstructed(T::name()),
        StorageKind::Dense => EcsError::EntityOutOfRange {
            id: id.raw(),
            capacity,
        },
    }
}

/// Rewrites the [`Entity`] records of `ids` from the signature table.
fn refresh_records(world: &mut World, signatures: &[Signature], ids: &[EntityId]) {
    if let Ok(records) = world.framework_storage_mut::<Entity>() {
        for &id in ids {
            records.insert(id.index(), Entity::live(id, signatures[id.index()]));
        }
    }
}

// ============================================================================
// ENTITY BUILDER
// ============================================================================

/// Incremental entity construction, returned by [`EntityManager::spawn`].
///
/// The id is reserved when the builder is created and becomes live on
/// [`EntityBuilder::build`]. Dropping an unbuilt builder returns the id.
///
/// ```rust
/// use tickwork_core::{Component, Dense, EcsConfig, EntityManager, Registry};
///
/// #[derive(Default)]
/// struct Name(&'static str);
///
/// impl Component for Name {
///     type Storage = Dense<Self>;
/// }
///
/// let mut registry = Registry::new(EcsConfig::default()).unwrap();
/// registry.register_component::<Name>().unwrap();
/// let mut manager = EntityManager::new(registry);
///
/// let id = manager.spawn().unwrap().with(Name("scout")).build().unwrap();
/// assert_eq!(manager.get_component::<Name>(id).0, "scout");
/// ```
pub struct EntityBuilder<'m> {
    manager: &'m mut EntityManager,
    id: EntityId,
    signature: Signature,
    error: Option<EcsError>,
    built: bool,
}

impl EntityBuilder<'_> {
    /// The id the entity will have.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Attaches a component value.
    #[must_use]
    pub fn with<T: Component>(mut self, value: T) -> Self {
        if self.error.is_none() {
            match self.manager.write_component(self.id.index(), value) {
                Ok(signature) => self.signature |= signature,
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Declares a dependency on `T` without supplying a value.
    ///
    /// Meant for singletons and event channels, whose instance is shared.
    #[must_use]
    pub fn depends_on<T: Component>(mut self) -> Self {
        if self.error.is_none() {
            match user_signature::<T>(&self.manager.world) {
                Ok(signature) => self.signature |= signature,
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Makes the entity live.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`EntityBuilder::with`] or
    /// [`EntityBuilder::depends_on`]; the id is returned to the pool.
    pub fn build(mut self) -> EcsResult<EntityId> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.built = true;
        self.manager.activate(self.id, self.signature);
        Ok(self.id)
    }
}

impl Drop for EntityBuilder<'_> {
    fn drop(&mut self) {
        if !self.built {
            self.manager.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::storage::Single;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct A {
        value: i32,
    }

    impl Component for A {
        type Storage = Dense<Self>;
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct B {
        value: i32,
    }

    impl Component for B {
        type Storage = Dense<Self>;
    }

    struct Gravity(f32);

    impl Component for Gravity {
        type Storage = Single<Self>;
    }

    fn registry() -> Registry {
        let mut registry = Registry::new(EcsConfig::new(16, 8).unwrap()).unwrap();
        registry.register_component::<A>().unwrap();
        registry.register_component::<B>().unwrap();
        registry.register_singleton::<Gravity>().unwrap();
        registry
    }

    #[test]
    fn test_create_sets_reserved_bits() {
        let mut manager = EntityManager::new(registry());
        let id = manager.create_entity((A { value: 1 },)).unwrap();

        let signature = manager.signature(id);
        assert!(signature.contains(Signature::RESERVED));
        assert!(signature.contains(manager.world().lookup::<A>().unwrap()));
        assert_eq!(manager.get_component::<Entity>(id).id(), id);
        assert!(manager.get_component::<OnCreate>(id).is_new());
        assert_eq!(manager.alive_count(), 1);
    }

    #[test]
    fn test_reserved_component_in_bundle_is_rejected() {
        let mut manager = EntityManager::new(registry());
        assert_eq!(
            manager.create_entity((A::default(), DeltaTime::default())),
            Err(EcsError::ReservedComponent("DeltaTime"))
        );
        assert_eq!(manager.alive_count(), 0);
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut registry = Registry::new(EcsConfig::new(2, 1).unwrap()).unwrap();
        registry.register_component::<A>().unwrap();
        let mut manager = EntityManager::new(registry);

        manager.create_entity(()).unwrap();
        manager.create_entity(()).unwrap();
        assert_eq!(
            manager.create_entity(()),
            Err(EcsError::EntityCapacityExhausted { capacity: 2 })
        );
    }

    #[test]
    fn test_missing_component_is_reported() {
        let mut manager = EntityManager::new(registry());
        let id = manager.create_entity((A::default(),)).unwrap();

        assert_eq!(
            manager.try_component::<B>(id).err(),
            Some(EcsError::MissingComponent {
                id: id.raw(),
                component: "B",
            })
        );
        assert_eq!(
            manager.try_component::<Gravity>(id).err(),
            Some(EcsError::SingletonNotConstructed("Gravity"))
        );
        assert_eq!(
            manager.try_component::<A>(EntityId::new(99)).err(),
            Some(EcsError::EntityOutOfRange { id: 99, capacity: 16 })
        );
    }

    #[test]
    #[should_panic(expected = "does not carry component `B`")]
    fn test_get_component_panics_on_missing() {
        let mut manager = EntityManager::new(registry());
        let id = manager.create_entity((A::default(),)).unwrap();
        let _ = manager.get_component::<B>(id);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_delete_out_of_range_panics() {
        let mut manager = EntityManager::new(registry());
        manager.delete_entity(EntityId::new(16));
    }

    #[test]
    fn test_delete_is_deferred_and_deduplicated() {
        let mut manager = EntityManager::new(registry());
        let id = manager.create_entity((A::default(),)).unwrap();

        manager.delete_entity(id);
        manager.delete_entity(id);
        assert_eq!(manager.pending_deletes(), 1);
        assert!(manager.is_alive(id));

        let stats = manager.tick(0.0);
        assert_eq!(stats.deleted, 1);
        assert!(!manager.is_alive(id));
        assert_eq!(manager.signature(id), Signature::EMPTY);

        manager.delete_entity(id);
        assert_eq!(manager.pending_deletes(), 0);
    }

    #[test]
    fn test_queued_flag_clears_on_drain() {
        let mut manager = EntityManager::new(registry());
        let a = manager.create_entity((A::default(),)).unwrap();
        let b = manager.create_entity((A::default(),)).unwrap();

        manager.delete_entities([a, b, a, b, a]);
        assert_eq!(manager.pending_deletes(), 2);
        assert_eq!(manager.tick(0.0).deleted, 2);
        assert_eq!(manager.free_count(), 16);

        let reused = manager.create_entity(()).unwrap();
        assert_eq!(reused, a);
        manager.delete_entity(reused);
        assert_eq!(manager.pending_deletes(), 1);
        assert_eq!(manager.tick(0.0).deleted, 1);
    }

    #[test]
    fn test_framework_components_are_not_writable() {
        let mut manager = EntityManager::new(registry());
        let id = manager.create_entity((A::default(),)).unwrap();

        assert_eq!(
            manager.try_component_mut::<Entity>(id).err(),
            Some(EcsError::ReservedComponent("Entity"))
        );
        assert_eq!(
            manager.try_component_mut::<OnCreate>(id).err(),
            Some(EcsError::ReservedComponent("OnCreate"))
        );
        assert!(manager.singleton_mut::<DeltaTime>().is_none());
        assert_eq!(manager.get_component::<Entity>(id).id(), id);
    }

    #[test]
    #[should_panic(expected = "reserved for the framework")]
    fn test_get_component_mut_panics_on_entity_record() {
        let mut manager = EntityManager::new(registry());
        let id = manager.create_entity(()).unwrap();
        let _ = manager.get_component_mut::<Entity>(id);
    }

    #[test]
    fn test_vacant_slot_error_follows_storage_kind() {
        assert_eq!(
            vacant::<A>(EntityId::new(20), 16),
            EcsError::EntityOutOfRange { id: 20, capacity: 16 }
        );
        assert_eq!(
            vacant::<Gravity>(EntityId::new(0), 16),
            EcsError::SingletonNotConstructed("Gravity")
        );
    }

    #[test]
    fn test_add_and_remove_update_membership() {
        let mut registry = registry();
        let sum = registry
            .register_system("sum", |a: &mut A, b: &mut B| b.value += a.value)
            .unwrap();
        let mut manager = EntityManager::new(registry);

        let id = manager.create_entity((A { value: 2 },)).unwrap();
        assert!(!manager.is_member(sum, id));

        manager.add_components(id, (B { value: 1 },)).unwrap();
        assert!(manager.is_member(sum, id));
        manager.tick(0.0);
        assert_eq!(manager.get_component::<B>(id).value, 3);

        manager.remove_components::<(A,)>(id).unwrap();
        assert!(!manager.is_member(sum, id));
        manager.tick(0.0);
        assert_eq!(manager.get_component::<B>(id).value, 3);

        assert_eq!(
            manager.remove_components::<(Entity,)>(id),
            Err(EcsError::ReservedComponent("Entity"))
        );
    }

    #[test]
    fn test_mutation_of_free_entity_fails() {
        let mut manager = EntityManager::new(registry());
        assert_eq!(
            manager.add_components(EntityId::new(3), (A::default(),)),
            Err(EcsError::EntityNotAlive(3))
        );
    }

    #[test]
    fn test_builder_attaches_and_releases() {
        let mut manager = EntityManager::new(registry());

        let first = manager.spawn().unwrap().id();
        assert_eq!(first, EntityId::new(0));
        assert_eq!(manager.alive_count(), 0);

        let id = manager
            .spawn()
            .unwrap()
            .with(A { value: 5 })
            .depends_on::<Gravity>()
            .build()
            .unwrap();
        assert_eq!(id, EntityId::new(0));
        assert_eq!(manager.get_component::<A>(id).value, 5);
        assert!(manager
            .signature(id)
            .contains(manager.world().lookup::<Gravity>().unwrap()));

        let failed = manager.spawn().unwrap().with(Commands::default()).build();
        assert_eq!(failed, Err(EcsError::ReservedComponent("Commands")));
        assert_eq!(manager.spawn().unwrap().id(), EntityId::new(1));
    }

    #[test]
    fn test_late_singleton_construction_enables_system() {
        let mut registry = registry();
        registry
            .register_system("fall", |a: &mut A, g: &mut Gravity| a.value -= g.0 as i32)
            .unwrap();
        let mut manager = EntityManager::new(registry);
        let id = manager
            .spawn()
            .unwrap()
            .with(A { value: 10 })
            .depends_on::<Gravity>()
            .build()
            .unwrap();

        let stats = manager.tick(0.016);
        assert_eq!(stats.systems_skipped, 1);
        assert_eq!(manager.get_component::<A>(id).value, 10);

        manager.construct_singleton(Gravity(3.0)).unwrap();
        let stats = manager.tick(0.016);
        assert_eq!(stats.systems_run, 1);
        assert_eq!(stats.invocations, 1);
        assert_eq!(manager.get_component::<A>(id).value, 7);
    }

    #[test]
    fn test_delta_time_and_system_lookup() {
        let mut registry = registry();
        registry
            .register_system("clock", |a: &mut A, dt: &mut DeltaTime| {
                a.value = (dt.seconds() * 1000.0) as i32;
            })
            .unwrap();
        let mut manager = EntityManager::new(registry);
        let id = manager.create_entity((A::default(),)).unwrap();

        manager.tick(0.25);
        assert_eq!(manager.get_component::<A>(id).value, 250);
        assert!((manager.singleton::<DeltaTime>().unwrap().seconds() - 0.25).abs() < f32::EPSILON);

        let clock = manager.system_id("clock").unwrap();
        assert_eq!(manager.system_name(clock), Some("clock"));
        assert!(manager.system_id("render").is_none());
        assert_eq!(manager.tick_count(), 1);
    }
}
