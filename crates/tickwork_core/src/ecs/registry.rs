//! # Registry
//!
//! The startup registration surface.
//!
//! Every component type, singleton, event channel and system enters the ECS
//! through a [`Registry`]. Once registration is complete the registry is
//! moved into an [`EntityManager`](crate::EntityManager), which closes it:
//! no type or system can be added after the first entity exists.
//!
//! ```rust
//! use tickwork_core::{Component, Dense, EcsConfig, EntityManager, Registry};
//!
//! #[derive(Default)]
//! struct A {
//!     value: i32,
//! }
//!
//! impl Component for A {
//!     type Storage = Dense<Self>;
//! }
//!
//! let mut registry = Registry::new(EcsConfig::default()).unwrap();
//! registry.register_component::<A>().unwrap();
//! registry.register_system("inc", |a: &mut A| a.value += 42).unwrap();
//!
//! let mut manager = EntityManager::new(registry);
//! let id = manager.create_entity((A { value: 0 },)).unwrap();
//! manager.tick(0.0);
//! assert_eq!(manager.get_component::<A>(id).value, 42);
//! ```

use tracing::debug;

use super::component::Component;
use super::event::Events;
use super::signature::Signature;
use super::storage::{AnyStorage, Single, Storage, StorageKind};
use super::system::{IntoSystem, Predicate, System, SystemId, SystemTable};
use super::world::World;
use crate::config::EcsConfig;
use crate::error::{EcsError, EcsResult};

/// Component types, storages and systems of one ECS instance.
pub struct Registry {
    config: EcsConfig,
    world: World,
    systems: SystemTable,
}

impl Registry {
    /// Creates an empty registry with the framework types bound.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: EcsConfig) -> EcsResult<Self> {
        config.validate()?;
        debug!(
            max_entities = config.max_entities,
            max_systems = config.max_systems,
            "creating registry"
        );
        Ok(Self {
            config,
            world: World::new(config.max_entities),
            systems: SystemTable::new(config.max_systems, config.max_entities),
        })
    }

    /// Capacities this registry was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EcsConfig {
        &self.config
    }

    /// Read access to the storages, e.g. for building custom systems.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // =========================================================================
    // Signatures and storage
    // =========================================================================

    /// Signature bit of `T`, assigned on first reference.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SignatureBitsExhausted`] if all bits are taken.
    pub fn signature_of<T: Component>(&mut self) -> EcsResult<Signature> {
        self.world.signature_of::<T>()
    }

    /// Signature bit of `T` if it has one.
    #[must_use]
    pub fn lookup<T: Component>(&self) -> Option<Signature> {
        self.world.lookup::<T>()
    }

    /// Binds an explicitly built storage for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StorageAlreadyBound`] on a second bind,
    /// [`EcsError::StorageCapacityMismatch`] if a dense storage does not have
    /// `max_entities` slots, or [`EcsError::SignatureBitsExhausted`].
    pub fn bind_storage<T: Component>(&mut self, storage: T::Storage) -> EcsResult<Signature> {
        self.world.bind_storage::<T>(storage)
    }

    /// Registers `T` with storage sized to the entity capacity.
    ///
    /// Singleton types registered this way start unconstructed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`] if `T` already has storage
    /// (framework types included), or [`EcsError::SignatureBitsExhausted`].
    pub fn register_component<T: Component>(&mut self) -> EcsResult<Signature> {
        if self.world.is_bound::<T>() {
            return Err(EcsError::AlreadyRegistered(T::name()));
        }
        let storage = <T::Storage as Storage<T>>::allocate(self.config.max_entities);
        self.world.bind_storage::<T>(storage)
    }

    /// Registers singleton `T` without constructing it.
    ///
    /// Systems naming `T` are skipped until it is constructed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotASingleton`] for dense types, plus the errors
    /// of [`Registry::register_component`].
    pub fn register_singleton<T: Component>(&mut self) -> EcsResult<Signature> {
        if <T::Storage as Storage<T>>::KIND != StorageKind::Single {
            return Err(EcsError::NotASingleton(T::name()));
        }
        self.register_component::<T>()
    }

    /// Registers and constructs singleton `T`.
    ///
    /// # Errors
    ///
    /// See [`Registry::register_singleton`].
    pub fn register_singleton_with<T: Component>(&mut self, value: T) -> EcsResult<Signature> {
        let signature = self.register_singleton::<T>()?;
        self.world.construct_singleton(value)?;
        Ok(signature)
    }

    /// Constructs a previously registered singleton.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonAlreadyConstructed`] on a second call,
    /// [`EcsError::NotASingleton`], or the lookup errors.
    pub fn construct_singleton<T: Component>(&mut self, value: T) -> EcsResult<()> {
        self.world.construct_singleton(value)
    }

    /// Whether singleton `T` has been constructed.
    #[must_use]
    pub fn is_constructed<T: Component>(&self) -> bool {
        self.world
            .storage::<T>()
            .ok()
            .and_then(|storage| storage.as_any().downcast_ref::<Single<T>>())
            .is_some_and(|single| single.is_constructed())
    }

    /// Registers the event channel for messages of type `E`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`] if the channel exists.
    pub fn register_event<E: 'static>(&mut self) -> EcsResult<Signature> {
        self.register_singleton_with::<Events<E>>(Events::new())
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers a closure system under `name`.
    ///
    /// Systems run in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemTableFull`], [`EcsError::DuplicateSystem`],
    /// [`EcsError::DuplicateParameter`], or [`EcsError::Unregistered`] /
    /// [`EcsError::StorageNotBound`] for an unknown parameter type.
    pub fn register_system<P, S>(&mut self, name: &str, system: S) -> EcsResult<SystemId>
    where
        S: IntoSystem<P>,
    {
        let system = system.into_system(&self.world)?;
        self.register_boxed_system(name, Box::new(system))
    }

    /// Registers a custom [`System`] implementation under `name`.
    ///
    /// # Errors
    ///
    /// See [`Registry::register_system`].
    pub fn register_boxed_system(&mut self, name: &str, system: Box<dyn System>) -> EcsResult<SystemId> {
        let signature = system.required_signature();
        let id = self.systems.push(name, system)?;
        debug!(system = name, id = %id, signature = %signature, "registered system");
        Ok(id)
    }

    /// Attaches a predicate on component `T` to the system called `system`.
    ///
    /// A member entity is only passed to the system if every predicate
    /// attached to it holds for that entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSystem`], the lookup errors for `T`, or
    /// [`EcsError::PredicateOutsideSignature`] if `T` is not a dense
    /// component the system already requires.
    pub fn require<T, F>(&mut self, system: &str, predicate: F) -> EcsResult<()>
    where
        T: Component,
        F: Fn(&T) -> bool + 'static,
    {
        let index = self
            .systems
            .index_of(SystemId::of(system))
            .ok_or_else(|| EcsError::UnknownSystem(system.to_string()))?;
        let param = self.world.param::<T>()?;

        let outside = || EcsError::PredicateOutsideSignature {
            system: system.to_string(),
            component: T::name(),
        };
        let entry = self.systems.get_mut(index).ok_or_else(outside)?;
        if param.kind() != StorageKind::Dense || !entry.signature.contains(param.signature()) {
            return Err(outside());
        }

        let predicate = Predicate::new::<T>(param.index(), predicate);
        debug!(system = system, component = predicate.component(), "attached predicate");
        entry.predicates.push(predicate);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (EcsConfig, World, SystemTable) {
        (self.config, self.world, self.systems)
    }
}
