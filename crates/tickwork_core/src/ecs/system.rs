//! # Systems
//!
//! A **system** is a unit of simulation logic run once per qualifying entity
//! per tick. It declares the component types it touches; the OR of their
//! bits is its required signature, and an entity qualifies when its own
//! signature contains every required bit.
//!
//! ## Closure systems
//!
//! Any closure taking `&mut` references to between one and eight distinct
//! component types is a system:
//!
//! ```rust
//! use tickwork_core::{Component, DeltaTime, Dense, EcsConfig, Registry};
//!
//! #[derive(Default)]
//! struct Position(f32);
//! #[derive(Default)]
//! struct Velocity(f32);
//!
//! impl Component for Position {
//!     type Storage = Dense<Self>;
//! }
//! impl Component for Velocity {
//!     type Storage = Dense<Self>;
//! }
//!
//! let mut registry = Registry::new(EcsConfig::default()).unwrap();
//! registry.register_component::<Position>().unwrap();
//! registry.register_component::<Velocity>().unwrap();
//! registry
//!     .register_system("integrate", |p: &mut Position, v: &mut Velocity, dt: &mut DeltaTime| {
//!         p.0 += v.0 * dt.seconds();
//!     })
//!     .unwrap();
//! ```
//!
//! The step "borrow each parameter's storage, then hand one slot per
//! parameter to the callback" is implemented once, generically, by
//! [`FnSystem`]. Storages are borrowed once per system per tick, never per
//! entity.
//!
//! ## Custom systems
//!
//! Types implementing [`System`] directly can be registered with
//! [`Registry::register_boxed_system`](crate::Registry::register_boxed_system).

use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;
use std::marker::PhantomData;

use siphasher::sip::SipHasher24;

use super::component::Component;
use super::entity::EntityId;
use super::signature::Signature;
use super::storage::{AnyStorage, Storage, StorageKind};
use super::world::{ParamInfo, World};
use crate::error::{EcsError, EcsResult};

/// Fixed keys so system ids are stable across runs and builds.
const NAME_KEY_0: u64 = 0x7469_636b_776f_726b;
const NAME_KEY_1: u64 = 0x7379_7374_656d_7321;

/// Stable identifier of a system, derived from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SystemId(u64);

impl SystemId {
    /// Hashes a system name.
    #[must_use]
    pub fn of(name: &str) -> Self {
        let mut hasher = SipHasher24::new_with_keys(NAME_KEY_0, NAME_KEY_1);
        hasher.write(name.as_bytes());
        Self(hasher.finish())
    }

    /// Raw 64-bit hash.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A unit of logic executed over the entities that satisfy its signature.
pub trait System: 'static {
    /// The storages this system borrows, in callback order.
    fn params(&self) -> &[ParamInfo];

    /// OR of the parameter signatures.
    fn required_signature(&self) -> Signature {
        self.params()
            .iter()
            .fold(Signature::EMPTY, |acc, param| acc | param.signature())
    }

    /// Runs the system for each entity in `entities`.
    ///
    /// The manager only passes entities that are members of this system and
    /// pass its predicates, and only after every singleton it names is
    /// constructed.
    fn run(&mut self, world: &mut World, entities: &[EntityId]);
}

/// Conversion of a callback into a [`System`].
///
/// `Params` is the tuple of parameter component types. It only exists to
/// tell the closure arities apart.
pub trait IntoSystem<Params> {
    /// The resulting system.
    type System: System;

    /// Resolves every parameter against `world`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] or [`EcsError::StorageNotBound`] for
    /// parameters without bound storage.
    fn into_system(self, world: &World) -> EcsResult<Self::System>;
}

/// A [`System`] backed by a closure over component references.
pub struct FnSystem<F, P> {
    func: F,
    params: Vec<ParamInfo>,
    _marker: PhantomData<fn() -> P>,
}

fn downcast<T: Component>(storage: &mut Box<dyn AnyStorage>) -> &mut T::Storage {
    match storage.as_any_mut().downcast_mut::<T::Storage>() {
        Some(storage) => storage,
        None => panic!("storage of `{}` has an unexpected type", T::name()),
    }
}

macro_rules! impl_fn_system {
    ($(($param:ident, $var:ident)),+) => {
        impl<Func, $($param),+> IntoSystem<($($param,)+)> for Func
        where
            Func: FnMut($(&mut $param),+) + 'static,
            $($param: Component,)+
        {
            type System = FnSystem<Func, ($($param,)+)>;

            fn into_system(self, world: &World) -> EcsResult<Self::System> {
                let params = vec![$(world.param::<$param>()?),+];
                Ok(FnSystem {
                    func: self,
                    params,
                    _marker: PhantomData,
                })
            }
        }

        impl<Func, $($param),+> System for FnSystem<Func, ($($param,)+)>
        where
            Func: FnMut($(&mut $param),+) + 'static,
            $($param: Component,)+
        {
            fn params(&self) -> &[ParamInfo] {
                &self.params
            }

            #[allow(unused_assignments)]
            fn run(&mut self, world: &mut World, entities: &[EntityId]) {
                let mut cursor = 0;
                $(
                    let mut $var = world.take_storage(self.params[cursor].index());
                    cursor += 1;
                )+

                {
                    $(let $var = downcast::<$param>(&mut $var);)+
                    for &entity in entities {
                        let index = entity.index();
                        (self.func)($($var.slot(index)),+);
                    }
                }

                cursor = 0;
                $(
                    world.restore_storage(self.params[cursor].index(), $var);
                    cursor += 1;
                )+
            }
        }
    };
}

impl_fn_system!((A, a));
impl_fn_system!((A, a), (B, b));
impl_fn_system!((A, a), (B, b), (C, c));
impl_fn_system!((A, a), (B, b), (C, c), (D, d));
impl_fn_system!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_fn_system!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));
impl_fn_system!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g));
impl_fn_system!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g), (H, h));

// ============================================================================
// PREDICATES
// ============================================================================

/// Secondary per-entity filter on a field of a required component.
pub(crate) struct Predicate {
    storage: usize,
    component: &'static str,
    check: Box<dyn Fn(&dyn AnyStorage, usize) -> bool>,
}

impl Predicate {
    pub(crate) fn new<T: Component>(storage: usize, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        Self {
            storage,
            component: T::name(),
            check: Box::new(move |storage: &dyn AnyStorage, index: usize| -> bool {
                storage
                    .as_any()
                    .downcast_ref::<T::Storage>()
                    .and_then(|storage| storage.get(index))
                    .is_some_and(|value| predicate(value))
            }),
        }
    }

    /// Evaluates the predicate for the entity at `index`.
    #[inline]
    pub(crate) fn holds(&self, world: &World, index: usize) -> bool {
        world
            .storage_at(self.storage)
            .is_some_and(|storage| (self.check)(storage, index))
    }

    pub(crate) const fn component(&self) -> &'static str {
        self.component
    }
}

// ============================================================================
// SYSTEM TABLE
// ============================================================================

/// A registered system and its membership index.
pub(crate) struct SystemEntry {
    pub(crate) name: String,
    pub(crate) id: SystemId,
    pub(crate) signature: Signature,
    /// Storage indices of singleton parameters, checked once per tick.
    pub(crate) singletons: Vec<usize>,
    pub(crate) predicates: Vec<Predicate>,
    /// Whether the system borrows the [`Entity`] records mutably.
    pub(crate) refreshes_records: bool,
    /// `members[i]` is set iff entity `i` satisfies `signature`.
    pub(crate) members: Box<[bool]>,
    pub(crate) system: Box<dyn System>,
}

impl SystemEntry {
    /// Whether every singleton this system names is constructed.
    pub(crate) fn singletons_ready(&self, world: &World) -> bool {
        self.singletons.iter().all(|&index| world.is_ready_at(index))
    }

    /// Whether entity `index` passes every predicate.
    #[inline]
    pub(crate) fn predicates_hold(&self, world: &World, index: usize) -> bool {
        self.predicates.iter().all(|predicate| predicate.holds(world, index))
    }
}

/// Fixed-capacity table of systems in registration order.
pub(crate) struct SystemTable {
    entries: Vec<SystemEntry>,
    ids: HashMap<SystemId, usize>,
    capacity: usize,
    entity_capacity: usize,
}

impl SystemTable {
    pub(crate) fn new(capacity: usize, entity_capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            ids: HashMap::with_capacity(capacity),
            capacity,
            entity_capacity,
        }
    }

    /// Appends a system.
    pub(crate) fn push(&mut self, name: &str, system: Box<dyn System>) -> EcsResult<SystemId> {
        if self.entries.len() >= self.capacity {
            return Err(EcsError::SystemTableFull {
                capacity: self.capacity,
                name: name.to_string(),
            });
        }

        let id = SystemId::of(name);
        if self.ids.contains_key(&id) {
            return Err(EcsError::DuplicateSystem(name.to_string()));
        }

        let params = system.params();
        for (position, param) in params.iter().enumerate() {
            if params[..position].iter().any(|seen| seen.index() == param.index()) {
                return Err(EcsError::DuplicateParameter {
                    system: name.to_string(),
                    component: param.name(),
                });
            }
        }

        let singletons = params
            .iter()
            .filter(|param| param.kind() == StorageKind::Single)
            .map(ParamInfo::index)
            .collect();

        let refreshes_records = params
            .iter()
            .any(|param| param.signature() == Signature::ENTITY);

        self.ids.insert(id, self.entries.len());
        self.entries.push(SystemEntry {
            name: name.to_string(),
            id,
            signature: system.required_signature(),
            singletons,
            predicates: Vec::new(),
            refreshes_records,
            members: vec![false; self.entity_capacity].into_boxed_slice(),
            system,
        });
        Ok(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn index_of(&self, id: SystemId) -> Option<usize> {
        self.ids.get(&id).copied()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&SystemEntry> {
        self.entries.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut SystemEntry> {
        self.entries.get_mut(index)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [SystemEntry] {
        &mut self.entries
    }

    /// Indices of every system whose signature `signature` satisfies.
    pub(crate) fn matching(&self, signature: Signature) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| signature.contains(entry.signature))
            .map(|(index, _)| index)
            .collect()
    }
}
