//! # TICKWORK Core
//!
//! Fixed-capacity Entity Component System dispatch core:
//! - Per-type contiguous component storage
//! - Systems registered against a required-component bitmask
//! - Incremental system membership, no per-tick rescans
//! - Deferred deletion and per-tick event channels
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - All buffers are sized at startup
//! 2. **Registration before entities** - A [`Registry`] is closed by building
//!    an [`EntityManager`] from it
//! 3. **Registration order is dispatch order** - No scheduling graph
//!
//! ## Example
//!
//! ```rust
//! use tickwork_core::{Component, Dense, EcsConfig, EntityManager, Registry};
//!
//! #[derive(Default)]
//! struct A {
//!     value: i32,
//! }
//! #[derive(Default)]
//! struct B {
//!     value: i32,
//! }
//!
//! impl Component for A {
//!     type Storage = Dense<Self>;
//! }
//! impl Component for B {
//!     type Storage = Dense<Self>;
//! }
//!
//! let mut registry = Registry::new(EcsConfig::default()).unwrap();
//! registry.register_component::<A>().unwrap();
//! registry.register_component::<B>().unwrap();
//! registry
//!     .register_system("sum", |a: &mut A, b: &mut B| b.value += a.value)
//!     .unwrap();
//!
//! let mut manager = EntityManager::new(registry);
//! let id = manager.create_entity((A { value: 5 }, B { value: 1 })).unwrap();
//! manager.tick(1.0 / 60.0);
//! assert_eq!(manager.get_component::<B>(id).value, 6);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::EcsConfig;
pub use ecs::{
    AnyStorage, Bundle, Commands, Component, ComponentSet, DeltaTime, Dense, Entity,
    EntityBuilder, EntityId, EntityManager, Events, FnSystem, IntoSystem, OnCreate, ParamInfo,
    Registry, Signature, Single, Storage, StorageKind, System, SystemId, TickStats, World,
};
pub use error::{EcsError, EcsResult};
