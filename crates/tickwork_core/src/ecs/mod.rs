//! # Entity Component System
//!
//! A fixed-capacity ECS dispatch core.
//!
//! ## Design Philosophy
//!
//! - All storage is pre-allocated from [`EcsConfig`](crate::EcsConfig)
//! - Components are stored in dense arrays indexed by entity id
//! - Each component type owns one bit of a 32-bit [`Signature`]
//! - Systems keep an incremental membership table, never rescanned per tick
//! - Structural deletes are deferred to the start of the next tick

mod bundle;
mod commands;
mod component;
mod entity;
mod event;
mod manager;
mod registry;
mod signature;
mod storage;
mod system;
mod world;

pub use bundle::{Bundle, ComponentSet};
pub use commands::Commands;
pub use component::{Component, DeltaTime};
pub use entity::{Entity, EntityId};
pub use event::{Events, OnCreate};
pub use manager::{EntityBuilder, EntityManager, TickStats};
pub use registry::Registry;
pub use signature::Signature;
pub use storage::{AnyStorage, Dense, Single, Storage, StorageKind};
pub use system::{FnSystem, IntoSystem, System, SystemId};
pub use world::{ParamInfo, World};
