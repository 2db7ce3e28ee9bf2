//! # ECS Error Types
//!
//! Every configuration and usage error the core can report.
//!
//! Registration-time failures are returned as [`EcsResult`] so the host can
//! abort startup with a readable message. Failures inside the tick loop
//! (out-of-range ids, components an entity never declared) are logic bugs
//! and panic with the same messages.

use thiserror::Error;

/// Errors that can occur while configuring or driving the ECS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component type was registered twice.
    #[error("component `{0}` is already registered")]
    AlreadyRegistered(&'static str),

    /// A component type was used before being registered.
    #[error("component `{0}` is not registered")]
    Unregistered(&'static str),

    /// Storage for a component type was bound a second time.
    #[error("storage for `{0}` is already bound")]
    StorageAlreadyBound(&'static str),

    /// Storage for a component type was accessed before being bound.
    #[error("storage for `{0}` is not bound")]
    StorageNotBound(&'static str),

    /// A bound dense storage does not have one slot per entity id.
    #[error("storage for `{name}` has {actual} slots, expected {expected}")]
    StorageCapacityMismatch {
        /// The component type.
        name: &'static str,
        /// The configured entity capacity.
        expected: usize,
        /// Slots in the supplied storage.
        actual: usize,
    },

    /// A singleton was constructed a second time.
    #[error("singleton `{0}` is already constructed")]
    SingletonAlreadyConstructed(&'static str),

    /// A singleton was read before being constructed.
    #[error("singleton `{0}` is not constructed")]
    SingletonNotConstructed(&'static str),

    /// A singleton operation was applied to a per-entity component.
    #[error("component `{0}` is not stored as a singleton")]
    NotASingleton(&'static str),

    /// All signature bits are in use.
    #[error("signature bits exhausted: `{name}` needs a bit but all {max} are assigned")]
    SignatureBitsExhausted {
        /// The component type that could not be assigned a bit.
        name: &'static str,
        /// Width of the signature word.
        max: u32,
    },

    /// A framework-owned component was supplied or removed by the caller.
    #[error("component `{0}` is reserved for the framework")]
    ReservedComponent(&'static str),

    /// The system table is full.
    #[error("system table full: capacity {capacity}, cannot add `{name}`")]
    SystemTableFull {
        /// Maximum number of systems.
        capacity: usize,
        /// The system that did not fit.
        name: String,
    },

    /// A system name (or its hash) is already taken.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// A system names the same component type twice.
    #[error("system `{system}` requests `{component}` more than once")]
    DuplicateParameter {
        /// The offending system.
        system: String,
        /// The repeated component type.
        component: &'static str,
    },

    /// No system has the given name.
    #[error("unknown system `{0}`")]
    UnknownSystem(String),

    /// A predicate was attached to a component the system does not require.
    #[error("predicate on `{component}` is outside the signature of system `{system}`")]
    PredicateOutsideSignature {
        /// The system the predicate was attached to.
        system: String,
        /// The component the predicate inspects.
        component: &'static str,
    },

    /// The free-id pool is empty.
    #[error("entity capacity exhausted: all {capacity} ids are live")]
    EntityCapacityExhausted {
        /// Maximum number of entities.
        capacity: usize,
    },

    /// An entity id is outside `[0, capacity)`.
    #[error("entity {id} is out of range (capacity {capacity})")]
    EntityOutOfRange {
        /// The offending id.
        id: u32,
        /// Maximum number of entities.
        capacity: usize,
    },

    /// An operation targeted an entity that is not live.
    #[error("entity {0} is not alive")]
    EntityNotAlive(u32),

    /// An entity was asked for a component it never declared.
    #[error("entity {id} does not carry component `{component}`")]
    MissingComponent {
        /// The entity.
        id: u32,
        /// The requested component type.
        component: &'static str,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
