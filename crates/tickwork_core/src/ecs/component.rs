//! # Component System
//!
//! Components are plain data. The type decides its storage kind through
//! [`Component::Storage`]:
//!
//! - [`Dense<T>`]: one slot per entity id (ordinary components),
//! - [`Single<T>`]: one instance shared by every dependent entity (singletons).
//!
//! # Example
//!
//! ```rust
//! use tickwork_core::{Component, Dense, Single};
//!
//! #[derive(Default)]
//! struct Health {
//!     points: i32,
//! }
//!
//! impl Component for Health {
//!     type Storage = Dense<Self>;
//! }
//!
//! struct Window {
//!     width: u32,
//! }
//!
//! impl Component for Window {
//!     type Storage = Single<Self>;
//! }
//! ```

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use parking_lot::{const_mutex, Mutex};

use super::storage::{Single, Storage};

/// Shortened names of generic types, leaked once per type.
static GENERIC_NAMES: Mutex<Option<HashMap<TypeId, &'static str>>> = const_mutex(None);

/// Marker trait for ECS components.
pub trait Component: Sized + 'static {
    /// Backing storage for this type.
    type Storage: Storage<Self>;

    /// Whether instances are reset at the end of every tick.
    ///
    /// Event channels and latches set this; the storage then calls
    /// [`Component::end_tick`] on every instance after dispatch.
    const PER_TICK: bool = false;

    /// Resets a per-tick instance. Called only when [`Component::PER_TICK`] is set.
    #[inline]
    fn end_tick(&mut self) {}

    /// Short type name used in logs and error messages.
    ///
    /// Module paths are stripped from the type and from its generic
    /// arguments: `game::Events<game::Hit>` is reported as `Events<Hit>`.
    #[must_use]
    fn name() -> &'static str {
        short_name::<Self>()
    }
}

fn short_name<T: 'static>() -> &'static str {
    let full = type_name::<T>();
    if !full.contains('<') {
        return last_segment(full);
    }

    let mut names = GENERIC_NAMES.lock();
    names
        .get_or_insert_with(HashMap::new)
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Box::leak(strip_paths(full).into_boxed_str()))
}

#[inline]
fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Drops the module path of every type named in `full`.
fn strip_paths(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut start = 0;
    for (position, c) in full.char_indices() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' | '*') {
            out.push_str(last_segment(&full[start..position]));
            out.push(c);
            start = position + c.len_utf8();
        }
    }
    out.push_str(last_segment(&full[start..]));
    out
}

/// Frame delta-time, written by the manager at the start of every tick.
///
/// A framework singleton every live entity depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaTime {
    seconds: f32,
}

impl DeltaTime {
    /// Seconds elapsed since the previous tick, as supplied by the host.
    #[inline]
    #[must_use]
    pub const fn seconds(&self) -> f32 {
        self.seconds
    }

    #[inline]
    pub(crate) fn set(&mut self, seconds: f32) {
        self.seconds = seconds;
    }
}

impl Component for DeltaTime {
    type Storage = Single<Self>;
}
