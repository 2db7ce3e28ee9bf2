//! # Event Channels
//!
//! Transient per-tick messages.
//!
//! An [`Events<E>`] channel is a singleton component holding the messages of
//! type `E` broadcast during the current tick. Systems that list
//! `&mut Events<E>` among their parameters read or append to it; entities
//! opt into such systems by declaring the dependency. The manager clears
//! every channel after dispatch, so a message is visible for exactly the
//! remainder of the tick it was sent in.
//!
//! [`OnCreate`] is the per-entity latch on the reserved event bit: it reads
//! `true` during the first tick an entity is live.

use std::fmt;

use super::component::Component;
use super::storage::{Dense, Single};

/// Message list of one event type.
pub struct Events<E> {
    messages: Vec<E>,
}

impl<E> Events<E> {
    /// Creates an empty channel.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Creates an empty channel with room for `capacity` messages per tick.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Vec::with_capacity(capacity),
        }
    }

    /// Appends a message.
    #[inline]
    pub fn send(&mut self, message: E) {
        self.messages.push(message);
    }

    /// Messages sent so far this tick, oldest first.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.messages.iter()
    }

    /// Messages sent so far this tick, oldest first.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[E] {
        &self.messages
    }

    /// The most recent message, for "did this happen this tick" checks.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&E> {
        self.messages.last()
    }

    /// Number of messages this tick.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// `true` if nothing was sent this tick.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops all messages, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl<E> Default for Events<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for Events<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.messages.iter()).finish()
    }
}

impl<'a, E> IntoIterator for &'a Events<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: 'static> Component for Events<E> {
    type Storage = Single<Self>;

    const PER_TICK: bool = true;

    #[inline]
    fn end_tick(&mut self) {
        self.clear();
    }
}

/// Entity-creation latch.
///
/// Set when the entity is created, reset for all entities at the end of
/// every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OnCreate {
    fresh: bool,
}

impl OnCreate {
    /// `true` during the first tick after the entity was created.
    #[inline]
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.fresh
    }

    #[inline]
    pub(crate) const fn raised() -> Self {
        Self { fresh: true }
    }
}

impl Component for OnCreate {
    type Storage = Dense<Self>;

    const PER_TICK: bool = true;

    #[inline]
    fn end_tick(&mut self) {
        self.fresh = false;
    }
}
