//! # Commands
//!
//! Deferred structural mutations requested while systems run.
//!
//! A system that needs to delete entities lists `&mut Commands` among its
//! parameters. Requests are only recorded; the manager applies them at the
//! start of the next tick, so deleting the entity a callback is currently
//! processing never disturbs the iteration in progress.
//!
//! `Commands` contributes no signature bit: requesting it does not narrow
//! the set of entities a system runs on.

use super::component::Component;
use super::entity::EntityId;
use super::storage::Single;

/// Queue of pending entity deletions.
#[derive(Debug, Default)]
pub struct Commands {
    pending: Vec<EntityId>,
}

impl Commands {
    /// Creates a queue with room for `capacity` requests.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
        }
    }

    /// Requests deletion of `entity` at the start of the next tick.
    #[inline]
    pub fn delete(&mut self, entity: EntityId) {
        self.pending.push(entity);
    }

    /// Requests deletion of every entity in `entities`.
    pub fn delete_all(&mut self, entities: impl IntoIterator<Item = EntityId>) {
        self.pending.extend(entities);
    }

    /// Requests recorded since the last drain.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[EntityId] {
        &self.pending
    }

    /// Number of recorded requests.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Swaps the queue with `buffer`, handing the recorded requests to the
    /// caller and keeping both allocations alive.
    #[inline]
    pub(crate) fn swap_queue(&mut self, buffer: &mut Vec<EntityId>) {
        std::mem::swap(&mut self.pending, buffer);
    }
}

impl Component for Commands {
    type Storage = Single<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_are_recorded_in_order() {
        let mut commands = Commands::with_capacity(4);
        commands.delete(EntityId::new(2));
        commands.delete_all([EntityId::new(7), EntityId::new(1)]);

        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands.pending(),
            &[EntityId::new(2), EntityId::new(7), EntityId::new(1)]
        );
    }

    #[test]
    fn test_swap_queue_hands_over_requests() {
        let mut commands = Commands::with_capacity(4);
        commands.delete(EntityId::new(5));

        let mut buffer = Vec::with_capacity(4);
        commands.swap_queue(&mut buffer);

        assert!(commands.is_empty());
        assert_eq!(buffer, vec![EntityId::new(5)]);
    }
}
