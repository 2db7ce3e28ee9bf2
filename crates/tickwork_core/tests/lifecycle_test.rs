//! Integration tests for entity lifecycle, deferred deletion and events.

use tickwork_core::{
    Commands, Component, Dense, EcsConfig, EcsError, Entity, EntityId, EntityManager, Events,
    Registry, Signature, Single, SystemId,
};

#[derive(Debug, Default, Clone, Copy)]
struct Health {
    points: i32,
}

impl Component for Health {
    type Storage = Dense<Self>;
}

#[derive(Debug, Default, Clone, Copy)]
struct Armor {
    rating: i32,
}

impl Component for Armor {
    type Storage = Dense<Self>;
}

#[derive(Debug, Default, Clone, Copy)]
struct Speed {
    value: f32,
}

impl Component for Speed {
    type Storage = Dense<Self>;
}

#[derive(Debug, Default)]
struct Visits {
    count: usize,
}

impl Component for Visits {
    type Storage = Single<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Hit {
    damage: i32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Listener {
    heard: usize,
}

impl Component for Listener {
    type Storage = Dense<Self>;
}

fn base_registry(max_entities: usize) -> Registry {
    let mut registry = Registry::new(EcsConfig::new(max_entities, 16).unwrap()).unwrap();
    registry.register_component::<Health>().unwrap();
    registry.register_component::<Armor>().unwrap();
    registry.register_component::<Speed>().unwrap();
    registry
}

#[test]
fn test_freed_ids_are_reused_in_ascending_order() {
    let mut manager = EntityManager::new(base_registry(32));

    let ids: Vec<EntityId> = (0..10)
        .map(|_| manager.create_entity((Health::default(),)).unwrap())
        .collect();
    assert_eq!(ids, (0..10).map(EntityId::new).collect::<Vec<_>>());

    manager.delete_entities([ids[7], ids[2], ids[5]]);
    // Not reusable before the queue is drained.
    assert_eq!(manager.create_entity(()).unwrap(), EntityId::new(10));

    manager.tick(0.0);
    let reused: Vec<u32> = (0..3)
        .map(|_| manager.create_entity(()).unwrap().raw())
        .collect();
    assert_eq!(reused, vec![2, 5, 7]);
    assert_eq!(manager.create_entity(()).unwrap(), EntityId::new(11));
}

#[test]
fn test_delete_during_callback_is_deferred() {
    let mut registry = base_registry(16);
    registry.register_singleton_with(Visits::default()).unwrap();
    registry
        .register_system(
            "reap",
            |entity: &mut Entity, health: &mut Health, commands: &mut Commands| {
                if health.points <= 0 {
                    commands.delete(entity.id());
                }
            },
        )
        .unwrap();
    let visit = registry
        .register_system("visit", |_: &mut Health, visits: &mut Visits| visits.count += 1)
        .unwrap();
    let mut manager = EntityManager::new(registry);

    let spawn = |manager: &mut EntityManager, points: i32| {
        manager
            .spawn()
            .unwrap()
            .with(Health { points })
            .depends_on::<Visits>()
            .build()
            .unwrap()
    };
    let dead = spawn(&mut manager, 0);
    let alive = spawn(&mut manager, 5);

    let stats = manager.tick(0.0);
    // The doomed entity is still visited during the tick that deleted it.
    assert_eq!(stats.deleted, 0);
    assert_eq!(manager.singleton::<Visits>().map(|v| v.count), Some(2));
    assert!(manager.is_alive(dead));
    assert!(manager.is_member(visit, dead));
    assert_eq!(manager.pending_deletes(), 1);

    let stats = manager.tick(0.0);
    assert_eq!(stats.deleted, 1);
    assert_eq!(manager.singleton::<Visits>().map(|v| v.count), Some(3));
    assert!(!manager.is_alive(dead));
    assert!(!manager.is_member(visit, dead));
    assert!(manager.is_alive(alive));
    assert_eq!(manager.alive_count(), 1);
}

#[test]
fn test_deleted_slot_is_reset_before_reuse() {
    let mut manager = EntityManager::new(base_registry(4));
    let id = manager
        .create_entity((Health { points: 9 }, Armor { rating: 3 }))
        .unwrap();
    manager.delete_entity(id);
    manager.tick(0.0);

    let reused = manager.create_entity((Health { points: 1 },)).unwrap();
    assert_eq!(reused, id);
    assert_eq!(
        manager.try_component::<Armor>(reused).err(),
        Some(EcsError::MissingComponent {
            id: reused.raw(),
            component: "Armor",
        })
    );
    assert_eq!(manager.world().storage::<Armor>().unwrap().as_slice()[id.index()].rating, 0);
}

#[test]
fn test_event_lifetime_is_one_tick() {
    let mut registry = base_registry(8);
    registry.register_component::<Listener>().unwrap();
    registry.register_event::<Hit>().unwrap();
    registry
        .register_system("attack", |health: &mut Health, hits: &mut Events<Hit>| {
            hits.send(Hit {
                damage: health.points,
            });
        })
        .unwrap();
    registry
        .register_system("listen", |listener: &mut Listener, hits: &mut Events<Hit>| {
            listener.heard += hits.len();
        })
        .unwrap();
    let mut manager = EntityManager::new(registry);

    for points in [3, 4] {
        manager
            .spawn()
            .unwrap()
            .with(Health { points })
            .depends_on::<Events<Hit>>()
            .build()
            .unwrap();
    }
    let listener = manager
        .spawn()
        .unwrap()
        .with(Listener::default())
        .depends_on::<Events<Hit>>()
        .build()
        .unwrap();

    manager.tick(0.0);
    assert_eq!(manager.get_component::<Listener>(listener).heard, 2);
    assert!(manager.singleton::<Events<Hit>>().unwrap().is_empty());

    // Broadcast between ticks is visible during the next tick only.
    manager.broadcast(Hit { damage: 99 }).unwrap();
    assert_eq!(
        manager.singleton::<Events<Hit>>().unwrap().latest(),
        Some(&Hit { damage: 99 })
    );
    manager.tick(0.0);
    assert_eq!(manager.get_component::<Listener>(listener).heard, 5);
    assert!(manager.singleton::<Events<Hit>>().unwrap().is_empty());
}

#[test]
fn test_broadcast_without_channel_fails() {
    let mut manager = EntityManager::new(base_registry(4));
    assert_eq!(
        manager.broadcast(Hit { damage: 1 }),
        Err(EcsError::Unregistered("Events<Hit>"))
    );
}

/// Deterministic xorshift sequence.
struct Sequence(u64);

impl Sequence {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

#[test]
fn test_membership_tracks_signature() {
    let mut registry = base_registry(32);
    let mut systems: Vec<(SystemId, Signature)> = Vec::new();

    let health = registry.lookup::<Health>().unwrap();
    let armor = registry.lookup::<Armor>().unwrap();
    let speed = registry.lookup::<Speed>().unwrap();

    let id = registry.register_system("h", |_: &mut Health| {}).unwrap();
    systems.push((id, health));
    let id = registry
        .register_system("ha", |_: &mut Health, _: &mut Armor| {})
        .unwrap();
    systems.push((id, health | armor));
    let id = registry
        .register_system("as", |_: &mut Armor, _: &mut Speed| {})
        .unwrap();
    systems.push((id, armor | speed));
    let id = registry
        .register_system("has", |_: &mut Health, _: &mut Armor, _: &mut Speed| {})
        .unwrap();
    systems.push((id, health | armor | speed));

    let mut manager = EntityManager::new(registry);
    let mut sequence = Sequence(0x9E37_79B9_7F4A_7C15);

    for step in 0..400 {
        let target = EntityId::new((sequence.next() % 32) as u32);
        match sequence.next() % 6 {
            0 => {
                let _ = manager.create_entity((Health::default(),));
            }
            1 => {
                let _ = manager.create_entity((Armor::default(), Speed::default()));
            }
            2 if manager.is_alive(target) => match sequence.next() % 3 {
                0 => manager.add_components(target, (Health::default(),)).unwrap(),
                1 => manager.add_components(target, (Armor::default(),)).unwrap(),
                _ => manager.add_components(target, (Speed::default(),)).unwrap(),
            },
            3 if manager.is_alive(target) => match sequence.next() % 3 {
                0 => manager.remove_components::<(Health,)>(target).unwrap(),
                1 => manager.remove_components::<(Armor, Speed)>(target).unwrap(),
                _ => manager.remove_components::<(Speed,)>(target).unwrap(),
            },
            4 if manager.is_alive(target) => manager.delete_entity(target),
            _ => {
                manager.tick(0.0);
            }
        }

        for raw in 0..32 {
            let entity = EntityId::new(raw);
            let signature = manager.signature(entity);
            for &(system, required) in &systems {
                let expected = !signature.is_empty() && signature.contains(required);
                assert_eq!(
                    manager.is_member(system, entity),
                    expected,
                    "step {step}: entity {entity} signature {signature}"
                );
            }
        }
    }
}

#[test]
fn test_reserved_bits_cannot_be_removed() {
    let mut manager = EntityManager::new(base_registry(4));
    let id = manager.create_entity((Health::default(),)).unwrap();

    assert_eq!(
        manager.remove_components::<(Commands,)>(id),
        Err(EcsError::ReservedComponent("Commands"))
    );
    manager.remove_components::<(Health,)>(id).unwrap();
    assert_eq!(manager.signature(id), Signature::RESERVED);
    assert!(manager.is_alive(id));
}
