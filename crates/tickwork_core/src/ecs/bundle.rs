//! # Component Bundles
//!
//! Tuples of component values attached to an entity in one call.
//!
//! A [`Bundle`] is what `create_entity` and `add_components` accept: an
//! ordered tuple of up to eight component values. Dense values are written
//! into the entity's slot; singleton values only record the dependency.
//! A [`ComponentSet`] names types without values, as `remove_components`
//! needs.
//!
//! Framework-owned types ([`DeltaTime`](crate::DeltaTime),
//! [`Entity`](crate::Entity), [`OnCreate`](crate::OnCreate),
//! [`Commands`](crate::Commands)) are attached to every entity
//! automatically and are rejected inside a bundle.

use super::component::Component;
use super::signature::Signature;
use super::storage::Storage;
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// A set of component types.
pub trait ComponentSet {
    /// OR of the member signatures.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ReservedComponent`] for framework-owned types, or
    /// the lookup errors of [`World::bound_signature`].
    fn signature(world: &World) -> EcsResult<Signature>;
}

/// A set of component values.
pub trait Bundle: ComponentSet {
    /// Writes each value into its storage at slot `index`.
    ///
    /// # Errors
    ///
    /// Returns the lookup errors of [`World::storage_mut`].
    fn write(self, world: &mut World, index: usize) -> EcsResult<()>;
}

/// Signature of a caller-supplied type.
pub(crate) fn user_signature<T: Component>(world: &World) -> EcsResult<Signature> {
    if world.is_reserved::<T>() {
        return Err(EcsError::ReservedComponent(T::name()));
    }
    world.bound_signature::<T>()
}

macro_rules! impl_bundle {
    ($(($ty:ident, $value:ident)),*) => {
        impl<$($ty: Component),*> ComponentSet for ($($ty,)*) {
            #[allow(unused_mut, unused_variables)]
            fn signature(world: &World) -> EcsResult<Signature> {
                let mut signature = Signature::EMPTY;
                $(signature |= user_signature::<$ty>(world)?;)*
                Ok(signature)
            }
        }

        impl<$($ty: Component),*> Bundle for ($($ty,)*) {
            #[allow(unused_variables)]
            fn write(self, world: &mut World, index: usize) -> EcsResult<()> {
                let ($($value,)*) = self;
                $(world.storage_mut::<$ty>()?.insert(index, $value);)*
                Ok(())
            }
        }
    };
}

impl_bundle!();
impl_bundle!((A, a));
impl_bundle!((A, a), (B, b));
impl_bundle!((A, a), (B, b), (C, c));
impl_bundle!((A, a), (B, b), (C, c), (D, d));
impl_bundle!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_bundle!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));
impl_bundle!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g));
impl_bundle!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g), (H, h));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::DeltaTime;
    use crate::ecs::storage::{Dense, Single};

    #[derive(Debug, Default, PartialEq)]
    struct Health(i32);

    impl Component for Health {
        type Storage = Dense<Self>;
    }

    #[derive(Debug, Default, PartialEq)]
    struct Armor(i32);

    impl Component for Armor {
        type Storage = Dense<Self>;
    }

    struct Settings(u8);

    impl Component for Settings {
        type Storage = Single<Self>;
    }

    fn world() -> World {
        let mut world = World::new(4);
        world.bind_storage::<Health>(Dense::new(4)).unwrap();
        world.bind_storage::<Armor>(Dense::new(4)).unwrap();
        world
            .bind_storage::<Settings>(Single::with_value(Settings(1)))
            .unwrap();
        world
    }

    #[test]
    fn test_bundle_signature_is_or_of_members() {
        let world = world();
        let expected = world.lookup::<Health>().unwrap() | world.lookup::<Armor>().unwrap();
        assert_eq!(<(Health, Armor)>::signature(&world).unwrap(), expected);
        assert_eq!(<()>::signature(&world).unwrap(), Signature::EMPTY);
    }

    #[test]
    fn test_bundle_writes_dense_and_skips_singletons() {
        let mut world = world();
        (Health(10), Settings(9), Armor(3)).write(&mut world, 2).unwrap();

        assert_eq!(world.storage::<Health>().unwrap().get(2), Some(&Health(10)));
        assert_eq!(world.storage::<Armor>().unwrap().get(2), Some(&Armor(3)));
        assert_eq!(world.singleton::<Settings>().map(|s| s.0), Some(1));
    }

    #[test]
    fn test_reserved_types_are_rejected() {
        let world = world();
        assert_eq!(
            <(Health, DeltaTime)>::signature(&world),
            Err(EcsError::ReservedComponent("DeltaTime"))
        );
    }

    #[test]
    fn test_unregistered_member_is_reported() {
        #[derive(Default)]
        struct Ghost;
        impl Component for Ghost {
            type Storage = Dense<Self>;
        }

        let world = world();
        assert_eq!(
            <(Ghost,)>::signature(&world),
            Err(EcsError::Unregistered("Ghost"))
        );
    }
}
