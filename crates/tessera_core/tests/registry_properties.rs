//! # Registry Property Tests
//!
//! Exercises the public store API end to end: dedup of archetypes under
//! arbitrary insertion orders, bitwise stability of untouched rows across
//! swap-remove, weak references across id reuse and query completeness.

use std::collections::HashSet;

use tessera_core::{
    AngularVelocity, Entity, GenerationPolicy, ObjectKind, Position, Registry, RegistryConfig,
    Rotation, StoreError, Velocity, Visibility,
};

/// Deterministic xorshift sequence.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, max: usize) -> usize {
        (self.next() % max as u64) as usize
    }
}

/// Adds component number `which` (0..6) with a value derived from `seed`.
fn add_nth(registry: &mut Registry, entity: &mut Entity, which: usize, seed: f32) {
    match which {
        0 => {
            registry.add_component(entity, Position::new(seed, seed + 1.0, seed + 2.0));
        }
        1 => {
            registry.add_component(entity, Velocity::new(-seed, 0.0, seed));
        }
        2 => {
            registry.add_component(entity, Rotation { w: seed, ..Rotation::IDENTITY });
        }
        3 => {
            registry.add_component(entity, AngularVelocity(Rotation::IDENTITY));
        }
        4 => {
            registry.add_component(entity, Visibility::VISIBLE);
        }
        _ => {
            registry.add_component(entity, ObjectKind { kind: seed as u32 });
        }
    }
}

/// Byte image of every component an entity may carry.
fn snapshot(registry: &Registry, entity: Entity) -> Vec<Vec<u8>> {
    let mut bytes = Vec::new();
    if let Some(c) = registry.get_component::<Position>(entity) {
        bytes.push(bytemuck::bytes_of(c).to_vec());
    }
    if let Some(c) = registry.get_component::<Velocity>(entity) {
        bytes.push(bytemuck::bytes_of(c).to_vec());
    }
    if let Some(c) = registry.get_component::<Rotation>(entity) {
        bytes.push(bytemuck::bytes_of(c).to_vec());
    }
    if let Some(c) = registry.get_component::<AngularVelocity>(entity) {
        bytes.push(bytemuck::bytes_of(c).to_vec());
    }
    if let Some(c) = registry.get_component::<Visibility>(entity) {
        bytes.push(bytemuck::bytes_of(c).to_vec());
    }
    if let Some(c) = registry.get_component::<ObjectKind>(entity) {
        bytes.push(bytemuck::bytes_of(c).to_vec());
    }
    bytes
}

/// Builds `count` entities with random component subsets added in random order.
fn populate(registry: &mut Registry, rng: &mut XorShift, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let mut entity = registry.create();
            let mut kinds: Vec<usize> = (0..6).filter(|_| rng.next() % 2 == 0).collect();
            // Fisher-Yates
            for j in (1..kinds.len()).rev() {
                kinds.swap(j, rng.below(j + 1));
            }
            for kind in kinds {
                add_nth(registry, &mut entity, kind, i as f32);
            }
            entity
        })
        .collect()
}

#[test]
fn test_signatures_stay_unique_under_random_orders() {
    let mut registry = Registry::new();
    let mut rng = XorShift(0x1234_5678);
    populate(&mut registry, &mut rng, 500);

    let signatures: Vec<_> = registry
        .archetypes()
        .iter()
        .map(|archetype| archetype.signature().clone())
        .collect();
    let unique: HashSet<_> = signatures.iter().cloned().collect();
    assert_eq!(unique.len(), signatures.len());
    // Never more than one archetype per subset of six types
    assert!(registry.archetype_count() <= 64);
}

#[test]
fn test_swap_remove_leaves_other_rows_bitwise_unchanged() {
    let mut registry = Registry::new();
    let mut rng = XorShift(0xDEAD_BEEF);
    let mut entities = populate(&mut registry, &mut rng, 300);

    let before: Vec<_> = entities.iter().map(|&e| snapshot(&registry, e)).collect();
    let mut expected: Vec<_> = entities.iter().copied().zip(before).collect();

    for _ in 0..150 {
        let victim = rng.below(entities.len());
        let entity = entities.swap_remove(victim);
        expected.swap_remove(victim);

        let archetype_rows = registry.get_archetype(entity.archetype).map(|a| a.len());
        registry.erase(entity).unwrap();
        assert_eq!(
            registry.get_archetype(entity.archetype).map(|a| a.len()),
            archetype_rows.map(|n| n - 1)
        );
    }

    assert_eq!(registry.entity_count(), 150);
    for (entity, bytes) in &expected {
        assert_eq!(&snapshot(&registry, *entity), bytes, "{entity} changed");
    }
}

#[test]
fn test_round_trip_through_many_archetypes() {
    let mut registry = Registry::new();
    let mut entity = registry.create();

    registry.add_component(&mut entity, Position::new(1.0, 2.0, 3.0));
    registry.add_component(&mut entity, Velocity::new(4.0, 5.0, 6.0));
    registry.add_component(&mut entity, Visibility::HIDDEN);

    assert_eq!(
        registry.remove_component::<Velocity>(&mut entity),
        Some(Velocity::new(4.0, 5.0, 6.0))
    );
    assert_eq!(registry.remove_component::<Velocity>(&mut entity), None);
    assert_eq!(
        registry.get_component::<Position>(entity),
        Some(&Position::new(1.0, 2.0, 3.0))
    );
    assert_eq!(
        registry.remove_component::<Visibility>(&mut entity),
        Some(Visibility::HIDDEN)
    );
    assert_eq!(
        registry.remove_component::<Position>(&mut entity),
        Some(Position::new(1.0, 2.0, 3.0))
    );
    assert_eq!(entity.archetype, tessera_core::ArchetypeId::EMPTY);
}

#[test]
fn test_first_write_wins_across_archetypes() {
    let mut registry = Registry::new();
    let mut entity = registry.create();
    registry.add_component(&mut entity, Velocity::new(1.0, 0.0, 0.0));
    registry.add_component(&mut entity, Position::default());

    let kept = *registry.add_component(&mut entity, Velocity::new(7.0, 7.0, 7.0));
    assert_eq!(kept, Velocity::new(1.0, 0.0, 0.0));
}

#[test]
fn test_weak_refs_never_resolve_to_reused_ids() {
    for policy in [GenerationPolicy::StructuralChange, GenerationPolicy::IdentityOnly] {
        let config = RegistryConfig::default().with_generation_policy(policy);
        let mut registry = Registry::with_config(config).unwrap();

        let mut refs = Vec::new();
        for round in 0..5 {
            let mut entity = registry.create();
            registry.add_component(&mut entity, Position::new(round as f32, 0.0, 0.0));
            let reference = registry.get_ref(entity);
            assert_eq!(registry.resolve(reference), Some(entity));
            registry.erase(entity).unwrap();
            refs.push(reference);
        }

        // Every round reused slot 0
        assert!(refs.iter().all(|r| r.entity.id == refs[0].entity.id));
        let live = registry.create();
        for reference in &refs {
            assert_eq!(registry.resolve(*reference), None);
            assert!(matches!(
                registry.resolve_checked(*reference),
                Err(StoreError::StaleReference { .. })
            ));
        }
        assert!(registry.is_alive(live));
    }
}

#[test]
fn test_generation_policy_decides_migration_invalidation() {
    let structural = Registry::with_config(
        RegistryConfig::default().with_generation_policy(GenerationPolicy::StructuralChange),
    )
    .unwrap();
    let identity = Registry::with_config(
        RegistryConfig::default().with_generation_policy(GenerationPolicy::IdentityOnly),
    )
    .unwrap();

    for (mut registry, survives) in [(structural, false), (identity, true)] {
        let mut entity = registry.create();
        let reference = registry.get_ref(entity);
        registry.add_component(&mut entity, Position::default());
        assert_eq!(registry.resolve(reference).is_some(), survives);

        let reference = registry.get_ref(entity);
        registry.remove_component::<Position>(&mut entity);
        assert_eq!(registry.resolve(reference).is_some(), survives);
    }
}

#[test]
fn test_iteration_visits_every_matching_row() {
    let mut registry = Registry::new();
    let mut rng = XorShift(42);
    let entities = populate(&mut registry, &mut rng, 400);

    let expected: usize = registry
        .archetypes()
        .iter()
        .filter(|a| a.has::<Position>() && a.has::<Velocity>())
        .map(|a| a.len())
        .sum();

    let mut visited = HashSet::new();
    registry.execute::<(Entity, &Position, &mut Velocity), _>(|(entity, _, velocity)| {
        velocity.y += 1.0;
        assert!(visited.insert(entity.id));
    });
    assert_eq!(visited.len(), expected);
    assert_eq!(registry.count::<(&Position, &Velocity)>(), expected);

    let with_both = entities
        .iter()
        .filter(|&&e| registry.has_component::<Position>(e) && registry.has_component::<Velocity>(e))
        .count();
    assert_eq!(with_both, expected);
}

#[test]
fn test_scenario_three_positions_one_velocity() {
    let mut registry = Registry::new();
    let mut entities = Vec::new();
    for i in 0..3 {
        let mut entity = registry.create();
        registry.add_component(&mut entity, Position::new(i as f32, 0.0, 0.0));
        entities.push(entity);
    }
    registry.add_component(&mut entities[1], Velocity::new(0.0, 9.0, 0.0));

    assert_eq!(registry.count::<&Position>(), 3);
    let mut both = Vec::new();
    registry.execute::<(&Position, &Velocity), _>(|(p, v)| both.push((*p, *v)));
    assert_eq!(
        both,
        vec![(Position::new(1.0, 0.0, 0.0), Velocity::new(0.0, 9.0, 0.0))]
    );

    registry.remove_component::<Velocity>(&mut entities[1]);
    let mut both = 0;
    registry.execute::<(&Position, &Velocity), _>(|_| both += 1);
    let mut positions = 0;
    registry.execute::<&Position, _>(|_| positions += 1);
    assert_eq!((both, positions), (0, 3));
}

#[test]
fn test_config_from_toml() {
    let config = RegistryConfig::from_toml_str(
        r#"
        entity_capacity = 256
        column_capacity = 32
        generation_policy = "identity_only"
        "#,
    )
    .unwrap();
    let mut registry = Registry::with_config(config).unwrap();
    assert_eq!(registry.config().generation_policy, GenerationPolicy::IdentityOnly);

    let mut entity = registry.create();
    let reference = registry.get_ref(entity);
    registry.add_component(&mut entity, ObjectKind { kind: 3 });
    assert_eq!(registry.resolve(reference), Some(entity));
}
