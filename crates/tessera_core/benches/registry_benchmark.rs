//! # Registry Structural Benchmark
//!
//! Measures the structural operations:
//! - Entity creation
//! - Component add/remove (archetype migration)
//! - Erase with swap-remove
//!
//! Run with: `cargo bench --package tessera_core --bench registry_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{Entity, Position, Registry, RegistryConfig, Rotation, Velocity};

const ENTITY_COUNT: usize = 100_000;

fn spawn_positions(registry: &mut Registry, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let mut entity = registry.create();
            registry.add_component(&mut entity, Position::new(i as f32, 0.0, 0.0));
            entity
        })
        .collect()
}

/// Benchmark: Create entities without components.
fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut registry = Registry::new();
                for _ in 0..count {
                    black_box(registry.create());
                }
                registry.entity_count()
            });
        });
    }

    group.finish();
}

/// Benchmark: Create with reserved capacity.
fn bench_create_preallocated(c: &mut Criterion) {
    let config = RegistryConfig {
        entity_capacity: ENTITY_COUNT,
        column_capacity: ENTITY_COUNT,
        ..RegistryConfig::default()
    };

    c.bench_function("create_with_position_100K_preallocated", |b| {
        b.iter(|| {
            let Ok(mut registry) = Registry::with_config(config.clone()) else {
                return 0;
            };
            spawn_positions(&mut registry, ENTITY_COUNT).len()
        });
    });
}

/// Benchmark: Migrate through three archetypes and back.
fn bench_migrate(c: &mut Criterion) {
    let mut registry = Registry::new();
    let mut entities = spawn_positions(&mut registry, 10_000);

    c.bench_function("add_remove_two_components_10K", |b| {
        b.iter(|| {
            for entity in &mut entities {
                registry.add_component(entity, Velocity::new(1.0, 0.0, 0.0));
                registry.add_component(entity, Rotation::IDENTITY);
            }
            for entity in &mut entities {
                black_box(registry.remove_component::<Rotation>(entity));
                black_box(registry.remove_component::<Velocity>(entity));
            }
        });
    });
}

/// Benchmark: Erase half the entities, then refill.
fn bench_erase(c: &mut Criterion) {
    c.bench_function("erase_half_100K", |b| {
        b.iter(|| {
            let mut registry = Registry::new();
            let entities = spawn_positions(&mut registry, ENTITY_COUNT);
            for entity in entities.into_iter().step_by(2) {
                assert!(registry.erase(entity).is_ok());
            }
            registry.entity_count()
        });
    });
}

/// Benchmark: Resolve weak references.
fn bench_resolve(c: &mut Criterion) {
    let mut registry = Registry::new();
    let entities = spawn_positions(&mut registry, ENTITY_COUNT);
    let refs: Vec<_> = entities.iter().map(|&e| registry.get_ref(e)).collect();

    c.bench_function("resolve_100K", |b| {
        b.iter(|| refs.iter().filter(|&&r| registry.resolve(r).is_some()).count());
    });
}

criterion_group!(
    benches,
    bench_create,
    bench_create_preallocated,
    bench_migrate,
    bench_erase,
    bench_resolve,
);
criterion_main!(benches);
