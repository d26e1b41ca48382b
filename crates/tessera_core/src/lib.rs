//! # TESSERA Core
//!
//! Archetype-based entity-component store:
//! - Generational entity ids with weak references that detect reuse
//! - Columnar component storage grouped by component set
//! - Archetype migration when components are added or removed
//! - Multi-component queries over matching archetypes
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Entity, Position, Registry, Velocity};
//!
//! let mut registry = Registry::new();
//! let mut ship = registry.create();
//! registry.add_component(&mut ship, Position::new(0.0, 0.0, 0.0));
//! registry.add_component(&mut ship, Velocity::new(2.0, 0.0, 0.0));
//!
//! registry.execute::<(&mut Position, &Velocity), _>(|(position, velocity)| {
//!     position.x += velocity.x;
//! });
//! assert_eq!(registry.get_component::<Position>(ship).map(|p| p.x), Some(2.0));
//!
//! let weak = registry.get_ref(ship);
//! registry.erase(ship).unwrap();
//! assert_eq!(registry.resolve(weak), None::<Entity>);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::{GenerationPolicy, RegistryConfig};
pub use ecs::{
    AngularVelocity, Archetype, ArchetypeId, ArchetypeSignature, ArchetypeSummary,
    ArchetypeTable, Column, Component, ComponentColumn, ComponentInfo, Entity,
    EntityAllocator, EntityId, EntityLocation, EntityRef, Generation, ObjectKind, Position,
    Query, QueryTerm, Registry, Rotation, Velocity, Visibility,
};
pub use error::{StoreError, StoreResult};
