//! # Entity Component System
//!
//! An archetype store: entities sharing a component set share an archetype,
//! and each archetype keeps one dense column per component type.
//!
//! ## Design Philosophy
//!
//! - Component data is stored in typed, contiguous columns
//! - Entity ids are slot indices with generation counters
//! - Structural changes move one row; other rows are left in place
//! - Queries match archetypes by signature and walk their columns linearly

pub mod archetype;
mod component;
mod entity;
pub mod query;
mod registry;
mod storage;

pub use archetype::{Archetype, ArchetypeId, ArchetypeSignature, ArchetypeTable};
pub use component::{
    AngularVelocity, Component, ComponentInfo, ObjectKind, Position, Rotation, Velocity,
    Visibility,
};
pub use entity::{Entity, EntityAllocator, EntityId, EntityRef, Generation};
pub use query::{ArchetypeView, Query, QueryTerm};
pub use registry::{ArchetypeSummary, EntityLocation, Registry};
pub use storage::{Column, ComponentColumn};
