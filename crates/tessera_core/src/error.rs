//! # Store Error Types
//!
//! Recoverable failures reported by the registry and its configuration.
//! Broken internal invariants are not represented here; they panic.

use thiserror::Error;

use crate::ecs::{EntityId, Generation};

/// Errors that can occur in the entity store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The entity was erased, or its id was never issued.
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    /// A weak reference no longer matches its slot.
    #[error("stale reference to entity {id}: captured generation {captured}, current {current}")]
    StaleReference {
        /// The referenced entity.
        id: EntityId,
        /// Generation stored in the reference.
        captured: Generation,
        /// Generation of the slot now, if the id was ever issued.
        current: Generation,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
