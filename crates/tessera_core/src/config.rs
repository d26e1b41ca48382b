//! # Registry Configuration
//!
//! Capacity hints and the generation policy, loadable from TOML:
//!
//! ```toml
//! entity_capacity = 100000
//! archetype_capacity = 64
//! column_capacity = 1024
//! generation_policy = "identity_only"
//! ```
//!
//! Every key is optional; missing keys take their [`Default`] value.

use serde::Deserialize;

use crate::error::{StoreError, StoreResult};

/// When a slot's generation is incremented, beyond allocation and erase.
///
/// The generation always changes when an id is issued, recycled or erased.
/// The policy decides whether moving between archetypes also counts as a new
/// identity for weak references.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPolicy {
    /// Adding or removing a component bumps the generation, so weak references
    /// taken before the change stop resolving.
    #[default]
    StructuralChange,
    /// Only allocation and erase bump the generation; weak references survive
    /// component changes.
    IdentityOnly,
}

impl GenerationPolicy {
    /// Returns `true` if migrations invalidate weak references.
    #[inline]
    #[must_use]
    pub const fn bumps_on_migration(self) -> bool {
        matches!(self, Self::StructuralChange)
    }
}

/// Construction parameters for a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Entity slots to reserve up front.
    pub entity_capacity: usize,
    /// Archetypes to reserve up front, including the empty one.
    pub archetype_capacity: usize,
    /// Rows to reserve in each newly created column.
    pub column_capacity: usize,
    /// Generation handling for weak references.
    pub generation_policy: GenerationPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 0,
            archetype_capacity: 16,
            column_capacity: 0,
            generation_policy: GenerationPolicy::default(),
        }
    }
}

impl RegistryConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConfigParse`] for malformed TOML or unknown keys,
    /// and [`StoreError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StoreError::ConfigParse(e.to_string()))?;
        config.validate()?;
        tracing::debug!(?config, "loaded registry config");
        Ok(config)
    }

    /// Returns a copy using `policy`.
    #[must_use]
    pub fn with_generation_policy(mut self, policy: GenerationPolicy) -> Self {
        self.generation_policy = policy;
        self
    }

    /// Checks that the capacities are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if `archetype_capacity` is zero, or
    /// if `column_capacity` exceeds a non-zero `entity_capacity`.
    pub fn validate(&self) -> StoreResult<()> {
        if self.archetype_capacity == 0 {
            return Err(StoreError::InvalidConfig(
                "archetype_capacity must leave room for the empty archetype".into(),
            ));
        }
        if self.entity_capacity != 0 && self.column_capacity > self.entity_capacity {
            return Err(StoreError::InvalidConfig(format!(
                "column_capacity {} exceeds entity_capacity {}",
                self.column_capacity, self.entity_capacity
            )));
        }
        Ok(())
    }
}
