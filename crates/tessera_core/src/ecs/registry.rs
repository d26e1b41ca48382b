//! # Registry
//!
//! The registry owns every archetype and maps each live entity to its row:
//!
//! ```text
//! locations[id] -> (archetype, row) -> archetypes[archetype].columns[c][row]
//! ```
//!
//! Structural changes move the row between archetypes:
//! - `add_component` migrates to `current ∪ {C}`
//! - `remove_component` migrates to `current \ {C}`
//! - `erase` swap-removes the row
//!
//! Each of these is O(columns) and never touches other rows beyond the one
//! relocated by swap-remove, whose location is patched in place.

use std::any::{type_name, TypeId};

use super::archetype::{Archetype, ArchetypeId, ArchetypeTable};
use super::component::{Component, ComponentInfo};
use super::entity::{Entity, EntityAllocator, EntityId, EntityRef, Generation};
use super::query::Query;
use super::storage::{self, Column};
use crate::config::RegistryConfig;
use crate::error::{StoreError, StoreResult};

/// Where a live entity's row is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityLocation {
    /// Archetype holding the row.
    pub archetype: ArchetypeId,
    /// Row index inside the archetype.
    pub row: usize,
}

/// Snapshot of one archetype for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchetypeSummary {
    /// Table index.
    pub id: ArchetypeId,
    /// Component type names in column order.
    pub components: Vec<&'static str>,
    /// Entity ids in row order.
    pub entities: Vec<EntityId>,
}

/// The entity-component store.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Position, Registry, Velocity};
///
/// let mut registry = Registry::new();
/// let mut entity = registry.create();
///
/// registry.add_component(&mut entity, Position::new(1.0, 2.0, 3.0));
/// registry.add_component(&mut entity, Velocity::new(0.0, 1.0, 0.0));
/// assert_eq!(registry.get_component::<Position>(entity), Some(&Position::new(1.0, 2.0, 3.0)));
///
/// let velocity = registry.remove_component::<Velocity>(&mut entity);
/// assert_eq!(velocity, Some(Velocity::new(0.0, 1.0, 0.0)));
/// assert!(!registry.has_component::<Velocity>(entity));
/// ```
#[derive(Debug)]
pub struct Registry {
    /// Id slots, generations and liveness.
    allocator: EntityAllocator,
    /// All archetypes; index 0 is the empty one.
    archetypes: ArchetypeTable,
    /// Row location per id slot, `None` for dead slots.
    locations: Vec<Option<EntityLocation>>,
    /// Construction parameters.
    config: RegistryConfig,
}

impl Registry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(RegistryConfig::default())
    }

    /// Creates an empty registry from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the configuration fails
    /// [`RegistryConfig::validate`].
    pub fn with_config(config: RegistryConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RegistryConfig) -> Self {
        Self {
            allocator: EntityAllocator::with_capacity(config.entity_capacity),
            archetypes: ArchetypeTable::with_capacity(config.archetype_capacity),
            locations: Vec::with_capacity(config.entity_capacity),
            config,
        }
    }

    /// Returns the configuration the registry was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity without components.
    ///
    /// The entity's row is appended to the empty archetype. A recycled id is
    /// used when one is available.
    pub fn create(&mut self) -> Entity {
        let id = self.allocator.allocate();
        let row = self.archetype_mut(ArchetypeId::EMPTY).push_entity(id);
        self.set_location(
            id,
            EntityLocation {
                archetype: ArchetypeId::EMPTY,
                row,
            },
        );

        tracing::trace!(entity = id.index(), "created entity");
        Entity::new(id, ArchetypeId::EMPTY)
    }

    /// Erases an entity and drops its components.
    ///
    /// The id's generation is bumped, so weak references to it stop
    /// resolving, and the id becomes available for reuse. If the entity's row
    /// was not the last in its archetype, the last row is moved into it.
    ///
    /// Strong handles carry no generation. Once the id is reused, an old
    /// handle naming the new entity's archetype is accepted again and acts on
    /// the new entity; only an [`EntityRef`] detects the reuse.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DeadEntity`] if the entity is not alive.
    ///
    /// # Panics
    ///
    /// Panics if the handle's archetype does not match where the entity lives.
    pub fn erase(&mut self, entity: Entity) -> StoreResult<()> {
        let location = self.locate(entity).ok_or(StoreError::DeadEntity(entity.id))?;

        self.allocator.free(entity.id);
        self.locations[entity.id.slot()] = None;

        let moved = self.archetype_mut(location.archetype).swap_remove(location.row);
        if let Some(moved) = moved {
            self.set_location(moved, location);
        }

        tracing::trace!(
            entity = entity.id.index(),
            archetype = location.archetype.index(),
            "erased entity"
        );
        Ok(())
    }

    /// Returns `true` if the entity has not been erased.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity.id)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Current generation of an id slot, or `None` if it was never issued.
    #[inline]
    #[must_use]
    pub fn generation(&self, id: EntityId) -> Option<Generation> {
        self.allocator.generation(id)
    }

    /// Where the entity's row lives, or `None` if it is dead.
    ///
    /// # Panics
    ///
    /// Panics if the handle's archetype does not match where the entity lives.
    #[must_use]
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locate(entity)
    }

    // =========================================================================
    // Weak references
    // =========================================================================

    /// Captures a weak reference at the entity's current generation.
    ///
    /// A reference taken from a dead entity never resolves.
    #[must_use]
    pub fn get_ref(&self, entity: Entity) -> EntityRef {
        EntityRef {
            entity,
            generation: self.allocator.generation(entity.id).unwrap_or(0),
        }
    }

    /// Turns a weak reference back into a handle.
    ///
    /// Returns `None` if the entity was erased or its generation has moved
    /// on. The returned handle points at the entity's current archetype.
    #[must_use]
    pub fn resolve(&self, reference: EntityRef) -> Option<Entity> {
        let id = reference.entity.id;
        if !self.allocator.is_current(id, reference.generation) {
            return None;
        }
        let location = self.locations.get(id.slot()).copied().flatten()?;
        Some(Entity::new(id, location.archetype))
    }

    /// [`Registry::resolve`] with the failure reported as an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StaleReference`] when the reference no longer
    /// resolves.
    pub fn resolve_checked(&self, reference: EntityRef) -> StoreResult<Entity> {
        self.resolve(reference).ok_or_else(|| StoreError::StaleReference {
            id: reference.entity.id,
            captured: reference.generation,
            current: self.allocator.generation(reference.entity.id).unwrap_or(0),
        })
    }

    // =========================================================================
    // Structural mutation
    // =========================================================================

    /// Adds a component and returns a reference to the stored value.
    ///
    /// If the entity already has a `C`, nothing moves: the existing value is
    /// returned and `value` is dropped. Otherwise the entity migrates to the
    /// archetype for its current components plus `C`, which is created on
    /// first use, and `entity` is updated to point at it.
    ///
    /// # Arguments
    ///
    /// * `entity` - Handle to update in place
    /// * `value` - The component value to store
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or the handle is stale.
    pub fn add_component<C: Component>(&mut self, entity: &mut Entity, value: C) -> &mut C {
        let location = self.expect_location(*entity);
        let type_id = TypeId::of::<C>();
        let source = self.archetype(location.archetype);

        if source.signature().contains_type(type_id) {
            return self.component_at_mut::<C>(location);
        }

        let signature = source.signature().with(type_id);
        let destination = match self.archetypes.find(&signature) {
            Some(id) => id,
            None => {
                let capacity = self.config.column_capacity;
                let mut columns = source.empty_columns_except(None, capacity);
                columns.push(Box::new(Column::<C>::with_capacity(capacity)));
                self.archetypes.find_or_insert_with(signature, || columns)
            }
        };

        let (src, dst) = self.archetypes.pair_mut(location.archetype, destination);
        let moved = src.migrate_row(location.row, dst, |column| {
            panic!("{} has no column in the wider archetype", column.info().name)
        });
        dst.push_component(value);
        let row = dst.push_entity(entity.id);

        let new_location = EntityLocation {
            archetype: destination,
            row,
        };
        self.finish_migration(entity, location, new_location, moved);

        tracing::trace!(
            entity = entity.id.index(),
            from = location.archetype.index(),
            to = destination.index(),
            component = type_name::<C>(),
            "added component"
        );
        self.component_at_mut::<C>(new_location)
    }

    /// Removes a component and returns its value.
    ///
    /// The entity migrates to the archetype for its current components minus
    /// `C` and `entity` is updated. If the entity has no `C` this is a no-op
    /// returning `None`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or the handle is stale.
    pub fn remove_component<C: Component>(&mut self, entity: &mut Entity) -> Option<C> {
        let location = self.expect_location(*entity);
        let type_id = TypeId::of::<C>();
        let source = self.archetype(location.archetype);

        if !source.signature().contains_type(type_id) {
            return None;
        }

        let signature = source.signature().without(type_id);
        let destination = match self.archetypes.find(&signature) {
            Some(id) => id,
            None => {
                let columns =
                    source.empty_columns_except(Some(type_id), self.config.column_capacity);
                self.archetypes.find_or_insert_with(signature, || columns)
            }
        };

        let mut removed = None;
        let (src, dst) = self.archetypes.pair_mut(location.archetype, destination);
        let moved = src.migrate_row(location.row, dst, |column| {
            let Some(column) = storage::downcast_mut::<C>(column) else {
                panic!("unexpected {} column left behind", column.info().name);
            };
            removed = Some(column.swap_remove(location.row));
        });
        let row = dst.push_entity(entity.id);

        self.finish_migration(
            entity,
            location,
            EntityLocation {
                archetype: destination,
                row,
            },
            moved,
        );

        tracing::trace!(
            entity = entity.id.index(),
            from = location.archetype.index(),
            to = destination.index(),
            component = type_name::<C>(),
            "removed component"
        );
        removed
    }

    /// Bookkeeping shared by both migration directions.
    fn finish_migration(
        &mut self,
        entity: &mut Entity,
        old: EntityLocation,
        new: EntityLocation,
        moved: Option<EntityId>,
    ) {
        if let Some(moved) = moved {
            self.set_location(moved, old);
        }
        self.set_location(entity.id, new);
        if self.config.generation_policy.bumps_on_migration() {
            self.allocator.bump_generation(entity.id);
        }
        entity.archetype = new.archetype;
    }

    // =========================================================================
    // Component access
    // =========================================================================

    /// Gets a component of a live entity.
    ///
    /// Returns `None` if the entity is dead or has no `C`.
    ///
    /// # Panics
    ///
    /// Panics if the handle's archetype does not match where the entity lives.
    #[must_use]
    pub fn get_component<C: Component>(&self, entity: Entity) -> Option<&C> {
        let location = self.locate(entity)?;
        self.archetype(location.archetype).get::<C>(location.row)
    }

    /// Mutable counterpart of [`Registry::get_component`].
    ///
    /// # Panics
    ///
    /// Panics if the handle's archetype does not match where the entity lives.
    pub fn get_component_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        let location = self.locate(entity)?;
        self.archetype_mut(location.archetype).get_mut::<C>(location.row)
    }

    /// Gets a component the caller knows is present.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead, the handle is stale, or `C` is missing.
    #[must_use]
    pub fn get_component_unchecked<C: Component>(&self, entity: Entity) -> &C {
        let location = self.expect_location(entity);
        match self.archetype(location.archetype).get::<C>(location.row) {
            Some(component) => component,
            None => panic!("{entity} has no {}", type_name::<C>()),
        }
    }

    /// Mutable counterpart of [`Registry::get_component_unchecked`].
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead, the handle is stale, or `C` is missing.
    pub fn get_component_unchecked_mut<C: Component>(&mut self, entity: Entity) -> &mut C {
        let location = self.expect_location(entity);
        if !self.archetype(location.archetype).has::<C>() {
            panic!("{entity} has no {}", type_name::<C>());
        }
        self.component_at_mut::<C>(location)
    }

    /// Returns `true` if the entity is alive and has a `C`.
    ///
    /// # Panics
    ///
    /// Panics if the handle's archetype does not match where the entity lives.
    #[must_use]
    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.locate(entity)
            .is_some_and(|location| self.archetype(location.archetype).has::<C>())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Runs `callback` once for every row matching `Q`.
    ///
    /// Archetypes are visited in table order and rows in row order. Component
    /// values may be changed through `&mut` terms; the component set of an
    /// entity cannot change while the query runs.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    pub fn execute<'r, Q, F>(&'r mut self, mut callback: F)
    where
        Q: Query,
        F: FnMut(Q::Item<'r>),
    {
        let required = Q::required_types();
        for archetype in self.archetypes.iter_mut() {
            if archetype.is_empty() || !archetype.signature().contains_all(&required) {
                continue;
            }
            let mut view = archetype.view();
            let mut fetch = Q::fetch(&mut view);
            while let Some(item) = Q::next(&mut fetch) {
                callback(item);
            }
        }
    }

    /// Number of rows [`Registry::execute`] would visit for `Q`.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    #[must_use]
    pub fn count<Q: Query>(&self) -> usize {
        let required = Q::required_types();
        self.archetypes
            .iter()
            .filter(|archetype| archetype.signature().contains_all(&required))
            .map(Archetype::len)
            .sum()
    }

    /// Ids of every archetype `Q` matches, including empty ones.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    #[must_use]
    pub fn matching_archetypes<Q: Query>(&self) -> Vec<ArchetypeId> {
        let required = Q::required_types();
        self.archetypes
            .iter()
            .filter(|archetype| archetype.signature().contains_all(&required))
            .map(Archetype::id)
            .collect()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of archetypes, including the empty one.
    #[inline]
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Looks up an archetype by id.
    #[inline]
    #[must_use]
    pub fn get_archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    /// The archetype table.
    #[inline]
    #[must_use]
    pub fn archetypes(&self) -> &ArchetypeTable {
        &self.archetypes
    }

    /// Describes every archetype and the entities it holds.
    #[must_use]
    pub fn layout(&self) -> Vec<ArchetypeSummary> {
        self.archetypes
            .iter()
            .map(|archetype| ArchetypeSummary {
                id: archetype.id(),
                components: archetype
                    .component_infos()
                    .iter()
                    .map(ComponentInfo::short_name)
                    .collect(),
                entities: archetype.entities().to_vec(),
            })
            .collect()
    }

    /// Logs [`Registry::layout`] at debug level, one event per archetype.
    pub fn log_layout(&self) {
        for summary in self.layout() {
            let entities: Vec<u32> = summary.entities.iter().map(|id| id.index()).collect();
            tracing::debug!(
                archetype = summary.id.index(),
                components = ?summary.components,
                ?entities,
                "archetype layout"
            );
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Location of a live entity, checking the handle against it.
    fn locate(&self, entity: Entity) -> Option<EntityLocation> {
        if !self.allocator.is_alive(entity.id) {
            return None;
        }
        let location = self.locations.get(entity.id.slot()).copied().flatten();
        let Some(location) = location else {
            panic!("live {entity} has no location");
        };
        assert_eq!(
            location.archetype, entity.archetype,
            "stale handle {entity}: entity lives in {}",
            location.archetype
        );
        Some(location)
    }

    fn expect_location(&self, entity: Entity) -> EntityLocation {
        match self.locate(entity) {
            Some(location) => location,
            None => panic!("{entity} is not alive"),
        }
    }

    fn set_location(&mut self, id: EntityId, location: EntityLocation) {
        let slot = id.slot();
        if slot >= self.locations.len() {
            self.locations.resize(slot + 1, None);
        }
        self.locations[slot] = Some(location);
    }

    fn archetype(&self, id: ArchetypeId) -> &Archetype {
        match self.archetypes.get(id) {
            Some(archetype) => archetype,
            None => panic!("{id} does not exist"),
        }
    }

    fn archetype_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        match self.archetypes.get_mut(id) {
            Some(archetype) => archetype,
            None => panic!("{id} does not exist"),
        }
    }

    fn component_at_mut<C: Component>(&mut self, location: EntityLocation) -> &mut C {
        match self.archetype_mut(location.archetype).get_mut::<C>(location.row) {
            Some(component) => component,
            None => panic!(
                "{} row {} has no {}",
                location.archetype,
                location.row,
                type_name::<C>()
            ),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
