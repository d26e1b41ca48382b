//! # Archetype-based Entity Storage
//!
//! Entities with the same component set are stored together, one dense
//! column per component type:
//!
//! ```text
//! Archetype {Position, Velocity}:
//!   Position: [P0, P1, P2, P3]
//!   Velocity: [V0, V1, V2, V3]
//!   entities: [e7, e2, e9, e4]
//! ```
//!
//! Row `i` of every column and of the entity list belong to the same entity.
//! Iteration over an archetype is a linear walk of its columns.
//!
//! ## Identity
//!
//! An archetype is identified by its [`ArchetypeSignature`], the sorted and
//! deduplicated set of component [`TypeId`]s. `{A, B}` and `{B, A}` are the
//! same archetype. The [`ArchetypeTable`] indexes archetypes by signature, so
//! there is never more than one archetype per component set.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use super::component::{Component, ComponentInfo};
use super::entity::EntityId;
use super::query::ArchetypeView;
use super::storage::{self, Column, ComponentColumn};

/// Index of an archetype in the [`ArchetypeTable`].
///
/// Archetypes are never removed, so an id stays valid for the table's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(pub(crate) usize);

impl ArchetypeId {
    /// The archetype of entities without components. Always at index 0.
    pub const EMPTY: Self = Self(0);

    /// Returns the position in the archetype table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archetype {}", self.0)
    }
}

/// Signature of an archetype - which components it contains.
///
/// Uses a sorted vector of `TypeId`s for consistent hashing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeSignature {
    /// Sorted list of component `TypeId`s.
    components: Vec<TypeId>,
}

impl ArchetypeSignature {
    /// Creates a new archetype signature from component types.
    #[must_use]
    pub fn new(mut components: Vec<TypeId>) -> Self {
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// The signature of the empty archetype.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Returns a copy with `type_id` added.
    #[must_use]
    pub fn with(&self, type_id: TypeId) -> Self {
        let mut components = self.components.clone();
        if let Err(pos) = components.binary_search(&type_id) {
            components.insert(pos, type_id);
        }
        Self { components }
    }

    /// Returns a copy with `type_id` removed.
    #[must_use]
    pub fn without(&self, type_id: TypeId) -> Self {
        let mut components = self.components.clone();
        if let Ok(pos) = components.binary_search(&type_id) {
            components.remove(pos);
        }
        Self { components }
    }

    /// Position of `type_id` in the signature, which is also its column index.
    #[inline]
    #[must_use]
    pub fn position(&self, type_id: TypeId) -> Option<usize> {
        self.components.binary_search(&type_id).ok()
    }

    /// Checks if this signature contains a component type.
    #[inline]
    #[must_use]
    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.position(type_id).is_some()
    }

    /// Checks if this signature contains component `C`.
    #[must_use]
    pub fn contains<C: Component>(&self) -> bool {
        self.contains_type(TypeId::of::<C>())
    }

    /// Checks if every type in `types` is part of this signature.
    #[must_use]
    pub fn contains_all(&self, types: &[TypeId]) -> bool {
        types.iter().all(|&t| self.contains_type(t))
    }

    /// Component types in column order.
    #[must_use]
    pub fn types(&self) -> &[TypeId] {
        &self.components
    }

    /// Returns the number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// A single archetype - stores all entities with the same component set.
pub struct Archetype {
    /// Position in the table.
    id: ArchetypeId,
    /// Signature identifying this archetype.
    signature: ArchetypeSignature,
    /// One column per signature entry, same order.
    columns: Vec<Box<dyn ComponentColumn>>,
    /// Entity ids in row order.
    entities: Vec<EntityId>,
}

impl Archetype {
    /// Creates an archetype from columns; the signature is derived from them.
    ///
    /// # Panics
    ///
    /// Panics if two columns store the same component type.
    pub(crate) fn from_columns(id: ArchetypeId, mut columns: Vec<Box<dyn ComponentColumn>>) -> Self {
        columns.sort_unstable_by_key(|column| column.info().type_id);
        let signature =
            ArchetypeSignature::new(columns.iter().map(|c| c.info().type_id).collect());
        assert_eq!(
            signature.len(),
            columns.len(),
            "archetype columns must have distinct component types"
        );

        Self {
            id,
            signature,
            columns,
            entities: Vec::new(),
        }
    }

    /// Returns the table index of this archetype.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Returns the signature of this archetype.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    /// Returns the number of entities in this archetype.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns a slice of all entity ids in row order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Gets the entity id at a row.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, row: usize) -> Option<EntityId> {
        self.entities.get(row).copied()
    }

    /// Describes the stored component types in column order.
    #[must_use]
    pub fn component_infos(&self) -> Vec<ComponentInfo> {
        self.columns.iter().map(|c| c.info()).collect()
    }

    /// Checks if this archetype stores component `C`.
    #[inline]
    #[must_use]
    pub fn has<C: Component>(&self) -> bool {
        self.signature.contains::<C>()
    }

    /// Returns the typed column for `C`, if present.
    #[must_use]
    pub fn column<C: Component>(&self) -> Option<&Column<C>> {
        let index = self.signature.position(TypeId::of::<C>())?;
        storage::downcast_ref::<C>(self.columns[index].as_ref())
    }

    /// Returns the mutable typed column for `C`, if present.
    pub fn column_mut<C: Component>(&mut self) -> Option<&mut Column<C>> {
        let index = self.signature.position(TypeId::of::<C>())?;
        storage::downcast_mut::<C>(self.columns[index].as_mut())
    }

    /// Gets the component `C` at a row.
    #[inline]
    #[must_use]
    pub fn get<C: Component>(&self, row: usize) -> Option<&C> {
        self.column::<C>()?.get(row)
    }

    /// Gets the mutable component `C` at a row.
    #[inline]
    pub fn get_mut<C: Component>(&mut self, row: usize) -> Option<&mut C> {
        self.column_mut::<C>()?.get_mut(row)
    }

    /// Empty columns matching this archetype's, except for `skip`.
    pub(crate) fn empty_columns_except(
        &self,
        skip: Option<TypeId>,
        capacity: usize,
    ) -> Vec<Box<dyn ComponentColumn>> {
        self.columns
            .iter()
            .filter(|column| Some(column.info().type_id) != skip)
            .map(|column| column.empty_like(capacity))
            .collect()
    }

    /// Appends an entity id; columns must be filled by the caller.
    #[inline]
    pub(crate) fn push_entity(&mut self, id: EntityId) -> usize {
        self.entities.push(id);
        self.entities.len() - 1
    }

    /// Appends a value to the `C` column.
    ///
    /// # Panics
    ///
    /// Panics if the archetype has no `C` column.
    pub(crate) fn push_component<C: Component>(&mut self, value: C) -> usize {
        let archetype = self.id;
        match self.column_mut::<C>() {
            Some(column) => column.push(value),
            None => panic!(
                "{archetype} has no column for {}",
                std::any::type_name::<C>()
            ),
        }
    }

    /// Swap-removes `row`, dropping its component values.
    ///
    /// Returns the entity that was moved into `row`, if any.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<EntityId> {
        for column in &mut self.columns {
            column.swap_remove_drop(row);
        }
        self.swap_remove_entity(row)
    }

    /// Swap-removes the entity id at `row` after the columns were handled.
    fn swap_remove_entity(&mut self, row: usize) -> Option<EntityId> {
        self.entities.swap_remove(row);
        self.debug_check_columns();
        self.entities.get(row).copied()
    }

    /// Moves the row's values into `dst` and swap-removes the row here.
    ///
    /// Every column of `self` whose type `dst` also stores is moved across;
    /// the value of any other column (at most `extracted`) is handed to
    /// `extract`, which takes ownership of it. The entity id itself is not
    /// pushed to `dst`.
    ///
    /// Returns the entity that was moved into `row`, if any.
    pub(crate) fn migrate_row(
        &mut self,
        row: usize,
        dst: &mut Archetype,
        mut extract: impl FnMut(&mut dyn ComponentColumn),
    ) -> Option<EntityId> {
        for column in &mut self.columns {
            let type_id = column.info().type_id;
            match dst.signature.position(type_id) {
                Some(index) => column.swap_remove_into(row, dst.columns[index].as_mut()),
                None => extract(column.as_mut()),
            }
        }
        self.swap_remove_entity(row)
    }

    /// Splits the archetype into per-column borrows for the query engine.
    pub(crate) fn view(&mut self) -> ArchetypeView<'_> {
        ArchetypeView::new(
            self.id,
            &self.signature,
            self.columns.iter_mut().map(Some).collect(),
            &self.entities,
        )
    }

    #[inline]
    fn debug_check_columns(&self) {
        debug_assert!(
            self.columns.iter().all(|c| c.len() == self.entities.len()),
            "{} has columns out of step with its {} rows",
            self.id,
            self.entities.len()
        );
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.columns.iter().map(|c| c.info().short_name()).collect();
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("components", &names)
            .field("rows", &self.entities.len())
            .finish()
    }
}

/// Every archetype in the registry, indexed by id and by signature.
///
/// The empty archetype is created with the table and always sits at
/// [`ArchetypeId::EMPTY`].
#[derive(Debug)]
pub struct ArchetypeTable {
    /// Archetypes in creation order.
    archetypes: Vec<Archetype>,
    /// Canonical signature lookup.
    index: HashMap<ArchetypeSignature, ArchetypeId>,
}

impl ArchetypeTable {
    /// Creates a table holding only the empty archetype.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Creates a table with room for `capacity` archetypes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut archetypes = Vec::with_capacity(capacity.max(1));
        archetypes.push(Archetype::from_columns(ArchetypeId::EMPTY, Vec::new()));

        let mut index = HashMap::with_capacity(capacity.max(1));
        index.insert(ArchetypeSignature::empty(), ArchetypeId::EMPTY);

        Self { archetypes, index }
    }

    /// Returns the number of archetypes, including the empty one.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Always `false`: the empty archetype is never removed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Looks up an archetype by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.0)
    }

    /// Looks up a mutable archetype by id.
    #[inline]
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.0)
    }

    /// Finds the archetype with exactly this component set.
    #[inline]
    #[must_use]
    pub fn find(&self, signature: &ArchetypeSignature) -> Option<ArchetypeId> {
        self.index.get(signature).copied()
    }

    /// Finds the archetype for `signature`, creating it from `columns` if needed.
    ///
    /// `columns` is only called when the archetype does not exist yet and must
    /// produce one empty column per signature entry.
    pub(crate) fn find_or_insert_with(
        &mut self,
        signature: ArchetypeSignature,
        columns: impl FnOnce() -> Vec<Box<dyn ComponentColumn>>,
    ) -> ArchetypeId {
        if let Some(id) = self.find(&signature) {
            return id;
        }

        let id = ArchetypeId(self.archetypes.len());
        let archetype = Archetype::from_columns(id, columns());
        assert_eq!(
            archetype.signature, signature,
            "new archetype columns do not match the requested signature"
        );

        let components: Vec<&str> = archetype
            .component_infos()
            .iter()
            .map(ComponentInfo::short_name)
            .collect();
        tracing::debug!(archetype = id.0, ?components, "created archetype");

        self.index.insert(signature, id);
        self.archetypes.push(archetype);
        id
    }

    /// Borrows two distinct archetypes mutably.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either id is out of range.
    pub(crate) fn pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "cannot borrow {a} twice");
        if a.0 < b.0 {
            let (low, high) = self.archetypes.split_at_mut(b.0);
            (&mut low[a.0], &mut high[0])
        } else {
            let (low, high) = self.archetypes.split_at_mut(a.0);
            (&mut high[0], &mut low[b.0])
        }
    }

    /// Iterates over all archetypes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Iterates mutably over all archetypes in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Archetype> {
        self.archetypes.iter_mut()
    }
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self::new()
    }
}
