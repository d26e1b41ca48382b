//! # Query Engine
//!
//! A query is a tuple of terms, each naming what a callback receives per row:
//!
//! | Term      | Yields        | Matching                         |
//! |-----------|---------------|----------------------------------|
//! | `&T`      | `&T`          | archetype must store `T`         |
//! | `&mut T`  | `&mut T`      | archetype must store `T`         |
//! | `Entity`  | [`Entity`]    | none, matches every archetype    |
//!
//! An archetype matches when its signature contains every component term.
//! Matching archetypes are visited in table order and rows in row order.
//!
//! ```rust
//! use tessera_core::{Entity, Position, Registry, Velocity};
//!
//! let mut registry = Registry::new();
//! let mut entity = registry.create();
//! registry.add_component(&mut entity, Position::new(0.0, 0.0, 0.0));
//! registry.add_component(&mut entity, Velocity::new(1.0, 0.0, 0.0));
//!
//! registry.execute::<(&mut Position, &Velocity), _>(|(position, velocity)| {
//!     position.x += velocity.x;
//! });
//!
//! let mut seen = Vec::new();
//! registry.execute::<(Entity, &Position), _>(|(entity, position)| {
//!     seen.push((entity.id, position.x));
//! });
//! assert_eq!(seen, vec![(entity.id, 1.0)]);
//! ```

use std::any::{type_name, TypeId};
use std::slice;

use super::archetype::{ArchetypeId, ArchetypeSignature};
use super::component::{Component, ComponentInfo};
use super::entity::{Entity, EntityId};
use super::storage::{self, Column, ComponentColumn};

// =============================================================================
// ARCHETYPE VIEW
// =============================================================================

/// One matching archetype, split into independently borrowable columns.
///
/// Each column can be taken once; this is what lets a single row hand out
/// `&mut A` and `&B` at the same time without aliasing.
pub struct ArchetypeView<'a> {
    archetype: ArchetypeId,
    signature: &'a ArchetypeSignature,
    columns: Vec<Option<&'a mut Box<dyn ComponentColumn>>>,
    entities: &'a [EntityId],
}

impl<'a> ArchetypeView<'a> {
    pub(crate) fn new(
        archetype: ArchetypeId,
        signature: &'a ArchetypeSignature,
        columns: Vec<Option<&'a mut Box<dyn ComponentColumn>>>,
        entities: &'a [EntityId],
    ) -> Self {
        Self {
            archetype,
            signature,
            columns,
            entities,
        }
    }

    /// Takes the column for `C` out of the view.
    ///
    /// # Panics
    ///
    /// Panics if the archetype does not store `C` or the column was already taken.
    fn take_column<C: Component>(&mut self) -> &'a mut Column<C> {
        let archetype = self.archetype;
        let Some(index) = self.signature.position(TypeId::of::<C>()) else {
            panic!("{archetype} does not store {}", type_name::<C>());
        };
        let Some(column) = self.columns[index].take() else {
            panic!("{} appears twice in one query", type_name::<C>());
        };
        match storage::downcast_mut::<C>(&mut **column) {
            Some(column) => column,
            None => panic!("{archetype} column {index} does not hold {}", type_name::<C>()),
        }
    }
}

// =============================================================================
// QUERY TERMS
// =============================================================================

/// A single element of a query tuple.
pub trait QueryTerm {
    /// Value handed to the callback for one row.
    type Item<'a>;
    /// Per-archetype cursor.
    type Fetch<'a>;

    /// The component this term requires, or `None` if it matches everything.
    fn component() -> Option<ComponentInfo>;

    /// Borrows what this term needs from a matching archetype.
    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a>;

    /// Advances the cursor by one row.
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>>;
}

impl<'q, C: Component> QueryTerm for &'q C {
    type Item<'a> = &'a C;
    type Fetch<'a> = slice::Iter<'a, C>;

    fn component() -> Option<ComponentInfo> {
        Some(ComponentInfo::of::<C>())
    }

    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a> {
        let column: &'a Column<C> = view.take_column::<C>();
        column.as_slice().iter()
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        fetch.next()
    }
}

impl<'q, C: Component> QueryTerm for &'q mut C {
    type Item<'a> = &'a mut C;
    type Fetch<'a> = slice::IterMut<'a, C>;

    fn component() -> Option<ComponentInfo> {
        Some(ComponentInfo::of::<C>())
    }

    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a> {
        view.take_column::<C>().as_mut_slice().iter_mut()
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        fetch.next()
    }
}

impl QueryTerm for Entity {
    type Item<'a> = Entity;
    type Fetch<'a> = (slice::Iter<'a, EntityId>, ArchetypeId);

    fn component() -> Option<ComponentInfo> {
        None
    }

    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a> {
        (view.entities.iter(), view.archetype)
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        let (ids, archetype) = fetch;
        ids.next().map(|&id| Entity::new(id, *archetype))
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// A set of terms evaluated together, one item per matching row.
///
/// Implemented for single component terms and for tuples of up to eight
/// [`QueryTerm`]s.
pub trait Query {
    /// Value handed to the callback for one row.
    type Item<'a>;
    /// Per-archetype cursor.
    type Fetch<'a>;

    /// Components an archetype must store to match, in term order.
    fn components() -> Vec<ComponentInfo>;

    /// Borrows what the terms need from a matching archetype.
    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a>;

    /// Advances every term by one row.
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>>;

    /// Component type ids required by the query.
    ///
    /// # Panics
    ///
    /// Panics if the same component type is named twice.
    fn required_types() -> Vec<TypeId> {
        let components = Self::components();
        let mut types: Vec<TypeId> = components.iter().map(|info| info.type_id).collect();
        types.sort_unstable();
        if let Some(pair) = types.windows(2).find(|pair| pair[0] == pair[1]) {
            let name = components
                .iter()
                .find(|info| info.type_id == pair[0])
                .map_or("<unknown>", |info| info.name);
            panic!("{name} appears twice in one query");
        }
        types
    }
}

impl<'q, C: Component> Query for &'q C {
    type Item<'a> = &'a C;
    type Fetch<'a> = slice::Iter<'a, C>;

    fn components() -> Vec<ComponentInfo> {
        vec![ComponentInfo::of::<C>()]
    }

    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a> {
        <&'q C as QueryTerm>::fetch(view)
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        fetch.next()
    }
}

impl<'q, C: Component> Query for &'q mut C {
    type Item<'a> = &'a mut C;
    type Fetch<'a> = slice::IterMut<'a, C>;

    fn components() -> Vec<ComponentInfo> {
        vec![ComponentInfo::of::<C>()]
    }

    fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a> {
        <&'q mut C as QueryTerm>::fetch(view)
    }

    #[inline]
    fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
        fetch.next()
    }
}

macro_rules! impl_query_tuple {
    ($($name:ident),+) => {
        impl<$($name: QueryTerm),+> Query for ($($name,)+) {
            type Item<'a> = ($($name::Item<'a>,)+);
            type Fetch<'a> = ($($name::Fetch<'a>,)+);

            fn components() -> Vec<ComponentInfo> {
                let mut components = Vec::new();
                $(
                    if let Some(info) = $name::component() {
                        components.push(info);
                    }
                )+
                components
            }

            fn fetch<'a>(view: &mut ArchetypeView<'a>) -> Self::Fetch<'a> {
                ($($name::fetch(view),)+)
            }

            #[inline]
            #[allow(non_snake_case)]
            fn next<'a>(fetch: &mut Self::Fetch<'a>) -> Option<Self::Item<'a>> {
                let ($($name,)+) = fetch;
                Some(($($name::next($name)?,)+))
            }
        }
    };
}

impl_query_tuple!(A);
impl_query_tuple!(A, B);
impl_query_tuple!(A, B, C);
impl_query_tuple!(A, B, C, D);
impl_query_tuple!(A, B, C, D, E);
impl_query_tuple!(A, B, C, D, E, F);
impl_query_tuple!(A, B, C, D, E, F, G);
impl_query_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Position, Velocity, Visibility};

    #[test]
    fn test_components_skip_entity_terms() {
        let components = <(Entity, &Position, &mut Velocity)>::components();
        let types: Vec<_> = components.iter().map(|info| info.type_id).collect();
        assert_eq!(types, vec![TypeId::of::<Position>(), TypeId::of::<Velocity>()]);

        assert!(<(Entity,)>::components().is_empty());
        assert_eq!(<&Visibility>::components().len(), 1);
    }

    #[test]
    fn test_required_types_sorted() {
        let mut expected = vec![TypeId::of::<Velocity>(), TypeId::of::<Position>()];
        expected.sort_unstable();
        assert_eq!(<(&Velocity, Entity, &Position)>::required_types(), expected);
    }

    #[test]
    #[should_panic(expected = "appears twice in one query")]
    fn test_duplicate_component_panics() {
        let _ = <(&Position, &mut Position)>::required_types();
    }
}
