//! # Component Storage
//!
//! Dense, per-type component columns.
//!
//! Each archetype owns one column per component type. Columns are stored as
//! `Box<dyn ComponentColumn>` so an archetype can hold any mix of types, but
//! the values themselves live in a typed `Vec<T>`:
//! - Access is O(1) by row
//! - Iteration is cache-friendly (contiguous memory)
//! - Typed access goes through a checked downcast, never a byte reinterpret

use std::any::Any;

use super::component::{Component, ComponentInfo};

/// Type-erased view of a [`Column`].
///
/// This is the operation table the archetype machinery works through: it can
/// move, drop and count rows without knowing the concrete component type.
pub trait ComponentColumn: Any {
    /// Describes the stored component type.
    fn info(&self) -> ComponentInfo;

    /// Number of values stored.
    fn len(&self) -> usize;

    /// Checks if empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates an empty column of the same component type.
    fn empty_like(&self, capacity: usize) -> Box<dyn ComponentColumn>;

    /// Removes `row` by moving the last value into it, dropping the removed value.
    fn swap_remove_drop(&mut self, row: usize);

    /// Removes `row` by swap-remove and appends the value to `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` stores a different component type.
    fn swap_remove_into(&mut self, row: usize, dst: &mut dyn ComponentColumn);

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage for a single component type.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Column, Position};
///
/// let mut column: Column<Position> = Column::with_capacity(16);
/// column.push(Position::new(1.0, 2.0, 3.0));
/// assert_eq!(column.get(0), Some(&Position::new(1.0, 2.0, 3.0)));
/// ```
pub struct Column<C: Component> {
    /// The dense array of components.
    values: Vec<C>,
}

impl<C: Component> Column<C> {
    /// Creates an empty column.
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Creates an empty column with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends a value, returning its row.
    #[inline]
    pub fn push(&mut self, value: C) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    /// Gets a component by row.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&C> {
        self.values.get(row)
    }

    /// Gets a mutable component by row.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut C> {
        self.values.get_mut(row)
    }

    /// Removes `row` by swap-remove and returns its value.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[inline]
    pub fn swap_remove(&mut self, row: usize) -> C {
        self.values.swap_remove(row)
    }

    /// Returns a slice of all components.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.values
    }

    /// Returns a mutable slice of all components.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.values
    }
}

impl<C: Component> Default for Column<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentColumn for Column<C> {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::of::<C>()
    }

    #[inline]
    fn len(&self) -> usize {
        self.values.len()
    }

    fn empty_like(&self, capacity: usize) -> Box<dyn ComponentColumn> {
        Box::new(Self::with_capacity(capacity))
    }

    #[inline]
    fn swap_remove_drop(&mut self, row: usize) {
        self.values.swap_remove(row);
    }

    fn swap_remove_into(&mut self, row: usize, dst: &mut dyn ComponentColumn) {
        let dst_name = dst.info().name;
        let Some(dst) = dst.as_any_mut().downcast_mut::<Self>() else {
            panic!(
                "column type mismatch: moving {} into {}",
                std::any::type_name::<C>(),
                dst_name
            );
        };
        dst.values.push(self.values.swap_remove(row));
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcasts an erased column to its concrete type.
#[inline]
pub(crate) fn downcast_ref<C: Component>(column: &dyn ComponentColumn) -> Option<&Column<C>> {
    column.as_any().downcast_ref::<Column<C>>()
}

/// Mutable counterpart of [`downcast_ref`].
#[inline]
pub(crate) fn downcast_mut<C: Component>(
    column: &mut dyn ComponentColumn,
) -> Option<&mut Column<C>> {
    column.as_any_mut().downcast_mut::<Column<C>>()
}
