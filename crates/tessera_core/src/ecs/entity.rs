//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the allocator's slot table
//! - The archetype currently holding the entity's row
//!
//! Slots carry a generation counter and a liveness flag so that weak
//! references can detect identity reuse.

use std::fmt;

use super::archetype::ArchetypeId;

/// Index of an entity slot in the allocator.
///
/// Ids are recycled: once an entity is erased its id becomes available to the
/// next [`EntityAllocator::allocate`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an id from a raw slot index.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-slot counter used to detect stale weak references.
pub type Generation = u32;

/// Strong entity handle.
///
/// The handle is **not** stable across structural mutation: adding or removing
/// a component moves the entity into another archetype. Every mutating
/// registry call takes `&mut Entity` and refreshes `archetype` in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    /// The entity's identity.
    pub id: EntityId,
    /// The archetype holding the entity's row.
    pub archetype: ArchetypeId,
}

impl Entity {
    /// Creates a new entity handle.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId, archetype: ArchetypeId) -> Self {
        Self { id, archetype }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({} in {})", self.id, self.archetype)
    }
}

/// Weak entity reference.
///
/// Captures the slot generation at the time of [`Registry::get_ref`]. It must
/// be resolved with [`Registry::resolve`] before use; resolution fails once the
/// entity is erased or its generation moves on.
///
/// [`Registry::get_ref`]: crate::Registry::get_ref
/// [`Registry::resolve`]: crate::Registry::resolve
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityRef {
    /// The handle as it was when the reference was captured.
    pub entity: Entity,
    /// Slot generation at capture time.
    pub generation: Generation,
}

/// Issues and recycles entity ids.
///
/// Slot state is kept in parallel vectors indexed by [`EntityId`]. Recycled ids
/// are kept on a stack so allocation is O(1).
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Generation per slot.
    generations: Vec<Generation>,
    /// Liveness per slot.
    alive: Vec<bool>,
    /// Dead slots ready for reuse, most recently freed on top.
    free_ids: Vec<EntityId>,
    /// Number of live slots.
    alive_count: usize,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator with room for `capacity` slots before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
            free_ids: Vec::new(),
            alive_count: 0,
        }
    }

    /// Allocates an id, reusing a dead slot when one is available.
    ///
    /// The slot's generation is incremented in both cases, so a fresh slot
    /// starts at generation 1.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots would be needed.
    pub fn allocate(&mut self) -> EntityId {
        let id = if let Some(id) = self.free_ids.pop() {
            id
        } else {
            let index = u32::try_from(self.generations.len())
                .unwrap_or_else(|_| panic!("entity id space exhausted"));
            self.generations.push(0);
            self.alive.push(false);
            EntityId(index)
        };

        let slot = id.slot();
        debug_assert!(!self.alive[slot], "allocated a live slot");
        self.alive[slot] = true;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.alive_count += 1;
        id
    }

    /// Marks a slot dead and makes its id available for reuse.
    ///
    /// Returns `false` if the slot was not alive.
    pub fn free(&mut self, id: EntityId) -> bool {
        let slot = id.slot();
        match self.alive.get_mut(slot) {
            Some(alive) if *alive => {
                *alive = false;
                self.generations[slot] = self.generations[slot].wrapping_add(1);
                self.free_ids.push(id);
                self.alive_count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Increments the generation of a live slot.
    ///
    /// Every weak reference captured before the call stops resolving.
    pub fn bump_generation(&mut self, id: EntityId) {
        if let Some(generation) = self.generations.get_mut(id.slot()) {
            *generation = generation.wrapping_add(1);
        }
    }

    /// Returns whether the slot is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id.slot()).copied().unwrap_or(false)
    }

    /// Returns the current generation of a slot, or `None` for an unknown id.
    #[inline]
    #[must_use]
    pub fn generation(&self, id: EntityId) -> Option<Generation> {
        self.generations.get(id.slot()).copied()
    }

    /// Returns `true` if `generation` is current for a live slot.
    #[inline]
    #[must_use]
    pub fn is_current(&self, id: EntityId, generation: Generation) -> bool {
        self.is_alive(id) && self.generation(id) == Some(generation)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Number of slots ever issued (live or dead).
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_fresh_slots() {
        let mut allocator = EntityAllocator::new();

        let a = allocator.allocate();
        let b = allocator.allocate();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(allocator.generation(a), Some(1));
        assert_eq!(allocator.alive_count(), 2);
    }

    #[test]
    fn test_free_and_reuse() {
        let mut allocator = EntityAllocator::new();

        let a = allocator.allocate();
        let _b = allocator.allocate();
        assert!(allocator.free(a));
        assert!(!allocator.is_alive(a));
        assert_eq!(allocator.alive_count(), 1);

        // Freed ids come back before new slots are issued
        let c = allocator.allocate();
        assert_eq!(c, a);
        assert!(allocator.is_alive(c));
        assert_eq!(allocator.generation(c), Some(3));
        assert_eq!(allocator.slot_count(), 2);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut allocator = EntityAllocator::new();

        let a = allocator.allocate();
        assert!(allocator.free(a));
        assert!(!allocator.free(a));
        assert!(!allocator.free(EntityId::from_raw(42)));
        assert_eq!(allocator.alive_count(), 0);
    }

    #[test]
    fn test_recycling_order_is_lifo() {
        let mut allocator = EntityAllocator::new();

        let ids: Vec<_> = (0..4).map(|_| allocator.allocate()).collect();
        allocator.free(ids[1]);
        allocator.free(ids[3]);

        assert_eq!(allocator.allocate(), ids[3]);
        assert_eq!(allocator.allocate(), ids[1]);
        assert_eq!(allocator.allocate().index(), 4);
    }

    #[test]
    fn test_is_current() {
        let mut allocator = EntityAllocator::new();

        let a = allocator.allocate();
        let generation = allocator.generation(a).unwrap();
        assert!(allocator.is_current(a, generation));

        allocator.bump_generation(a);
        assert!(!allocator.is_current(a, generation));
        assert!(allocator.is_current(a, generation + 1));

        allocator.free(a);
        assert!(!allocator.is_current(a, generation + 1));
    }
}
