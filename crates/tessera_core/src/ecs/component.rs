//! # Component System
//!
//! Components are pure data containers with no behavior.
//! Any `'static` type can be a component once it opts in with
//! [`Component`]; values are moved, never copied bytewise.

use std::any::{type_name, TypeId};

use bytemuck::{Pod, Zeroable};

/// Marker trait for ECS components.
///
/// Components must be `'static` so their columns can be recovered through
/// [`std::any::Any`]. They do not need to be `Copy`: migrating a row between
/// archetypes moves the value and erasing an entity drops it.
///
/// # Example
///
/// ```rust
/// use tessera_core::Component;
///
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: 'static {}

/// Runtime description of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentInfo {
    /// Identity used for archetype signatures.
    pub type_id: TypeId,
    /// Human-readable type name, for diagnostics only.
    pub name: &'static str,
    /// Size of one value in bytes.
    pub size: usize,
}

impl ComponentInfo {
    /// Describes component type `C`.
    #[inline]
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
            size: std::mem::size_of::<C>(),
        }
    }

    /// Type name without its module path.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        // Only the outermost path is trimmed; generic arguments stay as-is.
        let end = self.name.find('<').unwrap_or(self.name.len());
        match self.name[..end].rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

/// Position component for entities.
///
/// Represents a 3D position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space.
    pub y: f32,
    /// Z coordinate in world space.
    pub z: f32,
}

impl Component for Position {}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Velocity component for entities.
///
/// Movement speed in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X velocity component.
    pub x: f32,
    /// Y velocity component.
    pub y: f32,
    /// Z velocity component.
    pub z: f32,
}

impl Component for Velocity {}

impl Velocity {
    /// Creates a new velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation as a unit quaternion `(x, y, z, w)`.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Rotation {
    /// Quaternion x.
    pub x: f32,
    /// Quaternion y.
    pub y: f32,
    /// Quaternion z.
    pub z: f32,
    /// Quaternion w.
    pub w: f32,
}

impl Component for Rotation {}

impl Rotation {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Spin applied to a [`Rotation`] each step, as a quaternion.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct AngularVelocity(pub Rotation);

impl Component for AngularVelocity {}

/// Whether the renderer should draw the entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Visibility {
    /// Non-zero when visible.
    pub visible: u32,
}

impl Component for Visibility {}

impl Visibility {
    /// A visible entity.
    pub const VISIBLE: Self = Self { visible: 1 };
    /// A hidden entity.
    pub const HIDDEN: Self = Self { visible: 0 };

    /// Returns `true` when visible.
    #[inline]
    #[must_use]
    pub const fn is_visible(self) -> bool {
        self.visible != 0
    }
}

/// Gameplay category of an entity (crate, projectile, ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct ObjectKind {
    /// Category id; meaning is up to the gameplay layer.
    pub kind: u32,
}

impl Component for ObjectKind {}
