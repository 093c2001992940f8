//! Component trait and type tags
//!
//! Every component kind lives in its own dense array inside the store. The
//! closed [`ComponentType`] enumeration tags those arrays, and the
//! [`Component`] trait maps a Rust type onto its tag and array.

use std::fmt;

use super::store::ComponentArrays;
use super::EntityId;

/// Number of component kinds the store knows about
pub const NUM_COMPONENT_TYPES: usize = 9;

/// Type tag of each component array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    /// Local matrix and parent link
    Transform = 0,
    /// Geometry and material reference
    Mesh = 1,
    /// View and projection state
    Camera = 2,
    /// Light source
    Light = 3,
    /// Box or ray collider
    Collider = 4,
    /// Screen-space textured element
    GuiElement = 5,
    /// Screen-space text element
    GuiText = 6,
    /// Keyframe animation
    Animation = 7,
    /// Spline camera track
    ViewTrack = 8,
}

impl ComponentType {
    /// All tags in storage order
    pub const ALL: [Self; NUM_COMPONENT_TYPES] = [
        Self::Transform,
        Self::Mesh,
        Self::Camera,
        Self::Light,
        Self::Collider,
        Self::GuiElement,
        Self::GuiText,
        Self::Animation,
        Self::ViewTrack,
    ];
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fields shared by every component
///
/// `owner` and `index` are maintained by the store; user code can read them
/// but never change them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentBase {
    pub(crate) owner: EntityId,
    pub(crate) index: usize,
}

impl ComponentBase {
    /// Entity that owns this component
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Slot of this component in its type's array
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// A plain-data component stored in a dense per-type array
pub trait Component: Default + 'static {
    /// Tag of the array this type lives in
    const TYPE: ComponentType;

    /// Shared owner/index fields
    fn base(&self) -> &ComponentBase;

    /// Mutable access for the store
    #[doc(hidden)]
    fn base_mut(&mut self) -> &mut ComponentBase;

    /// The array holding every component of this type
    #[doc(hidden)]
    fn array(arrays: &ComponentArrays) -> &Vec<Self>;

    /// Mutable access to the array holding every component of this type
    #[doc(hidden)]
    fn array_mut(arrays: &mut ComponentArrays) -> &mut Vec<Self>;

    /// Entity that owns this component
    fn owner(&self) -> EntityId {
        self.base().owner
    }
}

/// Wires a component struct with a `base: ComponentBase` field to its array
macro_rules! impl_component {
    ($ty:ty, $tag:ident, $field:ident) => {
        impl $crate::ecs::Component for $ty {
            const TYPE: $crate::ecs::ComponentType = $crate::ecs::ComponentType::$tag;

            fn base(&self) -> &$crate::ecs::ComponentBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::ecs::ComponentBase {
                &mut self.base
            }

            fn array(arrays: &$crate::ecs::store::ComponentArrays) -> &Vec<Self> {
                &arrays.$field
            }

            fn array_mut(arrays: &mut $crate::ecs::store::ComponentArrays) -> &mut Vec<Self> {
                &mut arrays.$field
            }
        }
    };
}

pub(crate) use impl_component;
