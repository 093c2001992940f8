//! Named entities and their component index tables

use super::{ComponentType, NUM_COMPONENT_TYPES};

/// Position of an entity in the store's entity table
pub type EntityId = usize;

/// A named game object
///
/// Holds one slot per component type; `None` means the entity has no
/// component of that type. The store keeps every slot in sync with the
/// `owner` field of the component it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    name: String,
    active: bool,
    components: [Option<usize>; NUM_COMPONENT_TYPES],
}

impl Entity {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            components: [None; NUM_COMPONENT_TYPES],
        }
    }

    /// Entity name, possibly empty for anonymous entities
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether systems should process this entity
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable the entity
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Slot of this entity's component of type `component_type`
    pub const fn component_index(&self, component_type: ComponentType) -> Option<usize> {
        self.components[component_type as usize]
    }

    /// Whether the entity owns a component of the given type
    pub const fn has(&self, component_type: ComponentType) -> bool {
        self.component_index(component_type).is_some()
    }

    pub(crate) fn set_component_index(&mut self, component_type: ComponentType, index: usize) {
        self.components[component_type as usize] = Some(index);
    }
}
