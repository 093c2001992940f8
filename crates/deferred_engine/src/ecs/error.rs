//! Data-model integrity errors
//!
//! These are programmer or scene-data faults. They are surfaced immediately
//! and never retried.

use super::{ComponentType, EntityId};

/// Result type for store operations
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised by the entity-component store
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Lookup by name found no entity
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Entity handle out of range
    #[error("Invalid entity handle: {0}")]
    InvalidEntity(EntityId),

    /// Entity exists but has no component of the requested type
    #[error("Entity {entity} has no {component} component")]
    ComponentNotPresent {
        /// Entity that was queried
        entity: EntityId,
        /// Requested component type
        component: ComponentType,
    },

    /// Entity already owns a component of this type
    #[error("Entity {entity} already has a {component} component")]
    DuplicateComponent {
        /// Entity that was modified
        entity: EntityId,
        /// Component type being added
        component: ComponentType,
    },

    /// A named entity with this name already exists
    #[error("Duplicate entity name: {0}")]
    DuplicateEntityName(String),

    /// Transform index is past the end of the transform array
    #[error("No transform at index {0}")]
    InvalidTransform(usize),

    /// Transform parent index does not refer to a transform
    #[error("Transform {transform} has invalid parent {parent}")]
    InvalidParent {
        /// Child transform index
        transform: usize,
        /// Offending parent index
        parent: usize,
    },

    /// Parent chain starting at this transform loops back on itself
    #[error("Cyclic transform parent chain at transform {0}")]
    CyclicTransform(usize),

    /// Entity table and component array disagree
    #[error("Inconsistent {component} index for entity {entity}: {detail}")]
    InconsistentIndex {
        /// Entity whose table is wrong
        entity: EntityId,
        /// Component type involved
        component: ComponentType,
        /// Human readable description
        detail: String,
    },
}
