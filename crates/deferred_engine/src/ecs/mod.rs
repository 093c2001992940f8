//! Entity-component store
//!
//! Data-oriented storage for all game-object state: a table of named
//! entities plus one dense array per component type, kept in sync through
//! bidirectional indices.

pub mod component;
pub mod components;
pub mod entity;
pub mod error;
pub mod store;
pub mod systems;

pub use component::{Component, ComponentBase, ComponentType, NUM_COMPONENT_TYPES};
pub use entity::{Entity, EntityId};
pub use error::{EcsError, EcsResult};
pub use store::EntityComponentStore;
