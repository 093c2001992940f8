//! Mesh component

use serde::{Deserialize, Serialize};

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;

/// Which pass draws a mesh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Lit directly in the forward pass after deferred lighting
    Forward,
    /// Written to the G-buffer and lit by light volumes
    #[default]
    Deferred,
}

/// Geometry and material drawn for an entity
///
/// Both fields are registry ids, never pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mesh {
    pub(crate) base: ComponentBase,
    /// Geometry id in the resource registry
    pub geometry: usize,
    /// Material id in the resource registry
    pub material: usize,
    /// Pass that draws this mesh
    pub render_mode: RenderMode,
}

impl_component!(Mesh, Mesh, meshes);
