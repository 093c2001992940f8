//! Transform component
//!
//! A local affine matrix plus an optional parent transform. The global
//! matrix is resolved by the store, which owns the whole parent chain.

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Local matrix and parent link
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub(crate) base: ComponentBase,
    /// Matrix relative to the parent (or world when there is none)
    pub local: Mat4,
    /// Index of the parent in the Transform array
    pub parent: Option<usize>,
}

impl_component!(Transform, Transform, transforms);

impl Default for Transform {
    fn default() -> Self {
        Self {
            base: ComponentBase::default(),
            local: Mat4::identity(),
            parent: None,
        }
    }
}

impl Transform {
    /// Local translation
    pub fn position(&self) -> Vec3 {
        self.local.translation_part()
    }

    /// Overwrite the local translation, keeping rotation and scale
    pub fn set_position(&mut self, position: Vec3) {
        self.local[(0, 3)] = position.x;
        self.local[(1, 3)] = position.y;
        self.local[(2, 3)] = position.z;
    }

    /// Move the transform by `delta` in parent space
    pub fn translate(&mut self, delta: Vec3) {
        self.local = Mat4::new_translation(&delta) * self.local;
    }
}
