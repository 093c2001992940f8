//! Collider component
//!
//! Boxes and rays in the owner's local space. The collision result fields
//! are written by the collision system each frame and read by debug and
//! picking code.

use serde::{Deserialize, Serialize};

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::math::Vec3;

/// Default reach of a ray collider
pub const DEFAULT_RAY_DISTANCE: f32 = 10_000_000.0;

/// Shape of a collider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderType {
    /// Axis-aligned box around `local_center`
    #[default]
    Box,
    /// Half-line from `local_center` along `direction`
    Ray,
}

/// Box or ray collider attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub(crate) base: ComponentBase,
    /// Shape of this collider
    pub collider_type: ColliderType,
    /// Centre (box) or origin (ray) in local space
    pub local_center: Vec3,
    /// Half extents of the box in local space
    pub local_halfwidth: Vec3,
    /// Ray direction in world space
    pub direction: Vec3,
    /// Ray length
    pub max_distance: f32,
    /// Set when the last collision pass found a hit
    pub colliding: bool,
    /// Collider index of the closest hit
    pub other: Option<usize>,
    /// World-space hit point of a ray
    pub collision_point: Vec3,
    /// Distance along the ray to the hit point
    pub collision_distance: f32,
}

impl_component!(Collider, Collider, colliders);

impl Default for Collider {
    fn default() -> Self {
        Self {
            base: ComponentBase::default(),
            collider_type: ColliderType::Box,
            local_center: Vec3::zeros(),
            local_halfwidth: Vec3::new(0.5, 0.5, 0.5),
            direction: Vec3::new(0.0, 0.0, -1.0),
            max_distance: DEFAULT_RAY_DISTANCE,
            colliding: false,
            other: None,
            collision_point: Vec3::zeros(),
            collision_distance: 0.0,
        }
    }
}

impl Collider {
    /// Clear the transient hit fields
    pub fn reset_collision(&mut self) {
        self.colliding = false;
        self.other = None;
        self.collision_point = Vec3::zeros();
        self.collision_distance = 0.0;
    }
}
