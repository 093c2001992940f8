//! Camera component
//!
//! The view state is a value struct, [`CameraView`], so lights can carry the
//! same spatial and projection fields without sharing a layout with cameras.
//! The matrices are caches: [`CameraView::update`] rebuilds the view and
//! view-projection from `position`, `forward` and `up` every tick, and the
//! projection is rebuilt whenever one of the `set_*` projection methods runs.

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Default vertical field of view in degrees
pub const DEFAULT_FOV_DEGREES: f32 = 60.0;
/// Default near clipping plane
pub const DEFAULT_NEAR: f32 = 0.01;
/// Default far clipping plane
pub const DEFAULT_FAR: f32 = 100.0;

/// Position, orientation and projection of a viewer
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    /// Point looked at by [`Self::look_at`] and view tracks
    pub target: Vec3,
    /// Eye position in world space
    pub position: Vec3,
    /// Viewing direction, normalised on update
    pub forward: Vec3,
    /// Up hint
    pub up: Vec3,
    /// World to view
    pub view_matrix: Mat4,
    /// View to clip
    pub projection_matrix: Mat4,
    /// `projection_matrix * view_matrix`
    pub view_projection: Mat4,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        let mut view = Self {
            target: Vec3::zeros(),
            position: Vec3::new(0.0, 0.0, 1.0),
            forward: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::y(),
            view_matrix: Mat4::identity(),
            projection_matrix: Mat4::identity(),
            view_projection: Mat4::identity(),
            fov: 0.0,
            near: 0.0,
            far: 0.0,
        };
        view.set_perspective(utils::deg_to_rad(DEFAULT_FOV_DEGREES), 1.0, DEFAULT_NEAR, DEFAULT_FAR);
        view.update();
        view
    }
}

impl CameraView {
    /// Perspective projection, `fov` in radians
    pub fn set_perspective(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.fov = fov;
        self.near = near;
        self.far = far;
        self.projection_matrix = Mat4::perspective(fov, aspect, near, far);
    }

    /// Orthographic projection
    pub fn set_orthographic(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.projection_matrix = Mat4::orthographic(left, right, bottom, top, near, far);
    }

    /// Place the eye at `position` looking at `target`
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
        if let Some(forward) = (target - position).try_normalize(f32::EPSILON) {
            self.forward = forward;
        }
        self.update();
    }

    /// Recompute the view and view-projection caches
    pub fn update(&mut self) {
        if let Some(forward) = self.forward.try_normalize(f32::EPSILON) {
            self.forward = forward;
        }
        self.view_matrix = Mat4::look_at(&self.position, &(self.position + self.forward), &self.up);
        self.view_projection = self.projection_matrix * self.view_matrix;
    }
}

/// Camera attached to an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub(crate) base: ComponentBase,
    /// Spatial and projection state
    pub view: CameraView,
}

impl_component!(Camera, Camera, cameras);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let cam = Camera::default();
        assert_eq!(cam.view.position, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(cam.view.forward, Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(cam.view.fov, utils::deg_to_rad(60.0));
        assert_relative_eq!(cam.view.near, 0.01);
        assert_relative_eq!(cam.view.far, 100.0);
    }

    #[test]
    fn test_update_normalises_forward_and_rebuilds_caches() {
        let mut view = CameraView { forward: Vec3::new(0.0, 0.0, -4.0), ..CameraView::default() };
        view.position = Vec3::new(0.0, 0.0, 10.0);
        view.update();
        assert_relative_eq!(view.forward.norm(), 1.0);

        // A point straight ahead lands in the centre of clip space.
        let clip = view.view_projection * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-6);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-6);
        assert!(clip.z.abs() < clip.w);
    }

    #[test]
    fn test_look_at_sets_target_and_forward() {
        let mut view = CameraView::default();
        view.look_at(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0));
        assert_relative_eq!(view.forward, Vec3::x());
        assert_eq!(view.target, Vec3::new(3.0, 0.0, 0.0));
    }
}
