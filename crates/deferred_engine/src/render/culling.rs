//! View-frustum rejection of bounding boxes
//!
//! Corners are tested in homogeneous clip space against the six planes
//! `-w < x < w`, `-w < y < w`, `-w < z < w`. A box is rejected only when
//! every corner lies outside the same plane, so the test is conservative:
//! large boxes straddling a frustum edge may pass without being visible.

use super::geometry::Aabb;
use crate::foundation::math::{Mat4, Vec4};

/// Whether any part of `aabb` may be visible under `mvp`
pub fn aabb_in_frustum(aabb: &Aabb, mvp: &Mat4) -> bool {
    let clip: [Vec4; 8] = aabb.corners().map(|c| mvp * Vec4::new(c.x, c.y, c.z, 1.0));

    for axis in 0..3 {
        if clip.iter().all(|p| p[axis] <= -p.w) || clip.iter().all(|p| p[axis] >= p.w) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::CameraView;
    use crate::foundation::math::Vec3;

    fn camera() -> CameraView {
        let mut view = CameraView::default();
        view.set_perspective(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        view.look_at(Vec3::new(2.0, 1.0, 5.0), Vec3::new(2.0, 1.0, 0.0));
        view
    }

    fn unit_box(center: Vec3) -> Aabb {
        Aabb { center, half_width: Vec3::repeat(1.0) }
    }

    #[test]
    fn test_box_around_camera_is_visible() {
        let view = camera();
        assert!(aabb_in_frustum(&unit_box(view.position), &view.view_projection));
    }

    #[test]
    fn test_box_far_behind_camera_is_culled() {
        let view = camera();
        let behind = view.position - view.forward * 10_000.0;
        assert!(!aabb_in_frustum(&unit_box(behind), &view.view_projection));
    }

    #[test]
    fn test_box_in_front_visible_and_to_the_side_culled() {
        let view = camera();
        let ahead = view.position + view.forward * 10.0;
        assert!(aabb_in_frustum(&unit_box(ahead), &view.view_projection));

        let aside = ahead + Vec3::new(500.0, 0.0, 0.0);
        assert!(!aabb_in_frustum(&unit_box(aside), &view.view_projection));
    }

    #[test]
    fn test_model_matrix_moves_box() {
        let view = camera();
        let model = Mat4::new_translation(&Vec3::new(0.0, 0.0, 10_000.0));
        let local = unit_box(Vec3::new(2.0, 1.0, 0.0));
        assert!(aabb_in_frustum(&local, &view.view_projection));
        assert!(!aabb_in_frustum(&local, &(view.view_projection * model)));
    }
}
