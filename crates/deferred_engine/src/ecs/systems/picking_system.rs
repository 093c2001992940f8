//! Mouse picking ray
//!
//! Turns a cursor position into a world-space ray collider so the collision
//! system can report what lies under the mouse.

use crate::ecs::components::{Camera, Collider, ColliderType, Transform};
use crate::ecs::{EcsResult, EntityComponentStore, EntityId};
use crate::foundation::math::{Vec2, Vec3, Vec4};

/// Cursor position to normalised device coordinates
///
/// Screen y grows downwards, NDC y grows upwards.
pub fn screen_to_ndc(mouse_x: f32, mouse_y: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        mouse_x / width * 2.0 - 1.0,
        (height - mouse_y) / height * 2.0 - 1.0,
    )
}

/// Aim `ray_entity`'s ray collider from `camera_entity` through the cursor
///
/// The near-plane point under the cursor is unprojected through the inverse
/// view-projection. The ray starts at the camera position. Returns `false`
/// and leaves the ray untouched when the view-projection is singular or the
/// viewport is empty.
pub fn set_picking_ray(
    store: &mut EntityComponentStore,
    ray_entity: EntityId,
    camera_entity: EntityId,
    mouse: Vec2,
    viewport: (u32, u32),
) -> EcsResult<bool> {
    let (width, height) = viewport;
    if width == 0 || height == 0 {
        return Ok(false);
    }

    let view = &store.get::<Camera>(camera_entity)?.view;
    let Some(inverse_vp) = view.view_projection.try_inverse() else {
        log::warn!("Camera {} has a singular view-projection, picking skipped", camera_entity);
        return Ok(false);
    };
    let origin = view.position;

    let ndc = screen_to_ndc(mouse.x, mouse.y, width as f32, height as f32);
    let near = inverse_vp * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
    if near.w.abs() < f32::EPSILON {
        return Ok(false);
    }
    let world = near.xyz() / near.w;
    let Some(direction) = (world - origin).try_normalize(f32::EPSILON) else {
        return Ok(false);
    };

    let collider = store.get_mut::<Collider>(ray_entity)?;
    collider.collider_type = ColliderType::Ray;
    collider.local_center = Vec3::zeros();
    collider.direction = direction;
    store.get_mut::<Transform>(ray_entity)?.set_position(origin);

    log::debug!("Picking ray from {:?} towards {:?}", origin, direction);
    Ok(true)
}
