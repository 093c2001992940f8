//! Box and ray collision tests
//!
//! Boxes are turned into world-space axis-aligned boxes through their
//! owner's global matrix. Rays are tested against every box with the slab
//! method and keep the closest hit.

use crate::ecs::components::{Collider, ColliderType};
use crate::ecs::{Component, EcsResult, EntityComponentStore, EntityId};
use crate::foundation::math::{Mat4, Point3, Vec3};

/// World-space axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBox {
    /// Centre of the box
    pub center: Vec3,
    /// Half extents along each axis
    pub half_width: Vec3,
}

impl WorldBox {
    /// Bounding box of a local box after an affine transform
    pub fn from_local(model: &Mat4, center: &Vec3, half_width: &Vec3) -> Self {
        let world_center = model.transform_point(&Point3::from(*center)).coords;
        let linear = model.fixed_view::<3, 3>(0, 0).abs();
        Self { center: world_center, half_width: linear * half_width }
    }

    /// Whether two boxes overlap or touch
    pub fn overlaps(&self, other: &Self) -> bool {
        let distance = (self.center - other.center).abs();
        let reach = self.half_width + other.half_width;
        distance.x <= reach.x && distance.y <= reach.y && distance.z <= reach.z
    }

    /// Distance along `direction` from `origin` to the box entry point
    pub fn intersect_ray(&self, origin: &Vec3, direction: &Vec3) -> Option<f32> {
        let min = self.center - self.half_width;
        let max = self.center + self.half_width;
        let mut t_near = 0.0_f32;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            if direction[axis].abs() < f32::EPSILON {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let (t0, t1) = {
                let a = (min[axis] - origin[axis]) * inv;
                let b = (max[axis] - origin[axis]) * inv;
                if a < b { (a, b) } else { (b, a) }
            };
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }
        Some(t_near)
    }
}

/// Writes collision results into every [`Collider`]
#[derive(Debug, Default)]
pub struct CollisionSystem;

impl CollisionSystem {
    /// Create the system
    pub const fn new() -> Self {
        Self
    }

    /// Recompute `colliding`, `other`, `collision_point` and `collision_distance`
    pub fn update(&mut self, store: &mut EntityComponentStore) -> EcsResult<()> {
        let mut boxes: Vec<(usize, EntityId, WorldBox)> = Vec::new();
        let mut rays: Vec<(usize, EntityId, Vec3, Vec3, f32)> = Vec::new();

        for (index, collider) in store.all::<Collider>().iter().enumerate() {
            let model = store.world_matrix(collider.owner())?;
            match collider.collider_type {
                ColliderType::Box => boxes.push((
                    index,
                    collider.owner(),
                    WorldBox::from_local(&model, &collider.local_center, &collider.local_halfwidth),
                )),
                ColliderType::Ray => {
                    let origin = model.transform_point(&Point3::from(collider.local_center)).coords;
                    let direction = collider.direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
                    rays.push((index, collider.owner(), origin, direction, collider.max_distance));
                }
            }
        }

        let colliders = store.all_mut::<Collider>();
        for collider in colliders.iter_mut() {
            collider.reset_collision();
        }

        for (i, (a_index, a_owner, a_box)) in boxes.iter().enumerate() {
            for (b_index, b_owner, b_box) in &boxes[i + 1..] {
                if a_owner != b_owner && a_box.overlaps(b_box) {
                    for (this, other) in [(*a_index, *b_index), (*b_index, *a_index)] {
                        let collider = &mut colliders[this];
                        if !collider.colliding {
                            collider.colliding = true;
                            collider.other = Some(other);
                        }
                    }
                }
            }
        }

        for (ray_index, ray_owner, origin, direction, max_distance) in rays {
            if direction == Vec3::zeros() {
                continue;
            }
            let closest = boxes
                .iter()
                .filter(|(_, owner, _)| *owner != ray_owner)
                .filter_map(|(index, _, world_box)| {
                    world_box.intersect_ray(&origin, &direction).map(|t| (*index, t))
                })
                .filter(|(_, t)| *t <= max_distance)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((other, distance)) = closest {
                let ray = &mut colliders[ray_index];
                ray.colliding = true;
                ray.other = Some(other);
                ray.collision_distance = distance;
                ray.collision_point = origin + direction * distance;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::Transform;
    use approx::assert_relative_eq;

    fn add_box(store: &mut EntityComponentStore, name: &str, position: Vec3) -> EntityId {
        let e = store.create_entity(name).unwrap();
        store.get_mut::<Transform>(e).unwrap().set_position(position);
        store.create_component::<Collider>(e).unwrap();
        e
    }

    #[test]
    fn test_overlapping_boxes_collide() {
        let mut store = EntityComponentStore::new();
        let a = add_box(&mut store, "a", Vec3::zeros());
        let b = add_box(&mut store, "b", Vec3::new(0.9, 0.0, 0.0));
        let c = add_box(&mut store, "c", Vec3::new(5.0, 0.0, 0.0));

        CollisionSystem::new().update(&mut store).unwrap();
        let b_index = store.component_index::<Collider>(b).unwrap();
        assert!(store.get::<Collider>(a).unwrap().colliding);
        assert_eq!(store.get::<Collider>(a).unwrap().other, Some(b_index));
        assert!(!store.get::<Collider>(c).unwrap().colliding);
    }

    #[test]
    fn test_ray_hits_closest_box() {
        let mut store = EntityComponentStore::new();
        add_box(&mut store, "far", Vec3::new(0.0, 0.0, -10.0));
        let near = add_box(&mut store, "near", Vec3::new(0.0, 0.0, -4.0));
        let ray = store.create_entity("ray").unwrap();
        let collider = store.create_component::<Collider>(ray).unwrap();
        collider.collider_type = ColliderType::Ray;
        collider.direction = Vec3::new(0.0, 0.0, -1.0);

        CollisionSystem::new().update(&mut store).unwrap();
        let hit = store.get::<Collider>(ray).unwrap();
        assert!(hit.colliding);
        assert_eq!(hit.other, Some(store.component_index::<Collider>(near).unwrap()));
        assert_relative_eq!(hit.collision_distance, 3.5);
        assert_relative_eq!(hit.collision_point, Vec3::new(0.0, 0.0, -3.5));
    }

    #[test]
    fn test_ray_respects_max_distance() {
        let mut store = EntityComponentStore::new();
        add_box(&mut store, "box", Vec3::new(0.0, 0.0, -10.0));
        let ray = store.create_entity("ray").unwrap();
        let collider = store.create_component::<Collider>(ray).unwrap();
        collider.collider_type = ColliderType::Ray;
        collider.max_distance = 5.0;

        CollisionSystem::new().update(&mut store).unwrap();
        assert!(!store.get::<Collider>(ray).unwrap().colliding);
    }

    #[test]
    fn test_scaled_box_extent() {
        let model = Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 1.0, 1.0));
        let b = WorldBox::from_local(&model, &Vec3::zeros(), &Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(b.half_width, Vec3::new(1.0, 0.5, 0.5));
    }
}
