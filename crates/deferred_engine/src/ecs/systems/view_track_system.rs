//! Moves cameras along their view tracks

use crate::ecs::components::{Camera, Transform, ViewTrack};
use crate::ecs::{Component, EcsResult, EntityComponentStore, EntityId};
use crate::foundation::math::Vec3;

/// Advances every active [`ViewTrack`] and drags its owner's camera along
#[derive(Debug, Default)]
pub struct ViewTrackSystem;

impl ViewTrackSystem {
    /// Create the system
    pub const fn new() -> Self {
        Self
    }

    /// Step each active track by `dt * speed` and place its camera
    ///
    /// The camera keeps looking at its target. A track that reaches the end
    /// restarts from the beginning on the same step.
    pub fn update(&mut self, store: &mut EntityComponentStore, dt: f32) -> EcsResult<()> {
        let moves: Vec<(EntityId, Vec3)> = store
            .all_mut::<ViewTrack>()
            .iter_mut()
            .filter(|track| track.active)
            .map(|track| {
                track.ratio += dt * track.speed;
                let position = track.curve.evaluate_catmull(track.ratio);
                if track.ratio >= 1.0 {
                    track.ratio = 0.0;
                }
                (track.owner(), position)
            })
            .collect();

        for (owner, position) in moves {
            store.get_mut::<Transform>(owner)?.set_position(position);
            let view = &mut store.get_mut::<Camera>(owner)?.view;
            let target = view.target;
            view.look_at(position, target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::curve::Curve;
    use approx::assert_relative_eq;

    #[test]
    fn test_track_moves_camera_and_wraps() {
        let mut store = EntityComponentStore::new();
        let e = store.create_entity("flyover").unwrap();
        store.create_component::<Camera>(e).unwrap().view.target = Vec3::new(0.0, -10.0, 0.0);
        let track = store.create_component::<ViewTrack>(e).unwrap();
        track.speed = 0.25;
        track.curve = Curve::from_knots(vec![
            Vec3::zeros(),
            Vec3::zeros(),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(8.0, 0.0, 0.0),
            Vec3::new(8.0, 0.0, 0.0),
        ]);

        let mut system = ViewTrackSystem::new();
        system.update(&mut store, 2.0).unwrap();
        assert_relative_eq!(store.get::<Transform>(e).unwrap().position(), Vec3::new(4.0, 0.0, 0.0), epsilon = 1e-4);
        let cam = store.get::<Camera>(e).unwrap();
        assert_relative_eq!(cam.view.position.x, 4.0, epsilon = 1e-4);
        assert!(cam.view.forward.y < 0.0);

        system.update(&mut store, 2.0).unwrap();
        assert_eq!(store.get::<ViewTrack>(e).unwrap().ratio, 0.0);
    }

    #[test]
    fn test_inactive_track_is_ignored() {
        let mut store = EntityComponentStore::new();
        let e = store.create_entity("cam").unwrap();
        store.create_component::<Camera>(e).unwrap();
        let track = store.create_component::<ViewTrack>(e).unwrap();
        track.active = false;
        track.speed = 1.0;

        ViewTrackSystem::new().update(&mut store, 0.5).unwrap();
        assert_eq!(store.get::<ViewTrack>(e).unwrap().ratio, 0.0);
    }
}
