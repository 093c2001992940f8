//! Keyframe animation playback

use crate::ecs::components::{Animation, Transform};
use crate::ecs::{EcsResult, EntityComponentStore};
use crate::foundation::math::Mat4;

/// Steps every [`Animation`] at its own frame rate
#[derive(Debug, Default)]
pub struct AnimationSystem;

impl AnimationSystem {
    /// Create the system
    pub const fn new() -> Self {
        Self
    }

    /// Accumulate `dt` and apply the next keyframe when a frame has elapsed
    pub fn update(&mut self, store: &mut EntityComponentStore, dt: f32) -> EcsResult<()> {
        let mut frames: Vec<(usize, Mat4)> = Vec::new();

        for anim in store.all_mut::<Animation>() {
            if anim.keyframes.is_empty() {
                continue;
            }
            anim.ms_counter += dt * 1000.0;
            if anim.ms_counter >= anim.ms_frame {
                anim.ms_counter -= anim.ms_frame;
                let frame = anim.curr_frame.min(anim.keyframes.len() - 1);
                frames.push((anim.target_transform, anim.keyframes[frame]));
                anim.curr_frame = (frame + 1) % anim.keyframes.len();
            }
        }

        for (target, matrix) in frames {
            match store.component_mut::<Transform>(target) {
                Some(transform) => transform.local = matrix,
                None => log::warn!("Animation targets missing transform {}", target),
            }
        }
        Ok(())
    }
}
