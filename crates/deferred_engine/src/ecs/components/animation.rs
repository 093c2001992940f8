//! Keyframe animation component

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::math::Mat4;

/// Sequence of local matrices applied to a transform at a fixed rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    pub(crate) base: ComponentBase,
    /// Clip name
    pub name: String,
    /// Index of the animated transform
    pub target_transform: usize,
    /// Frame applied on the next step
    pub curr_frame: usize,
    /// Milliseconds per frame
    pub ms_frame: f32,
    /// Milliseconds accumulated since the last step
    pub ms_counter: f32,
    /// One local matrix per frame
    pub keyframes: Vec<Mat4>,
}

impl_component!(Animation, Animation, animations);

impl Animation {
    /// Number of frames in the clip
    pub fn num_frames(&self) -> usize {
        self.keyframes.len()
    }
}
