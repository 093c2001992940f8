//! Camera view track component

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::curve::Curve;

/// Moves the owner's camera along a Catmull-Rom spline
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTrack {
    pub(crate) base: ComponentBase,
    /// Position along the curve in `[0, 1)`
    pub ratio: f32,
    /// Whether the track is advancing
    pub active: bool,
    /// Ratio advanced per second
    pub speed: f32,
    /// Path followed by the camera
    pub curve: Curve,
}

impl_component!(ViewTrack, ViewTrack, view_tracks);

impl Default for ViewTrack {
    fn default() -> Self {
        Self {
            base: ComponentBase::default(),
            ratio: 0.0,
            active: true,
            speed: 0.0,
            curve: Curve::new(),
        }
    }
}
