//! Light component
//!
//! Pure data plus the attenuation math that sizes light volumes. A light
//! owns a [`CameraView`] for its shadow projection rather than inheriting
//! from [`Camera`](super::Camera).

use serde::{Deserialize, Serialize};

use super::camera::CameraView;
use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::math::Vec3;

/// Attenuated intensity below which a light is considered invisible
pub const VISIBILITY_THRESHOLD: f32 = 5.0 / 256.0;

/// Radius used when a light has no attenuation at all
pub const UNATTENUATED_RADIUS: f32 = 1000.0;

/// Types of lights supported by the pipeline
///
/// The discriminant is the value written into the light block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    /// Parallel rays, drawn as a full-screen quad
    #[default]
    Directional = 0,
    /// Omnidirectional, drawn as a sphere
    Point = 1,
    /// Cone of light, drawn as a cone
    Spot = 2,
}

impl LightType {
    /// Value stored in the light block
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Inverse of [`Self::as_i32`]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Directional),
            1 => Some(Self::Point),
            2 => Some(Self::Spot),
            _ => None,
        }
    }
}

/// Light source attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub(crate) base: ComponentBase,
    /// Shadow-projection state
    pub view: CameraView,
    /// Kind of light
    pub light_type: LightType,
    /// Direction for directional and spot lights
    pub direction: Vec3,
    /// Linear RGB colour
    pub color: Vec3,
    /// Linear attenuation factor
    pub linear_att: f32,
    /// Quadratic attenuation factor
    pub quadratic_att: f32,
    /// Inner spot cone angle in degrees
    pub spot_inner: f32,
    /// Outer spot cone angle in degrees
    pub spot_outer: f32,
    /// Shadow map size in texels
    pub resolution: u32,
    /// Whether the shadow pass renders this light
    pub cast_shadow: bool,
    /// Distance at which the light stops contributing
    pub radius: f32,
}

impl_component!(Light, Light, lights);

impl Default for Light {
    fn default() -> Self {
        let mut light = Self {
            base: ComponentBase::default(),
            view: CameraView::default(),
            light_type: LightType::Directional,
            direction: Vec3::new(1.0, 1.0, 1.0),
            color: Vec3::new(1.0, 1.0, 1.0),
            linear_att: 0.09,
            quadratic_att: 0.032,
            spot_inner: 20.0,
            spot_outer: 30.0,
            resolution: 1024,
            cast_shadow: false,
            radius: 0.0,
        };
        light.update_radius();
        light
    }
}

impl Light {
    /// Recompute [`Self::radius`] from colour and attenuation
    pub fn update_radius(&mut self) {
        self.radius = Self::compute_radius(&self.color, self.linear_att, self.quadratic_att);
    }

    /// Distance where `max(color) / (1 + l*d + q*d^2)` drops to the visibility threshold
    ///
    /// Solves the quadratic for `d`. Falls back to the linear solution when
    /// `quadratic` is zero and to [`UNATTENUATED_RADIUS`] when both are.
    pub fn compute_radius(color: &Vec3, linear: f32, quadratic: f32) -> f32 {
        let brightest = color.max();
        let c = 1.0 - brightest / VISIBILITY_THRESHOLD;

        let radius = if quadratic > f32::EPSILON {
            let discriminant = linear.mul_add(linear, -4.0 * quadratic * c);
            (-linear + discriminant.max(0.0).sqrt()) / (2.0 * quadratic)
        } else if linear > f32::EPSILON {
            -c / linear
        } else {
            UNATTENUATED_RADIUS
        };

        radius.max(0.0)
    }

    /// Cosine of half the inner cone angle, as the shaders compare it
    pub fn spot_inner_cos(&self) -> f32 {
        (self.spot_inner.to_radians() * 0.5).cos()
    }

    /// Cosine of half the outer cone angle
    pub fn spot_outer_cos(&self) -> f32 {
        (self.spot_outer.to_radians() * 0.5).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_radius_matches_closed_form() {
        let color = Vec3::new(1.0, 0.5, 0.2);
        let (l, q) = (0.09, 0.032);
        let expected = (-l + (l * l - 4.0 * q * (1.0 - (256.0 / 5.0) * 1.0_f32)).sqrt()) / (2.0 * q);
        assert_relative_eq!(Light::compute_radius(&color, l, q), expected, max_relative = 1e-5);
    }

    #[test]
    fn test_radius_decreases_with_quadratic_attenuation() {
        let color = Vec3::new(0.8, 0.8, 1.0);
        let mut previous = f32::INFINITY;
        for step in 1..=20 {
            let q = step as f32 * 0.01;
            let radius = Light::compute_radius(&color, 0.09, q);
            assert!(radius < previous, "radius {radius} did not drop below {previous} at q={q}");
            previous = radius;
        }
    }

    #[test]
    fn test_radius_degenerate_attenuation() {
        let white = Vec3::new(1.0, 1.0, 1.0);
        assert_relative_eq!(Light::compute_radius(&white, 0.0, 0.0), UNATTENUATED_RADIUS);
        assert_relative_eq!(Light::compute_radius(&white, 0.5, 0.0), (256.0 / 5.0 - 1.0) / 0.5, epsilon = 1e-3);
        assert_eq!(Light::compute_radius(&Vec3::zeros(), 0.09, 0.032), 0.0);
    }

    #[test]
    fn test_defaults_and_type_codes() {
        let light = Light::default();
        assert_eq!(light.light_type, LightType::Directional);
        assert!(!light.cast_shadow);
        assert!(light.radius > 0.0);
        assert_eq!(LightType::from_i32(LightType::Spot.as_i32()), Some(LightType::Spot));
        assert_eq!(LightType::from_i32(7), None);
        assert!(light.spot_inner_cos() > light.spot_outer_cos());
    }
}
