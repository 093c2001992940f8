//! Binary layout of the shared light block
//!
//! Each light occupies [`LIGHT_STRIDE`] bytes, laid out for std140:
//!
//! | offset | contents                                          |
//! |--------|---------------------------------------------------|
//! | 0      | position.xyz, 0                                   |
//! | 16     | direction.xyz, 0                                  |
//! | 32     | color.xyz, 0                                      |
//! | 48     | linear, quadratic, cos(inner/2), cos(outer/2)     |
//! | 64     | light view-projection, column-major               |
//! | 128    | type (i32), cast_shadow (i32)                     |
//! | 136    | zero padding up to 208                            |

use crate::ecs::components::{Light, LightType};
use crate::foundation::math::{Mat4, Vec3};

/// Bytes per light in the block
pub const LIGHT_STRIDE: usize = 208;

const FLOAT_BYTES: usize = 128;

/// One light as the shaders see it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBlock {
    /// World position
    pub position: Vec3,
    /// Direction as set on the light; shaders normalise it
    pub direction: Vec3,
    /// Linear colour
    pub color: Vec3,
    /// Linear attenuation
    pub linear: f32,
    /// Quadratic attenuation
    pub quadratic: f32,
    /// Cosine of half the inner cone
    pub spot_inner_cos: f32,
    /// Cosine of half the outer cone
    pub spot_outer_cos: f32,
    /// Light-space view-projection
    pub view_projection: Mat4,
    /// Kind of light
    pub light_type: LightType,
    /// Whether a shadow map exists for this light
    pub cast_shadow: bool,
}

impl LightBlock {
    /// Snapshot `light` at world position `position`
    pub fn from_light(light: &Light, position: Vec3) -> Self {
        Self {
            position,
            direction: light.direction,
            color: light.color,
            linear: light.linear_att,
            quadratic: light.quadratic_att,
            spot_inner_cos: light.spot_inner_cos(),
            spot_outer_cos: light.spot_outer_cos(),
            view_projection: light.view.view_projection,
            light_type: light.light_type,
            cast_shadow: light.cast_shadow,
        }
    }

    /// Append this light's [`LIGHT_STRIDE`] bytes to `out`
    pub fn pack_into(&self, out: &mut Vec<u8>) {
        let mut floats = [0.0f32; FLOAT_BYTES / 4];
        floats[0..3].copy_from_slice(self.position.as_slice());
        floats[4..7].copy_from_slice(self.direction.as_slice());
        floats[8..11].copy_from_slice(self.color.as_slice());
        floats[12..16].copy_from_slice(&[self.linear, self.quadratic, self.spot_inner_cos, self.spot_outer_cos]);
        floats[16..32].copy_from_slice(self.view_projection.as_slice());

        let start = out.len();
        out.extend_from_slice(bytemuck::cast_slice(&floats));
        out.extend_from_slice(&self.light_type.as_i32().to_ne_bytes());
        out.extend_from_slice(&i32::from(self.cast_shadow).to_ne_bytes());
        out.resize(start + LIGHT_STRIDE, 0);
    }

    /// Read one light from the start of `bytes`
    ///
    /// Returns `None` when fewer than [`LIGHT_STRIDE`] bytes remain or the
    /// type code is unknown.
    pub fn unpack(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..LIGHT_STRIDE)?;
        let floats: [f32; FLOAT_BYTES / 4] = bytemuck::try_pod_read_unaligned(&bytes[..FLOAT_BYTES]).ok()?;
        let light_type: i32 = bytemuck::try_pod_read_unaligned(&bytes[128..132]).ok()?;
        let cast_shadow: i32 = bytemuck::try_pod_read_unaligned(&bytes[132..136]).ok()?;

        Some(Self {
            position: Vec3::from_column_slice(&floats[0..3]),
            direction: Vec3::from_column_slice(&floats[4..7]),
            color: Vec3::from_column_slice(&floats[8..11]),
            linear: floats[12],
            quadratic: floats[13],
            spot_inner_cos: floats[14],
            spot_outer_cos: floats[15],
            view_projection: Mat4::from_column_slice(&floats[16..32]),
            light_type: LightType::from_i32(light_type)?,
            cast_shadow: cast_shadow != 0,
        })
    }
}

/// Pack lights back to back
pub fn pack_lights(lights: &[LightBlock]) -> Vec<u8> {
    let mut out = Vec::with_capacity(lights.len() * LIGHT_STRIDE);
    for light in lights {
        light.pack_into(&mut out);
    }
    out
}

/// Inverse of [`pack_lights`]
pub fn unpack_lights(bytes: &[u8]) -> Option<Vec<LightBlock>> {
    bytes.chunks(LIGHT_STRIDE).map(LightBlock::unpack).collect()
}
