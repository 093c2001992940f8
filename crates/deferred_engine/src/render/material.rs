//! Material parameter sets
//!
//! A material names the program it is drawn with plus the surface
//! constants and texture maps that program reads. Texture references are
//! registry ids.

use super::device::{GraphicsDevice, ProgramId, UniformValue};
use super::shader::{Shader, UniformId};
use super::texture::Texture;
use crate::foundation::math::{Vec2, Vec3};

/// Texture unit assignments shared by every material program
pub mod units {
    /// First diffuse layer
    pub const DIFFUSE: u32 = 8;
    /// Second diffuse layer
    pub const DIFFUSE_2: u32 = 9;
    /// Third diffuse layer
    pub const DIFFUSE_3: u32 = 10;
    /// Tangent-space normal map
    pub const NORMAL: u32 = 11;
    /// Specular intensity map
    pub const SPECULAR: u32 = 12;
    /// Reflection cubemap
    pub const CUBE: u32 = 13;
    /// Displacement noise
    pub const NOISE: u32 = 14;
}

/// Surface description referenced by meshes
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Program used to draw this material
    pub shader: ProgramId,
    /// Ambient colour
    pub ambient: Vec3,
    /// Diffuse colour
    pub diffuse: Vec3,
    /// Specular colour
    pub specular: Vec3,
    /// Specular exponent
    pub specular_gloss: f32,
    /// Up to three diffuse layers
    pub diffuse_maps: [Option<usize>; 3],
    /// Normal map
    pub normal_map: Option<usize>,
    /// Specular map
    pub specular_map: Option<usize>,
    /// Noise map for displacement
    pub noise_map: Option<usize>,
    /// Reflection cubemap
    pub cube_map: Option<usize>,
    /// Texture coordinate scale
    pub uv_scale: Vec2,
    /// Strength of the normal map
    pub normal_factor: f32,
    /// Terrain displacement height
    pub max_height: f32,
}

impl Material {
    /// Material with default constants drawn by `shader`
    pub fn new(shader: ProgramId) -> Self {
        Self {
            shader,
            ambient: Vec3::repeat(0.1),
            diffuse: Vec3::repeat(1.0),
            specular: Vec3::repeat(1.0),
            specular_gloss: 80.0,
            diffuse_maps: [None; 3],
            normal_map: None,
            specular_map: None,
            noise_map: None,
            cube_map: None,
            uv_scale: Vec2::new(1.0, 1.0),
            normal_factor: 1.0,
            max_height: 0.0,
        }
    }

    /// Every texture id the material references
    pub fn texture_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.diffuse_maps
            .iter()
            .chain([&self.normal_map, &self.specular_map, &self.noise_map, &self.cube_map])
            .filter_map(|id| *id)
    }

    /// Number of leading diffuse layers present
    pub fn diffuse_layer_count(&self) -> usize {
        self.diffuse_maps.iter().take_while(|m| m.is_some()).count()
    }

    /// Write constants and bind maps for the bound `shader`
    pub fn apply(&self, device: &mut dyn GraphicsDevice, shader: &Shader, textures: &[Texture]) {
        shader.set(device, UniformId::Ambient, UniformValue::Vec3(self.ambient));
        shader.set(device, UniformId::Diffuse, UniformValue::Vec3(self.diffuse));
        shader.set(device, UniformId::Specular, UniformValue::Vec3(self.specular));
        shader.set(device, UniformId::SpecularGloss, UniformValue::Float(self.specular_gloss));
        shader.set(device, UniformId::UvScale, UniformValue::Vec2(self.uv_scale));
        shader.set(device, UniformId::NormalFactor, UniformValue::Float(self.normal_factor));
        shader.set(device, UniformId::MaxHeight, UniformValue::Float(self.max_height));

        let layers = self.diffuse_layer_count();
        shader.set(device, UniformId::UseDiffuseMap, UniformValue::Int(layers as i32));
        let diffuse_slots = [
            (UniformId::DiffuseMap, units::DIFFUSE),
            (UniformId::DiffuseMap2, units::DIFFUSE_2),
            (UniformId::DiffuseMap3, units::DIFFUSE_3),
        ];
        for (map, (uniform, unit)) in self.diffuse_maps.iter().zip(diffuse_slots) {
            bind_map(device, shader, textures, *map, uniform, unit);
        }

        shader.set(device, UniformId::UseNormalMap, flag(self.normal_map));
        bind_map(device, shader, textures, self.normal_map, UniformId::NormalMap, units::NORMAL);

        shader.set(device, UniformId::UseSpecularMap, flag(self.specular_map));
        bind_map(device, shader, textures, self.specular_map, UniformId::SpecularMap, units::SPECULAR);

        shader.set(device, UniformId::UseReflectionMap, flag(self.cube_map));
        bind_map(device, shader, textures, self.cube_map, UniformId::Skybox, units::CUBE);

        bind_map(device, shader, textures, self.noise_map, UniformId::NoiseMap, units::NOISE);
    }
}

fn flag(map: Option<usize>) -> UniformValue {
    UniformValue::Int(i32::from(map.is_some()))
}

fn bind_map(
    device: &mut dyn GraphicsDevice,
    shader: &Shader,
    textures: &[Texture],
    map: Option<usize>,
    uniform: UniformId,
    unit: u32,
) {
    let Some(texture) = map.and_then(|id| textures.get(id)) else {
        return;
    };
    if shader.set(device, uniform, UniformValue::Int(unit as i32)) {
        texture.bind(device, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::TextureTarget;
    use crate::render::headless::{DeviceCommand, HeadlessDevice};
    use crate::render::shader::BuiltinShader;
    use crate::render::texture::ImageData;

    #[test]
    fn test_defaults() {
        let material = Material::new(ProgramId(3));
        assert_eq!(material.ambient, Vec3::repeat(0.1));
        assert_eq!(material.specular_gloss, 80.0);
        assert_eq!(material.uv_scale, Vec2::new(1.0, 1.0));
        assert_eq!(material.texture_ids().count(), 0);
    }

    #[test]
    fn test_apply_binds_maps_to_fixed_units() {
        let mut device = HeadlessDevice::new();
        let shader = Shader::builtin(&mut device, BuiltinShader::ForwardPhong).unwrap();
        let image = ImageData::solid_color(1, 1, [255; 4]);
        let textures = vec![
            Texture::from_image(&mut device, &image).unwrap(),
            Texture::from_image(&mut device, &image).unwrap(),
        ];

        let mut material = Material::new(shader.program());
        material.diffuse_maps[0] = Some(0);
        material.normal_map = Some(1);
        shader.bind(&mut device);
        device.take_commands();
        material.apply(&mut device, &shader, &textures);

        let bound: Vec<(u32, TextureTarget)> = device
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::BindTexture { unit, target, .. } => Some((*unit, *target)),
                _ => None,
            })
            .collect();
        assert_eq!(bound, vec![(units::DIFFUSE, TextureTarget::Texture2D), (units::NORMAL, TextureTarget::Texture2D)]);

        let program = shader.program();
        assert_eq!(device.uniform_value(program, "u_use_diffuse_map"), Some(UniformValue::Int(1)));
        assert_eq!(device.uniform_value(program, "u_use_normal_map"), Some(UniformValue::Int(1)));
        assert_eq!(device.uniform_value(program, "u_use_specular_map"), Some(UniformValue::Int(0)));
        assert_eq!(device.uniform_value(program, "u_specular_gloss"), Some(UniformValue::Float(80.0)));
    }
}
