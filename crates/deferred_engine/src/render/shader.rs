//! Shader programs and their uniform vocabulary
//!
//! Every program the pipeline drives speaks the same fixed set of uniform
//! names. Locations are resolved once at creation and cached; writing a
//! uniform the program does not declare is a silent no-op that reports
//! `false`, so one material path can feed programs of different richness.

use std::fmt;

use super::device::{GraphicsDevice, GpuResource, ProgramId, UniformLocation, UniformValue};
use super::{RenderResult, MAX_LIGHTS};

/// Name of the shared light uniform block
pub const LIGHTS_BLOCK: &str = "u_lights_ubo";

macro_rules! uniform_ids {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Uniform names understood by the pipeline
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum UniformId {
            $($variant),*
        }

        impl UniformId {
            /// Every uniform, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// GLSL name
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }
        }
    };
}

uniform_ids! {
    Vp => "u_vp",
    Mvp => "u_mvp",
    Model => "u_model",
    NormalMatrix => "u_normal_matrix",
    CamPos => "u_cam_pos",
    Color => "u_color",
    Ambient => "u_ambient",
    Diffuse => "u_diffuse",
    Specular => "u_specular",
    SpecularGloss => "u_specular_gloss",
    UseDiffuseMap => "u_use_diffuse_map",
    DiffuseMap => "u_diffuse_map",
    DiffuseMap2 => "u_diffuse_map_2",
    DiffuseMap3 => "u_diffuse_map_3",
    UseNormalMap => "u_use_normal_map",
    NormalMap => "u_normal_map",
    NormalFactor => "u_normal_factor",
    UseSpecularMap => "u_use_specular_map",
    SpecularMap => "u_specular_map",
    NoiseMap => "u_noise_map",
    Skybox => "u_skybox",
    UseReflectionMap => "u_use_reflection_map",
    NumLights => "u_num_lights",
    ScreenTexture => "u_screen_texture",
    TexPosition => "u_tex_position",
    TexNormal => "u_tex_normal",
    TexAlbedo => "u_tex_albedo",
    LightId => "u_light_id",
    UvScale => "u_uv_scale",
    MaxHeight => "u_max_height",
}

impl fmt::Display for UniformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Programs compiled into the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    /// Depth-only, used by the shadow pass
    Depth,
    /// Writes position, normal and albedo into the G-buffer
    Gbuffer,
    /// Shades one light volume from the G-buffer
    DeferredVolume,
    /// Copies a texture onto a full-screen quad
    Screen,
    /// Lit forward shading with shadows
    ForwardPhong,
    /// Cubemap skybox
    Environment,
}

impl BuiltinShader {
    /// Look a program up by its scene-file name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "depth" => Some(Self::Depth),
            "gbuffer" => Some(Self::Gbuffer),
            "deferred_volume" => Some(Self::DeferredVolume),
            "screen" => Some(Self::Screen),
            "forward_phong" => Some(Self::ForwardPhong),
            "environment" => Some(Self::Environment),
            _ => None,
        }
    }

    /// Vertex and fragment GLSL
    pub const fn sources(self) -> (&'static str, &'static str) {
        match self {
            Self::Depth => (include_str!("../../shaders/depth.vert"), include_str!("../../shaders/depth.frag")),
            Self::Gbuffer => (include_str!("../../shaders/gbuffer.vert"), include_str!("../../shaders/gbuffer.frag")),
            Self::DeferredVolume => (
                include_str!("../../shaders/deferred_volume.vert"),
                include_str!("../../shaders/deferred_volume.frag"),
            ),
            Self::Screen => (include_str!("../../shaders/screen.vert"), include_str!("../../shaders/screen.frag")),
            Self::ForwardPhong => (
                include_str!("../../shaders/forward_phong.vert"),
                include_str!("../../shaders/forward_phong.frag"),
            ),
            Self::Environment => (
                include_str!("../../shaders/environment.vert"),
                include_str!("../../shaders/environment.frag"),
            ),
        }
    }
}

/// Linked program with cached uniform locations
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    program: ProgramId,
    locations: Vec<Option<UniformLocation>>,
    shadow_maps: [Option<UniformLocation>; MAX_LIGHTS],
    lights_binding: Option<u32>,
}

impl Shader {
    /// Compile, link and introspect a program
    pub fn new(device: &mut dyn GraphicsDevice, vertex_source: &str, fragment_source: &str) -> RenderResult<Self> {
        let program = device.create_program(vertex_source, fragment_source)?;
        Ok(Self::from_program(device, program))
    }

    /// Build one of the embedded programs
    pub fn builtin(device: &mut dyn GraphicsDevice, which: BuiltinShader) -> RenderResult<Self> {
        let (vertex, fragment) = which.sources();
        let shader = Self::new(device, vertex, fragment)?;
        log::debug!("Compiled built-in shader {:?} as {:?}", which, shader.program);
        Ok(shader)
    }

    /// Wrap an already linked program
    pub fn from_program(device: &dyn GraphicsDevice, program: ProgramId) -> Self {
        let locations = UniformId::ALL
            .iter()
            .map(|id| device.uniform_location(program, id.name()))
            .collect();

        let mut shadow_maps = [None; MAX_LIGHTS];
        for (i, slot) in shadow_maps.iter_mut().enumerate() {
            *slot = device.uniform_location(program, &format!("u_shadow_map[{i}]"));
        }

        Self { program, locations, shadow_maps, lights_binding: None }
    }

    /// Underlying program id
    pub const fn program(&self) -> ProgramId {
        self.program
    }

    /// Cached location, `None` when the program does not declare it
    pub fn location(&self, id: UniformId) -> Option<UniformLocation> {
        self.locations.get(id as usize).copied().flatten()
    }

    /// Whether the program declares `id`
    pub fn has(&self, id: UniformId) -> bool {
        self.location(id).is_some()
    }

    /// Make the program current
    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        device.use_program(Some(self.program));
    }

    /// Write a uniform of the bound program
    pub fn set(&self, device: &mut dyn GraphicsDevice, id: UniformId, value: UniformValue) -> bool {
        match self.location(id) {
            Some(location) => {
                device.set_uniform(location, value);
                true
            }
            None => false,
        }
    }

    /// Point `u_shadow_map[light]` at texture unit `unit`
    pub fn set_shadow_map(&self, device: &mut dyn GraphicsDevice, light: usize, unit: u32) -> bool {
        match self.shadow_maps.get(light).copied().flatten() {
            Some(location) => {
                device.set_uniform(location, UniformValue::Int(unit as i32));
                true
            }
            None => false,
        }
    }

    /// Attach the light block to `binding`, once
    pub fn bind_lights_block(&mut self, device: &mut dyn GraphicsDevice, binding: u32) -> bool {
        if self.lights_binding == Some(binding) {
            return true;
        }
        if device.bind_uniform_block(self.program, LIGHTS_BLOCK, binding) {
            self.lights_binding = Some(binding);
            true
        } else {
            false
        }
    }

    /// Delete the program
    pub fn release(&self, device: &mut dyn GraphicsDevice) {
        device.release(GpuResource::Program(self.program));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessDevice;

    #[test]
    fn test_builtins_compile_and_expose_expected_uniforms() {
        let mut device = HeadlessDevice::new();

        let depth = Shader::builtin(&mut device, BuiltinShader::Depth).unwrap();
        assert!(depth.has(UniformId::Mvp));
        assert!(!depth.has(UniformId::Diffuse));

        let mut volume = Shader::builtin(&mut device, BuiltinShader::DeferredVolume).unwrap();
        for id in [UniformId::Mvp, UniformId::CamPos, UniformId::LightId, UniformId::TexPosition] {
            assert!(volume.has(id), "deferred_volume lacks {id}");
        }
        assert!(volume.bind_lights_block(&mut device, 1));

        let gbuffer = Shader::builtin(&mut device, BuiltinShader::Gbuffer).unwrap();
        assert!(gbuffer.has(UniformId::NormalMatrix));

        let phong = Shader::builtin(&mut device, BuiltinShader::ForwardPhong).unwrap();
        assert!(phong.has(UniformId::NumLights));
        assert!(phong.set_shadow_map(&mut device, MAX_LIGHTS - 1, 7));

        let environment = Shader::builtin(&mut device, BuiltinShader::Environment).unwrap();
        assert!(environment.has(UniformId::Skybox));
    }

    #[test]
    fn test_absent_uniform_is_noop() {
        let mut device = HeadlessDevice::new();
        let depth = Shader::builtin(&mut device, BuiltinShader::Depth).unwrap();
        depth.bind(&mut device);
        let before = device.commands().len();
        assert!(!depth.set(&mut device, UniformId::SpecularGloss, UniformValue::Float(1.0)));
        assert!(!depth.set_shadow_map(&mut device, 0, 0));
        assert_eq!(device.commands().len(), before);
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(BuiltinShader::from_name("forward_phong"), Some(BuiltinShader::ForwardPhong));
        assert_eq!(BuiltinShader::from_name("toon"), None);
        assert_eq!(UniformId::NormalMatrix.to_string(), "u_normal_matrix");
    }
}
