//! Scene Description - serde model of a scene file
//!
//! Sections mirror the level files the engine has always read: named
//! geometries, shaders, cameras, textures, an optional environment,
//! materials, lights and entities, all resolved relative to `directory`.
//! Cross references between sections are by name.
//!
//! Mandatory sections are `Option`s so that a missing one can be reported
//! by name instead of as a generic parse error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{SceneError, SceneResult};
use crate::config::extension_of;
use crate::ecs::components::{ColliderType, LightType, RenderMode};

/// Root of a scene file
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Display name
    pub scene: String,

    /// Asset directory, relative to the scene file
    pub directory: Option<String>,

    /// Geometry definitions
    pub geometries: Vec<GeometryDef>,

    /// Shader program definitions
    pub shaders: Option<Vec<ShaderDef>>,

    /// Camera definitions
    pub cameras: Vec<CameraDef>,

    /// Texture definitions
    pub textures: Option<Vec<TextureDef>>,

    /// Skybox
    pub environment: Option<EnvironmentDef>,

    /// Material definitions
    pub materials: Option<Vec<MaterialDef>>,

    /// Light definitions
    pub lights: Option<Vec<LightDef>>,

    /// Entity definitions
    pub entities: Option<Vec<EntityDef>>,
}

/// Serialization format of a scene file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    /// Rusty Object Notation
    Ron,
    /// JSON level files
    Json,
}

impl SceneFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension_of(path).as_deref() {
            Some("ron") => Some(Self::Ron),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

impl SceneDescription {
    /// Parse scene text
    ///
    /// RON input accepts bare values for optional fields.
    pub fn parse(contents: &str, format: SceneFormat) -> SceneResult<Self> {
        match format {
            SceneFormat::Ron => ron::Options::default()
                .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
                .from_str(contents)
                .map_err(|e| SceneError::Parse(e.to_string())),
            SceneFormat::Json => serde_json::from_str(contents).map_err(|e| SceneError::Parse(e.to_string())),
        }
    }

    /// Fail with [`SceneError::MissingSection`] naming the first absent mandatory section
    pub fn check_sections(&self) -> SceneResult<()> {
        let sections = [
            ("directory", self.directory.is_some()),
            ("textures", self.textures.is_some()),
            ("materials", self.materials.is_some()),
            ("lights", self.lights.is_some()),
            ("entities", self.entities.is_some()),
            ("shaders", self.shaders.is_some()),
        ];
        match sections.iter().find(|(_, present)| !present) {
            Some((name, _)) => Err(SceneError::MissingSection(*name)),
            None => Ok(()),
        }
    }
}

/// Procedural geometry built without a file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeDef {
    /// Unit square facing +Z
    Plane,
    /// Unit UV sphere
    Sphere {
        /// Latitude bands
        rings: u32,
        /// Longitude bands
        segments: u32,
    },
    /// Heightmap terrain
    Terrain {
        /// Greyscale image, relative to the scene directory
        heightmap: String,
        /// Vertices per side
        resolution: u32,
        /// Distance between neighbouring vertices
        step: f32,
        /// Height of a white pixel
        max_height: f32,
    },
}

/// Named geometry, from an OBJ file or a procedural shape
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryDef {
    /// Name referenced by entities and the environment
    pub name: String,
    /// OBJ file relative to the scene directory
    pub file: Option<String>,
    /// Procedural shape, used when `file` is absent
    pub shape: Option<ShapeDef>,
}

/// Named shader program
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShaderDef {
    /// Name referenced by materials and the environment
    pub name: String,
    /// Vertex source file relative to the scene directory
    pub vertex: Option<String>,
    /// Fragment source file relative to the scene directory
    pub fragment: Option<String>,
    /// Embedded program name, used instead of files
    pub builtin: Option<String>,
}

/// Camera track
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackDef {
    /// Ratio advanced per second
    pub speed: f32,
    /// Control points, first and last are duplicated on load
    pub knots: Vec<[f32; 3]>,
}

/// Camera entity
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraDef {
    /// Entity name
    pub name: String,
    /// Eye position
    pub position: [f32; 3],
    /// View direction, ignored when `target` is set
    pub direction: [f32; 3],
    /// Point looked at
    pub target: Option<[f32; 3]>,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
    /// Optional spline the camera follows
    pub track: Option<TrackDef>,
}

impl Default for CameraDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: [0.0, 0.0, 1.0],
            direction: [0.0, 0.0, -1.0],
            target: None,
            fov: 60.0,
            near: 0.01,
            far: 100.0,
            track: None,
        }
    }
}

/// Named 2D texture or cubemap
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TextureDef {
    /// Name referenced by materials and the environment
    pub name: String,
    /// Image file of a 2D texture
    pub file: Option<String>,
    /// Six cubemap faces (+X, -X, +Y, -Y, +Z, -Z)
    pub files: Option<[String; 6]>,
}

/// Skybox references
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentDef {
    /// Cubemap texture name
    pub texture: String,
    /// Enclosing geometry name
    pub geometry: String,
    /// Program name
    pub shader: String,
}

/// Named material
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaterialDef {
    /// Name referenced by entities
    pub name: String,
    /// Program name, mandatory
    pub shader: String,
    /// Diffuse colour
    pub diffuse: [f32; 3],
    /// Specular colour
    pub specular: [f32; 3],
    /// Ambient colour
    pub ambient: [f32; 3],
    /// Specular exponent
    pub specular_gloss: f32,
    /// Texture coordinate scale
    pub uv_scale: [f32; 2],
    /// Diffuse texture name
    pub diffuse_map: Option<String>,
    /// Normal map texture name
    pub normal_map: Option<String>,
    /// Specular map texture name
    pub specular_map: Option<String>,
    /// Reflection cubemap texture name
    pub cube_map: Option<String>,
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            shader: String::new(),
            diffuse: [1.0; 3],
            specular: [0.0; 3],
            ambient: [0.1; 3],
            specular_gloss: 80.0,
            uv_scale: [1.0, 1.0],
            diffuse_map: None,
            normal_map: None,
            specular_map: None,
            cube_map: None,
        }
    }
}

/// Light entity; absent fields keep the light defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LightDef {
    /// Entity name
    pub name: String,
    /// Kind of light
    #[serde(rename = "type")]
    pub light_type: LightType,
    /// Linear colour
    pub color: Option<[f32; 3]>,
    /// World position
    pub position: Option<[f32; 3]>,
    /// Direction of the rays
    pub direction: Option<[f32; 3]>,
    /// Linear attenuation
    pub linear_att: Option<f32>,
    /// Quadratic attenuation
    pub quadratic_att: Option<f32>,
    /// Inner cone angle in degrees
    pub spot_inner: Option<f32>,
    /// Outer cone angle in degrees
    pub spot_outer: Option<f32>,
    /// Whether a shadow map is rendered
    pub cast_shadow: Option<bool>,
    /// Shadow map size
    pub resolution: Option<u32>,
}

/// Local transform of an entity
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformDef {
    /// Translation
    pub translate: [f32; 3],
    /// XYZ Euler angles in degrees
    pub rotate: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
    /// Name of the parent entity
    pub parent: Option<String>,
}

impl Default for TransformDef {
    fn default() -> Self {
        Self { translate: [0.0; 3], rotate: [0.0; 3], scale: [1.0; 3], parent: None }
    }
}

/// Collider attached to an entity
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColliderDef {
    /// Shape
    #[serde(rename = "type")]
    pub collider_type: ColliderType,
    /// Centre in local space
    pub center: [f32; 3],
    /// Half extents in local space
    pub halfwidth: [f32; 3],
}

impl Default for ColliderDef {
    fn default() -> Self {
        Self { collider_type: ColliderType::Box, center: [0.0; 3], halfwidth: [0.5; 3] }
    }
}

/// Drawable entity
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EntityDef {
    /// Entity name, may be empty
    pub name: String,
    /// Geometry name, mandatory
    pub geometry: String,
    /// Material name, mandatory
    pub material: String,
    /// Pass that draws the entity
    pub render_mode: RenderMode,
    /// Local transform
    pub transform: TransformDef,
    /// Optional collider
    pub collider: Option<ColliderDef>,
}
