//! Configuration system

use std::path::Path;

pub use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        match extension_of(path).as_deref() {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension_of(path).as_deref() {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Lower-cased file extension
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Engine-wide settings read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Screen viewport width in pixels
    pub viewport_width: u32,
    /// Screen viewport height in pixels
    pub viewport_height: u32,
    /// Clear colour of the G-buffer and the screen
    pub background_color: Vec3,
    /// Shadow map size used when a light does not specify one
    pub shadow_map_resolution: u32,
    /// Half extent of the orthographic box used by directional light shadows
    pub directional_shadow_extent: f32,
    /// Near plane of light projections
    pub shadow_near: f32,
    /// Far plane of light projections
    pub shadow_far: f32,
    /// Uniform-buffer binding point of the light block
    pub lights_binding_point: u32,
    /// Upper bound on lights with shadow maps
    pub max_lights: usize,
    /// Root directory for scene assets
    pub asset_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            background_color: Vec3::new(0.0, 0.0, 0.0),
            shadow_map_resolution: 2048,
            directional_shadow_extent: 50.0,
            shadow_near: 0.1,
            shadow_far: 200.0,
            lights_binding_point: 1,
            max_lights: 8,
            asset_dir: "assets".to_string(),
        }
    }
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Width over height of the screen viewport
    pub fn aspect_ratio(&self) -> f32 {
        if self.viewport_height == 0 {
            1.0
        } else {
            self.viewport_width as f32 / self.viewport_height as f32
        }
    }
}
