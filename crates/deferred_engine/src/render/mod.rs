//! # Rendering
//!
//! Deferred-plus-forward pipeline over an OpenGL-style device.
//!
//! ## Architecture
//!
//! - [`device`]: the [`GraphicsDevice`] command interface every pass is written against
//! - [`headless`]: a recording device for tests and offline runs
//! - [`registry`]: owns geometries, materials, shaders and textures by integer id
//! - [`graphics_system`]: the per-frame pass sequence (shadow, G-buffer,
//!   light volumes, forward, environment)
//! - [`culling`]: clip-space AABB rejection
//! - [`light_ubo`]: binary layout of the shared light block

pub mod culling;
pub mod device;
pub mod framebuffer;
pub mod geometry;
pub mod graphics_system;
pub mod headless;
pub mod light_ubo;
pub mod material;
pub mod registry;
pub mod shader;
pub mod texture;

#[cfg(test)]
mod graphics_system_tests;

pub use culling::aabb_in_frustum;
pub use device::{
    Attachment, BlendFactor, ClearFlags, DepthFunc, Face, FramebufferStatus, GpuResource, GraphicsDevice,
    TextureDesc, TextureFilter, TextureFormat, TextureTarget, TextureWrap, UniformLocation, UniformValue,
};
pub use framebuffer::Framebuffer;
pub use geometry::{Aabb, DrawRange, Geometry, MaterialSet, MeshData};
pub use graphics_system::{DebugView, Environment, FrameStats, GraphicsSystem};
pub use headless::{DeviceCommand, HeadlessDevice};
pub use light_ubo::{pack_lights, LightBlock, LIGHT_STRIDE};
pub use material::Material;
pub use registry::ResourceRegistry;
pub use shader::{BuiltinShader, Shader, UniformId};
pub use texture::{Heightmap, ImageData, Texture};

use thiserror::Error;

use crate::ecs::EcsError;

/// Upper bound on shadow maps and lights sampled per pixel
pub const MAX_LIGHTS: usize = 8;

/// Rendering error types
#[derive(Error, Debug)]
pub enum RenderError {
    /// Pipeline setup failed
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A pass could not run
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// The device refused to create a resource
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// File extension or pixel layout the loaders do not handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An asset file could not be read or decoded
    #[error("Failed to load '{path}': {reason}")]
    LoadFailed {
        /// File that failed
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// A framebuffer failed its completeness check
    #[error("Framebuffer '{name}' is incomplete: {status:?}")]
    IncompleteFramebuffer {
        /// Which target
        name: String,
        /// Reported status
        status: FramebufferStatus,
    },

    /// An id does not name a registered resource
    #[error("No {kind} with id {id}")]
    InvalidResource {
        /// Resource kind
        kind: &'static str,
        /// Offending id
        id: usize,
    },

    /// Compile or link failure
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Store lookup failed while rendering
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
