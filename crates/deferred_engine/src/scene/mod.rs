//! # Scenes
//!
//! Declarative scene files (RON or JSON) turned into entities, components
//! and registry resources.
//!
//! - [`description`]: the serde model of a file
//! - [`loader`]: instantiation into the store and registry

pub mod description;
pub mod loader;

pub use description::SceneDescription;
pub use loader::{load_scene, LoadedScene, SceneLoader};

use thiserror::Error;

use crate::ecs::EcsError;
use crate::render::RenderError;

/// Scene loading error types
#[derive(Error, Debug)]
pub enum SceneError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a valid scene document
    #[error("Parse error: {0}")]
    Parse(String),

    /// A mandatory section is absent
    #[error("Scene is missing section '{0}'")]
    MissingSection(&'static str),

    /// A name does not refer to anything defined in the scene
    #[error("Scene references unknown {kind} '{name}'")]
    MissingReference {
        /// Section the name was looked up in
        kind: &'static str,
        /// The unknown name
        name: String,
    },

    /// Resource creation failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Store operation failed
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for scene loading
pub type SceneResult<T> = Result<T, SceneError>;
