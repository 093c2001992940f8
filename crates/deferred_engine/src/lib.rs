//! # Deferred Engine
//!
//! Entity-component store and deferred-plus-forward rendering pipeline for a
//! small real-time 3D engine.
//!
//! ## Features
//!
//! - **Entity-Component Store**: dense per-type component arrays with
//!   bidirectional entity indices and a transform hierarchy
//! - **Render Pipeline**: shadow maps, G-buffer, additive light volumes,
//!   forward pass with frustum culling, skybox
//! - **Camera Blending**: prioritised transitional cameras mixed into one output
//! - **Scenes**: RON or JSON scene files loaded into the store and registry
//! - **Headless Device**: the whole frame runs and is recorded without a GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deferred_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new(EngineConfig::default(), HeadlessDevice::new());
//!     engine.init()?;
//!     engine.load_scene("assets/scenes/demo.ron")?;
//!     engine.late_init()?;
//!     let stats = engine.update(1.0 / 60.0)?;
//!     println!("{} meshes drawn", stats.meshes_drawn);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod ecs;
pub mod foundation;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{Engine, EngineError, EngineResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig},
        ecs::{
            components::{Camera, Collider, ColliderType, Light, LightType, Mesh, RenderMode, Transform},
            systems::CameraPriority,
            EntityComponentStore, EntityId,
        },
        foundation::math::{Mat4, Vec2, Vec3},
        render::{FrameStats, GraphicsDevice, GraphicsSystem, HeadlessDevice, ResourceRegistry},
        scene::{load_scene, LoadedScene},
        Engine, EngineError,
    };
}
