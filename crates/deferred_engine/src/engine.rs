//! Engine facade
//!
//! Owns the store, the resource registry and every system, and runs them in
//! frame order: camera blend, animation, collision, then the render passes.

use std::path::Path;

use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::ecs::components::Camera;
use crate::ecs::systems::{set_picking_ray, AnimationSystem, CameraSystem, CollisionSystem};
use crate::ecs::{EcsError, EntityComponentStore, EntityId};
use crate::foundation::math::{Mat4, Vec2};
use crate::render::{FrameStats, GraphicsDevice, GraphicsSystem, RenderError, ResourceRegistry};
use crate::scene::{self, LoadedScene, SceneError};

/// Engine-level error types
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene could not be loaded
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Pipeline failure
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Store failure
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// Settings could not be read
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Main engine struct
///
/// Generic over the device so the same frame loop drives a real context or
/// the recording [`crate::render::HeadlessDevice`].
pub struct Engine<D: GraphicsDevice> {
    device: D,
    store: EntityComponentStore,
    registry: ResourceRegistry,
    graphics: GraphicsSystem,
    cameras: CameraSystem,
    animations: AnimationSystem,
    collisions: CollisionSystem,
    config: EngineConfig,
    output_camera: Option<EntityId>,
}

impl<D: GraphicsDevice> Engine<D> {
    /// Create an engine; call [`Self::init`] before loading a scene
    pub fn new(config: EngineConfig, device: D) -> Self {
        log::info!("Creating engine ({}x{})", config.viewport_width, config.viewport_height);
        Self {
            device,
            store: EntityComponentStore::new(),
            registry: ResourceRegistry::new(),
            graphics: GraphicsSystem::new(config.clone()),
            cameras: CameraSystem::new(config.aspect_ratio()),
            animations: AnimationSystem::new(),
            collisions: CollisionSystem::new(),
            config,
            output_camera: None,
        }
    }

    /// Create the pipeline's GPU objects
    pub fn init(&mut self) -> EngineResult<()> {
        self.graphics.init(&mut self.device)?;
        Ok(())
    }

    /// Load a scene file and route its first camera through the blend layer
    ///
    /// The blended result is written into an unnamed output camera, which is
    /// the one the pipeline renders from. Call [`Self::late_init`] afterwards.
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> EngineResult<LoadedScene> {
        let loaded = scene::load_scene(
            path,
            &mut self.device,
            &mut self.store,
            &mut self.registry,
            self.config.aspect_ratio(),
        )?;

        if let Some(environment) = loaded.environment {
            self.graphics.set_environment(environment);
        }

        if let Some(&first) = loaded.cameras.first() {
            let view = self.store.get::<Camera>(first)?.view.clone();
            let output = match self.output_camera {
                Some(output) => output,
                None => {
                    let output = self.store.create_entity("")?;
                    self.store.create_component::<Camera>(output)?;
                    self.output_camera = Some(output);
                    output
                }
            };
            self.store.get_mut::<Camera>(output)?.view = view;
            self.cameras.set_default_camera(first);
            self.cameras.set_output_camera(output);
            self.graphics.set_camera(output);
        } else {
            log::warn!("Scene '{}' has no camera", loaded.name);
        }

        self.graphics.mark_lights_dirty();
        Ok(loaded)
    }

    /// Sort meshes and create shadow maps; run once the scene is complete
    pub fn late_init(&mut self) -> EngineResult<()> {
        self.graphics.late_init(&mut self.device, &mut self.store, &mut self.registry)?;
        Ok(())
    }

    /// Advance every system by `dt` seconds and render a frame
    pub fn update(&mut self, dt: f32) -> EngineResult<FrameStats> {
        self.cameras.update(&mut self.store, dt)?;
        self.animations.update(&mut self.store, dt)?;
        self.collisions.update(&mut self.store)?;
        let stats = self.graphics.update(&mut self.device, &mut self.store, &self.registry, dt)?;
        log::trace!("Frame: {:?}", stats);
        Ok(stats)
    }

    /// Resize the screen and keep the blended projection in step
    pub fn resize(&mut self, width: u32, height: u32) -> EngineResult<()> {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self.cameras.set_aspect(self.config.aspect_ratio());
        self.graphics.update_main_viewport(&mut self.device, width, height)?;
        Ok(())
    }

    /// View-projection of the blended output camera
    pub fn output_view_projection(&self) -> EngineResult<Option<Mat4>> {
        Ok(self.cameras.output_view_projection(&self.store)?)
    }

    /// Aim `ray_entity`'s ray collider through the cursor from the output camera
    pub fn set_picking_ray(&mut self, ray_entity: EntityId, mouse: Vec2) -> EngineResult<bool> {
        let Some(camera) = self.output_camera else {
            log::warn!("Picking requested before a camera was loaded");
            return Ok(false);
        };
        let viewport = self.graphics.viewport();
        Ok(set_picking_ray(&mut self.store, ray_entity, camera, mouse, viewport)?)
    }

    /// Release the pipeline's and the registry's GPU objects
    pub fn shutdown(&mut self) {
        self.graphics.shutdown(&mut self.device);
        self.registry.release_all(&mut self.device);
        log::info!("Engine shut down");
    }

    /// Entity the pipeline renders from, once a scene provided a camera
    pub const fn output_camera(&self) -> Option<EntityId> {
        self.output_camera
    }

    /// Engine settings
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Component store
    pub const fn store(&self) -> &EntityComponentStore {
        &self.store
    }

    /// Mutable component store
    pub fn store_mut(&mut self) -> &mut EntityComponentStore {
        &mut self.store
    }

    /// Resource registry
    pub const fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Mutable resource registry
    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    /// Render pipeline
    pub fn graphics_mut(&mut self) -> &mut GraphicsSystem {
        &mut self.graphics
    }

    /// Camera blend layer
    pub fn camera_system_mut(&mut self) -> &mut CameraSystem {
        &mut self.cameras
    }

    /// The device frames are recorded on
    pub const fn device(&self) -> &D {
        &self.device
    }
}
