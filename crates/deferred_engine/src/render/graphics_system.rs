//! # Graphics System
//!
//! Per-frame pass sequence of the deferred-plus-forward pipeline.
//!
//! ## Frame
//!
//! 1. Spatial update: view tracks, camera matrices, light views.
//! 2. Light block upload, only when marked dirty.
//! 3. Shadow pass: every mesh into each shadow-casting light's depth map,
//!    front faces culled.
//! 4. G-buffer pass: deferred meshes, frustum culled.
//! 5. Screen: clear and reset the bind cache.
//! 6. Light volumes: one additive draw per light sampling the G-buffer,
//!    then the G-buffer depth is blitted onto the screen.
//! 7. Forward pass: forward meshes, frustum culled, with shader and
//!    material binds skipped when unchanged.
//! 8. Environment cubemap, when configured.
//!
//! The registry's mesh sort (done in [`GraphicsSystem::late_init`]) is what
//! makes the bind skipping in step 7 effective.

use super::culling::aabb_in_frustum;
use super::device::{
    BlendFactor, BufferId, ClearFlags, DepthFunc, Face, GpuResource, GraphicsDevice, ProgramId, UniformValue,
};
use super::framebuffer::Framebuffer;
use super::geometry::{Geometry, MeshData};
use super::light_ubo::{pack_lights, LightBlock, LIGHT_STRIDE};
use super::material::units;
use super::registry::ResourceRegistry;
use super::shader::{BuiltinShader, Shader, UniformId};
use super::{RenderError, RenderResult, MAX_LIGHTS};
use crate::config::EngineConfig;
use crate::ecs::components::{Camera, CameraView, Light, LightType, Mesh, RenderMode, Transform};
use crate::ecs::systems::ViewTrackSystem;
use crate::ecs::{Component, EcsResult, EntityComponentStore, EntityId};
use crate::foundation::math::{constants, utils, Mat4, Mat4Ext, Unit, Vec3, Vec4};

/// Texture unit of the G-buffer position target during the light pass
const GBUFFER_POSITION_UNIT: u32 = 8;
/// Texture unit of the G-buffer normal target
const GBUFFER_NORMAL_UNIT: u32 = 9;
/// Texture unit of the G-buffer albedo target
const GBUFFER_ALBEDO_UNIT: u32 = 10;

/// Widest spot cone the volume can represent, in degrees
const MAX_SPOT_VOLUME_ANGLE: f32 = 89.0;

/// Skybox drawn after the forward pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environment {
    /// Program drawing the skybox
    pub shader: Option<ProgramId>,
    /// Cubemap texture id
    pub cube_map: Option<usize>,
    /// Geometry id of the enclosing shape
    pub geometry: Option<usize>,
}

/// G-buffer target shown instead of the lit image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugView {
    /// World positions
    Position,
    /// World normals
    Normal,
    /// Albedo with specular in alpha
    Albedo,
}

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Meshes that issued draws in the G-buffer and forward passes
    pub meshes_drawn: usize,
    /// Meshes rejected by the frustum test
    pub meshes_culled: usize,
    /// Light volumes drawn
    pub light_volumes: usize,
    /// Shadow maps rendered
    pub shadow_maps: usize,
}

/// GPU objects created by [`GraphicsSystem::init`]
#[derive(Debug)]
struct PipelineResources {
    lights_buffer: BufferId,
    quad: Geometry,
    sphere: Geometry,
    cone: Geometry,
    depth_shader: Shader,
    gbuffer_shader: Shader,
    volume_shader: Shader,
    screen_shader: Shader,
    gbuffer: Framebuffer,
}

/// Last shader and material bound, to skip redundant state changes
#[derive(Debug, Default)]
struct BindCache {
    shader: Option<ProgramId>,
    material: Option<usize>,
}

/// Per-frame values shared by every draw
struct FrameContext {
    camera: CameraView,
    light_count: usize,
    shadow_lights: Vec<usize>,
}

/// Deferred-plus-forward renderer
#[derive(Debug)]
pub struct GraphicsSystem {
    config: EngineConfig,
    viewport: (u32, u32),
    camera: Option<EntityId>,
    resources: Option<PipelineResources>,
    shadow_maps: Vec<Option<Framebuffer>>,
    environment: Environment,
    view_tracks: ViewTrackSystem,
    debug_view: Option<DebugView>,
    lights_dirty: bool,
}

impl GraphicsSystem {
    /// Renderer for the given settings; call [`Self::init`] before use
    pub fn new(config: EngineConfig) -> Self {
        let viewport = (config.viewport_width, config.viewport_height);
        Self {
            config,
            viewport,
            camera: None,
            resources: None,
            shadow_maps: Vec::new(),
            environment: Environment::default(),
            view_tracks: ViewTrackSystem::new(),
            debug_view: None,
            lights_dirty: true,
        }
    }

    /// Set global state and create the pipeline's own GPU objects
    pub fn init(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        log::info!("Initializing graphics system at {}x{}", self.viewport.0, self.viewport.1);

        device.set_depth_test(Some(DepthFunc::LessEqual));
        device.set_cull_face(Some(Face::Back));
        device.set_seamless_cubemap(true);

        let lights_buffer = device.create_uniform_buffer(MAX_LIGHTS * LIGHT_STRIDE)?;
        let quad = Geometry::upload(device, &MeshData::plane())?;
        let sphere = Geometry::upload(device, &MeshData::sphere(16, 24))?;
        let cone = Geometry::upload(device, &MeshData::cone(24))?;

        let depth_shader = Shader::builtin(device, BuiltinShader::Depth)?;
        let gbuffer_shader = Shader::builtin(device, BuiltinShader::Gbuffer)?;
        let mut volume_shader = Shader::builtin(device, BuiltinShader::DeferredVolume)?;
        let screen_shader = Shader::builtin(device, BuiltinShader::Screen)?;
        if !volume_shader.bind_lights_block(device, self.config.lights_binding_point) {
            return Err(RenderError::InitializationFailed("light volume shader has no light block".to_owned()));
        }

        let gbuffer = Framebuffer::gbuffer(device, self.viewport.0, self.viewport.1)?;

        self.resources = Some(PipelineResources {
            lights_buffer,
            quad,
            sphere,
            cone,
            depth_shader,
            gbuffer_shader,
            volume_shader,
            screen_shader,
            gbuffer,
        });
        self.lights_dirty = true;
        log::info!("Graphics system initialized");
        Ok(())
    }

    /// Sort meshes for batching and create shadow maps; run once after scene load
    pub fn late_init(
        &mut self,
        device: &mut dyn GraphicsDevice,
        store: &mut EntityComponentStore,
        registry: &mut ResourceRegistry,
    ) -> RenderResult<()> {
        registry.sort_meshes(store);

        for shadow_map in self.shadow_maps.drain(..).flatten() {
            shadow_map.release(device);
        }

        let limit = self.light_limit();
        for (index, light) in store.all::<Light>().iter().enumerate() {
            if !light.cast_shadow {
                self.shadow_maps.push(None);
                continue;
            }
            if index >= limit {
                log::warn!("Light {} exceeds the shadow limit of {}, no shadow map", index, limit);
                self.shadow_maps.push(None);
                continue;
            }

            let size = if light.resolution > 0 { light.resolution } else { self.config.shadow_map_resolution };
            self.shadow_maps.push(Some(Framebuffer::depth(device, size)?));
            log::debug!("Created {}x{} shadow map for light {}", size, size, index);
        }

        let binding = self.config.lights_binding_point;
        for shader in registry.shaders_mut() {
            if !shader.bind_lights_block(device, binding) {
                log::trace!("Shader {:?} does not read the light block", shader.program());
            }
        }

        self.lights_dirty = true;
        Ok(())
    }

    /// Render one frame
    pub fn update(
        &mut self,
        device: &mut dyn GraphicsDevice,
        store: &mut EntityComponentStore,
        registry: &ResourceRegistry,
        dt: f32,
    ) -> RenderResult<FrameStats> {
        let mut stats = FrameStats::default();

        // 1. Spatial update
        self.view_tracks.update(store, dt)?;
        for camera in store.all_mut::<Camera>() {
            camera.view.update();
        }
        self.update_lights(store)?;

        let store: &EntityComponentStore = store;
        let resources = self
            .resources
            .as_ref()
            .ok_or_else(|| RenderError::RenderingFailed("update before init".to_owned()))?;
        let camera = self.resolve_camera(store)?;
        let models = mesh_models(store)?;
        let meshes = store.all::<Mesh>();
        let lights = store.all::<Light>();
        let light_count = lights.len().min(self.light_limit());

        // 2. Light block
        if self.lights_dirty {
            let blocks: Vec<LightBlock> =
                lights.iter().take(light_count).map(|l| LightBlock::from_light(l, l.view.position)).collect();
            device.upload_buffer(resources.lights_buffer, &pack_lights(&blocks));
            if !blocks.is_empty() {
                device.bind_buffer_range(
                    self.config.lights_binding_point,
                    resources.lights_buffer,
                    0,
                    blocks.len() * LIGHT_STRIDE,
                );
            }
            self.lights_dirty = false;
            log::trace!("Uploaded {} lights", blocks.len());
        }

        let frame = FrameContext {
            camera,
            light_count,
            shadow_lights: (0..light_count).filter(|i| self.shadow_map(*i).is_some()).collect(),
        };

        // 3. Shadow pass
        device.set_cull_face(Some(Face::Front));
        resources.depth_shader.bind(device);
        for &index in &frame.shadow_lights {
            let (Some(light), Some(target)) = (lights.get(index), self.shadow_map(index)) else {
                continue;
            };
            if !light.cast_shadow {
                continue;
            }
            target.bind_and_clear(device, Vec4::repeat(1.0));
            for (mesh, model) in meshes.iter().zip(&models) {
                let geometry = geometry_of(registry, mesh)?;
                let mvp = light.view.view_projection * model;
                resources.depth_shader.set(device, UniformId::Mvp, UniformValue::Mat4(mvp));
                geometry.render(device);
            }
            stats.shadow_maps += 1;
        }
        device.set_cull_face(Some(Face::Back));

        // 4. G-buffer pass
        let background = self.background();
        resources.gbuffer.bind_and_clear(device, background);
        let mut cache = BindCache::default();
        resources.gbuffer_shader.bind(device);
        cache.shader = Some(resources.gbuffer_shader.program());
        for (mesh, model) in meshes.iter().zip(&models) {
            if mesh.render_mode == RenderMode::Deferred {
                draw_mesh(device, registry, &frame, Some(&resources.gbuffer_shader), &mut cache, mesh, model, &mut stats)?;
            }
        }

        // 5. Screen
        device.bind_framebuffer(None);
        device.viewport(0, 0, self.viewport.0, self.viewport.1);
        device.clear(background, ClearFlags::COLOR | ClearFlags::DEPTH);
        let mut cache = BindCache::default();

        // 6. Light volumes
        self.light_volume_pass(device, resources, &frame, lights, &mut stats);

        // 7. Forward pass
        self.bind_shadow_maps(device, &frame);
        for (mesh, model) in meshes.iter().zip(&models) {
            if mesh.render_mode == RenderMode::Forward {
                draw_mesh(device, registry, &frame, None, &mut cache, mesh, model, &mut stats)?;
            }
        }

        // 8. Environment
        self.environment_pass(device, registry, &frame.camera);

        if let Some(view) = self.debug_view {
            self.draw_debug_view(device, resources, view);
        }

        log::trace!("Frame: {:?}", stats);
        Ok(stats)
    }

    fn light_volume_pass(
        &self,
        device: &mut dyn GraphicsDevice,
        resources: &PipelineResources,
        frame: &FrameContext,
        lights: &[Light],
        stats: &mut FrameStats,
    ) {
        let shader = &resources.volume_shader;
        shader.bind(device);
        self.bind_shadow_maps(device, frame);
        for &index in &frame.shadow_lights {
            shader.set_shadow_map(device, index, index as u32);
        }

        let targets = [
            (UniformId::TexPosition, GBUFFER_POSITION_UNIT),
            (UniformId::TexNormal, GBUFFER_NORMAL_UNIT),
            (UniformId::TexAlbedo, GBUFFER_ALBEDO_UNIT),
        ];
        for (slot, (uniform, unit)) in targets.into_iter().enumerate() {
            resources.gbuffer.bind_texture(device, slot, unit);
            shader.set(device, uniform, UniformValue::Int(unit as i32));
        }
        shader.set(device, UniformId::CamPos, UniformValue::Vec3(frame.camera.position));

        device.set_blend(Some((BlendFactor::One, BlendFactor::One)));
        device.set_depth_write(false);

        for (index, light) in lights.iter().take(frame.light_count).enumerate() {
            shader.set(device, UniformId::LightId, UniformValue::Int(index as i32));
            let position = light.view.position;
            match light.light_type {
                LightType::Directional => {
                    device.set_cull_face(Some(Face::Back));
                    shader.set(device, UniformId::Mvp, UniformValue::Mat4(Mat4::identity()));
                    resources.quad.render(device);
                }
                LightType::Spot => {
                    device.set_cull_face(Some(Face::Front));
                    let model = spot_volume_transform(&position, &light.view.forward, light.radius, light.spot_outer);
                    let mvp = frame.camera.view_projection * model;
                    shader.set(device, UniformId::Mvp, UniformValue::Mat4(mvp));
                    resources.cone.render(device);
                }
                LightType::Point => {
                    device.set_cull_face(Some(Face::Front));
                    let mvp = frame.camera.view_projection * point_volume_transform(&position, light.radius);
                    shader.set(device, UniformId::Mvp, UniformValue::Mat4(mvp));
                    resources.sphere.render(device);
                }
            }
            stats.light_volumes += 1;
        }

        device.set_blend(None);
        device.set_depth_write(true);
        device.set_cull_face(Some(Face::Back));

        device.blit_depth(Some(resources.gbuffer.id()), None, resources.gbuffer.size(), self.viewport);
    }

    fn environment_pass(&self, device: &mut dyn GraphicsDevice, registry: &ResourceRegistry, camera: &CameraView) {
        let Environment { shader: Some(program), cube_map: Some(cube_map), geometry: Some(geometry) } = self.environment
        else {
            return;
        };
        let (Some(shader), Some(texture), Some(geometry)) =
            (registry.shader(program), registry.texture(cube_map), registry.geometry(geometry))
        else {
            log::warn!("Environment references missing resources, skipping");
            return;
        };

        device.set_depth_write(false);
        device.set_cull_face(Some(Face::Front));

        shader.bind(device);
        let view_projection = camera.projection_matrix * camera.view_matrix.with_translation_zeroed();
        shader.set(device, UniformId::Vp, UniformValue::Mat4(view_projection));
        shader.set(device, UniformId::Skybox, UniformValue::Int(units::CUBE as i32));
        texture.bind(device, units::CUBE);
        geometry.render(device);

        device.set_depth_write(true);
        device.set_cull_face(Some(Face::Back));
    }

    fn draw_debug_view(&self, device: &mut dyn GraphicsDevice, resources: &PipelineResources, view: DebugView) {
        let slot = match view {
            DebugView::Position => 0,
            DebugView::Normal => 1,
            DebugView::Albedo => 2,
        };
        resources.screen_shader.bind(device);
        resources.gbuffer.bind_texture(device, slot, 0);
        resources.screen_shader.set(device, UniformId::ScreenTexture, UniformValue::Int(0));
        device.set_depth_test(None);
        resources.quad.render(device);
        device.set_depth_test(Some(DepthFunc::LessEqual));
    }

    fn bind_shadow_maps(&self, device: &mut dyn GraphicsDevice, frame: &FrameContext) {
        for &index in &frame.shadow_lights {
            if let Some(target) = self.shadow_map(index) {
                target.bind_depth_texture(device, index as u32);
            }
        }
    }

    fn update_lights(&self, store: &mut EntityComponentStore) -> EcsResult<()> {
        let positions = store
            .all::<Light>()
            .iter()
            .map(|light| {
                if store.has::<Transform>(light.owner()) {
                    store.world_matrix(light.owner()).map(|m| m.translation_part())
                } else {
                    Ok(light.view.position)
                }
            })
            .collect::<EcsResult<Vec<Vec3>>>()?;

        for (light, position) in store.all_mut::<Light>().iter_mut().zip(positions) {
            update_light_view(light, position, &self.config);
        }
        Ok(())
    }

    fn resolve_camera(&self, store: &EntityComponentStore) -> RenderResult<CameraView> {
        match self.camera {
            Some(entity) => Ok(store.get::<Camera>(entity)?.view.clone()),
            None => store
                .all::<Camera>()
                .first()
                .map(|c| c.view.clone())
                .ok_or_else(|| RenderError::RenderingFailed("scene has no camera".to_owned())),
        }
    }

    fn shadow_map(&self, light: usize) -> Option<&Framebuffer> {
        self.shadow_maps.get(light).and_then(Option::as_ref)
    }

    fn light_limit(&self) -> usize {
        self.config.max_lights.min(MAX_LIGHTS)
    }

    fn background(&self) -> Vec4 {
        let c = self.config.background_color;
        Vec4::new(c.x, c.y, c.z, 1.0)
    }

    /// Camera entity the pipeline renders from; the first camera when unset
    pub fn set_camera(&mut self, camera: EntityId) {
        self.camera = Some(camera);
    }

    /// Configure the skybox
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    /// Current skybox configuration
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Show a G-buffer target on screen instead of the lit image
    pub fn set_debug_view(&mut self, view: Option<DebugView>) {
        self.debug_view = view;
    }

    /// Re-upload the light block on the next frame
    pub fn mark_lights_dirty(&mut self) {
        self.lights_dirty = true;
    }

    /// Whether the light block will be uploaded on the next frame
    pub const fn lights_dirty(&self) -> bool {
        self.lights_dirty
    }

    /// Screen viewport size
    pub const fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Resize the screen viewport and rebuild the G-buffer to match
    pub fn update_main_viewport(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> RenderResult<()> {
        self.viewport = (width, height);
        if let Some(resources) = self.resources.as_mut() {
            let gbuffer = Framebuffer::gbuffer(device, width, height)?;
            std::mem::replace(&mut resources.gbuffer, gbuffer).release(device);
        }
        log::debug!("Viewport resized to {}x{}", width, height);
        Ok(())
    }

    /// Shadow map of the light at `index`, if it casts shadows
    pub fn shadow_map_for(&self, index: usize) -> Option<&Framebuffer> {
        self.shadow_map(index)
    }

    /// Release every GPU object the pipeline created
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        for shadow_map in self.shadow_maps.drain(..).flatten() {
            shadow_map.release(device);
        }
        if let Some(resources) = self.resources.take() {
            resources.gbuffer.release(device);
            for geometry in [&resources.quad, &resources.sphere, &resources.cone] {
                device.release(GpuResource::VertexArray(geometry.vertex_array()));
            }
            for shader in [
                &resources.depth_shader,
                &resources.gbuffer_shader,
                &resources.volume_shader,
                &resources.screen_shader,
            ] {
                shader.release(device);
            }
            device.release(GpuResource::Buffer(resources.lights_buffer));
        }
        log::info!("Graphics system shut down");
    }
}

/// Place a light's shadow camera at `position` and refresh its projection
fn update_light_view(light: &mut Light, position: Vec3, config: &EngineConfig) {
    let forward = light.direction.try_normalize(constants::EPSILON).unwrap_or_else(|| -Vec3::y());
    light.view.position = position;
    light.view.forward = forward;

    match light.light_type {
        LightType::Directional => {
            let e = config.directional_shadow_extent;
            light.view.set_orthographic(-e, e, -e, e, config.shadow_near, config.shadow_far);
        }
        LightType::Spot => {
            let fov = utils::deg_to_rad((2.0 * light.spot_outer).clamp(1.0, 179.0));
            light.view.set_perspective(fov, 1.0, config.shadow_near, config.shadow_far);
        }
        LightType::Point => {
            light.view.set_perspective(utils::deg_to_rad(90.0), 1.0, config.shadow_near, config.shadow_far);
        }
    }
    light.update_radius();
    light.view.update();
}

/// Rotation taking +Y onto `forward`
///
/// When `forward` is parallel to +Y the cross product vanishes, so the
/// rotation axis falls back to a fixed perpendicular.
fn rotation_from_up(forward: &Vec3) -> Mat4 {
    let up = Vec3::y();
    let Some(forward) = forward.try_normalize(constants::EPSILON) else {
        return Mat4::identity();
    };
    let angle = utils::clamp(up.dot(&forward), -1.0, 1.0).acos();
    let axis = up.cross(&forward);
    let axis = if axis.norm() < constants::EPSILON { utils::any_perpendicular(&up) } else { axis };
    Mat4::from_axis_angle(&Unit::new_normalize(axis), angle)
}

/// Model matrix of a spot light's cone volume
///
/// The unit cone (apex at the origin, base at y = 1) is scaled to
/// `(w, radius, w)` with `w = radius * tan(outer)`, turned onto `forward`
/// and moved to `position`.
pub fn spot_volume_transform(position: &Vec3, forward: &Vec3, radius: f32, spot_outer_degrees: f32) -> Mat4 {
    let angle = utils::deg_to_rad(spot_outer_degrees.clamp(0.0, MAX_SPOT_VOLUME_ANGLE));
    let width = radius * angle.tan();
    Mat4::new_translation(position)
        * rotation_from_up(forward)
        * Mat4::new_nonuniform_scaling(&Vec3::new(width, radius, width))
}

/// Model matrix of a point light's sphere volume
pub fn point_volume_transform(position: &Vec3, radius: f32) -> Mat4 {
    Mat4::new_translation(position) * Mat4::new_scaling(radius)
}

/// World matrix of every mesh, in mesh order; identity for untransformed owners
fn mesh_models(store: &EntityComponentStore) -> EcsResult<Vec<Mat4>> {
    store
        .all::<Mesh>()
        .iter()
        .map(|mesh| {
            if store.has::<Transform>(mesh.owner()) {
                store.world_matrix(mesh.owner())
            } else {
                Ok(Mat4::identity())
            }
        })
        .collect()
}

fn geometry_of<'a>(registry: &'a ResourceRegistry, mesh: &Mesh) -> RenderResult<&'a Geometry> {
    registry.geometry(mesh.geometry).ok_or(RenderError::InvalidResource { kind: "geometry", id: mesh.geometry })
}

/// Draw one mesh with frustum culling
///
/// `fixed_shader` draws every range with one program (the G-buffer pass);
/// otherwise each range uses its material's program.
#[allow(clippy::too_many_arguments)]
fn draw_mesh(
    device: &mut dyn GraphicsDevice,
    registry: &ResourceRegistry,
    frame: &FrameContext,
    fixed_shader: Option<&Shader>,
    cache: &mut BindCache,
    mesh: &Mesh,
    model: &Mat4,
    stats: &mut FrameStats,
) -> RenderResult<()> {
    let geometry = geometry_of(registry, mesh)?;
    let mvp = frame.camera.view_projection * model;
    if !aabb_in_frustum(geometry.aabb(), &mvp) {
        stats.meshes_culled += 1;
        return Ok(());
    }
    let normal_matrix = model.normal_matrix();

    for range in geometry.draw_ranges() {
        let material_id = range.material.unwrap_or(mesh.material);
        let material = registry
            .material(material_id)
            .ok_or(RenderError::InvalidResource { kind: "material", id: material_id })?;

        let shader = match fixed_shader {
            Some(shader) => shader,
            None => registry
                .shader(material.shader)
                .ok_or(RenderError::InvalidResource { kind: "shader", id: material.shader.0 as usize })?,
        };

        if cache.shader != Some(shader.program()) {
            shader.bind(device);
            shader.set(device, UniformId::NumLights, UniformValue::Int(frame.light_count as i32));
            for &index in &frame.shadow_lights {
                shader.set_shadow_map(device, index, index as u32);
            }
            cache.shader = Some(shader.program());
            cache.material = None;
        }

        shader.set(device, UniformId::Mvp, UniformValue::Mat4(mvp));
        shader.set(device, UniformId::Model, UniformValue::Mat4(*model));
        shader.set(device, UniformId::NormalMatrix, UniformValue::Mat4(normal_matrix));
        shader.set(device, UniformId::CamPos, UniformValue::Vec3(frame.camera.position));

        if cache.material != Some(material_id) {
            material.apply(device, shader, registry.textures());
            cache.material = Some(material_id);
        }

        geometry.render_range(device, &range);
    }

    stats.meshes_drawn += 1;
    Ok(())
}
