//! Frame-level tests of the pipeline against the recording device

use super::device::{BlendFactor, Face, FramebufferId, GraphicsDevice, ProgramId, UniformValue, VertexArrayId};
use super::graphics_system::{DebugView, Environment, GraphicsSystem};
use super::headless::{DeviceCommand, HeadlessDevice};
use super::light_ubo::{unpack_lights, LIGHT_STRIDE};
use super::material::Material;
use super::registry::ResourceRegistry;
use super::shader::BuiltinShader;
use super::texture::{ImageData, Texture};
use super::geometry::MeshData;
use super::{RenderError, MAX_LIGHTS};
use crate::config::EngineConfig;
use crate::ecs::components::{Camera, Light, LightType, Mesh, RenderMode, Transform};
use crate::ecs::{EntityComponentStore, EntityId};
use crate::foundation::math::Vec3;
use approx::assert_relative_eq;

struct Scene {
    device: HeadlessDevice,
    store: EntityComponentStore,
    registry: ResourceRegistry,
    graphics: GraphicsSystem,
    phong: ProgramId,
    plane: usize,
    material: usize,
}

impl Scene {
    fn new() -> Self {
        let mut device = HeadlessDevice::new();
        let config = EngineConfig { viewport_width: 320, viewport_height: 240, ..EngineConfig::default() };
        let mut graphics = GraphicsSystem::new(config);
        graphics.init(&mut device).unwrap();

        let mut registry = ResourceRegistry::new();
        let phong = registry.load_builtin_shader(&mut device, BuiltinShader::ForwardPhong).unwrap();
        let plane = registry.create_plane_geometry(&mut device).unwrap();
        let material = registry.create_material(Material::new(phong)).unwrap();

        let mut store = EntityComponentStore::new();
        let camera = store.create_entity("camera").unwrap();
        let view = &mut store.create_component::<Camera>(camera).unwrap().view;
        view.set_perspective(60f32.to_radians(), 320.0 / 240.0, 0.1, 100.0);
        view.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros());

        Self { device, store, registry, graphics, phong, plane, material }
    }

    fn add_mesh(&mut self, name: &str, position: Vec3, mode: RenderMode) -> EntityId {
        let entity = self.store.create_entity(name).unwrap();
        self.store.get_mut::<Transform>(entity).unwrap().set_position(position);
        let mesh = self.store.create_component::<Mesh>(entity).unwrap();
        mesh.geometry = self.plane;
        mesh.material = self.material;
        mesh.render_mode = mode;
        entity
    }

    fn add_light(&mut self, name: &str, light_type: LightType, cast_shadow: bool) -> EntityId {
        let entity = self.store.create_entity(name).unwrap();
        self.store.get_mut::<Transform>(entity).unwrap().set_position(Vec3::new(0.0, 4.0, 0.0));
        let light = self.store.create_component::<Light>(entity).unwrap();
        light.light_type = light_type;
        light.direction = Vec3::new(0.0, -1.0, 0.0);
        light.cast_shadow = cast_shadow;
        entity
    }

    fn late_init(&mut self) {
        self.graphics.late_init(&mut self.device, &mut self.store, &mut self.registry).unwrap();
        self.device.take_commands();
    }

    fn frame(&mut self) -> super::FrameStats {
        self.graphics.update(&mut self.device, &mut self.store, &self.registry, 0.016).unwrap()
    }
}

fn position_of(commands: &[DeviceCommand], wanted: &DeviceCommand) -> usize {
    commands.iter().position(|c| c == wanted).unwrap_or_else(|| panic!("{wanted:?} not recorded"))
}

fn lights_buffer(device: &HeadlessDevice) -> super::device::BufferId {
    device
        .commands()
        .iter()
        .find_map(|c| match c {
            DeviceCommand::BindBufferRange { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .unwrap()
}

fn gbuffer_id(commands: &[DeviceCommand], exclude: Option<FramebufferId>) -> FramebufferId {
    commands
        .iter()
        .find_map(|c| match c {
            DeviceCommand::BindFramebuffer(Some(id)) if Some(*id) != exclude => Some(*id),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_passes_run_in_order() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Deferred);
    scene.add_mesh("glass", Vec3::new(0.5, 0.0, 0.0), RenderMode::Forward);
    scene.add_light("sun", LightType::Directional, true);
    scene.late_init();

    let stats = scene.frame();
    assert_eq!(stats.shadow_maps, 1);
    assert_eq!(stats.light_volumes, 1);
    assert_eq!(stats.meshes_drawn, 2);

    let commands = scene.device.commands();
    let shadow = scene.graphics.shadow_map_for(0).unwrap().id();
    let gbuffer = gbuffer_id(commands, Some(shadow));

    let shadow_pass = position_of(commands, &DeviceCommand::BindFramebuffer(Some(shadow)));
    let gbuffer_pass = position_of(commands, &DeviceCommand::BindFramebuffer(Some(gbuffer)));
    let screen = position_of(commands, &DeviceCommand::BindFramebuffer(None));
    let additive = position_of(commands, &DeviceCommand::Blend(Some((BlendFactor::One, BlendFactor::One))));
    let opaque = position_of(commands, &DeviceCommand::Blend(None));
    let blit = position_of(commands, &DeviceCommand::BlitDepth { source: Some(gbuffer), destination: None });
    let forward = position_of(commands, &DeviceCommand::UseProgram(Some(scene.phong)));

    assert!(shadow_pass < gbuffer_pass);
    assert!(gbuffer_pass < screen);
    assert!(screen < additive);
    assert!(additive < opaque);
    assert!(opaque < blit);
    assert!(blit < forward);
}

#[test]
fn test_shadow_pass_culls_front_faces_and_draws_every_mesh() {
    let mut scene = Scene::new();
    scene.add_mesh("near", Vec3::zeros(), RenderMode::Deferred);
    scene.add_mesh("behind", Vec3::new(0.0, 0.0, 500.0), RenderMode::Forward);
    scene.add_light("spot", LightType::Spot, true);
    scene.late_init();
    scene.frame();

    let commands = scene.device.commands();
    let shadow = scene.graphics.shadow_map_for(0).unwrap().id();
    let start = position_of(commands, &DeviceCommand::BindFramebuffer(Some(shadow)));
    assert_eq!(commands[start - 2], DeviceCommand::CullFace(Some(Face::Front)));

    let end = start + commands[start..].iter().position(|c| c == &DeviceCommand::CullFace(Some(Face::Back))).unwrap();
    let draws = commands[start..end].iter().filter(|c| matches!(c, DeviceCommand::Draw { .. })).count();
    assert_eq!(draws, 2);
}

#[test]
fn test_meshes_outside_frustum_are_culled() {
    let mut scene = Scene::new();
    scene.add_mesh("visible", Vec3::zeros(), RenderMode::Deferred);
    scene.add_mesh("behind", Vec3::new(0.0, 0.0, 10_000.0), RenderMode::Deferred);
    scene.add_mesh("aside", Vec3::new(500.0, 0.0, 0.0), RenderMode::Forward);
    scene.late_init();

    let stats = scene.frame();
    assert_eq!(stats.meshes_drawn, 1);
    assert_eq!(stats.meshes_culled, 2);
    assert_eq!(stats.shadow_maps, 0);
}

#[test]
fn test_light_block_uploaded_only_when_dirty() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Deferred);
    scene.add_light("lamp", LightType::Point, false);
    scene.late_init();

    let uploads = |device: &HeadlessDevice| {
        device.commands().iter().filter(|c| matches!(c, DeviceCommand::UploadBuffer { .. })).count()
    };

    scene.frame();
    assert_eq!(uploads(&scene.device), 1);
    assert!(scene.device.commands().iter().any(|c| matches!(
        c,
        DeviceCommand::BindBufferRange { binding: 1, offset: 0, size, .. } if *size == LIGHT_STRIDE
    )));
    assert!(!scene.graphics.lights_dirty());

    scene.device.take_commands();
    scene.frame();
    assert_eq!(uploads(&scene.device), 0);

    scene.graphics.mark_lights_dirty();
    scene.frame();
    assert_eq!(uploads(&scene.device), 1);
}

#[test]
fn test_light_block_carries_world_position() {
    let mut scene = Scene::new();
    let lamp = scene.add_light("lamp", LightType::Spot, true);
    scene.store.get_mut::<Transform>(lamp).unwrap().set_position(Vec3::new(1.0, 2.0, 3.0));
    scene.late_init();
    scene.frame();

    let buffer = lights_buffer(&scene.device);
    let lights = unpack_lights(scene.device.buffer_data(buffer).unwrap()).unwrap();
    assert_eq!(lights.len(), 1);
    assert_eq!(lights[0].position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(lights[0].direction, Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(lights[0].light_type, LightType::Spot);
    assert!(lights[0].cast_shadow);
}

#[test]
fn test_light_block_keeps_unnormalised_direction() {
    let mut scene = Scene::new();
    let lamp = scene.add_light("lamp", LightType::Spot, true);
    scene.store.get_mut::<Light>(lamp).unwrap().direction = Vec3::new(0.0, -2.0, 0.0);
    scene.late_init();
    scene.frame();

    let buffer = lights_buffer(&scene.device);
    let lights = unpack_lights(scene.device.buffer_data(buffer).unwrap()).unwrap();
    assert_eq!(lights[0].direction, Vec3::new(0.0, -2.0, 0.0));
    // the shadow camera still looks along the unit direction
    let forward = scene.store.get::<Light>(lamp).unwrap().view.forward;
    assert_relative_eq!(forward, Vec3::new(0.0, -1.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_one_volume_per_light_type() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Deferred);
    scene.add_light("sun", LightType::Directional, false);
    scene.add_light("spot", LightType::Spot, false);
    scene.add_light("bulb", LightType::Point, false);
    scene.late_init();

    let stats = scene.frame();
    assert_eq!(stats.light_volumes, 3);

    // quad, sphere and cone are the first three vertex arrays after the light buffer
    let commands = scene.device.commands();
    let additive = position_of(commands, &DeviceCommand::Blend(Some((BlendFactor::One, BlendFactor::One))));
    let opaque = position_of(commands, &DeviceCommand::Blend(None));
    let volumes: Vec<VertexArrayId> = commands[additive..opaque]
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::Draw { vertex_array, .. } => Some(*vertex_array),
            _ => None,
        })
        .collect();
    assert_eq!(volumes, vec![VertexArrayId(2), VertexArrayId(4), VertexArrayId(3)]);
}

#[test]
fn test_shadow_maps_limited_to_casting_lights() {
    let mut scene = Scene::new();
    scene.add_light("plain", LightType::Point, false);
    for i in 0..MAX_LIGHTS {
        scene.add_light(&format!("caster{i}"), LightType::Spot, true);
    }
    scene.late_init();

    assert!(scene.graphics.shadow_map_for(0).is_none());
    assert!(scene.graphics.shadow_map_for(1).is_some());
    assert!(scene.graphics.shadow_map_for(MAX_LIGHTS).is_none());

    let stats = scene.frame();
    assert_eq!(stats.shadow_maps, MAX_LIGHTS - 1);
    assert_eq!(stats.light_volumes, MAX_LIGHTS);
}

#[test]
fn test_forward_pass_skips_redundant_binds() {
    let mut scene = Scene::new();
    scene.add_mesh("a", Vec3::zeros(), RenderMode::Forward);
    scene.add_mesh("b", Vec3::new(0.2, 0.0, 0.0), RenderMode::Forward);
    scene.add_mesh("c", Vec3::new(-0.2, 0.0, 0.0), RenderMode::Forward);
    scene.late_init();

    let stats = scene.frame();
    assert_eq!(stats.meshes_drawn, 3);

    let commands = scene.device.commands();
    let binds = commands.iter().filter(|c| **c == DeviceCommand::UseProgram(Some(scene.phong))).count();
    assert_eq!(binds, 1);

    let ambient = scene.device.uniform_location(scene.phong, "u_ambient").unwrap();
    let ambient_writes = commands
        .iter()
        .filter(|c| {
            matches!(c, DeviceCommand::SetUniform { program, location, .. }
                if *program == Some(scene.phong) && *location == ambient)
        })
        .count();
    assert_eq!(ambient_writes, 1);
}

#[test]
fn test_environment_drawn_last_without_translation() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Forward);

    let sky_shader = scene.registry.load_builtin_shader(&mut scene.device, BuiltinShader::Environment).unwrap();
    let faces = std::array::from_fn(|_| ImageData::solid_color(2, 2, [40, 80, 160, 255]));
    let cube = Texture::cubemap(&mut scene.device, faces).unwrap();
    let cube_map = scene.registry.add_texture(cube);
    let sky = scene.registry.create_geometry(&mut scene.device, &MeshData::sphere(8, 8)).unwrap();
    scene.graphics.set_environment(Environment {
        shader: Some(sky_shader),
        cube_map: Some(cube_map),
        geometry: Some(sky),
    });
    scene.late_init();
    scene.frame();

    let sky_vao = scene.registry.geometry(sky).unwrap().vertex_array();
    let last_draw = scene
        .device
        .commands()
        .iter()
        .rev()
        .find_map(|c| match c {
            DeviceCommand::Draw { vertex_array, .. } => Some(*vertex_array),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_draw, sky_vao);
    assert_eq!(scene.device.uniform_value(sky_shader, "u_skybox"), Some(UniformValue::Int(13)));

    let Some(UniformValue::Mat4(vp)) = scene.device.uniform_value(sky_shader, "u_vp") else {
        panic!("u_vp not written");
    };
    let camera = scene.store.get_by_name::<Camera>("camera").unwrap();
    let mut view = camera.view.view_matrix;
    view[(0, 3)] = 0.0;
    view[(1, 3)] = 0.0;
    view[(2, 3)] = 0.0;
    assert_eq!(vp, camera.view.projection_matrix * view);
}

#[test]
fn test_incomplete_environment_is_skipped() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Forward);
    scene.graphics.set_environment(Environment { shader: Some(scene.phong), cube_map: None, geometry: Some(0) });
    scene.late_init();
    scene.frame();
    assert_eq!(scene.device.draw_count(), 1);
}

#[test]
fn test_update_requires_init_and_camera() {
    let mut device = HeadlessDevice::new();
    let mut store = EntityComponentStore::new();
    let registry = ResourceRegistry::new();
    let mut graphics = GraphicsSystem::new(EngineConfig::default());

    let err = graphics.update(&mut device, &mut store, &registry, 0.0).unwrap_err();
    assert!(matches!(err, RenderError::RenderingFailed(_)));

    graphics.init(&mut device).unwrap();
    let err = graphics.update(&mut device, &mut store, &registry, 0.0).unwrap_err();
    assert!(matches!(err, RenderError::RenderingFailed(_)));
}

#[test]
fn test_explicit_camera_selection() {
    let mut scene = Scene::new();
    let second = scene.store.create_entity("overhead").unwrap();
    let view = &mut scene.store.create_component::<Camera>(second).unwrap().view;
    view.set_perspective(60f32.to_radians(), 1.0, 0.1, 100.0);
    view.look_at(Vec3::new(7.0, 9.0, 0.0), Vec3::zeros());
    scene.late_init();

    scene.graphics.set_camera(second);
    scene.frame();
    let forward = scene.device.commands().iter().any(|c| {
        matches!(c, DeviceCommand::SetUniform { value: UniformValue::Vec3(v), .. } if *v == Vec3::new(7.0, 9.0, 0.0))
    });
    assert!(forward);
}

#[test]
fn test_debug_view_adds_full_screen_draw() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Deferred);
    scene.late_init();
    scene.frame();
    let plain = scene.device.take_commands();
    let plain_draws = plain.iter().filter(|c| matches!(c, DeviceCommand::Draw { .. })).count();

    scene.graphics.set_debug_view(Some(DebugView::Normal));
    scene.frame();
    assert_eq!(scene.device.draw_count(), plain_draws + 1);
}

#[test]
fn test_resize_rebuilds_gbuffer() {
    let mut scene = Scene::new();
    let before = scene.device.live_resource_count();
    scene.graphics.update_main_viewport(&mut scene.device, 640, 480).unwrap();
    assert_eq!(scene.graphics.viewport(), (640, 480));
    assert_eq!(scene.device.live_resource_count(), before);
    assert!(scene
        .device
        .commands()
        .iter()
        .any(|c| matches!(c, DeviceCommand::CreateRenderbuffer { width: 640, height: 480, .. })));
}

#[test]
fn test_shutdown_releases_everything() {
    let mut scene = Scene::new();
    scene.add_mesh("floor", Vec3::zeros(), RenderMode::Deferred);
    scene.add_light("sun", LightType::Directional, true);
    scene.late_init();
    scene.frame();

    scene.graphics.shutdown(&mut scene.device);
    scene.registry.release_all(&mut scene.device);
    assert_eq!(scene.device.live_resource_count(), 0);
}
