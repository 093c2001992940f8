//! Scene Loader - instantiate a [`SceneDescription`]
//!
//! Sections are processed in file order: geometries, shaders, cameras,
//! textures, environment, materials, lights, entities. Names are resolved
//! through per-section dictionaries built along the way. Parent links are
//! applied in a second pass once every entity exists.
//!
//! Failures to load a single asset are logged and the asset is left out;
//! entities that reference a missing geometry or material are skipped.
//! Broken structure (missing sections, unknown shaders or parents) aborts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::description::{
    CameraDef, EntityDef, EnvironmentDef, GeometryDef, LightDef, MaterialDef, SceneDescription, SceneFormat,
    ShaderDef, ShapeDef, TextureDef,
};
use super::{SceneError, SceneResult};
use crate::ecs::components::{Camera, Collider, Light, Mesh, Transform, ViewTrack};
use crate::ecs::{EntityComponentStore, EntityId};
use crate::foundation::curve::Curve;
use crate::foundation::math::{compose_trs, utils, Vec2, Vec3};
use crate::render::device::{GraphicsDevice, ProgramId};
use crate::render::geometry::MeshData;
use crate::render::graphics_system::Environment;
use crate::render::material::Material;
use crate::render::registry::ResourceRegistry;
use crate::render::shader::BuiltinShader;
use crate::render::RenderResult;

/// What a load produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedScene {
    /// Display name from the file
    pub name: String,
    /// Skybox, when the file defines a complete one
    pub environment: Option<Environment>,
    /// Camera entities in file order
    pub cameras: Vec<EntityId>,
    /// Light entities in file order
    pub lights: Vec<EntityId>,
    /// Drawable entities that were created
    pub entities: Vec<EntityId>,
    /// Entities left out because of unknown references
    pub skipped: usize,
}

/// Read, parse and instantiate a scene file
///
/// The format is chosen by extension (`.ron` or `.json`). Asset paths
/// resolve against the file's `directory` entry, itself relative to the
/// file's location.
pub fn load_scene(
    path: impl AsRef<Path>,
    device: &mut dyn GraphicsDevice,
    store: &mut EntityComponentStore,
    registry: &mut ResourceRegistry,
    aspect: f32,
) -> SceneResult<LoadedScene> {
    let path = path.as_ref();
    let format = SceneFormat::from_path(path)
        .ok_or_else(|| SceneError::Parse(format!("{} is neither .ron nor .json", path.display())))?;
    let contents = fs::read_to_string(path)?;
    let description = SceneDescription::parse(&contents, format)?;
    log::info!("Loading scene '{}' from {:?}", description.scene, path);

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    SceneLoader::new(device, store, registry, aspect).load(&description, base)
}

/// Builds one scene into a store and registry
pub struct SceneLoader<'a> {
    device: &'a mut dyn GraphicsDevice,
    store: &'a mut EntityComponentStore,
    registry: &'a mut ResourceRegistry,
    aspect: f32,
    directory: PathBuf,
    geometries: HashMap<String, usize>,
    shaders: HashMap<String, ProgramId>,
    textures: HashMap<String, usize>,
    materials: HashMap<String, usize>,
}

impl<'a> SceneLoader<'a> {
    /// Loader writing into `store` and `registry`; cameras use `aspect`
    pub fn new(
        device: &'a mut dyn GraphicsDevice,
        store: &'a mut EntityComponentStore,
        registry: &'a mut ResourceRegistry,
        aspect: f32,
    ) -> Self {
        Self {
            device,
            store,
            registry,
            aspect,
            directory: PathBuf::new(),
            geometries: HashMap::new(),
            shaders: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    /// Instantiate `description`, resolving its directory against `base`
    pub fn load(mut self, description: &SceneDescription, base: &Path) -> SceneResult<LoadedScene> {
        description.check_sections()?;
        self.directory = base.join(description.directory.as_deref().unwrap_or_default());

        let mut scene = LoadedScene { name: description.scene.clone(), ..LoadedScene::default() };

        for def in &description.geometries {
            self.load_geometry(def);
        }
        for def in description.shaders.iter().flatten() {
            self.load_shader(def)?;
        }
        for def in &description.cameras {
            scene.cameras.push(self.load_camera(def)?);
        }
        for def in description.textures.iter().flatten() {
            self.load_texture(def);
        }
        scene.environment = description.environment.as_ref().and_then(|def| self.resolve_environment(def));
        for def in description.materials.iter().flatten() {
            self.load_material(def)?;
        }
        for def in description.lights.iter().flatten() {
            scene.lights.push(self.load_light(def)?);
        }

        let mut parents = Vec::new();
        for def in description.entities.iter().flatten() {
            match self.load_entity(def)? {
                Some(entity) => {
                    scene.entities.push(entity);
                    if let Some(parent) = &def.transform.parent {
                        parents.push((entity, parent.as_str()));
                    }
                }
                None => scene.skipped += 1,
            }
        }

        for (child, parent_name) in parents {
            let parent = self
                .store
                .entity_id(parent_name)
                .map_err(|_| SceneError::MissingReference { kind: "entity", name: parent_name.to_owned() })?;
            self.store.set_parent(child, parent)?;
        }

        log::info!(
            "Scene '{}': {} entities ({} skipped), {} lights, {} cameras",
            scene.name,
            scene.entities.len(),
            scene.skipped,
            scene.lights.len(),
            scene.cameras.len()
        );
        Ok(scene)
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.directory.join(relative)
    }

    fn load_geometry(&mut self, def: &GeometryDef) {
        let result: RenderResult<usize> = match (&def.file, &def.shape) {
            (Some(file), _) => {
                let path = self.path(file);
                self.registry.create_geometry_from_file(self.device, path)
            }
            (None, Some(ShapeDef::Plane)) => self.registry.create_plane_geometry(self.device),
            (None, Some(ShapeDef::Sphere { rings, segments })) => {
                self.registry.create_geometry(self.device, &MeshData::sphere(*rings, *segments))
            }
            (None, Some(ShapeDef::Terrain { heightmap, resolution, step, max_height })) => {
                let path = self.path(heightmap);
                self.registry.create_terrain_geometry(self.device, path, *resolution, *step, *max_height)
            }
            (None, None) => {
                log::warn!("Geometry '{}' has neither a file nor a shape", def.name);
                return;
            }
        };

        match result {
            Ok(id) => {
                self.geometries.insert(def.name.clone(), id);
            }
            Err(e) => log::error!("Failed to load geometry '{}': {}", def.name, e),
        }
    }

    fn load_shader(&mut self, def: &ShaderDef) -> SceneResult<()> {
        let program = match (&def.builtin, &def.vertex, &def.fragment) {
            (Some(name), _, _) => {
                let which = BuiltinShader::from_name(name)
                    .ok_or_else(|| SceneError::MissingReference { kind: "builtin shader", name: name.clone() })?;
                self.registry.load_builtin_shader(self.device, which)?
            }
            (None, Some(vertex), Some(fragment)) => {
                let (vertex, fragment) = (self.path(vertex), self.path(fragment));
                self.registry.load_shader_from_files(self.device, vertex, fragment)?
            }
            _ => return Err(SceneError::Parse(format!("shader '{}' needs builtin or vertex and fragment", def.name))),
        };
        log::debug!("Shader '{}' is {:?}", def.name, program);
        self.shaders.insert(def.name.clone(), program);
        Ok(())
    }

    fn load_camera(&mut self, def: &CameraDef) -> SceneResult<EntityId> {
        let entity = self.store.create_entity(&def.name)?;
        let position = Vec3::from(def.position);
        self.store.get_mut::<Transform>(entity)?.set_position(position);

        let view = &mut self.store.create_component::<Camera>(entity)?.view;
        view.set_perspective(utils::deg_to_rad(def.fov), self.aspect, def.near, def.far);
        match def.target {
            Some(target) => view.look_at(position, Vec3::from(target)),
            None => {
                let forward = Vec3::from(def.direction);
                view.position = position;
                view.forward = forward;
                view.target = position + forward;
                view.update();
            }
        }

        if let Some(track_def) = &def.track {
            let mut knots: Vec<Vec3> = track_def.knots.iter().copied().map(Vec3::from).collect();
            if let (Some(&first), Some(&last)) = (knots.first(), knots.last()) {
                knots.insert(0, first);
                knots.push(last);
            }
            let track = self.store.create_component::<ViewTrack>(entity)?;
            track.speed = track_def.speed;
            track.curve = Curve::from_knots(knots);
        }

        Ok(entity)
    }

    fn load_texture(&mut self, def: &TextureDef) {
        let result = match (&def.files, &def.file) {
            (Some(faces), _) => {
                let paths = faces.clone().map(|face| self.path(&face));
                self.registry.create_cubemap_from_files(self.device, &paths)
            }
            (None, Some(file)) => {
                let path = self.path(file);
                self.registry.create_texture_from_file(self.device, path)
            }
            (None, None) => {
                log::warn!("Texture '{}' has neither file nor files", def.name);
                return;
            }
        };

        match result {
            Ok(id) => {
                self.textures.insert(def.name.clone(), id);
            }
            Err(e) => log::error!("Failed to load texture '{}': {}", def.name, e),
        }
    }

    fn resolve_environment(&self, def: &EnvironmentDef) -> Option<Environment> {
        let shader = self.shaders.get(&def.shader);
        let cube_map = self.textures.get(&def.texture);
        let geometry = self.geometries.get(&def.geometry);
        if shader.is_none() || cube_map.is_none() || geometry.is_none() {
            log::warn!(
                "Environment references unknown resources (shader '{}', texture '{}', geometry '{}'), no skybox",
                def.shader,
                def.texture,
                def.geometry
            );
            return None;
        }
        Some(Environment { shader: shader.copied(), cube_map: cube_map.copied(), geometry: geometry.copied() })
    }

    fn texture_ref(&self, material: &str, name: Option<&String>) -> Option<usize> {
        let name = name?;
        let id = self.textures.get(name).copied();
        if id.is_none() {
            log::warn!("Material '{}' references unknown texture '{}'", material, name);
        }
        id
    }

    fn load_material(&mut self, def: &MaterialDef) -> SceneResult<()> {
        let shader = *self
            .shaders
            .get(&def.shader)
            .ok_or_else(|| SceneError::MissingReference { kind: "shader", name: def.shader.clone() })?;

        let mut material = Material::new(shader);
        material.diffuse = Vec3::from(def.diffuse);
        material.specular = Vec3::from(def.specular);
        material.ambient = Vec3::from(def.ambient);
        material.specular_gloss = def.specular_gloss;
        material.uv_scale = Vec2::from(def.uv_scale);
        material.diffuse_maps[0] = self.texture_ref(&def.name, def.diffuse_map.as_ref());
        material.normal_map = self.texture_ref(&def.name, def.normal_map.as_ref());
        material.specular_map = self.texture_ref(&def.name, def.specular_map.as_ref());
        material.cube_map = self.texture_ref(&def.name, def.cube_map.as_ref());

        let id = self.registry.create_material(material)?;
        self.materials.insert(def.name.clone(), id);
        Ok(())
    }

    fn load_light(&mut self, def: &LightDef) -> SceneResult<EntityId> {
        let entity = self.store.create_entity(&def.name)?;
        if let Some(position) = def.position {
            self.store.get_mut::<Transform>(entity)?.set_position(Vec3::from(position));
        }

        let light = self.store.create_component::<Light>(entity)?;
        light.light_type = def.light_type;
        if let Some(color) = def.color {
            light.color = Vec3::from(color);
        }
        if let Some(direction) = def.direction {
            light.direction = Vec3::from(direction);
        }
        light.linear_att = def.linear_att.unwrap_or(light.linear_att);
        light.quadratic_att = def.quadratic_att.unwrap_or(light.quadratic_att);
        light.spot_inner = def.spot_inner.unwrap_or(light.spot_inner);
        light.spot_outer = def.spot_outer.unwrap_or(light.spot_outer);
        light.cast_shadow = def.cast_shadow.unwrap_or(light.cast_shadow);
        light.resolution = def.resolution.unwrap_or(light.resolution);
        light.update_radius();

        log::debug!("Light '{}' ({:?}) radius {:.1}", def.name, light.light_type, light.radius);
        Ok(entity)
    }

    fn load_entity(&mut self, def: &EntityDef) -> SceneResult<Option<EntityId>> {
        let Some(&geometry) = self.geometries.get(&def.geometry) else {
            log::warn!("Skipping entity '{}': unknown geometry '{}'", def.name, def.geometry);
            return Ok(None);
        };
        let Some(&material) = self.materials.get(&def.material) else {
            log::warn!("Skipping entity '{}': unknown material '{}'", def.name, def.material);
            return Ok(None);
        };

        let entity = self.store.create_entity(&def.name)?;
        let transform = &def.transform;
        self.store.get_mut::<Transform>(entity)?.local = compose_trs(
            &Vec3::from(transform.translate),
            &Vec3::from(transform.rotate),
            &Vec3::from(transform.scale),
        );

        let mesh = self.store.create_component::<Mesh>(entity)?;
        mesh.geometry = geometry;
        mesh.material = material;
        mesh.render_mode = def.render_mode;

        if let Some(collider_def) = &def.collider {
            let collider = self.store.create_component::<Collider>(entity)?;
            collider.collider_type = collider_def.collider_type;
            collider.local_center = Vec3::from(collider_def.center);
            collider.local_halfwidth = Vec3::from(collider_def.halfwidth);
        }

        Ok(Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{ColliderType, LightType, RenderMode};
    use crate::render::headless::HeadlessDevice;
    use approx::assert_relative_eq;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deferred_engine_scene_{}_{}", name, std::process::id()));
        fs::create_dir_all(dir.join("data")).unwrap();
        dir
    }

    fn write_png(path: &Path) {
        image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 120, 40, 255])).save(path).unwrap();
    }

    const LEVEL: &str = r#"{
        "scene": "courtyard",
        "directory": "data/",
        "geometries": [
            { "name": "plane", "shape": "plane" },
            { "name": "ball", "shape": { "sphere": { "rings": 6, "segments": 8 } } }
        ],
        "shaders": [{ "name": "phong", "builtin": "forward_phong" }],
        "cameras": [{
            "name": "cam",
            "position": [0, 2, 10],
            "target": [0, 0, 0],
            "fov": 45, "near": 0.1, "far": 200,
            "track": { "speed": 0.1, "knots": [[0, 2, 10], [10, 2, 0], [0, 2, -10]] }
        }],
        "textures": [{ "name": "bricks", "file": "bricks.png" }],
        "materials": [
            { "name": "brick", "shader": "phong", "diffuse_map": "bricks", "specular": [0.5, 0.5, 0.5] },
            { "name": "plain", "shader": "phong", "normal_map": "missing" }
        ],
        "lights": [
            { "name": "sun", "type": "directional", "direction": [0, -1, 0], "cast_shadow": true },
            { "name": "lamp", "type": "point", "position": [1, 3, 0], "color": [1, 0.5, 0.5],
              "linear_att": 0.0, "quadratic_att": 0.0 }
        ],
        "entities": [
            { "name": "floor", "geometry": "plane", "material": "brick",
              "transform": { "translate": [0, -1, 0], "rotate": [-90, 0, 0], "scale": [10, 10, 1] } },
            { "name": "ball", "geometry": "ball", "material": "plain", "render_mode": "forward",
              "transform": { "translate": [0, 2, 0], "parent": "floor" },
              "collider": { "type": "Box", "center": [0, 0, 0], "halfwidth": [1, 1, 1] } },
            { "name": "ghost", "geometry": "teapot", "material": "brick" }
        ]
    }"#;

    fn load_level(name: &str, contents: &str) -> (SceneResult<LoadedScene>, EntityComponentStore, ResourceRegistry) {
        let dir = temp_dir(name);
        write_png(&dir.join("data/bricks.png"));
        let path = dir.join("level.json");
        fs::write(&path, contents).unwrap();

        let mut device = HeadlessDevice::new();
        let mut store = EntityComponentStore::new();
        let mut registry = ResourceRegistry::new();
        let result = load_scene(&path, &mut device, &mut store, &mut registry, 16.0 / 9.0);
        (result, store, registry)
    }

    #[test]
    fn test_level_populates_store_and_registry() {
        let (result, store, registry) = load_level("full", LEVEL);
        let scene = result.unwrap();

        assert_eq!(scene.name, "courtyard");
        assert_eq!(scene.entities.len(), 2);
        assert_eq!(scene.skipped, 1);
        assert_eq!(scene.lights.len(), 2);
        assert!(store.entity_id("ghost").is_err());

        let floor = store.get_by_name::<Mesh>("floor").unwrap();
        let brick = registry.material(floor.material).unwrap();
        assert_eq!(brick.diffuse_maps[0], Some(0));
        assert_eq!(brick.specular, Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(brick.ambient, Vec3::new(0.1, 0.1, 0.1));

        let ball = store.get_by_name::<Mesh>("ball").unwrap();
        assert_eq!(ball.render_mode, RenderMode::Forward);
        assert_eq!(registry.material(ball.material).unwrap().normal_map, None);

        let collider = store.get_by_name::<Collider>("ball").unwrap();
        assert_eq!(collider.collider_type, ColliderType::Box);
        assert_eq!(collider.local_halfwidth, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_parent_links_resolve_after_all_entities() {
        let (result, store, _) = load_level("parent", LEVEL);
        result.unwrap();

        let ball = store.entity_id("ball").unwrap();
        let world = store.world_matrix(ball).unwrap();
        // the parent's scale and -90 degree pitch carry the +Y offset onto -Z
        let origin = world.transform_point(&crate::foundation::math::Point3::origin());
        assert_relative_eq!(origin.coords, Vec3::new(0.0, -1.0, -20.0), epsilon = 1e-4);
    }

    #[test]
    fn test_cameras_and_lights() {
        let (result, store, _) = load_level("camera", LEVEL);
        let scene = result.unwrap();

        let camera = store.get::<Camera>(scene.cameras[0]).unwrap();
        assert_eq!(camera.view.position, Vec3::new(0.0, 2.0, 10.0));
        assert_relative_eq!(camera.view.fov, utils::deg_to_rad(45.0));
        assert_relative_eq!(camera.view.forward, Vec3::new(0.0, -2.0, -10.0).normalize(), epsilon = 1e-6);

        let track = store.get::<ViewTrack>(scene.cameras[0]).unwrap();
        let knots = track.curve.knots();
        assert_eq!(knots.len(), 5);
        assert_eq!(knots[0], knots[1]);
        assert_eq!(knots[3], knots[4]);
        assert_relative_eq!(track.speed, 0.1);

        let sun = store.get_by_name::<Light>("sun").unwrap();
        assert_eq!(sun.light_type, LightType::Directional);
        assert!(sun.cast_shadow);

        let lamp = store.get_by_name::<Light>("lamp").unwrap();
        assert_eq!(lamp.light_type, LightType::Point);
        assert_relative_eq!(lamp.radius, 1000.0);
        let lamp_entity = store.entity_id("lamp").unwrap();
        assert_eq!(store.get::<Transform>(lamp_entity).unwrap().position(), Vec3::new(1.0, 3.0, 0.0));
    }

    #[test]
    fn test_unknown_parent_is_error() {
        let level = LEVEL.replace(r#""parent": "floor""#, r#""parent": "nowhere""#);
        let (result, _, _) = load_level("bad_parent", &level);
        assert!(matches!(result, Err(SceneError::MissingReference { kind: "entity", .. })));
    }

    #[test]
    fn test_material_with_unknown_shader_is_error() {
        let level = LEVEL.replace(r#""name": "plain", "shader": "phong""#, r#""name": "plain", "shader": "toon""#);
        let (result, _, _) = load_level("bad_shader", &level);
        assert!(matches!(result, Err(SceneError::MissingReference { kind: "shader", .. })));
    }

    #[test]
    fn test_missing_section_aborts() {
        let level = LEVEL.replace(r#""lights""#, r#""lamps""#);
        let (result, store, _) = load_level("no_lights", &level);
        assert!(matches!(result, Err(SceneError::MissingSection("lights"))));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn test_ron_environment_and_unreadable_texture() {
        let dir = temp_dir("ron");
        let faces = ["px", "nx", "py", "ny", "pz", "nz"];
        for face in faces {
            write_png(&dir.join(format!("data/{face}.png")));
        }
        let text = r#"(
            scene: "sky",
            directory: "data",
            geometries: [(name: "dome", shape: sphere(rings: 8, segments: 8))],
            shaders: [(name: "sky", builtin: "environment")],
            textures: [
                (name: "cube", files: ("px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png")),
                (name: "broken", file: "absent.png"),
            ],
            environment: (texture: "cube", geometry: "dome", shader: "sky"),
            materials: [],
            lights: [],
            entities: [],
        )"#;
        let description = SceneDescription::parse(text, SceneFormat::Ron).unwrap();

        let mut device = HeadlessDevice::new();
        let mut store = EntityComponentStore::new();
        let mut registry = ResourceRegistry::new();
        let scene = SceneLoader::new(&mut device, &mut store, &mut registry, 1.0).load(&description, &dir).unwrap();

        let environment = scene.environment.unwrap();
        assert_eq!(environment.cube_map, Some(0));
        assert_eq!(environment.geometry, Some(0));
        assert!(registry.shader(environment.shader.unwrap()).is_some());
        assert_eq!(registry.textures().len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let mut device = HeadlessDevice::new();
        let mut store = EntityComponentStore::new();
        let mut registry = ResourceRegistry::new();
        let result = load_scene("level.xml", &mut device, &mut store, &mut registry, 1.0);
        assert!(matches!(result, Err(SceneError::Parse(_))));
    }
}
