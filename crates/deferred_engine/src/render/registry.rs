//! Resource registry
//!
//! Single owner of every GPU resource a scene references. Components and
//! materials hold plain integer ids into the registry's arrays; shaders are
//! keyed by their program id. Nothing is freed before [`ResourceRegistry::release_all`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use super::device::{GraphicsDevice, GpuResource, ProgramId};
use super::geometry::{Geometry, MaterialSet, MeshData};
use super::material::Material;
use super::shader::{BuiltinShader, Shader};
use super::texture::{Heightmap, ImageData, Texture};
use super::{RenderError, RenderResult};
use crate::config::extension_of;
use crate::ecs::components::Mesh;
use crate::ecs::{Component, EntityComponentStore};
use crate::foundation::math::Vec3;

/// Owns geometries, materials, shaders and textures
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
    shaders: BTreeMap<ProgramId, Shader>,
    textures: Vec<Texture>,
    texture_paths: HashMap<PathBuf, usize>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // --- Geometry ---

    /// Upload `mesh` as a new geometry
    pub fn create_geometry(&mut self, device: &mut dyn GraphicsDevice, mesh: &MeshData) -> RenderResult<usize> {
        let geometry = Geometry::upload(device, mesh)?;
        Ok(self.push_geometry(geometry))
    }

    fn push_geometry(&mut self, geometry: Geometry) -> usize {
        self.geometries.push(geometry);
        self.geometries.len() - 1
    }

    /// Unit plane in the XY plane
    pub fn create_plane_geometry(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<usize> {
        self.create_geometry(device, &MeshData::plane())
    }

    /// Terrain grid displaced by a heightmap image
    pub fn create_terrain_geometry(
        &mut self,
        device: &mut dyn GraphicsDevice,
        heightmap: impl AsRef<Path>,
        resolution: u32,
        step: f32,
        max_height: f32,
    ) -> RenderResult<usize> {
        let map = Heightmap::from_file(heightmap)?;
        let mesh = MeshData::terrain(resolution, step, max_height, &map.heights, map.width, map.height);
        log::info!("Built terrain {}x{} ({} triangles)", resolution, resolution, mesh.triangle_count());
        self.create_geometry(device, &mesh)
    }

    /// Load every shape of an OBJ file into one geometry
    pub fn create_geometry_from_file(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> RenderResult<usize> {
        let path = path.as_ref();
        let (models, _) = load_obj(path)?;

        let mut mesh = MeshData::default();
        for model in &models {
            append_model(&mut mesh, &model.mesh);
        }
        log::info!("Loaded {:?}: {} vertices, {} triangles", path, mesh.positions.len(), mesh.triangle_count());
        self.create_geometry(device, &mesh)
    }

    /// Load an OBJ file with its MTL library as one multi-material geometry
    ///
    /// One material per MTL entry is created, drawn with `shader`. Shapes
    /// are grouped by material and each group becomes a material set.
    pub fn create_multi_geometry_from_file(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
        shader: ProgramId,
    ) -> RenderResult<usize> {
        let path = path.as_ref();
        self.require_shader(shader)?;
        let (mut models, obj_materials) = load_obj(path)?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));

        let first_material = self.materials.len();
        for obj_material in &obj_materials {
            let material = self.material_from_mtl(device, obj_material, shader, directory);
            self.materials.push(material);
        }
        if obj_materials.is_empty() {
            log::warn!("{:?} has no material library, using defaults", path);
            self.materials.push(Material::new(shader));
        }
        let material_count = self.materials.len() - first_material;

        models.sort_by_key(|m| m.mesh.material_id.unwrap_or(0));

        let mut mesh = MeshData::default();
        let mut sets: Vec<MaterialSet> = Vec::new();
        for model in &models {
            append_model(&mut mesh, &model.mesh);
            let local = model.mesh.material_id.unwrap_or(0).min(material_count - 1);
            let material = first_material + local;
            match sets.last_mut() {
                Some(set) if set.material == material => set.end_triangle = mesh.triangle_count(),
                _ => sets.push(MaterialSet { end_triangle: mesh.triangle_count(), material }),
            }
        }

        log::info!("Loaded {:?} with {} material sets", path, sets.len());
        let geometry = Geometry::upload_with_sets(device, &mesh, sets)?;
        Ok(self.push_geometry(geometry))
    }

    fn material_from_mtl(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: &tobj::Material,
        shader: ProgramId,
        directory: &Path,
    ) -> Material {
        let mut material = Material::new(shader);
        if let Some(ambient) = source.ambient {
            material.ambient = Vec3::from(ambient);
        }
        if let Some(diffuse) = source.diffuse {
            material.diffuse = Vec3::from(diffuse);
        }
        if let Some(specular) = source.specular {
            material.specular = Vec3::from(specular);
        }
        if let Some(shininess) = source.shininess {
            material.specular_gloss = shininess;
        }

        let mut load = |file: &Option<String>| -> Option<usize> {
            let file = file.as_ref()?;
            match self.create_texture_from_file(device, directory.join(file)) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("Material '{}': skipping texture {}: {}", source.name, file, e);
                    None
                }
            }
        };
        material.diffuse_maps[0] = load(&source.diffuse_texture);
        material.normal_map = load(&source.normal_texture);
        material.specular_map = load(&source.specular_texture);
        material
    }

    // --- Materials ---

    /// Register a material after checking every id it references
    pub fn create_material(&mut self, material: Material) -> RenderResult<usize> {
        self.require_shader(material.shader)?;
        if let Some(bad) = material.texture_ids().find(|id| *id >= self.textures.len()) {
            return Err(RenderError::InvalidResource { kind: "texture", id: bad });
        }
        self.materials.push(material);
        Ok(self.materials.len() - 1)
    }

    fn require_shader(&self, shader: ProgramId) -> RenderResult<()> {
        if self.shaders.contains_key(&shader) {
            Ok(())
        } else {
            Err(RenderError::InvalidResource { kind: "shader", id: shader.0 as usize })
        }
    }

    // --- Textures ---

    /// Decode and upload an image, reusing earlier loads of the same path
    pub fn create_texture_from_file(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl AsRef<Path>,
    ) -> RenderResult<usize> {
        let path = path.as_ref();
        if let Some(id) = self.texture_paths.get(path) {
            return Ok(*id);
        }

        let image = ImageData::from_file(path)?;
        let id = self.add_texture(Texture::from_image(device, &image)?);
        self.texture_paths.insert(path.to_path_buf(), id);
        Ok(id)
    }

    /// Upload a cubemap from six files ordered +X, -X, +Y, -Y, +Z, -Z
    pub fn create_cubemap_from_files(
        &mut self,
        device: &mut dyn GraphicsDevice,
        paths: &[PathBuf; 6],
    ) -> RenderResult<usize> {
        let faces = [
            ImageData::from_file(&paths[0])?,
            ImageData::from_file(&paths[1])?,
            ImageData::from_file(&paths[2])?,
            ImageData::from_file(&paths[3])?,
            ImageData::from_file(&paths[4])?,
            ImageData::from_file(&paths[5])?,
        ];
        let texture = Texture::cubemap(device, faces)?;
        log::info!("Loaded cubemap {}x{} from {:?}", texture.size().0, texture.size().1, paths[0].parent());
        Ok(self.add_texture(texture))
    }

    /// Register an uploaded texture
    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    // --- Shaders ---

    /// Compile a program from GLSL source strings
    pub fn load_shader_from_strings(
        &mut self,
        device: &mut dyn GraphicsDevice,
        vertex_source: &str,
        fragment_source: &str,
    ) -> RenderResult<ProgramId> {
        let shader = Shader::new(device, vertex_source, fragment_source)?;
        Ok(self.add_shader(shader))
    }

    /// Compile a program from GLSL files
    pub fn load_shader_from_files(
        &mut self,
        device: &mut dyn GraphicsDevice,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> RenderResult<ProgramId> {
        let read = |path: &Path| {
            fs::read_to_string(path)
                .map_err(|e| RenderError::LoadFailed { path: path.display().to_string(), reason: e.to_string() })
        };
        let vertex = read(vertex_path.as_ref())?;
        let fragment = read(fragment_path.as_ref())?;
        let program = self.load_shader_from_strings(device, &vertex, &fragment)?;
        log::info!("Loaded shader {:?} from {:?}", program, vertex_path.as_ref());
        Ok(program)
    }

    /// Compile one of the embedded programs
    pub fn load_builtin_shader(
        &mut self,
        device: &mut dyn GraphicsDevice,
        which: BuiltinShader,
    ) -> RenderResult<ProgramId> {
        let shader = Shader::builtin(device, which)?;
        Ok(self.add_shader(shader))
    }

    fn add_shader(&mut self, shader: Shader) -> ProgramId {
        let program = shader.program();
        self.shaders.insert(program, shader);
        program
    }

    // --- Lookup ---

    /// Geometry by id
    pub fn geometry(&self, id: usize) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    /// Material by id
    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Material by id, mutable
    pub fn material_mut(&mut self, id: usize) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Shader by program id
    pub fn shader(&self, program: ProgramId) -> Option<&Shader> {
        self.shaders.get(&program)
    }

    /// Shader by program id, mutable
    pub fn shader_mut(&mut self, program: ProgramId) -> Option<&mut Shader> {
        self.shaders.get_mut(&program)
    }

    /// Texture by id
    pub fn texture(&self, id: usize) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// All geometries
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    /// All materials
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// All textures
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Every shader, ordered by program id
    pub fn shaders_mut(&mut self) -> impl Iterator<Item = &mut Shader> {
        self.shaders.values_mut()
    }

    // --- Ordering ---

    /// Group materials by shader, then meshes by material
    ///
    /// Materials are stable-sorted by program id and every reference to a
    /// material (mesh components and geometry material sets) is rewritten
    /// through the old-to-new map. The mesh array is then stable-sorted by
    /// material, which also updates each owner's index table.
    pub fn sort_meshes(&mut self, store: &mut EntityComponentStore) {
        let mut order: Vec<usize> = (0..self.materials.len()).collect();
        order.sort_by_key(|&old| self.materials[old].shader);

        let mut remap = vec![0; order.len()];
        for (new_index, &old_index) in order.iter().enumerate() {
            remap[old_index] = new_index;
        }

        let mut previous: Vec<Option<Material>> = std::mem::take(&mut self.materials).into_iter().map(Some).collect();
        self.materials = order.iter().filter_map(|&old| previous[old].take()).collect();

        for mesh in store.all_mut::<Mesh>() {
            match remap.get(mesh.material) {
                Some(&new_index) => mesh.material = new_index,
                None => log::warn!("Mesh of entity {} references unknown material {}", mesh.owner(), mesh.material),
            }
        }
        for geometry in &mut self.geometries {
            for set in geometry.material_sets_mut() {
                if let Some(&new_index) = remap.get(set.material) {
                    set.material = new_index;
                }
            }
        }

        store.sort_components_by_key::<Mesh, _, _>(|mesh| mesh.material);
        log::debug!("Sorted {} materials and {} meshes", self.materials.len(), store.count::<Mesh>());
    }

    /// Free every GPU object and empty the registry
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        for geometry in self.geometries.drain(..) {
            device.release(GpuResource::VertexArray(geometry.vertex_array()));
        }
        for texture in self.textures.drain(..) {
            device.release(GpuResource::Texture(texture.id()));
        }
        for shader in std::mem::take(&mut self.shaders).into_values() {
            shader.release(device);
        }
        self.materials.clear();
        self.texture_paths.clear();
        log::debug!("Released all registry resources");
    }
}

fn load_obj(path: &Path) -> RenderResult<(Vec<tobj::Model>, Vec<tobj::Material>)> {
    match extension_of(path).as_deref() {
        Some("obj") => {}
        other => {
            return Err(RenderError::UnsupportedFormat(format!(
                "{} (extension {:?}, expected obj)",
                path.display(),
                other.unwrap_or("")
            )))
        }
    }

    let options = tobj::LoadOptions { triangulate: true, single_index: true, ..Default::default() };
    let (models, materials) = tobj::load_obj(path, &options)
        .map_err(|e| RenderError::LoadFailed { path: path.display().to_string(), reason: e.to_string() })?;

    let materials = materials.unwrap_or_else(|e| {
        log::debug!("No material library for {:?}: {}", path, e);
        Vec::new()
    });
    Ok((models, materials))
}

fn append_model(target: &mut MeshData, source: &tobj::Mesh) {
    let base = target.positions.len() as u32;
    let vertex_count = source.positions.len() / 3;

    target.positions.extend(source.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]));
    if source.normals.len() == vertex_count * 3 {
        target.normals.extend(source.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
    } else {
        target.normals.extend(std::iter::repeat([0.0, 1.0, 0.0]).take(vertex_count));
    }
    if source.texcoords.len() == vertex_count * 2 {
        target.uvs.extend(source.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]));
    } else {
        target.uvs.extend(std::iter::repeat([0.0, 0.0]).take(vertex_count));
    }
    target.indices.extend(source.indices.iter().map(|i| base + i));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::RenderMode;
    use crate::render::headless::HeadlessDevice;
    use std::io::Write;

    const CUBE_OBJ: &str = "\
mtllib cube.mtl
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
o front
usemtl red
f 5 6 7
f 5 7 8
o back
usemtl blue
f 1 3 2
f 1 4 3
o top
usemtl red
f 4 8 7
";

    const CUBE_MTL: &str = "\
newmtl red
Kd 1 0 0
Ns 20
newmtl blue
Kd 0 0 1
";

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deferred_engine_registry_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(path: &Path, contents: &str) {
        fs::File::create(path).unwrap().write_all(contents.as_bytes()).unwrap();
    }

    fn registry_with_shaders(device: &mut HeadlessDevice, count: usize) -> (ResourceRegistry, Vec<ProgramId>) {
        let mut registry = ResourceRegistry::new();
        let shaders = (0..count)
            .map(|_| registry.load_builtin_shader(device, BuiltinShader::ForwardPhong).unwrap())
            .collect();
        (registry, shaders)
    }

    #[test]
    fn test_obj_single_geometry() {
        let dir = temp_dir("single");
        let obj = dir.join("CUBE.OBJ");
        write(&obj, CUBE_OBJ);

        let mut device = HeadlessDevice::new();
        let mut registry = ResourceRegistry::new();
        let id = registry.create_geometry_from_file(&mut device, &obj).unwrap();
        let geometry = registry.geometry(id).unwrap();
        assert_eq!(geometry.num_tris(), 5);
        assert!(geometry.material_sets().is_empty());
        assert_eq!(geometry.aabb().half_width, Vec3::repeat(1.0));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_obj_multi_material_sets() {
        let dir = temp_dir("multi");
        let obj = dir.join("cube.obj");
        write(&obj, CUBE_OBJ);
        write(&dir.join("cube.mtl"), CUBE_MTL);

        let mut device = HeadlessDevice::new();
        let (mut registry, shaders) = registry_with_shaders(&mut device, 1);
        let id = registry.create_multi_geometry_from_file(&mut device, &obj, shaders[0]).unwrap();

        assert_eq!(registry.materials().len(), 2);
        assert_eq!(registry.materials()[0].diffuse, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(registry.materials()[0].specular_gloss, 20.0);

        let sets = registry.geometry(id).unwrap().material_sets().to_vec();
        assert_eq!(
            sets,
            vec![MaterialSet { end_triangle: 3, material: 0 }, MaterialSet { end_triangle: 5, material: 1 }]
        );
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_unsupported_extension() {
        let mut device = HeadlessDevice::new();
        let mut registry = ResourceRegistry::new();
        let err = registry.create_geometry_from_file(&mut device, "model.fbx").unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat(_)), "{err}");
    }

    #[test]
    fn test_material_validation() {
        let mut device = HeadlessDevice::new();
        let (mut registry, shaders) = registry_with_shaders(&mut device, 1);
        assert!(registry.create_material(Material::new(shaders[0])).is_ok());
        assert!(matches!(
            registry.create_material(Material::new(ProgramId(999))),
            Err(RenderError::InvalidResource { kind: "shader", .. })
        ));

        let mut textured = Material::new(shaders[0]);
        textured.normal_map = Some(4);
        assert!(matches!(
            registry.create_material(textured),
            Err(RenderError::InvalidResource { kind: "texture", id: 4 })
        ));
    }

    fn sorted_scene() -> (EntityComponentStore, ResourceRegistry, Vec<ProgramId>) {
        let mut device = HeadlessDevice::new();
        let (mut registry, shaders) = registry_with_shaders(&mut device, 2);
        // Materials alternate between the two shaders.
        for i in 0..4 {
            registry.create_material(Material::new(shaders[(i + 1) % 2])).unwrap();
        }

        let mut store = EntityComponentStore::new();
        for (i, material) in [3usize, 0, 2, 1, 0].iter().enumerate() {
            let e = store.create_entity(&format!("mesh_{i}")).unwrap();
            let mesh = store.create_component::<Mesh>(e).unwrap();
            mesh.material = *material;
            mesh.geometry = i;
            mesh.render_mode = RenderMode::Forward;
        }
        (store, registry, shaders)
    }

    #[test]
    fn test_sort_groups_materials_by_shader_and_meshes_by_material() {
        let (mut store, mut registry, shaders) = sorted_scene();
        registry.sort_meshes(&mut store);
        store.check_consistency().unwrap();

        let programs: Vec<ProgramId> = registry.materials().iter().map(|m| m.shader).collect();
        assert_eq!(programs, vec![shaders[0], shaders[0], shaders[1], shaders[1]]);

        let materials: Vec<usize> = store.all::<Mesh>().iter().map(|m| m.material).collect();
        assert!(materials.windows(2).all(|w| w[0] <= w[1]), "{materials:?}");

        // Each entity still sees its own mesh, now pointing at the moved material.
        for i in 0..5 {
            let e = store.entity_id(&format!("mesh_{i}")).unwrap();
            let mesh = store.get::<Mesh>(e).unwrap();
            assert_eq!(mesh.geometry, i);
            let original = [3usize, 0, 2, 1, 0][i];
            let expected_shader = shaders[(original + 1) % 2];
            assert_eq!(registry.material(mesh.material).unwrap().shader, expected_shader);
        }
    }

    #[test]
    fn test_sort_is_idempotent() {
        let (mut store, mut registry, _) = sorted_scene();
        registry.sort_meshes(&mut store);
        let once_materials = registry.materials().to_vec();
        let once_meshes: Vec<Mesh> = store.all::<Mesh>().to_vec();
        let once_slots: Vec<usize> = (0..5).map(|e| store.component_index::<Mesh>(e).unwrap()).collect();

        registry.sort_meshes(&mut store);
        assert_eq!(registry.materials(), once_materials.as_slice());
        assert_eq!(store.all::<Mesh>(), once_meshes.as_slice());
        let twice_slots: Vec<usize> = (0..5).map(|e| store.component_index::<Mesh>(e).unwrap()).collect();
        assert_eq!(once_slots, twice_slots);
    }

    #[test]
    fn test_release_all_frees_everything() {
        let mut device = HeadlessDevice::new();
        let (mut registry, _) = registry_with_shaders(&mut device, 2);
        registry.create_plane_geometry(&mut device).unwrap();
        registry.add_texture(Texture::from_image(&mut device, &ImageData::solid_color(1, 1, [0; 4])).unwrap());
        assert_eq!(device.live_resource_count(), 4);

        registry.release_all(&mut device);
        assert_eq!(device.live_resource_count(), 0);
        assert!(registry.geometries().is_empty());
    }
}
