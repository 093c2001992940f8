//! Geometry resources
//!
//! CPU-side mesh data, bounding boxes, and the GPU geometry record the
//! registry owns. A geometry can be split into material sets: contiguous
//! triangle ranges, each drawn with its own material.

use super::device::{GraphicsDevice, VertexArrayId};
use super::RenderResult;
use crate::foundation::math::{constants::PI, Vec3};

/// Sentinel used to seed min/max folds
const AABB_SEED: f32 = 1_000_000.0;

/// Vertex attributes and triangle indices ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates, one per vertex
    pub uvs: Vec<[f32; 2]>,
    /// Vertex normals, one per vertex
    pub normals: Vec<[f32; 3]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of triangles
    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }

    /// Bounding box of the positions
    pub fn aabb(&self) -> Aabb {
        Aabb::from_positions(&self.positions)
    }

    /// Two-triangle square from (-1,-1) to (1,1) in the XY plane, facing +Z
    ///
    /// Doubles as the full-screen quad when drawn with an identity MVP.
    pub fn plane() -> Self {
        Self {
            positions: vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Unit UV sphere centred on the origin
    pub fn sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut mesh = Self::default();

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let phi = v * PI;
            for segment in 0..=segments {
                let u = segment as f32 / segments as f32;
                let theta = u * 2.0 * PI;
                let p = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
                mesh.positions.push(p);
                mesh.normals.push(p);
                mesh.uvs.push([u, v]);
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        mesh
    }

    /// Closed cone with its apex at the origin and a unit-radius base at y = 1
    pub fn cone(segments: u32) -> Self {
        let segments = segments.max(3);
        let mut mesh = Self::default();

        mesh.positions.push([0.0, 0.0, 0.0]);
        mesh.normals.push([0.0, -1.0, 0.0]);
        mesh.uvs.push([0.5, 0.0]);
        mesh.positions.push([0.0, 1.0, 0.0]);
        mesh.normals.push([0.0, 1.0, 0.0]);
        mesh.uvs.push([0.5, 1.0]);

        for segment in 0..segments {
            let theta = segment as f32 / segments as f32 * 2.0 * PI;
            let (x, z) = (theta.cos(), theta.sin());
            let normal = Vec3::new(x, -1.0, z).normalize();
            mesh.positions.push([x, 1.0, z]);
            mesh.normals.push([normal.x, normal.y, normal.z]);
            mesh.uvs.push([segment as f32 / segments as f32, 1.0]);
        }

        for segment in 0..segments {
            let current = 2 + segment;
            let next = 2 + (segment + 1) % segments;
            mesh.indices.extend_from_slice(&[0, next, current]);
            mesh.indices.extend_from_slice(&[1, current, next]);
        }
        mesh
    }

    /// Height-field grid of `resolution`² vertices centred on the origin
    ///
    /// `heights` is a row-major single-channel image of `width` x `height`
    /// texels; vertex heights are `texel / 255 * max_height`.
    pub fn terrain(
        resolution: u32,
        step: f32,
        max_height: f32,
        heights: &[u8],
        width: u32,
        height: u32,
    ) -> Self {
        let n = resolution.max(2);
        let half_width = n as f32 * step / 2.0;
        let texel = |x: i64, y: i64| -> f32 {
            let x = x.clamp(0, i64::from(width) - 1) as usize;
            let y = y.clamp(0, i64::from(height) - 1) as usize;
            heights.get(y * width as usize + x).copied().map_or(0.0, f32::from)
        };

        let mut mesh = Self::default();
        for vx in 0..n {
            for vz in 0..n {
                let px = i64::from(vx) * i64::from(width) / i64::from(n);
                let py = i64::from(vz) * i64::from(height) / i64::from(n);

                mesh.positions.push([
                    vx as f32 * step - half_width,
                    texel(px, py) / 255.0 * max_height,
                    -(vz as f32) * step + half_width,
                ]);

                let normal = Vec3::new(
                    texel(px - 1, py) - texel(px + 1, py),
                    2.0,
                    texel(px, py + 1) - texel(px, py - 1),
                )
                .normalize();
                mesh.normals.push([normal.x, normal.y, normal.z]);
                mesh.uvs.push([vx as f32 / (n - 1) as f32, vz as f32 / (n - 1) as f32]);
            }
        }

        // B---D
        // | \ |
        // A---C
        for jx in 0..n - 1 {
            for iz in 0..n - 1 {
                let a = iz + jx * n;
                let b = a + 1;
                let c = iz + (jx + 1) * n;
                let d = c + 1;
                mesh.indices.extend_from_slice(&[a, c, b, c, d, b]);
            }
        }
        mesh
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    /// Box centre
    pub center: Vec3,
    /// Half extents
    pub half_width: Vec3,
}

impl Aabb {
    /// Tightest box around `positions`
    ///
    /// An empty slice yields a degenerate box at the origin.
    pub fn from_positions(positions: &[[f32; 3]]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }

        let mut min = Vec3::repeat(AABB_SEED);
        let mut max = Vec3::repeat(-AABB_SEED);
        for p in positions {
            let p = Vec3::from(*p);
            min = min.inf(&p);
            max = max.sup(&p);
        }

        let center = (min + max) / 2.0;
        Self { center, half_width: max - center }
    }

    /// The eight corners, ordered by sign of (x, y, z): ---, --+, -+-, -++, +--, +-+, ++-, +++
    pub fn corners(&self) -> [Vec3; 8] {
        let c = self.center;
        let h = self.half_width;
        let mut corners = [Vec3::zeros(); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sx = if i & 0b100 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 0b010 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 0b001 == 0 { -1.0 } else { 1.0 };
            *corner = Vec3::new(c.x + sx * h.x, c.y + sy * h.y, c.z + sz * h.z);
        }
        corners
    }
}

/// End of one material range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialSet {
    /// Cumulative triangle count at the end of this range
    pub end_triangle: u32,
    /// Material used for the range
    pub material: usize,
}

/// Indexed draw range of one material set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// First index in the index buffer
    pub first_index: u32,
    /// Number of indices
    pub index_count: u32,
    /// Material of the range, `None` for whole-geometry draws
    pub material: Option<usize>,
}

/// Uploaded geometry owned by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    vertex_array: VertexArrayId,
    num_tris: u32,
    aabb: Aabb,
    material_sets: Vec<MaterialSet>,
}

impl Geometry {
    /// Upload `mesh` and compute its bounds
    pub fn upload(device: &mut dyn GraphicsDevice, mesh: &MeshData) -> RenderResult<Self> {
        let vertex_array = device.upload_mesh(mesh)?;
        Ok(Self {
            vertex_array,
            num_tris: mesh.triangle_count(),
            aabb: mesh.aabb(),
            material_sets: Vec::new(),
        })
    }

    /// Upload `mesh` split into material ranges
    pub fn upload_with_sets(
        device: &mut dyn GraphicsDevice,
        mesh: &MeshData,
        material_sets: Vec<MaterialSet>,
    ) -> RenderResult<Self> {
        let mut geometry = Self::upload(device, mesh)?;
        geometry.material_sets = material_sets;
        Ok(geometry)
    }

    /// GPU vertex array
    pub const fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    /// Triangle count
    pub const fn num_tris(&self) -> u32 {
        self.num_tris
    }

    /// Object-space bounds
    pub const fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Material ranges, empty when drawn with the mesh's own material
    pub fn material_sets(&self) -> &[MaterialSet] {
        &self.material_sets
    }

    pub(crate) fn material_sets_mut(&mut self) -> &mut [MaterialSet] {
        &mut self.material_sets
    }

    /// Index ranges to draw, one per material set or one for the whole mesh
    pub fn draw_ranges(&self) -> Vec<DrawRange> {
        if self.material_sets.is_empty() {
            return vec![DrawRange { first_index: 0, index_count: self.num_tris * 3, material: None }];
        }

        let mut previous = 0;
        self.material_sets
            .iter()
            .map(|set| {
                let range = DrawRange {
                    first_index: previous * 3,
                    index_count: set.end_triangle.saturating_sub(previous) * 3,
                    material: Some(set.material),
                };
                previous = set.end_triangle;
                range
            })
            .collect()
    }

    /// Draw the whole geometry
    pub fn render(&self, device: &mut dyn GraphicsDevice) {
        device.draw_indexed(self.vertex_array, 0, self.num_tris * 3);
    }

    /// Draw one range
    pub fn render_range(&self, device: &mut dyn GraphicsDevice, range: &DrawRange) {
        device.draw_indexed(self.vertex_array, range.first_index, range.index_count);
    }
}
