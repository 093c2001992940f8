//! Recording device
//!
//! [`HeadlessDevice`] implements [`GraphicsDevice`] without a GPU. Every
//! call is appended to a command log, resources get sequential ids, and
//! just enough GL behaviour is emulated for the pipeline to be asserted on:
//! uniform discovery from GLSL source, framebuffer completeness, and
//! uniform-buffer contents.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::device::{
    Attachment, BlendFactor, BufferId, ClearFlags, DepthFunc, Face, FramebufferId, FramebufferStatus, GpuResource,
    GraphicsDevice, ProgramId, RenderbufferId, TextureDesc, TextureFormat, TextureId, TextureTarget, UniformLocation,
    UniformValue, VertexArrayId,
};
use super::geometry::MeshData;
use super::{RenderError, RenderResult};
use crate::foundation::math::Vec4;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DeviceCommand {
    UploadMesh { vertex_array: VertexArrayId, vertices: usize, indices: usize },
    CreateTexture { texture: TextureId, desc: TextureDesc },
    CreateCubemap { texture: TextureId, size: (u32, u32) },
    CreateProgram { program: ProgramId },
    BindUniformBlock { program: ProgramId, block: String, binding: u32 },
    CreateUniformBuffer { buffer: BufferId, size: usize },
    UploadBuffer { buffer: BufferId, size: usize },
    BindBufferRange { binding: u32, buffer: BufferId, offset: usize, size: usize },
    CreateFramebuffer { framebuffer: FramebufferId },
    CreateRenderbuffer { renderbuffer: RenderbufferId, format: TextureFormat, width: u32, height: u32 },
    AttachTexture { framebuffer: FramebufferId, attachment: Attachment, texture: TextureId },
    AttachRenderbuffer { framebuffer: FramebufferId, attachment: Attachment, renderbuffer: RenderbufferId },
    SetDrawBuffers { framebuffer: FramebufferId, count: u32 },
    BindFramebuffer(Option<FramebufferId>),
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    Clear { color: Vec4, flags: ClearFlags },
    UseProgram(Option<ProgramId>),
    SetUniform { program: Option<ProgramId>, location: UniformLocation, value: UniformValue },
    BindTexture { unit: u32, target: TextureTarget, texture: TextureId },
    DepthTest(Option<DepthFunc>),
    DepthWrite(bool),
    CullFace(Option<Face>),
    Blend(Option<(BlendFactor, BlendFactor)>),
    SeamlessCubemap(bool),
    Draw { vertex_array: VertexArrayId, first_index: u32, index_count: u32 },
    BlitDepth { source: Option<FramebufferId>, destination: Option<FramebufferId> },
    Release(GpuResource),
}

#[derive(Debug, Default)]
struct ProgramInfo {
    uniforms: HashMap<String, i32>,
    blocks: HashSet<String>,
}

#[derive(Debug, Default)]
struct FramebufferInfo {
    colors: BTreeSet<u32>,
    depth: bool,
    draw_buffers: Option<u32>,
    sizes: Vec<(u32, u32)>,
}

/// Device that records commands instead of drawing
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    commands: Vec<DeviceCommand>,
    programs: HashMap<ProgramId, ProgramInfo>,
    framebuffers: HashMap<FramebufferId, FramebufferInfo>,
    buffers: HashMap<BufferId, Vec<u8>>,
    texture_sizes: HashMap<TextureId, (u32, u32)>,
    renderbuffer_sizes: HashMap<RenderbufferId, (u32, u32)>,
    uniform_values: HashMap<(ProgramId, i32), UniformValue>,
    live: HashSet<GpuResource>,
    current_program: Option<ProgramId>,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Everything recorded so far
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded draw calls
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, DeviceCommand::Draw { .. })).count()
    }

    /// Last bytes uploaded into `buffer`
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Last value written to a named uniform of `program`
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let location = self.programs.get(&program)?.uniforms.get(name)?;
        self.uniform_values.get(&(program, *location)).copied()
    }

    /// Whether `program` declares the uniform block `block`
    pub fn has_uniform_block(&self, program: ProgramId, block: &str) -> bool {
        self.programs.get(&program).is_some_and(|p| p.blocks.contains(block))
    }

    /// Resources created and not yet released
    pub fn live_resource_count(&self) -> usize {
        self.live.len()
    }

    /// Program made current by the last `use_program`
    pub const fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }
}

/// Collect `uniform` declarations and uniform blocks from GLSL source
///
/// Arrays expand to one entry per element, named `name[i]` as GL reports them.
/// Array sizes may be integer literals or `#define`d names.
fn scan_uniforms(source: &str, info: &mut ProgramInfo) {
    let defines: HashMap<&str, &str> = source
        .lines()
        .filter_map(|line| line.trim().strip_prefix("#define "))
        .filter_map(|rest| {
            let mut parts = rest.split_whitespace();
            Some((parts.next()?, parts.next()?))
        })
        .collect();

    for line in source.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        let Some((prefix, rest)) = line.split_once("uniform ") else {
            continue;
        };
        if !(prefix.is_empty() || prefix.starts_with("layout")) {
            continue;
        }

        if !line.contains(';') {
            if let Some(block) = rest.split(|c: char| c.is_whitespace() || c == '{').find(|t| !t.is_empty()) {
                info.blocks.insert(block.to_owned());
            }
            continue;
        }

        let declaration = rest.trim_end_matches(';').trim();
        let Some(name) = declaration.split_whitespace().last() else {
            continue;
        };

        let mut declare = |name: String| {
            let next = i32::try_from(info.uniforms.len()).unwrap_or(i32::MAX);
            info.uniforms.entry(name).or_insert(next);
        };

        match name.split_once('[') {
            Some((base, count)) => {
                let count = count.trim_end_matches(']');
                let count: usize = defines.get(count).unwrap_or(&count).parse().unwrap_or(0);
                for i in 0..count {
                    declare(format!("{base}[{i}]"));
                }
            }
            None => declare(name.to_owned()),
        }
    }
}

const fn bytes_per_texel(format: TextureFormat) -> usize {
    match format {
        TextureFormat::Rgb8 => 3,
        TextureFormat::Rgb16F => 6,
        TextureFormat::Rgba8 | TextureFormat::Depth24 | TextureFormat::Depth24Stencil8 => 4,
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn upload_mesh(&mut self, mesh: &MeshData) -> RenderResult<VertexArrayId> {
        if mesh.positions.is_empty() {
            return Err(RenderError::ResourceCreationFailed("mesh has no vertices".to_owned()));
        }
        if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= mesh.positions.len()) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "index {} out of range for {} vertices",
                bad,
                mesh.positions.len()
            )));
        }

        let vertex_array = VertexArrayId(self.allocate());
        self.live.insert(GpuResource::VertexArray(vertex_array));
        self.commands.push(DeviceCommand::UploadMesh {
            vertex_array,
            vertices: mesh.positions.len(),
            indices: mesh.indices.len(),
        });
        Ok(vertex_array)
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> RenderResult<TextureId> {
        if let Some(pixels) = pixels {
            let expected = desc.width as usize * desc.height as usize * bytes_per_texel(desc.format);
            if pixels.len() != expected {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "texture {}x{} expects {} bytes, got {}",
                    desc.width,
                    desc.height,
                    expected,
                    pixels.len()
                )));
            }
        }

        let texture = TextureId(self.allocate());
        self.live.insert(GpuResource::Texture(texture));
        self.texture_sizes.insert(texture, (desc.width, desc.height));
        self.commands.push(DeviceCommand::CreateTexture { texture, desc: *desc });
        Ok(texture)
    }

    fn create_cubemap(&mut self, size: (u32, u32), faces: &[Vec<u8>; 6]) -> RenderResult<TextureId> {
        let expected = size.0 as usize * size.1 as usize * 4;
        if let Some((face, data)) = faces.iter().enumerate().find(|(_, f)| f.len() != expected) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "cubemap face {} has {} bytes, expected {}",
                face,
                data.len(),
                expected
            )));
        }

        let texture = TextureId(self.allocate());
        self.live.insert(GpuResource::Texture(texture));
        self.texture_sizes.insert(texture, size);
        self.commands.push(DeviceCommand::CreateCubemap { texture, size });
        Ok(texture)
    }

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> RenderResult<ProgramId> {
        for (stage, source) in [("vertex", vertex_source), ("fragment", fragment_source)] {
            if !source.contains("void main") {
                return Err(RenderError::ShaderCompilation(format!("{stage} stage has no entry point")));
            }
        }

        let mut info = ProgramInfo::default();
        scan_uniforms(vertex_source, &mut info);
        scan_uniforms(fragment_source, &mut info);

        let program = ProgramId(self.allocate());
        log::trace!("Headless program {:?} with {} uniforms", program, info.uniforms.len());
        self.programs.insert(program, info);
        self.live.insert(GpuResource::Program(program));
        self.commands.push(DeviceCommand::CreateProgram { program });
        Ok(program)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.uniforms.get(name).copied().map(UniformLocation)
    }

    fn bind_uniform_block(&mut self, program: ProgramId, block: &str, binding: u32) -> bool {
        if !self.has_uniform_block(program, block) {
            return false;
        }
        self.commands.push(DeviceCommand::BindUniformBlock { program, block: block.to_owned(), binding });
        true
    }

    fn create_uniform_buffer(&mut self, size: usize) -> RenderResult<BufferId> {
        let buffer = BufferId(self.allocate());
        self.buffers.insert(buffer, vec![0; size]);
        self.live.insert(GpuResource::Buffer(buffer));
        self.commands.push(DeviceCommand::CreateUniformBuffer { buffer, size });
        Ok(buffer)
    }

    fn upload_buffer(&mut self, buffer: BufferId, data: &[u8]) {
        self.buffers.insert(buffer, data.to_vec());
        self.commands.push(DeviceCommand::UploadBuffer { buffer, size: data.len() });
    }

    fn bind_buffer_range(&mut self, binding: u32, buffer: BufferId, offset: usize, size: usize) {
        self.commands.push(DeviceCommand::BindBufferRange { binding, buffer, offset, size });
    }

    fn create_framebuffer(&mut self) -> RenderResult<FramebufferId> {
        let framebuffer = FramebufferId(self.allocate());
        self.framebuffers.insert(framebuffer, FramebufferInfo::default());
        self.live.insert(GpuResource::Framebuffer(framebuffer));
        self.commands.push(DeviceCommand::CreateFramebuffer { framebuffer });
        Ok(framebuffer)
    }

    fn create_renderbuffer(&mut self, format: TextureFormat, width: u32, height: u32) -> RenderResult<RenderbufferId> {
        let renderbuffer = RenderbufferId(self.allocate());
        self.renderbuffer_sizes.insert(renderbuffer, (width, height));
        self.live.insert(GpuResource::Renderbuffer(renderbuffer));
        self.commands.push(DeviceCommand::CreateRenderbuffer { renderbuffer, format, width, height });
        Ok(renderbuffer)
    }

    fn attach_texture(&mut self, framebuffer: FramebufferId, attachment: Attachment, texture: TextureId) {
        let size = self.texture_sizes.get(&texture).copied();
        attach(self.framebuffers.get_mut(&framebuffer), attachment, size);
        self.commands.push(DeviceCommand::AttachTexture { framebuffer, attachment, texture });
    }

    fn attach_renderbuffer(&mut self, framebuffer: FramebufferId, attachment: Attachment, renderbuffer: RenderbufferId) {
        let size = self.renderbuffer_sizes.get(&renderbuffer).copied();
        attach(self.framebuffers.get_mut(&framebuffer), attachment, size);
        self.commands.push(DeviceCommand::AttachRenderbuffer { framebuffer, attachment, renderbuffer });
    }

    fn set_draw_buffers(&mut self, framebuffer: FramebufferId, count: u32) {
        if let Some(info) = self.framebuffers.get_mut(&framebuffer) {
            info.draw_buffers = Some(count);
        }
        self.commands.push(DeviceCommand::SetDrawBuffers { framebuffer, count });
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(info) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::MissingAttachment;
        };

        if info.colors.is_empty() && !info.depth {
            return FramebufferStatus::MissingAttachment;
        }
        if info.sizes.windows(2).any(|pair| pair[0] != pair[1]) {
            return FramebufferStatus::IncompleteAttachment;
        }

        if info.colors.is_empty() {
            // Depth-only targets must declare that they have no colour buffer.
            return match info.draw_buffers {
                Some(0) => FramebufferStatus::Complete,
                _ => FramebufferStatus::IncompleteDrawBuffer,
            };
        }

        if !info.depth {
            return FramebufferStatus::MissingAttachment;
        }
        let enabled = info.draw_buffers.unwrap_or(1);
        if enabled == 0 || (0..enabled).any(|i| !info.colors.contains(&i)) {
            return FramebufferStatus::IncompleteDrawBuffer;
        }
        FramebufferStatus::Complete
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.commands.push(DeviceCommand::BindFramebuffer(framebuffer));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.commands.push(DeviceCommand::Viewport { x, y, width, height });
    }

    fn clear(&mut self, color: Vec4, flags: ClearFlags) {
        self.commands.push(DeviceCommand::Clear { color, flags });
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if let Some(program) = self.current_program {
            self.uniform_values.insert((program, location.0), value);
        }
        self.commands.push(DeviceCommand::SetUniform { program: self.current_program, location, value });
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId) {
        self.commands.push(DeviceCommand::BindTexture { unit, target, texture });
    }

    fn set_depth_test(&mut self, func: Option<DepthFunc>) {
        self.commands.push(DeviceCommand::DepthTest(func));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::DepthWrite(enabled));
    }

    fn set_cull_face(&mut self, face: Option<Face>) {
        self.commands.push(DeviceCommand::CullFace(face));
    }

    fn set_blend(&mut self, blend: Option<(BlendFactor, BlendFactor)>) {
        self.commands.push(DeviceCommand::Blend(blend));
    }

    fn set_seamless_cubemap(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SeamlessCubemap(enabled));
    }

    fn draw_indexed(&mut self, vertex_array: VertexArrayId, first_index: u32, index_count: u32) {
        self.commands.push(DeviceCommand::Draw { vertex_array, first_index, index_count });
    }

    fn blit_depth(
        &mut self,
        source: Option<FramebufferId>,
        destination: Option<FramebufferId>,
        _source_size: (u32, u32),
        _destination_size: (u32, u32),
    ) {
        self.commands.push(DeviceCommand::BlitDepth { source, destination });
    }

    fn release(&mut self, resource: GpuResource) {
        if !self.live.remove(&resource) {
            log::warn!("Releasing unknown or already released {:?}", resource);
            return;
        }
        match resource {
            GpuResource::Program(program) => {
                self.programs.remove(&program);
            }
            GpuResource::Buffer(buffer) => {
                self.buffers.remove(&buffer);
            }
            GpuResource::Framebuffer(framebuffer) => {
                self.framebuffers.remove(&framebuffer);
            }
            GpuResource::Texture(texture) => {
                self.texture_sizes.remove(&texture);
            }
            GpuResource::Renderbuffer(renderbuffer) => {
                self.renderbuffer_sizes.remove(&renderbuffer);
            }
            GpuResource::VertexArray(_) => {}
        }
        self.commands.push(DeviceCommand::Release(resource));
    }
}

fn attach(info: Option<&mut FramebufferInfo>, attachment: Attachment, size: Option<(u32, u32)>) {
    let Some(info) = info else {
        log::warn!("Attaching {:?} to an unknown framebuffer", attachment);
        return;
    };
    match attachment {
        Attachment::Color(slot) => {
            info.colors.insert(slot);
        }
        Attachment::Depth | Attachment::DepthStencil => info.depth = true,
    }
    if let Some(size) = size {
        info.sizes.push(size);
    }
}
