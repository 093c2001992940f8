//! GPU device abstraction
//!
//! The pipeline talks to the GPU through [`GraphicsDevice`], an immediate
//! command interface shaped after OpenGL: bind state, set uniforms, draw.
//! Real backends implement it over a GL context; [`HeadlessDevice`]
//! records the calls for tests and offline runs.
//!
//! [`HeadlessDevice`]: super::headless::HeadlessDevice

use bitflags::bitflags;

use super::geometry::MeshData;
use super::RenderResult;
use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};

macro_rules! gpu_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

gpu_handle!(
    /// Linked shader program
    ProgramId
);
gpu_handle!(
    /// Vertex array with its vertex and index buffers
    VertexArrayId
);
gpu_handle!(
    /// 2D texture or cubemap
    TextureId
);
gpu_handle!(
    /// Uniform buffer
    BufferId
);
gpu_handle!(
    /// Framebuffer object
    FramebufferId
);
gpu_handle!(
    /// Renderbuffer attachment
    RenderbufferId
);

/// Location of a uniform inside one program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Any GPU object that must be released explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum GpuResource {
    Program(ProgramId),
    VertexArray(VertexArrayId),
    Texture(TextureId),
    Buffer(BufferId),
    Framebuffer(FramebufferId),
    Renderbuffer(RenderbufferId),
}

/// Storage format of a texture or renderbuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureFormat {
    Depth24,
    Depth24Stencil8,
    Rgb16F,
    Rgb8,
    Rgba8,
}

/// Sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Addressing outside `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    ClampToBorder,
}

/// Texture creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDesc {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Storage format
    pub format: TextureFormat,
    /// Min and mag filter
    pub filter: TextureFilter,
    /// Wrap mode on both axes
    pub wrap: TextureWrap,
    /// Border colour for [`TextureWrap::ClampToBorder`]
    pub border_color: Option<Vec4>,
    /// Whether to build a mip chain
    pub mipmaps: bool,
}

impl TextureDesc {
    /// Mipmapped, repeating RGBA8 texture for material maps
    pub const fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Repeat,
            border_color: None,
            mipmaps: true,
        }
    }

    /// Render-target texture of the given format, nearest filtered
    pub const fn target(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::ClampToEdge,
            border_color: None,
            mipmaps: false,
        }
    }
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

/// Framebuffer attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// Colour attachment `n`
    Color(u32),
    /// Depth only
    Depth,
    /// Packed depth and stencil
    DepthStencil,
}

/// Result of a framebuffer completeness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// Ready to render into
    Complete,
    /// Nothing attached
    MissingAttachment,
    /// An attachment has mismatched size or format
    IncompleteAttachment,
    /// Draw or read buffer names an absent attachment
    IncompleteDrawBuffer,
}

/// Polygon face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Face {
    Front,
    Back,
}

/// Blend equation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DepthFunc {
    Less,
    LessEqual,
}

bitflags! {
    /// Buffers affected by clears and blits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Colour attachments
        const COLOR = 0b001;
        /// Depth attachment
        const DEPTH = 0b010;
        /// Stencil attachment
        const STENCIL = 0b100;
    }
}

/// Value written to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// OpenGL-style immediate command interface
///
/// `None` framebuffer arguments mean the default (screen) framebuffer.
pub trait GraphicsDevice {
    /// Upload vertex attributes and indices into a new vertex array
    fn upload_mesh(&mut self, mesh: &MeshData) -> RenderResult<VertexArrayId>;

    /// Create a 2D texture, optionally with initial RGBA8 pixels
    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> RenderResult<TextureId>;

    /// Create an RGBA8 cubemap from six faces (+X, -X, +Y, -Y, +Z, -Z)
    fn create_cubemap(&mut self, size: (u32, u32), faces: &[Vec<u8>; 6]) -> RenderResult<TextureId>;

    /// Compile and link a program
    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> RenderResult<ProgramId>;

    /// Location of an active uniform
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Bind a named uniform block to a buffer binding point
    fn bind_uniform_block(&mut self, program: ProgramId, block: &str, binding: u32) -> bool;

    /// Create a uniform buffer of `size` bytes
    fn create_uniform_buffer(&mut self, size: usize) -> RenderResult<BufferId>;

    /// Replace the contents of a buffer
    fn upload_buffer(&mut self, buffer: BufferId, data: &[u8]);

    /// Bind a byte range of a buffer to a uniform binding point
    fn bind_buffer_range(&mut self, binding: u32, buffer: BufferId, offset: usize, size: usize);

    /// Create an empty framebuffer
    fn create_framebuffer(&mut self) -> RenderResult<FramebufferId>;

    /// Create a renderbuffer
    fn create_renderbuffer(&mut self, format: TextureFormat, width: u32, height: u32) -> RenderResult<RenderbufferId>;

    /// Attach a texture to a framebuffer
    fn attach_texture(&mut self, framebuffer: FramebufferId, attachment: Attachment, texture: TextureId);

    /// Attach a renderbuffer to a framebuffer
    fn attach_renderbuffer(&mut self, framebuffer: FramebufferId, attachment: Attachment, renderbuffer: RenderbufferId);

    /// Enable the first `count` colour attachments; zero declares no draw or read buffer
    fn set_draw_buffers(&mut self, framebuffer: FramebufferId, count: u32);

    /// Completeness of a framebuffer
    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus;

    /// Bind a framebuffer for drawing
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Clear the bound framebuffer
    fn clear(&mut self, color: Vec4, flags: ClearFlags);

    /// Make a program current
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Write a uniform of the current program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: TextureId);

    /// Enable depth testing with `func`, or disable it
    fn set_depth_test(&mut self, func: Option<DepthFunc>);

    /// Enable or disable depth writes
    fn set_depth_write(&mut self, enabled: bool);

    /// Cull `face`, or disable culling
    fn set_cull_face(&mut self, face: Option<Face>);

    /// Enable blending with source and destination factors, or disable it
    fn set_blend(&mut self, blend: Option<(BlendFactor, BlendFactor)>);

    /// Enable seamless filtering across cubemap faces
    fn set_seamless_cubemap(&mut self, enabled: bool);

    /// Draw `index_count` indices of a vertex array starting at `first_index`
    fn draw_indexed(&mut self, vertex_array: VertexArrayId, first_index: u32, index_count: u32);

    /// Copy depth between framebuffers with nearest filtering
    fn blit_depth(
        &mut self,
        source: Option<FramebufferId>,
        destination: Option<FramebufferId>,
        source_size: (u32, u32),
        destination_size: (u32, u32),
    );

    /// Free a GPU object
    fn release(&mut self, resource: GpuResource);
}
