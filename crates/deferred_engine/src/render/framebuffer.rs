//! Off-screen render targets
//!
//! Three shapes are used by the pipeline: depth-only shadow maps, the
//! three-target G-buffer, and a plain colour target.

use super::device::{
    Attachment, ClearFlags, FramebufferId, FramebufferStatus, GpuResource, GraphicsDevice, RenderbufferId,
    TextureDesc, TextureFilter, TextureFormat, TextureId, TextureTarget, TextureWrap,
};
use super::{RenderError, RenderResult};
use crate::foundation::math::Vec4;

/// Framebuffer with its attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    name: String,
    id: FramebufferId,
    width: u32,
    height: u32,
    textures: Vec<TextureId>,
    depth_texture: Option<TextureId>,
    renderbuffer: Option<RenderbufferId>,
}

impl Framebuffer {
    fn empty(device: &mut dyn GraphicsDevice, name: &str, width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self {
            name: name.to_owned(),
            id: device.create_framebuffer()?,
            width,
            height,
            textures: Vec::new(),
            depth_texture: None,
            renderbuffer: None,
        })
    }

    /// Square depth-only target for one shadow map
    ///
    /// Samples outside the map read as depth 1 so they are never in shadow.
    pub fn depth(device: &mut dyn GraphicsDevice, size: u32) -> RenderResult<Self> {
        let mut fb = Self::empty(device, "shadow_depth", size, size)?;
        let desc = TextureDesc {
            width: size,
            height: size,
            format: TextureFormat::Depth24,
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::ClampToBorder,
            border_color: Some(Vec4::new(1.0, 1.0, 1.0, 1.0)),
            mipmaps: false,
        };
        let texture = device.create_texture(&desc, None)?;
        device.attach_texture(fb.id, Attachment::Depth, texture);
        device.set_draw_buffers(fb.id, 0);
        fb.depth_texture = Some(texture);
        fb.check(device)
    }

    /// Position, normal and albedo+specular targets over a depth-stencil buffer
    pub fn gbuffer(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> RenderResult<Self> {
        let mut fb = Self::empty(device, "gbuffer", width, height)?;
        let formats = [TextureFormat::Rgb16F, TextureFormat::Rgb16F, TextureFormat::Rgba8];
        for (slot, format) in (0u32..).zip(formats) {
            let texture = device.create_texture(&TextureDesc::target(width, height, format), None)?;
            device.attach_texture(fb.id, Attachment::Color(slot), texture);
            fb.textures.push(texture);
        }
        device.set_draw_buffers(fb.id, formats.len() as u32);

        let depth = device.create_renderbuffer(TextureFormat::Depth24Stencil8, width, height)?;
        device.attach_renderbuffer(fb.id, Attachment::DepthStencil, depth);
        fb.renderbuffer = Some(depth);
        fb.check(device)
    }

    /// Single RGBA8 target with depth
    pub fn color(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> RenderResult<Self> {
        let mut fb = Self::empty(device, "color", width, height)?;
        let texture = device.create_texture(&TextureDesc::target(width, height, TextureFormat::Rgba8), None)?;
        device.attach_texture(fb.id, Attachment::Color(0), texture);
        device.set_draw_buffers(fb.id, 1);
        fb.textures.push(texture);

        let depth = device.create_renderbuffer(TextureFormat::Depth24, width, height)?;
        device.attach_renderbuffer(fb.id, Attachment::Depth, depth);
        fb.renderbuffer = Some(depth);
        fb.check(device)
    }

    fn check(self, device: &mut dyn GraphicsDevice) -> RenderResult<Self> {
        match device.framebuffer_status(self.id) {
            FramebufferStatus::Complete => {
                log::debug!("Framebuffer '{}' {}x{} complete", self.name, self.width, self.height);
                Ok(self)
            }
            status => {
                log::error!("Framebuffer '{}' is incomplete: {:?}", self.name, status);
                let name = self.name.clone();
                self.release(device);
                Err(RenderError::IncompleteFramebuffer { name, status })
            }
        }
    }

    /// Bind, size the viewport to the target, and clear colour and depth
    pub fn bind_and_clear(&self, device: &mut dyn GraphicsDevice, color: Vec4) {
        device.bind_framebuffer(Some(self.id));
        device.viewport(0, 0, self.width, self.height);
        device.clear(color, ClearFlags::COLOR | ClearFlags::DEPTH);
    }

    /// Bind colour attachment `slot` to a texture unit
    pub fn bind_texture(&self, device: &mut dyn GraphicsDevice, slot: usize, unit: u32) -> bool {
        match self.textures.get(slot) {
            Some(texture) => {
                device.bind_texture(unit, TextureTarget::Texture2D, *texture);
                true
            }
            None => false,
        }
    }

    /// Bind the depth texture to a texture unit
    pub fn bind_depth_texture(&self, device: &mut dyn GraphicsDevice, unit: u32) -> bool {
        match self.depth_texture {
            Some(texture) => {
                device.bind_texture(unit, TextureTarget::Texture2D, texture);
                true
            }
            None => false,
        }
    }

    /// Framebuffer handle
    pub const fn id(&self) -> FramebufferId {
        self.id
    }

    /// Target size
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Colour attachments in slot order
    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    /// Free the framebuffer and everything attached to it
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        for texture in self.textures.into_iter().chain(self.depth_texture) {
            device.release(GpuResource::Texture(texture));
        }
        if let Some(renderbuffer) = self.renderbuffer {
            device.release(GpuResource::Renderbuffer(renderbuffer));
        }
        device.release(GpuResource::Framebuffer(self.id));
    }
}
