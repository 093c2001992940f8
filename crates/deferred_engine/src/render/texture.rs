//! Texture resources and image decoding

use std::path::Path;

use super::device::{GraphicsDevice, TextureDesc, TextureId, TextureTarget};
use super::{RenderError, RenderResult};

/// Decoded RGBA8 image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Row-major RGBA8 pixels
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode a PNG, TGA or JPEG file
    pub fn from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        log::debug!("Loading image from: {:?}", path);

        let image = image::open(path).map_err(|e| load_failed(path, e))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!("Loaded image {}x{} from {:?}", width, height, path);

        Ok(Self { pixels: rgba.into_raw(), width, height })
    }

    /// Single-colour image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat(width as usize * height as usize);
        Self { pixels, width, height }
    }
}

/// Single-channel heightmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heightmap {
    /// Row-major luminance
    pub heights: Vec<u8>,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
}

impl Heightmap {
    /// Decode an image and keep its luminance
    pub fn from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let luma = image::open(path).map_err(|e| load_failed(path, e))?.to_luma8();
        let (width, height) = luma.dimensions();
        log::debug!("Loaded heightmap {}x{} from {:?}", width, height, path);
        Ok(Self { heights: luma.into_raw(), width, height })
    }
}

fn load_failed(path: &Path, error: image::ImageError) -> RenderError {
    match error {
        image::ImageError::Unsupported(e) => RenderError::UnsupportedFormat(format!("{}: {}", path.display(), e)),
        other => RenderError::LoadFailed { path: path.display().to_string(), reason: other.to_string() },
    }
}

/// Uploaded texture owned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    id: TextureId,
    target: TextureTarget,
    size: (u32, u32),
}

impl Texture {
    /// Upload a 2D texture
    pub fn from_image(device: &mut dyn GraphicsDevice, image: &ImageData) -> RenderResult<Self> {
        let id = device.create_texture(&TextureDesc::rgba8(image.width, image.height), Some(&image.pixels))?;
        Ok(Self { id, target: TextureTarget::Texture2D, size: (image.width, image.height) })
    }

    /// Upload a cubemap from faces ordered +X, -X, +Y, -Y, +Z, -Z
    pub fn cubemap(device: &mut dyn GraphicsDevice, faces: [ImageData; 6]) -> RenderResult<Self> {
        let size = (faces[0].width, faces[0].height);
        if let Some(face) = faces.iter().find(|f| (f.width, f.height) != size) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "cubemap faces differ in size: {}x{} vs {}x{}",
                face.width, face.height, size.0, size.1
            )));
        }

        let pixels = faces.map(|f| f.pixels);
        let id = device.create_cubemap(size, &pixels)?;
        Ok(Self { id, target: TextureTarget::CubeMap, size })
    }

    /// GPU handle
    pub const fn id(&self) -> TextureId {
        self.id
    }

    /// Binding target
    pub const fn target(&self) -> TextureTarget {
        self.target
    }

    /// Size in texels
    pub const fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Bind to a texture unit
    pub fn bind(&self, device: &mut dyn GraphicsDevice, unit: u32) {
        device.bind_texture(unit, self.target, self.id);
    }
}
