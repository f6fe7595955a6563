//! Texture loading and GPU texture resources
//!
//! [`Texture`] is the backend-neutral image resource meshes refer to: it is
//! decoded on the CPU with the `image` crate, uploaded through a
//! [`RenderDevice`], and released exactly once. [`TextureResource`] bundles
//! the wgpu objects the wgpu backend creates for each uploaded texture and
//! for its depth buffer.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{Result, ViewerError};
use crate::gfx::rendering::device::{RenderDevice, TextureHandle};

/// Decoded pixels, always stored as RGBA8
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source image (1, 3 or 4)
    pub channels: u8,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Accepts 8-bit grey, RGB and RGBA images.
    ///
    /// Any other channel count fails with [`ViewerError::UnsupportedChannels`];
    /// `path` only labels the error.
    pub fn from_dynamic(image: DynamicImage, path: &Path) -> Result<Self> {
        let channels = match &image {
            DynamicImage::ImageLuma8(_) => 1,
            DynamicImage::ImageRgb8(_) => 3,
            DynamicImage::ImageRgba8(_) => 4,
            other => {
                let channels = other.color().channel_count();
                log::error!(
                    "unsupported image format in '{}' ({:?}, {} channels)",
                    path.display(),
                    other.color(),
                    channels
                );
                return Err(ViewerError::UnsupportedChannels {
                    channels,
                    path: path.to_path_buf(),
                });
            }
        };

        let rgba = image.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            channels,
            rgba: rgba.into_raw(),
        })
    }

    /// Wraps already-decoded RGBA8 pixels
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            channels: 4,
            rgba,
        }
    }

    /// A single opaque white pixel, sampled when no texture is bound
    pub fn white() -> Self {
        Self::from_rgba(1, 1, vec![255; 4])
    }
}

/// An image texture with a bind/unbind/clean-up lifecycle
#[derive(Debug)]
pub struct Texture {
    path: PathBuf,
    width: u32,
    height: u32,
    channels: u8,
    pending: Option<TextureImage>,
    handle: Option<TextureHandle>,
}

impl Texture {
    /// Decodes an image file; nothing is uploaded yet
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            log::error!("failed to load texture '{}': {}", path.display(), e);
            e
        })?;
        Ok(Self::from_image(TextureImage::from_dynamic(decoded, path)?, path))
    }

    /// Wraps an already-decoded image; `path` is used for diagnostics
    pub fn from_image(image: TextureImage, path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            width: image.width,
            height: image.height,
            channels: image.channels,
            pending: Some(image),
            handle: None,
        }
    }

    /// Creates the GPU texture. Calling it again after a successful upload
    /// returns the existing handle.
    pub fn upload(&mut self, device: &mut dyn RenderDevice) -> Result<TextureHandle> {
        if let Some(handle) = self.handle {
            return Ok(handle);
        }

        let Some(image) = self.pending.as_ref() else {
            return Err(ViewerError::NotInitialized(self.path.display().to_string()));
        };

        let handle = device.create_texture(image)?;
        self.pending = None;
        self.handle = Some(handle);

        log::debug!(
            "uploaded texture '{}' ({}x{}, {} channels) as {}",
            self.path.display(),
            self.width,
            self.height,
            self.channels,
            handle
        );
        Ok(handle)
    }

    pub fn bind(&self, device: &mut dyn RenderDevice, unit: u32) {
        match self.handle {
            Some(handle) => device.bind_texture(unit, handle),
            None => log::warn!("texture '{}' bound before upload", self.path.display()),
        }
    }

    pub fn unbind(&self, device: &mut dyn RenderDevice, unit: u32) {
        device.unbind_texture(unit);
    }

    /// Releases the GPU texture; further calls are no-ops
    pub fn clean_up(&mut self, device: &mut dyn RenderDevice) {
        if let Some(handle) = self.handle.take() {
            device.delete_texture(handle);
        }
        self.pending = None;
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }
}

/// GPU texture resource containing texture, view, and sampler
///
/// Bundles the three main components needed for texture operations:
/// - Texture: The actual GPU memory allocation
/// - View: Interface for shader access
/// - Sampler: Filtering and addressing configuration
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used by the wgpu backend
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an RGBA8 image with repeat addressing and linear filtering
    pub fn create_from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::headless::HeadlessDevice;

    #[test]
    fn accepts_grey_rgb_and_rgba() {
        let path = Path::new("mem.png");

        let grey = TextureImage::from_dynamic(DynamicImage::new_luma8(2, 2), path).unwrap();
        assert_eq!(grey.channels, 1);
        assert_eq!(grey.rgba.len(), 16);

        let rgb = TextureImage::from_dynamic(DynamicImage::new_rgb8(3, 1), path).unwrap();
        assert_eq!(rgb.channels, 3);
        assert_eq!((rgb.width, rgb.height), (3, 1));

        let rgba = TextureImage::from_dynamic(DynamicImage::new_rgba8(1, 1), path).unwrap();
        assert_eq!(rgba.channels, 4);
    }

    #[test]
    fn rejects_two_channel_images() {
        let result = TextureImage::from_dynamic(DynamicImage::new_luma_a8(2, 2), Path::new("la.png"));
        assert!(matches!(
            result,
            Err(ViewerError::UnsupportedChannels { channels: 2, .. })
        ));
    }

    #[test]
    fn missing_file_fails_to_load() {
        let result = Texture::load("definitely/not/here.png");
        assert!(result.is_err());
    }

    #[test]
    fn upload_and_clean_up_happen_once() {
        let mut device = HeadlessDevice::new();
        let mut texture = Texture::from_image(TextureImage::white(), "white");

        let handle = texture.upload(&mut device).unwrap();
        assert_eq!(texture.upload(&mut device).unwrap(), handle);
        assert_eq!(device.live_texture_count(), 1);

        texture.clean_up(&mut device);
        texture.clean_up(&mut device);
        assert_eq!(device.live_texture_count(), 0);
        assert_eq!(texture.handle(), None);
    }
}
