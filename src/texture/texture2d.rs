//! 2D texture implementation with a role-based format policy.

use std::path::Path;

use crate::core::Id;
use wgpu::util::DeviceExt;

/// Semantic role of a texture, deciding its GPU format.
///
/// Color data is stored sRGB so sampling returns linear values; scalar
/// and vector data channels stay linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRole {
    /// Base color / emission: sRGB-encoded color.
    Color,
    /// Metalness, roughness, occlusion: linear scalar data.
    Scalar,
    /// Normal maps and other linear vector data.
    Data,
}

impl TextureRole {
    /// The wgpu format for RGBA8 content in this role.
    #[inline]
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureRole::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureRole::Scalar | TextureRole::Data => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A 2D texture.
pub struct Texture2D {
    /// Unique ID.
    id: Id,
    /// Texture width.
    width: u32,
    /// Texture height.
    height: u32,
    /// The GPU texture.
    texture: wgpu::Texture,
    /// Texture view.
    view: wgpu::TextureView,
    /// Texture format.
    format: wgpu::TextureFormat,
}

impl Texture2D {
    /// Create a new texture from RGBA8 data.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        role: TextureRole,
        label: Option<&str>,
    ) -> Self {
        let format = role.format();
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label,
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            id: Id::new(),
            width,
            height,
            texture,
            view,
            format,
        }
    }

    /// Create a solid color texture (1x1).
    pub fn from_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        role: TextureRole,
    ) -> Self {
        Self::from_rgba8(device, queue, &rgba, 1, 1, role, Some("Solid Color Texture"))
    }

    /// Create a white texture (1x1). Fallback for color/scalar maps.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue, role: TextureRole) -> Self {
        Self::from_color(device, queue, [255, 255, 255, 255], role)
    }

    /// Create a black texture (1x1). Fallback for emission maps.
    pub fn black(device: &wgpu::Device, queue: &wgpu::Queue, role: TextureRole) -> Self {
        Self::from_color(device, queue, [0, 0, 0, 255], role)
    }

    /// Create a flat normal map texture (1x1, normal pointing out).
    pub fn default_normal(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_rgba8(
            device,
            queue,
            &[128, 128, 255, 255],
            1,
            1,
            TextureRole::Data,
            Some("Default Normal Map"),
        )
    }

    /// Create a texture from encoded image bytes (PNG, JPEG, etc.).
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        role: TextureRole,
        label: Option<&str>,
    ) -> Result<Self, String> {
        let img = image::load_from_memory(data)
            .map_err(|e| format!("Failed to decode image: {}", e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self::from_rgba8(
            device,
            queue,
            rgba.as_raw(),
            width,
            height,
            role,
            label,
        ))
    }

    /// Load a texture from an image file on disk.
    pub fn from_file(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        role: TextureRole,
    ) -> Result<Self, String> {
        let data = std::fs::read(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_bytes(
            device,
            queue,
            &data,
            role,
            Some(&path.display().to_string()),
        )
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get texture width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get texture height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the texture format.
    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Get the underlying wgpu texture.
    #[inline]
    pub fn wgpu_texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Get the texture view.
    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_formats() {
        assert_eq!(
            TextureRole::Color.format(),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(TextureRole::Scalar.format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(TextureRole::Data.format(), wgpu::TextureFormat::Rgba8Unorm);
    }
}
