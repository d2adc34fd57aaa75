//! Cube texture (cubemap) implementation for skyboxes and environment maps.
//!
//! Faces carry linear floating-point radiance and are stored as
//! Rgba16Float on the GPU.

use crate::core::Id;

/// Face order for cube maps: +X, -X, +Y, -Y, +Z, -Z
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    /// Positive X (+X, right)
    PositiveX = 0,
    /// Negative X (-X, left)
    NegativeX = 1,
    /// Positive Y (+Y, top)
    PositiveY = 2,
    /// Negative Y (-Y, bottom)
    NegativeY = 3,
    /// Positive Z (+Z, front)
    PositiveZ = 4,
    /// Negative Z (-Z, back)
    NegativeZ = 5,
}

impl CubeFace {
    /// All faces in storage order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// File-name suffix for this face (`px`, `nx`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "px",
            CubeFace::NegativeX => "nx",
            CubeFace::PositiveY => "py",
            CubeFace::NegativeY => "ny",
            CubeFace::PositiveZ => "pz",
            CubeFace::NegativeZ => "nz",
        }
    }
}

/// A cube texture (cubemap) holding linear HDR data.
pub struct CubeTexture {
    /// Unique ID.
    id: Id,
    /// Face size (width = height) at mip 0.
    size: u32,
    /// Number of mip levels.
    mip_level_count: u32,
    /// The GPU texture.
    texture: wgpu::Texture,
    /// Cube view over all mips.
    view: wgpu::TextureView,
}

impl CubeTexture {
    /// Create a cube texture from 6 linear RGB f32 faces (one mip).
    ///
    /// Each face must hold `size * size * 3` floats.
    pub fn from_rgb32f_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[Vec<f32>; 6],
        size: u32,
        label: Option<&str>,
    ) -> Self {
        Self::from_rgb32f_mips(device, queue, std::slice::from_ref(faces), size, label)
    }

    /// Create a cube texture from a full mip chain of linear RGB f32 faces.
    ///
    /// `mips[m]` holds six faces of `(size >> m)^2 * 3` floats each.
    pub fn from_rgb32f_mips(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mips: &[[Vec<f32>; 6]],
        size: u32,
        label: Option<&str>,
    ) -> Self {
        let mip_level_count = mips.len() as u32;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, faces) in mips.iter().enumerate() {
            let mip_size = (size >> mip).max(1);
            for (face, data) in faces.iter().enumerate() {
                let texels = rgb32f_to_rgba16f(data);
                queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &texture,
                        mip_level: mip as u32,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: face as u32,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    &texels,
                    wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(mip_size * 8),
                        rows_per_image: Some(mip_size),
                    },
                    wgpu::Extent3d {
                        width: mip_size,
                        height: mip_size,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Cube Texture View"),
            format: Some(wgpu::TextureFormat::Rgba16Float),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            mip_level_count: None,
            base_array_layer: 0,
            array_layer_count: Some(6),
        });

        Self {
            id: Id::new(),
            size,
            mip_level_count,
            texture,
            view,
        }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Face size at mip 0.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of mip levels.
    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    /// Get the underlying wgpu texture.
    #[inline]
    pub fn wgpu_texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Get the cube texture view.
    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Convert packed RGB f32 texels to RGBA16Float bytes (alpha = 1).
fn rgb32f_to_rgba16f(rgb: &[f32]) -> Vec<u8> {
    let texels = rgb.len() / 3;
    let mut out = Vec::with_capacity(texels * 8);
    let one = half::f16::from_f32(1.0).to_le_bytes();

    for texel in rgb.chunks_exact(3) {
        for &channel in texel {
            out.extend_from_slice(&half::f16::from_f32(channel).to_le_bytes());
        }
        out.extend_from_slice(&one);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb32f_to_rgba16f_packs_alpha() {
        let rgb = [0.5f32, 1.0, 2.0];
        let bytes = rgb32f_to_rgba16f(&rgb);
        assert_eq!(bytes.len(), 8);

        let r = half::f16::from_le_bytes([bytes[0], bytes[1]]).to_f32();
        let a = half::f16::from_le_bytes([bytes[6], bytes[7]]).to_f32();
        assert!((r - 0.5).abs() < 1e-3);
        assert!((a - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_face_suffixes() {
        let suffixes: Vec<&str> = CubeFace::ALL.iter().map(|f| f.suffix()).collect();
        assert_eq!(suffixes, ["px", "nx", "py", "ny", "pz", "nz"]);
    }
}
