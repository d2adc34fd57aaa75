//! BRDF look-up table for IBL.
//!
//! Pre-integrates the split-sum approximation of the GGX BRDF over a
//! grid of (NdotV, roughness), producing an (F0 scale, F0 bias) pair
//! per texel. Stored as Rg16Float, indexed by NdotV (x) and roughness (y).

use std::f32::consts::PI;

use crate::core::Id;
use wgpu::util::DeviceExt;

/// BRDF look-up table texture.
pub struct BrdfLut {
    /// Unique ID.
    id: Id,
    /// LUT resolution (width and height).
    resolution: u32,
    /// The GPU texture.
    texture: wgpu::Texture,
    /// Texture view.
    view: wgpu::TextureView,
}

impl BrdfLut {
    /// Default resolution for the BRDF LUT.
    pub const DEFAULT_RESOLUTION: u32 = 512;
    /// Samples per texel for the integration.
    const SAMPLE_COUNT: u32 = 32;

    /// Generate a new BRDF LUT with the specified resolution.
    pub fn generate(device: &wgpu::Device, queue: &wgpu::Queue, resolution: u32) -> Self {
        let data = Self::compute_lut(resolution, Self::SAMPLE_COUNT);

        // Pack (scale, bias) pairs as two f16 channels.
        let mut bytes = Vec::with_capacity((resolution * resolution * 4) as usize);
        for (scale, bias) in data {
            bytes.extend_from_slice(&half::f16::from_f32(scale).to_le_bytes());
            bytes.extend_from_slice(&half::f16::from_f32(bias).to_le_bytes());
        }

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("BRDF LUT"),
                size: wgpu::Extent3d {
                    width: resolution,
                    height: resolution,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rg16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &bytes,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            id: Id::new(),
            resolution,
            texture,
            view,
        }
    }

    /// Generate a BRDF LUT with default resolution.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::generate(device, queue, Self::DEFAULT_RESOLUTION)
    }

    /// Compute the LUT grid on the CPU. Row `y` is roughness, column `x`
    /// is NdotV; texel centers sample the open interval (0, 1).
    pub(crate) fn compute_lut(resolution: u32, sample_count: u32) -> Vec<(f32, f32)> {
        let mut data = Vec::with_capacity((resolution * resolution) as usize);

        for y in 0..resolution {
            for x in 0..resolution {
                let n_dot_v = ((x as f32 + 0.5) / resolution as f32).max(0.001);
                let roughness = (y as f32 + 0.5) / resolution as f32;
                data.push(Self::integrate_brdf(n_dot_v, roughness, sample_count));
            }
        }

        data
    }

    /// Integrate the BRDF for a given NdotV and roughness.
    fn integrate_brdf(n_dot_v: f32, roughness: f32, sample_count: u32) -> (f32, f32) {
        let v = glam::Vec3::new((1.0 - n_dot_v * n_dot_v).sqrt(), 0.0, n_dot_v);

        let mut scale = 0.0f32;
        let mut bias = 0.0f32;
        let alpha = roughness * roughness;

        for i in 0..sample_count {
            let xi = super::prefilter::hammersley(i, sample_count);
            let h = Self::importance_sample_ggx(xi, alpha);
            let l = 2.0 * v.dot(h) * h - v;

            let n_dot_l = l.z.max(0.0);
            let n_dot_h = h.z.max(0.0);
            let v_dot_h = v.dot(h).max(0.0);

            if n_dot_l > 0.0 && n_dot_h > 0.0 {
                let g = Self::geometry_smith(n_dot_v, n_dot_l, alpha);
                let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v);
                let fc = (1.0 - v_dot_h).powf(5.0);

                scale += (1.0 - fc) * g_vis;
                bias += fc * g_vis;
            }
        }

        let inv_samples = 1.0 / sample_count as f32;
        (scale * inv_samples, bias * inv_samples)
    }

    /// Importance sample the GGX distribution (tangent space, N = +Z).
    fn importance_sample_ggx(xi: [f32; 2], alpha: f32) -> glam::Vec3 {
        let a2 = alpha * alpha;

        let phi = 2.0 * PI * xi[0];
        let cos_theta = ((1.0 - xi[1]) / (1.0 + (a2 - 1.0) * xi[1])).sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        glam::Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
    }

    /// Smith's geometry function for GGX.
    fn geometry_smith(n_dot_v: f32, n_dot_l: f32, alpha: f32) -> f32 {
        Self::geometry_schlick_ggx(n_dot_v, alpha) * Self::geometry_schlick_ggx(n_dot_l, alpha)
    }

    /// Schlick-GGX geometry function with the IBL k remapping.
    fn geometry_schlick_ggx(n_dot: f32, alpha: f32) -> f32 {
        let k = alpha / 2.0;
        n_dot / (n_dot * (1.0 - k) + k)
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the LUT resolution.
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
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
    fn test_lut_values_are_bounded() {
        let lut = BrdfLut::compute_lut(16, 32);
        assert_eq!(lut.len(), 256);
        for &(scale, bias) in &lut {
            assert!(scale.is_finite() && bias.is_finite());
            assert!((0.0..=1.5).contains(&scale));
            assert!((0.0..=1.0).contains(&bias));
        }
    }

    #[test]
    fn test_smooth_grazing_bias_dominates() {
        // At low roughness and grazing angles the Fresnel term saturates,
        // so the bias (F90 weight) outweighs the scale.
        let lut = BrdfLut::compute_lut(16, 64);
        let grazing_smooth = lut[0];
        assert!(grazing_smooth.1 > grazing_smooth.0);
    }
}
