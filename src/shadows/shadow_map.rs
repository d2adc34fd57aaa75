//! Shadow map texture and light matrices.

use glam::{Mat4, Vec3};

/// Per-frame directional light rig: position and view/projection matrices.
///
/// The matrices are recomputed every frame even though the light is
/// currently static; nothing in the pipeline assumes a fixed light.
#[derive(Debug, Clone)]
pub struct LightRig {
    /// Light world position.
    pub position: Vec3,
    /// Light view matrix (looking at the scene origin).
    pub view: Mat4,
    /// Light projection matrix.
    pub projection: Mat4,
}

impl LightRig {
    /// Light position above the scene.
    pub const LIGHT_POSITION: Vec3 = Vec3::new(0.0, 25.0, 0.0);
    /// Near plane of the light projection.
    pub const NEAR: f32 = 1.0;
    /// Far plane of the light projection. Objects outside [NEAR, FAR]
    /// from the light produce unreliable shadow results.
    pub const FAR: f32 = 50.0;

    /// Compute the rig for the current frame.
    pub fn new() -> Self {
        let position = Self::LIGHT_POSITION;
        // The light looks straight down; +Z serves as the up reference.
        let view = Mat4::look_at_rh(position, Vec3::ZERO, Vec3::Z);
        let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, Self::NEAR, Self::FAR);

        Self {
            position,
            view,
            projection,
        }
    }

    /// Combined projection * view matrix.
    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth-only shadow map target plus the sampling bind group.
pub struct ShadowMap {
    /// Depth texture.
    texture: wgpu::Texture,
    /// View for rendering into and sampling from.
    view: wgpu::TextureView,
    /// Comparison sampler for shadow tests.
    sampler: wgpu::Sampler,
    /// Bind group layout for sampling in the shading pass.
    bind_group_layout: wgpu::BindGroupLayout,
    /// Bind group over the depth texture and comparison sampler.
    bind_group: wgpu::BindGroup,
    /// Resolution.
    resolution: u32,
}

impl ShadowMap {
    /// Create a new shadow map with the given resolution.
    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Comparison sampler; linear filtering gives hardware PCF.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let bind_group_layout = Self::create_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            texture,
            view,
            sampler,
            bind_group_layout,
            bind_group,
            resolution,
        }
    }

    /// Create the bind group layout for shadow sampling.
    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        })
    }

    /// Get the texture view for rendering into this shadow map.
    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Get the texture.
    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Get the comparison sampler.
    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Get the bind group layout.
    #[inline]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Get the bind group.
    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Get the resolution.
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_sees_scene_origin() {
        let rig = LightRig::new();
        let clip = rig.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;

        // The origin projects to the center of the shadow map within
        // the light's depth range.
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_light_matrices_are_deterministic() {
        let a = LightRig::new();
        let b = LightRig::new();
        assert_eq!(a.view_projection(), b.view_projection());
    }
}
