//! GPU-side material: PBR factors, optional texture maps, and the
//! geometry-pass bind group.

use std::path::Path;

use bytemuck::{Pod, Zeroable};

use super::MaterialDescription;
use crate::core::Context;
use crate::texture::{Texture2D, TextureRole};

/// Shared material resources: fallback maps bound in place of absent
/// textures, and the map sampler.
pub struct MaterialDefaults {
    /// Repeat-linear sampler for material maps.
    pub sampler: wgpu::Sampler,
    /// White sRGB fallback (base color).
    pub white: Texture2D,
    /// White linear fallback (metalness/roughness/occlusion).
    pub white_data: Texture2D,
    /// Flat normal fallback.
    pub normal: Texture2D,
    /// Black sRGB fallback (emission).
    pub black: Texture2D,
}

impl MaterialDefaults {
    /// Create the shared resources.
    pub fn new(ctx: &Context) -> Self {
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            sampler,
            white: Texture2D::white(&ctx.device, &ctx.queue, TextureRole::Color),
            white_data: Texture2D::white(&ctx.device, &ctx.queue, TextureRole::Scalar),
            normal: Texture2D::default_normal(&ctx.device, &ctx.queue),
            black: Texture2D::black(&ctx.device, &ctx.queue, TextureRole::Color),
        }
    }
}

/// Material uniforms for the geometry pass.
///
/// The `use_*` flags carry the factor-vs-texture authority: when a flag
/// is set the sampled map wins, otherwise the factor is authoritative.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct MaterialUniform {
    /// Base color factor.
    pub basecolor_factor: [f32; 4],
    /// Metalness factor.
    pub metalness_factor: f32,
    /// Roughness factor.
    pub roughness_factor: f32,
    /// Alpha cutoff; zero disables the test.
    pub alpha_cutoff: f32,
    /// Base color comes from the map.
    pub use_basecolor_map: u32,
    /// Metalness comes from the map.
    pub use_metalness_map: u32,
    /// Roughness comes from the map.
    pub use_roughness_map: u32,
    /// Normal mapping enabled.
    pub use_normal_map: u32,
    /// Occlusion map enabled.
    pub use_occlusion_map: u32,
    /// Emission map enabled.
    pub use_emission_map: u32,
    /// Screen-door blending enabled.
    pub enable_blend: u32,
    /// Padding.
    pub _padding: [u32; 2],
}

/// A GPU material instance.
pub struct Material {
    basecolor_factor: [f32; 4],
    metalness_factor: f32,
    roughness_factor: f32,
    alpha_cutoff: f32,
    double_sided: bool,
    enable_blend: bool,
    basecolor_map: Option<Texture2D>,
    metalness_map: Option<Texture2D>,
    roughness_map: Option<Texture2D>,
    normal_map: Option<Texture2D>,
    occlusion_map: Option<Texture2D>,
    emission_map: Option<Texture2D>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Material {
    /// Build a material from its description, loading its maps.
    ///
    /// A map that fails to load is replaced by the matching fallback
    /// texture and logged; the material stays usable with defined
    /// (if visually wrong) output.
    pub fn from_description(
        ctx: &Context,
        description: &MaterialDescription,
        assets_root: &Path,
        layout: &wgpu::BindGroupLayout,
        defaults: &MaterialDefaults,
    ) -> Self {
        let load = |path: &Option<std::path::PathBuf>, role: TextureRole| -> Option<Texture2D> {
            let path = assets_root.join(path.as_ref()?);
            match Texture2D::from_file(&ctx.device, &ctx.queue, &path, role) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("{}; using fallback texture", e);
                    None
                }
            }
        };

        let basecolor_map = load(&description.basecolor_map, TextureRole::Color);
        let metalness_map = load(&description.metalness_map, TextureRole::Scalar);
        let roughness_map = load(&description.roughness_map, TextureRole::Scalar);
        let normal_map = load(&description.normal_map, TextureRole::Data);
        let occlusion_map = load(&description.occlusion_map, TextureRole::Scalar);
        let emission_map = load(&description.emission_map, TextureRole::Color);

        // Flags follow the description, not the load result: a
        // described-but-unloadable map keeps its flag with a neutral
        // fallback bound, so factor authority is unchanged.
        let uniform = Self::uniform_for(description);

        let uniform_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        fn view_or<'a>(
            map: &'a Option<Texture2D>,
            fallback: &'a Texture2D,
        ) -> &'a wgpu::TextureView {
            map.as_ref().unwrap_or(fallback).view()
        }
        let views = [
            view_or(&basecolor_map, &defaults.white),
            view_or(&metalness_map, &defaults.white_data),
            view_or(&roughness_map, &defaults.white_data),
            view_or(&normal_map, &defaults.normal),
            view_or(&occlusion_map, &defaults.white_data),
            view_or(&emission_map, &defaults.black),
        ];

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&defaults.sampler),
            },
        ];
        for (i, view) in views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: (i + 2) as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout,
            entries: &entries,
        });

        Self {
            basecolor_factor: description.basecolor_factor,
            metalness_factor: description.metalness_factor,
            roughness_factor: description.roughness_factor,
            alpha_cutoff: description.alpha_cutoff,
            double_sided: description.double_sided,
            enable_blend: description.enable_blend,
            basecolor_map,
            metalness_map,
            roughness_map,
            normal_map,
            occlusion_map,
            emission_map,
            uniform_buffer,
            bind_group,
        }
    }

    /// Build the uniform block for a description without touching the GPU.
    ///
    /// Shared with `from_description`; also the unit-testable view of
    /// the factor-vs-texture flags.
    pub fn uniform_for(description: &MaterialDescription) -> MaterialUniform {
        MaterialUniform {
            basecolor_factor: description.basecolor_factor,
            metalness_factor: description.metalness_factor,
            roughness_factor: description.roughness_factor,
            alpha_cutoff: description.alpha_cutoff,
            use_basecolor_map: description.basecolor_map.is_some() as u32,
            use_metalness_map: description.metalness_map.is_some() as u32,
            use_roughness_map: description.roughness_map.is_some() as u32,
            use_normal_map: description.normal_map.is_some() as u32,
            use_occlusion_map: description.occlusion_map.is_some() as u32,
            use_emission_map: description.emission_map.is_some() as u32,
            enable_blend: description.enable_blend as u32,
            _padding: [0; 2],
        }
    }

    /// Base color factor.
    #[inline]
    pub fn basecolor_factor(&self) -> [f32; 4] {
        self.basecolor_factor
    }

    /// Metalness factor.
    #[inline]
    pub fn metalness_factor(&self) -> f32 {
        self.metalness_factor
    }

    /// Roughness factor.
    #[inline]
    pub fn roughness_factor(&self) -> f32 {
        self.roughness_factor
    }

    /// Alpha cutoff.
    #[inline]
    pub fn alpha_cutoff(&self) -> f32 {
        self.alpha_cutoff
    }

    /// Whether both faces render.
    #[inline]
    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    /// Whether screen-door blending is enabled.
    #[inline]
    pub fn enable_blend(&self) -> bool {
        self.enable_blend
    }

    /// Whether a base color map was loaded.
    #[inline]
    pub fn has_basecolor_map(&self) -> bool {
        self.basecolor_map.is_some()
    }

    /// Whether a metalness map was loaded.
    #[inline]
    pub fn has_metalness_map(&self) -> bool {
        self.metalness_map.is_some()
    }

    /// Whether a roughness map was loaded.
    #[inline]
    pub fn has_roughness_map(&self) -> bool {
        self.roughness_map.is_some()
    }

    /// Whether a normal map was loaded.
    #[inline]
    pub fn has_normal_map(&self) -> bool {
        self.normal_map.is_some()
    }

    /// Whether an occlusion map was loaded.
    #[inline]
    pub fn has_occlusion_map(&self) -> bool {
        self.occlusion_map.is_some()
    }

    /// Whether an emission map was loaded.
    #[inline]
    pub fn has_emission_map(&self) -> bool {
        self.emission_map.is_some()
    }

    /// Geometry-pass bind group.
    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Uniform buffer.
    #[inline]
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_description() -> MaterialDescription {
        MaterialDescription {
            basecolor_factor: [1.0, 1.0, 1.0, 1.0],
            metalness_factor: 0.0,
            roughness_factor: 0.5,
            basecolor_map: None,
            metalness_map: None,
            roughness_map: None,
            normal_map: None,
            occlusion_map: None,
            emission_map: None,
            double_sided: false,
            enable_blend: false,
            alpha_cutoff: 0.0,
        }
    }

    #[test]
    fn test_material_uniform_size() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 64);
    }

    #[test]
    fn test_factor_only_material_reports_flags_off() {
        let uniform = Material::uniform_for(&plain_description());
        assert_eq!(uniform.use_basecolor_map, 0);
        assert_eq!(uniform.use_metalness_map, 0);
        assert_eq!(uniform.use_normal_map, 0);
        assert_eq!(uniform.use_emission_map, 0);
        assert_eq!(uniform.basecolor_factor, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_textured_material_reports_flags_on() {
        let mut description = plain_description();
        description.basecolor_map = Some("maps/base.png".into());
        description.normal_map = Some("maps/normal.png".into());

        let uniform = Material::uniform_for(&description);
        assert_eq!(uniform.use_basecolor_map, 1);
        assert_eq!(uniform.use_normal_map, 1);
        assert_eq!(uniform.use_metalness_map, 0);
    }
}
