//! Image-based lighting precompute stage.
//!
//! Runs once at scene load, before the frame loop: assembles the skybox
//! cubemap from six HDR face images, convolves the GGX-prefiltered
//! specular mip chain, integrates the split-sum BRDF LUT, and loads the
//! Kulla-Conty energy-compensation tables. The resulting [`IblBundle`]
//! is immutable for the rest of the session.

mod brdf_lut;
mod prefilter;

pub use brdf_lut::BrdfLut;
pub use prefilter::PrefilterGenerator;

use std::path::Path;

use thiserror::Error;

use crate::texture::{CubeFace, CubeTexture, Texture2D, TextureRole};

/// Base face size of the prefiltered specular cubemap.
pub const PREFILTER_SIZE: u32 = 512;
/// Number of prefiltered mip levels; mip roughness is `mip / (levels - 1)`.
pub const PREFILTER_MIP_LEVELS: u32 = 5;

/// Errors raised by the IBL precompute stage.
///
/// Environment faces are required input; anything wrong with them is
/// fatal to scene construction.
#[derive(Error, Debug)]
pub enum IblError {
    /// An environment face image could not be read or decoded.
    #[error("Failed to load environment face {0}: {1}")]
    FaceLoad(String, String),

    /// A face image is not square or does not match the other faces.
    #[error("Bad environment face {0}: {1}")]
    BadFace(String, String),
}

/// The immutable IBL asset bundle.
pub struct IblBundle {
    /// Source skybox cubemap.
    skybox: CubeTexture,
    /// GGX-prefiltered specular cubemap mip chain.
    prefiltered: CubeTexture,
    /// Split-sum BRDF integration LUT.
    brdf_lut: BrdfLut,
    /// Kulla-Conty directional energy LUT.
    e_lut: Texture2D,
    /// Kulla-Conty average energy LUT.
    e_avg_lut: Texture2D,
    /// Trilinear clamp sampler shared by all IBL lookups.
    sampler: wgpu::Sampler,
    /// Bind group layout for the IBL bindings.
    bind_group_layout: wgpu::BindGroupLayout,
    /// Bind group over every asset in the bundle.
    bind_group: wgpu::BindGroup,
}

impl IblBundle {
    /// Build the bundle from an environment directory.
    ///
    /// `assets_root/environment` must contain the six face images
    /// `m0_px.hdr` ... `m0_nz.hdr`; `assets_root` must contain the two
    /// energy LUT images. Blocks until every upload is recorded.
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        assets_root: &Path,
        environment: &str,
    ) -> Result<Self, IblError> {
        let (faces, face_size) = load_environment_faces(assets_root, environment)?;

        log::info!(
            "IBL precompute: environment '{}' ({}x{} faces)",
            environment,
            face_size,
            face_size
        );

        let skybox =
            CubeTexture::from_rgb32f_faces(device, queue, &faces, face_size, Some("Skybox"));

        // Small environments cannot carry the full mip chain.
        let base_size = PREFILTER_SIZE.min(face_size);
        let mip_levels = PREFILTER_MIP_LEVELS.min(32 - base_size.leading_zeros());

        let mips = PrefilterGenerator::new().generate(&faces, face_size, base_size, mip_levels);
        let prefiltered = CubeTexture::from_rgb32f_mips(
            device,
            queue,
            &mips,
            base_size,
            Some("Prefiltered Environment"),
        );

        let brdf_lut = BrdfLut::new(device, queue);

        let e_lut = load_energy_lut(device, queue, &assets_root.join("GGX_E_LUT.png"));
        let e_avg_lut = load_energy_lut(device, queue, &assets_root.join("GGX_Eavg_LUT.png"));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("IBL Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = Self::create_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("IBL Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(prefiltered.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(brdf_lut.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(e_lut.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(e_avg_lut.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(skybox.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Ok(Self {
            skybox,
            prefiltered,
            brdf_lut,
            e_lut,
            e_avg_lut,
            sampler,
            bind_group_layout,
            bind_group,
        })
    }

    /// Create the bind group layout shared by the shading and composite passes.
    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let texture_2d = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_cube = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::Cube,
                multisampled: false,
            },
            count: None,
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("IBL Bind Group Layout"),
            entries: &[
                // Prefiltered specular cubemap
                texture_cube(0),
                // BRDF LUT
                texture_2d(1),
                // Kulla-Conty E LUT
                texture_2d(2),
                // Kulla-Conty Eavg LUT
                texture_2d(3),
                // Skybox
                texture_cube(4),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    /// Skybox cubemap.
    #[inline]
    pub fn skybox(&self) -> &CubeTexture {
        &self.skybox
    }

    /// Prefiltered specular cubemap.
    #[inline]
    pub fn prefiltered(&self) -> &CubeTexture {
        &self.prefiltered
    }

    /// BRDF LUT.
    #[inline]
    pub fn brdf_lut(&self) -> &BrdfLut {
        &self.brdf_lut
    }

    /// Kulla-Conty directional energy LUT.
    #[inline]
    pub fn e_lut(&self) -> &Texture2D {
        &self.e_lut
    }

    /// Kulla-Conty average energy LUT.
    #[inline]
    pub fn e_avg_lut(&self) -> &Texture2D {
        &self.e_avg_lut
    }

    /// IBL sampler.
    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Bind group layout.
    #[inline]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Bind group over the whole bundle.
    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Load the six environment faces as linear RGB f32 data.
fn load_environment_faces(
    assets_root: &Path,
    environment: &str,
) -> Result<([Vec<f32>; 6], u32), IblError> {
    let mut faces: [Vec<f32>; 6] = Default::default();
    let mut size = 0u32;

    for (i, face) in CubeFace::ALL.iter().enumerate() {
        let path = assets_root
            .join(environment)
            .join(format!("m0_{}.hdr", face.suffix()));
        let display = path.display().to_string();

        let img = image::open(&path).map_err(|e| IblError::FaceLoad(display.clone(), e.to_string()))?;
        let rgb = img.into_rgb32f();
        let (w, h) = rgb.dimensions();

        if w != h {
            return Err(IblError::BadFace(display, format!("not square: {}x{}", w, h)));
        }
        if i == 0 {
            size = w;
        } else if w != size {
            return Err(IblError::BadFace(
                display,
                format!("size {} differs from face 0 size {}", w, size),
            ));
        }

        faces[i] = rgb.into_raw();
    }

    Ok((faces, size))
}

/// Load one Kulla-Conty energy LUT, falling back to white on failure.
///
/// The LUTs are static assets; a bad file degrades energy compensation
/// but is not fatal.
fn load_energy_lut(device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> Texture2D {
    match Texture2D::from_file(device, queue, path, TextureRole::Scalar) {
        Ok(lut) => {
            if lut.width() != lut.height() {
                log::error!(
                    "Energy LUT {} is not square ({}x{}); using fallback",
                    path.display(),
                    lut.width(),
                    lut.height()
                );
                Texture2D::white(device, queue, TextureRole::Scalar)
            } else {
                lut
            }
        }
        Err(e) => {
            log::error!("Failed to load energy LUT {}: {}", path.display(), e);
            Texture2D::white(device, queue, TextureRole::Scalar)
        }
    }
}
