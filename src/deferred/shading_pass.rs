//! Shading (resolve) pass.
//!
//! A single fullscreen draw that reads the G-buffer, the shadow map,
//! and the IBL bundle, and writes one lit HDR color buffer. This pass
//! only consumes the G-buffer; it never writes it.

use bytemuck::{Pod, Zeroable};

use super::gbuffer::{GBuffer, GBufferChannel, COLOR_TARGET_FORMAT};
use crate::camera::Camera;
use crate::core::Context;
use crate::geometry::{FullscreenVertex, FULLSCREEN_QUAD_VERTICES};
use crate::ibl::IblBundle;
use crate::shadows::{LightRig, ShadowMap};

/// Directional light intensity.
const LIGHT_INTENSITY: f32 = 3.0;

const SHADING_SHADER: &str = r#"
// Shading resolve shader - G-buffer + shadow + IBL -> lit HDR color

const PI: f32 = 3.14159265359;

struct Shading {
    light_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    light_pos: vec4<f32>,     // xyz position, w intensity
    params: vec4<f32>,        // x = max prefiltered mip
}

@group(0) @binding(0)
var<uniform> shading: Shading;

@group(1) @binding(0)
var g_position: texture_2d<f32>;
@group(1) @binding(1)
var g_normal: texture_2d<f32>;
@group(1) @binding(2)
var g_basecolor: texture_2d<f32>;
@group(1) @binding(3)
var g_rmo: texture_2d<f32>;
@group(1) @binding(4)
var g_emission: texture_2d<f32>;
@group(1) @binding(5)
var g_depth: texture_2d<f32>;

@group(2) @binding(0)
var shadow_map: texture_depth_2d;
@group(2) @binding(1)
var shadow_sampler: sampler_comparison;

@group(3) @binding(0)
var prefiltered_map: texture_cube<f32>;
@group(3) @binding(1)
var brdf_lut: texture_2d<f32>;
@group(3) @binding(2)
var e_lut: texture_2d<f32>;
@group(3) @binding(3)
var e_avg_lut: texture_2d<f32>;
@group(3) @binding(5)
var ibl_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}

fn distribution_ggx(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * d * d);
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = (r * r) / 8.0;
    let gv = n_dot_v / (n_dot_v * (1.0 - k) + k);
    let gl = n_dot_l / (n_dot_l * (1.0 - k) + k);
    return gv * gl;
}

fn fresnel_schlick(cos_theta: f32, f0: vec3<f32>) -> vec3<f32> {
    return f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - cos_theta, 5.0);
}

fn sample_shadow(world_pos: vec3<f32>) -> f32 {
    let ls = shading.light_view_proj * vec4<f32>(world_pos, 1.0);
    let ndc = ls.xyz / ls.w;
    let uv = ndc.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        // Outside the light frustum: treat as lit (documented limitation).
        return 1.0;
    }
    return textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z - 0.002);
}

// Kulla-Conty multiple-scattering compensation from the energy tables.
fn multi_scatter(n_dot_v: f32, n_dot_l: f32, roughness: f32, f0: vec3<f32>) -> vec3<f32> {
    let e_mu_v = textureSampleLevel(e_lut, ibl_sampler, vec2<f32>(n_dot_v, roughness), 0.0).r;
    let e_mu_l = textureSampleLevel(e_lut, ibl_sampler, vec2<f32>(n_dot_l, roughness), 0.0).r;
    let e_avg = textureSampleLevel(e_avg_lut, ibl_sampler, vec2<f32>(roughness, 0.5), 0.0).r;

    let f_ms = (1.0 - e_mu_v) * (1.0 - e_mu_l) / (PI * max(1.0 - e_avg, 1e-3));
    let f_avg = f0 + (vec3<f32>(1.0) - f0) / 21.0;
    let f_add = f_avg * e_avg / (vec3<f32>(1.0) - f_avg * (1.0 - e_avg));
    return f_ms * f_add;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let coords = vec2<i32>(in.clip_position.xy);

    let position = textureLoad(g_position, coords, 0);
    if (position.w == 0.0) {
        // Background pixel; the composite pass fills it from the skybox.
        return vec4<f32>(0.0);
    }

    let world_pos = position.xyz;
    let n = normalize(textureLoad(g_normal, coords, 0).xyz);
    let basecolor = textureLoad(g_basecolor, coords, 0).rgb;
    let rmo = textureLoad(g_rmo, coords, 0).xyz;
    let emission = textureLoad(g_emission, coords, 0).rgb;

    let roughness = clamp(rmo.x, 0.04, 1.0);
    let metalness = rmo.y;
    let occlusion = rmo.z;

    let v = normalize(shading.camera_pos.xyz - world_pos);
    let n_dot_v = max(dot(n, v), 1e-4);
    let f0 = mix(vec3<f32>(0.04), basecolor, metalness);

    // Direct lighting: one shadow-tested directional light.
    let l = normalize(shading.light_pos.xyz - world_pos);
    let h = normalize(v + l);
    let n_dot_l = max(dot(n, l), 0.0);
    let n_dot_h = max(dot(n, h), 0.0);

    let alpha = roughness * roughness;
    let d = distribution_ggx(n_dot_h, alpha);
    let g = geometry_smith(n_dot_v, n_dot_l, roughness);
    let f = fresnel_schlick(max(dot(h, v), 0.0), f0);

    let specular = (d * g * f) / max(4.0 * n_dot_v * n_dot_l, 1e-4);
    let kd = (vec3<f32>(1.0) - f) * (1.0 - metalness);
    let ms = multi_scatter(n_dot_v, n_dot_l, roughness, f0);

    let shadow = sample_shadow(world_pos);
    let light_color = vec3<f32>(1.0) * shading.light_pos.w;
    let direct = (kd * basecolor / PI + specular + ms) * light_color * n_dot_l * shadow;

    // Indirect lighting from the IBL bundle.
    let max_mip = shading.params.x;
    let r_dir = reflect(-v, n);
    let prefiltered = textureSampleLevel(prefiltered_map, ibl_sampler, r_dir, roughness * max_mip).rgb;
    let env_brdf = textureSampleLevel(brdf_lut, ibl_sampler, vec2<f32>(n_dot_v, roughness), 0.0).rg;
    var specular_ibl = prefiltered * (f0 * env_brdf.x + env_brdf.y);

    // Energy compensation keeps rough metals from darkening.
    let e_ss = max(env_brdf.x + env_brdf.y, 1e-4);
    specular_ibl *= vec3<f32>(1.0) + f0 * (1.0 / e_ss - 1.0);

    let irradiance = textureSampleLevel(prefiltered_map, ibl_sampler, n, max_mip).rgb;
    let diffuse_ibl = irradiance * basecolor * (1.0 - metalness);

    let ambient = (diffuse_ibl + specular_ibl) * occlusion;

    let color = direct + ambient + emission;
    return vec4<f32>(color, 1.0);
}
"#;

/// Per-frame uniforms for the shading pass.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ShadingUniform {
    /// Light-space view-projection matrix for the shadow test.
    pub light_view_proj: [[f32; 4]; 4],
    /// Camera world position.
    pub camera_pos: [f32; 4],
    /// Light position (xyz) and intensity (w).
    pub light_pos: [f32; 4],
    /// x = max prefiltered mip level.
    pub params: [f32; 4],
}

impl ShadingUniform {
    /// Build the uniform for the current frame.
    pub fn new(camera: &Camera, light: &LightRig, max_prefiltered_mip: f32) -> Self {
        Self {
            light_view_proj: light.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_pos: light.position.extend(LIGHT_INTENSITY).to_array(),
            params: [max_prefiltered_mip, 0.0, 0.0, 0.0],
        }
    }
}

/// The shading (resolve) pass.
pub struct ShadingPass {
    /// Fullscreen pipeline.
    pipeline: wgpu::RenderPipeline,
    /// Uniform buffer.
    uniform_buffer: wgpu::Buffer,
    /// Uniform bind group (group 0).
    uniform_bind_group: wgpu::BindGroup,
    /// G-buffer read bind group (group 1). Rebuilt with the G-buffer.
    gbuffer_bind_group: wgpu::BindGroup,
    /// Fullscreen quad vertex buffer.
    quad_buffer: wgpu::Buffer,
}

impl ShadingPass {
    /// Create the shading pass against the current G-buffer targets.
    ///
    /// The pass holds views into the G-buffer; recreate it whenever the
    /// G-buffer is reallocated.
    pub fn new(
        ctx: &Context,
        gbuffer: &GBuffer,
        shadow_map: &ShadowMap,
        ibl: &IblBundle,
    ) -> Self {
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shading Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADING_SHADER.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shading Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let gbuffer_layout = Self::create_gbuffer_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shading Pipeline Layout"),
            bind_group_layouts: &[
                &uniform_layout,
                &gbuffer_layout,
                shadow_map.bind_group_layout(),
                ibl.bind_group_layout(),
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shading Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[FullscreenVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shading Uniform Buffer"),
            size: std::mem::size_of::<ShadingUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shading Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let gbuffer_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shading G-Buffer Bind Group"),
            layout: &gbuffer_layout,
            entries: &GBufferChannel::ALL
                .iter()
                .map(|&channel| wgpu::BindGroupEntry {
                    binding: channel.index() as u32,
                    resource: wgpu::BindingResource::TextureView(gbuffer.view(channel)),
                })
                .collect::<Vec<_>>(),
        });

        let quad_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad Buffer"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            gbuffer_bind_group,
            quad_buffer,
        }
    }

    /// Bind group layout over the six G-buffer channels (read by index).
    fn create_gbuffer_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = GBufferChannel::ALL
            .iter()
            .map(|&channel| wgpu::BindGroupLayoutEntry {
                binding: channel.index() as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shading G-Buffer Layout"),
            entries: &entries,
        })
    }

    /// Upload the per-frame uniforms.
    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera, light: &LightRig, ibl: &IblBundle) {
        let uniform = ShadingUniform::new(
            camera,
            light,
            (ibl.prefiltered().mip_level_count() - 1) as f32,
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Record the fullscreen resolve into the HDR color target.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_target: &wgpu::TextureView,
        shadow_map: &ShadowMap,
        ibl: &IblBundle,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shading Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.gbuffer_bind_group, &[]);
        pass.set_bind_group(2, shadow_map.bind_group(), &[]);
        pass.set_bind_group(3, ibl.bind_group(), &[]);
        pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        pass.draw(0..4, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibl::PREFILTER_MIP_LEVELS;
    use glam::Vec3;

    #[test]
    fn test_shading_uniform_layout() {
        assert_eq!(std::mem::size_of::<ShadingUniform>(), 112);
    }

    #[test]
    fn test_shading_uniform_mip_range() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0));
        let light = LightRig::new();
        let max_mip = (PREFILTER_MIP_LEVELS - 1) as f32;
        let uniform = ShadingUniform::new(&camera, &light, max_mip);
        assert_eq!(uniform.params[0], max_mip);
        assert!(uniform.light_pos[3] > 0.0);
    }
}
