//! Geometry pass: rasterizes every model into the G-buffer.
//!
//! All six channel attachments plus the depth/stencil target are
//! written in one pass; the stencil plane is stamped with the coverage
//! value so later passes can separate geometry from background.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::gbuffer::{GBuffer, GBufferChannel, DEPTH_STENCIL_FORMAT, STENCIL_COVERED};
use crate::camera::Camera;
use crate::core::FrameState;
use crate::geometry::Vertex;
use crate::scene::{Material, Model};

/// Near plane of the viewer projection.
pub const CAMERA_NEAR: f32 = 0.1;
/// Far plane of the viewer projection; linear G-buffer depth is
/// normalized against it.
pub const CAMERA_FAR: f32 = 100.0;

const GEOMETRY_SHADER: &str = r#"
// Geometry shader - fills the G-buffer and stamps stencil coverage

struct Camera {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    position: vec3<f32>,
    far: f32,
    offset_index: u32,
}

struct Model {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
}

struct Material {
    basecolor_factor: vec4<f32>,
    metalness_factor: f32,
    roughness_factor: f32,
    alpha_cutoff: f32,
    use_basecolor_map: u32,
    use_metalness_map: u32,
    use_roughness_map: u32,
    use_normal_map: u32,
    use_occlusion_map: u32,
    use_emission_map: u32,
    enable_blend: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(1) @binding(0)
var<uniform> model: Model;

@group(2) @binding(0)
var<uniform> material: Material;
@group(2) @binding(1)
var map_sampler: sampler;
@group(2) @binding(2)
var basecolor_map: texture_2d<f32>;
@group(2) @binding(3)
var metalness_map: texture_2d<f32>;
@group(2) @binding(4)
var roughness_map: texture_2d<f32>;
@group(2) @binding(5)
var normal_map: texture_2d<f32>;
@group(2) @binding(6)
var occlusion_map: texture_2d<f32>;
@group(2) @binding(7)
var emission_map: texture_2d<f32>;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) texcoord: vec2<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tangent: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tangent: vec4<f32>,
    @location(4) view_depth: f32,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_pos = model.model * vec4<f32>(in.position, 1.0);
    out.clip_position = camera.view_proj * world_pos;
    out.world_pos = world_pos.xyz;
    out.uv = in.texcoord;
    out.normal = normalize((model.normal * vec4<f32>(in.normal, 0.0)).xyz);
    let world_tangent = normalize((model.model * vec4<f32>(in.tangent.xyz, 0.0)).xyz);
    out.tangent = vec4<f32>(world_tangent, in.tangent.w);
    out.view_depth = -(camera.view * world_pos).z / camera.far;
    return out;
}

struct FragmentOutput {
    @location(0) position: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) basecolor: vec4<f32>,
    @location(3) rmo: vec4<f32>,
    @location(4) emission: vec4<f32>,
    @location(5) depth: vec4<f32>,
}

@fragment
fn fs_main(in: VertexOutput) -> FragmentOutput {
    var basecolor = material.basecolor_factor;
    if (material.use_basecolor_map == 1u) {
        basecolor = textureSample(basecolor_map, map_sampler, in.uv);
    }

    if (material.alpha_cutoff > 0.0 && basecolor.a < material.alpha_cutoff) {
        discard;
    }
    if (material.enable_blend == 1u) {
        // Screen-door transparency: the per-frame offset rotates the
        // dither pattern so coverage averages out over the cycle.
        var bayer = array<f32, 16>(
            0.0625, 0.5625, 0.1875, 0.6875,
            0.8125, 0.3125, 0.9375, 0.4375,
            0.25,   0.75,   0.125,  0.625,
            1.0,    0.5,    0.875,  0.375,
        );
        let coords = vec2<u32>(in.clip_position.xy) + vec2<u32>(camera.offset_index, camera.offset_index * 3u);
        let threshold = bayer[(coords.y % 4u) * 4u + (coords.x % 4u)];
        if (basecolor.a < threshold) {
            discard;
        }
    }

    var metalness = material.metalness_factor;
    if (material.use_metalness_map == 1u) {
        metalness = textureSample(metalness_map, map_sampler, in.uv).r;
    }
    var roughness = material.roughness_factor;
    if (material.use_roughness_map == 1u) {
        roughness = textureSample(roughness_map, map_sampler, in.uv).r;
    }
    var occlusion = 1.0;
    if (material.use_occlusion_map == 1u) {
        occlusion = textureSample(occlusion_map, map_sampler, in.uv).r;
    }
    var emission = vec3<f32>(0.0);
    if (material.use_emission_map == 1u) {
        emission = textureSample(emission_map, map_sampler, in.uv).rgb;
    }

    var n = normalize(in.normal);
    if (material.use_normal_map == 1u) {
        let t = normalize(in.tangent.xyz - n * dot(in.tangent.xyz, n));
        let b = cross(n, t) * in.tangent.w;
        let sampled = textureSample(normal_map, map_sampler, in.uv).xyz * 2.0 - 1.0;
        n = normalize(t * sampled.x + b * sampled.y + n * sampled.z);
    }

    var out: FragmentOutput;
    out.position = vec4<f32>(in.world_pos, 1.0);
    out.normal = vec4<f32>(n, 0.0);
    out.basecolor = basecolor;
    out.rmo = vec4<f32>(roughness, metalness, occlusion, 1.0);
    out.emission = vec4<f32>(emission, 1.0);
    out.depth = vec4<f32>(in.view_depth, 0.0, 0.0, 1.0);
    return out;
}
"#;

/// Per-frame camera uniforms for the geometry pass.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// View matrix (for linear depth).
    pub view: [[f32; 4]; 4],
    /// Camera world position.
    pub position: [f32; 3],
    /// Far plane distance.
    pub far: f32,
    /// Rotating per-frame offset index.
    pub offset_index: u32,
    /// Padding.
    pub _padding: [u32; 3],
}

impl CameraUniform {
    /// Build the uniform for the current frame.
    pub fn new(camera: &Camera, aspect_ratio: f32, frame: &FrameState) -> Self {
        let view = camera.view_matrix();
        let projection = Mat4::perspective_rh(
            camera.zoom.to_radians(),
            aspect_ratio,
            CAMERA_NEAR,
            CAMERA_FAR,
        );

        Self {
            view_proj: (projection * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            position: camera.position.to_array(),
            far: CAMERA_FAR,
            offset_index: frame.offset_index(),
            _padding: [0; 3],
        }
    }
}

/// The geometry pass.
pub struct GeometryPass {
    /// Back-face culled pipeline.
    pipeline: wgpu::RenderPipeline,
    /// Pipeline for double-sided materials.
    pipeline_double_sided: wgpu::RenderPipeline,
    /// Model bind group layout (group 1).
    model_layout: wgpu::BindGroupLayout,
    /// Material bind group layout (group 2).
    material_layout: wgpu::BindGroupLayout,
    /// Camera uniform buffer.
    camera_buffer: wgpu::Buffer,
    /// Camera bind group (group 0).
    camera_bind_group: wgpu::BindGroup,
}

impl GeometryPass {
    /// Create the geometry pass pipelines and layouts.
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Geometry Shader"),
            source: wgpu::ShaderSource::Wgsl(GEOMETRY_SHADER.into()),
        });

        let uniform_entry = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Camera Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Model Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Material Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                texture_entry(5),
                texture_entry(6),
                texture_entry(7),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &model_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let targets: Vec<Option<wgpu::ColorTargetState>> = GBufferChannel::ALL
            .iter()
            .map(|channel| {
                Some(wgpu::ColorTargetState {
                    format: channel.format(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let make_pipeline = |cull_mode: Option<wgpu::Face>, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_STENCIL_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState {
                        front: wgpu::StencilFaceState {
                            compare: wgpu::CompareFunction::Always,
                            fail_op: wgpu::StencilOperation::Keep,
                            depth_fail_op: wgpu::StencilOperation::Keep,
                            pass_op: wgpu::StencilOperation::Replace,
                        },
                        back: wgpu::StencilFaceState {
                            compare: wgpu::CompareFunction::Always,
                            fail_op: wgpu::StencilOperation::Keep,
                            depth_fail_op: wgpu::StencilOperation::Keep,
                            pass_op: wgpu::StencilOperation::Replace,
                        },
                        read_mask: 0xFF,
                        write_mask: 0xFF,
                    },
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipeline = make_pipeline(Some(wgpu::Face::Back), "Geometry Pipeline");
        let pipeline_double_sided = make_pipeline(None, "Geometry Pipeline (Double-Sided)");

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Geometry Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Geometry Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            pipeline_double_sided,
            model_layout,
            material_layout,
            camera_buffer,
            camera_bind_group,
        }
    }

    /// Upload the camera uniforms for this frame.
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        camera: &Camera,
        aspect_ratio: f32,
        frame: &FrameState,
    ) {
        let uniform = CameraUniform::new(camera, aspect_ratio, frame);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Record the geometry pass: clear the G-buffer and draw every model.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        models: &[Model],
        materials: &[Material],
    ) {
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = GBufferChannel::ALL
            .iter()
            .map(|&channel| {
                Some(wgpu::RenderPassColorAttachment {
                    view: gbuffer.view(channel),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: gbuffer.depth_stencil_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_stencil_reference(STENCIL_COVERED);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for model in models {
            let material = &materials[model.material_index()];
            if material.double_sided() {
                pass.set_pipeline(&self.pipeline_double_sided);
            } else {
                pass.set_pipeline(&self.pipeline);
            }
            pass.set_bind_group(1, model.bind_group(), &[]);
            pass.set_bind_group(2, material.bind_group(), &[]);
            pass.set_vertex_buffer(0, model.vertex_buffer().slice(..));
            pass.draw(0..model.vertex_count(), 0..1);
        }
    }

    /// Get the model bind group layout.
    #[inline]
    pub fn model_layout(&self) -> &wgpu::BindGroupLayout {
        &self.model_layout
    }

    /// Get the material bind group layout.
    #[inline]
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_camera_uniform_size() {
        // WGSL struct layout: two mat4x4 + vec3 + f32 + u32 + padding.
        assert_eq!(std::mem::size_of::<CameraUniform>(), 160);
    }

    #[test]
    fn test_camera_uniform_carries_frame_offset() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0));
        let mut frame = FrameState::new();
        frame.advance();
        frame.advance();
        let uniform = CameraUniform::new(&camera, 1.0, &frame);
        assert_eq!(uniform.offset_index, 2);
        assert_eq!(uniform.far, CAMERA_FAR);
    }
}
