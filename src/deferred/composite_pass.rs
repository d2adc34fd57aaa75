//! Post-process / composite pass.
//!
//! The final pass of the frame and the only writer of the presentation
//! target. The G-buffer's depth/stencil target is attached read-only,
//! so the coverage mask stamped by the geometry pass keeps masking
//! here: covered pixels receive the composited resolve output
//! (environment fog from the linear-depth channel, then tone mapping),
//! background pixels receive the skybox.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use super::gbuffer::{GBuffer, GBufferChannel, DEPTH_STENCIL_FORMAT, STENCIL_COVERED};
use super::geometry_pass::{CAMERA_FAR, CAMERA_NEAR};
use crate::camera::Camera;
use crate::core::Context;
use crate::geometry::{FullscreenVertex, Mesh, Vertex, FULLSCREEN_QUAD_VERTICES};
use crate::ibl::IblBundle;

/// Exponential fog density against normalized linear depth.
const FOG_DENSITY: f32 = 1.2;
/// Fog blend strength.
const FOG_STRENGTH: f32 = 0.08;

const COMPOSITE_SHADER: &str = r#"
// Composite shader - resolve output + G-buffer channels -> surface,
// with the skybox filling uncovered pixels.

struct Composite {
    sky_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    params: vec4<f32>,   // x = max prefiltered mip, y = fog density, z = fog strength
}

@group(0) @binding(0)
var<uniform> composite: Composite;

@group(1) @binding(0)
var shading_color: texture_2d<f32>;
@group(1) @binding(1)
var g_position: texture_2d<f32>;
@group(1) @binding(2)
var g_normal: texture_2d<f32>;
@group(1) @binding(3)
var g_rmo: texture_2d<f32>;
@group(1) @binding(4)
var g_depth: texture_2d<f32>;

@group(2) @binding(0)
var prefiltered_map: texture_cube<f32>;
@group(2) @binding(4)
var skybox_map: texture_cube<f32>;
@group(2) @binding(5)
var ibl_sampler: sampler;

fn aces_tonemap(color: vec3<f32>) -> vec3<f32> {
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;
    return clamp((color * (a * color + b)) / (color * (c * color + d) + e), vec3<f32>(0.0), vec3<f32>(1.0));
}

// ---- fullscreen composite (stencil == covered) ----

struct QuadInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_composite(in: QuadInput) -> QuadOutput {
    var out: QuadOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_composite(in: QuadOutput) -> @location(0) vec4<f32> {
    let coords = vec2<i32>(in.clip_position.xy);

    var color = textureLoad(shading_color, coords, 0).rgb;
    let world_pos = textureLoad(g_position, coords, 0).xyz;
    let depth = textureLoad(g_depth, coords, 0).r;

    // Aerial perspective: fade distant geometry toward the ambient
    // environment along the view ray.
    let view_dir = normalize(world_pos - composite.camera_pos.xyz);
    let fog_color = textureSampleLevel(prefiltered_map, ibl_sampler, view_dir, composite.params.x).rgb;
    let fog = (1.0 - exp(-composite.params.y * depth)) * composite.params.z;
    color = mix(color, fog_color, clamp(fog, 0.0, 1.0));

    return vec4<f32>(aces_tonemap(color), 1.0);
}

// ---- skybox (stencil != covered) ----

struct SkyInput {
    @location(0) position: vec3<f32>,
}

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

@vertex
fn vs_skybox(in: SkyInput) -> SkyOutput {
    var out: SkyOutput;
    let p = composite.sky_view_proj * vec4<f32>(in.position, 1.0);
    // Pin the cube to the far plane.
    out.clip_position = p.xyww;
    out.direction = in.position;
    return out;
}

@fragment
fn fs_skybox(in: SkyOutput) -> @location(0) vec4<f32> {
    let sky = textureSampleLevel(skybox_map, ibl_sampler, normalize(in.direction), 0.0).rgb;
    return vec4<f32>(aces_tonemap(sky), 1.0);
}
"#;

/// Per-frame uniforms for the composite pass.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct CompositeUniform {
    /// Projection * rotation-only view, for the skybox.
    pub sky_view_proj: [[f32; 4]; 4],
    /// Camera world position.
    pub camera_pos: [f32; 4],
    /// x = max prefiltered mip, y = fog density, z = fog strength.
    pub params: [f32; 4],
}

impl CompositeUniform {
    /// Build the uniform for the current frame.
    pub fn new(camera: &Camera, aspect_ratio: f32, max_prefiltered_mip: f32) -> Self {
        let view_rot = Mat4::from_mat3(Mat3::from_mat4(camera.view_matrix()));
        let projection = Mat4::perspective_rh(
            camera.zoom.to_radians(),
            aspect_ratio,
            CAMERA_NEAR,
            CAMERA_FAR,
        );

        Self {
            sky_view_proj: (projection * view_rot).to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            params: [max_prefiltered_mip, FOG_DENSITY, FOG_STRENGTH, 0.0],
        }
    }
}

/// The composite pass.
pub struct CompositePass {
    /// Fullscreen composite pipeline (stencil == covered).
    composite_pipeline: wgpu::RenderPipeline,
    /// Skybox pipeline (stencil != covered).
    skybox_pipeline: wgpu::RenderPipeline,
    /// Uniform buffer.
    uniform_buffer: wgpu::Buffer,
    /// Uniform bind group (group 0).
    uniform_bind_group: wgpu::BindGroup,
    /// Input textures bind group (group 1). Rebuilt with the G-buffer.
    input_bind_group: wgpu::BindGroup,
    /// Fullscreen quad vertex buffer.
    quad_buffer: wgpu::Buffer,
    /// Skybox cube vertex buffer.
    skybox_buffer: wgpu::Buffer,
    /// Skybox cube vertex count.
    skybox_vertex_count: u32,
}

impl CompositePass {
    /// Create the composite pass against the current targets.
    ///
    /// Holds views into the G-buffer and the resolve color target;
    /// recreate it whenever those are reallocated.
    pub fn new(
        ctx: &Context,
        gbuffer: &GBuffer,
        color_target: &wgpu::TextureView,
        ibl: &IblBundle,
    ) -> Self {
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(COMPOSITE_SHADER.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let input_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..5)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Input Layout"),
            entries: &input_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &input_layout, ibl.bind_group_layout()],
            push_constant_ranges: &[],
        });

        // Read-only depth/stencil: stencil decides coverage, nothing is written.
        let stencil_state = |compare| wgpu::DepthStencilState {
            format: DEPTH_STENCIL_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState {
                front: wgpu::StencilFaceState {
                    compare,
                    fail_op: wgpu::StencilOperation::Keep,
                    depth_fail_op: wgpu::StencilOperation::Keep,
                    pass_op: wgpu::StencilOperation::Keep,
                },
                back: wgpu::StencilFaceState {
                    compare,
                    fail_op: wgpu::StencilOperation::Keep,
                    depth_fail_op: wgpu::StencilOperation::Keep,
                    pass_op: wgpu::StencilOperation::Keep,
                },
                read_mask: 0xFF,
                write_mask: 0x00,
            },
            bias: wgpu::DepthBiasState::default(),
        };

        let target = [Some(wgpu::ColorTargetState {
            format: ctx.surface_format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let composite_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Composite Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_composite"),
                    buffers: &[FullscreenVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_composite"),
                    targets: &target,
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
                depth_stencil: Some(stencil_state(wgpu::CompareFunction::Equal)),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let skybox_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_skybox"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_skybox"),
                targets: &target,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // The camera sits inside the cube.
                cull_mode: Some(wgpu::Face::Front),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(stencil_state(wgpu::CompareFunction::NotEqual)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniform Buffer"),
            size: std::mem::size_of::<CompositeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let input_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Input Bind Group"),
            layout: &input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(color_target),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        gbuffer.view(GBufferChannel::Position),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        gbuffer.view(GBufferChannel::Normal),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(gbuffer.view(GBufferChannel::Rmo)),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(
                        gbuffer.view(GBufferChannel::Depth),
                    ),
                },
            ],
        });

        let quad_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Quad Buffer"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let cube = Mesh::unit_cube();
        let skybox_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Cube Buffer"),
            contents: bytemuck::cast_slice(&cube.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            composite_pipeline,
            skybox_pipeline,
            uniform_buffer,
            uniform_bind_group,
            input_bind_group,
            quad_buffer,
            skybox_buffer,
            skybox_vertex_count: cube.vertex_count(),
        }
    }

    /// Upload the per-frame uniforms.
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        camera: &Camera,
        aspect_ratio: f32,
        ibl: &IblBundle,
    ) {
        let uniform = CompositeUniform::new(
            camera,
            aspect_ratio,
            (ibl.prefiltered().mip_level_count() - 1) as f32,
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Record the composite pass into the presentation target.
    ///
    /// The single render pass here is the frame's only write to the
    /// surface.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        gbuffer: &GBuffer,
        ibl: &IblBundle,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.02,
                        g: 0.02,
                        b: 0.03,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            // Read-only: the stencil coverage mask from the geometry
            // pass is consumed, never modified.
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: gbuffer.depth_stencil_view(),
                depth_ops: None,
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_stencil_reference(STENCIL_COVERED);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.input_bind_group, &[]);
        pass.set_bind_group(2, ibl.bind_group(), &[]);

        // Covered pixels: composite the resolve output.
        pass.set_pipeline(&self.composite_pipeline);
        pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        pass.draw(0..4, 0..1);

        // Background pixels: skybox.
        pass.set_pipeline(&self.skybox_pipeline);
        pass.set_vertex_buffer(0, self.skybox_buffer.slice(..));
        pass.draw(0..self.skybox_vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibl::PREFILTER_MIP_LEVELS;
    use glam::Vec3;

    #[test]
    fn test_composite_uniform_layout() {
        assert_eq!(std::mem::size_of::<CompositeUniform>(), 96);
    }

    #[test]
    fn test_sky_view_has_no_translation() {
        let max_mip = (PREFILTER_MIP_LEVELS - 1) as f32;
        let mut camera = Camera::new(Vec3::new(10.0, 5.0, -3.0));
        camera.set_orientation(30.0, -10.0);
        let uniform = CompositeUniform::new(&camera, 1.0, max_mip);

        let moved = {
            let mut c = camera.clone();
            c.position = Vec3::new(-50.0, 0.0, 8.0);
            CompositeUniform::new(&c, 1.0, max_mip)
        };

        // The skybox matrix only rotates; camera translation must not
        // change it.
        assert_eq!(uniform.sky_view_proj, moved.sky_view_proj);
    }
}
