//! Shadow rendering pass (depth-only).

use crate::geometry::Vertex;
use crate::scene::Model;

use super::{LightRig, ShadowMap};

/// Depth-only shader source for the shadow pass.
const SHADOW_SHADER: &str = r#"
// Shadow depth shader - renders depth from the light's perspective

struct LightCamera {
    view_proj: mat4x4<f32>,
}

struct Model {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> light_camera: LightCamera;

@group(1) @binding(0)
var<uniform> model: Model;

struct VertexInput {
    @location(0) position: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_pos = model.model * vec4<f32>(in.position, 1.0);
    out.clip_position = light_camera.view_proj * world_pos;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) {
    // Depth is automatically written
}
"#;

/// Shadow pass rendering scene depth from the light's point of view.
pub struct ShadowPass {
    /// Depth-only render pipeline.
    pipeline: wgpu::RenderPipeline,
    /// Model bind group layout (shared with per-model bind groups).
    model_layout: wgpu::BindGroupLayout,
    /// Light camera uniform buffer.
    light_camera_buffer: wgpu::Buffer,
    /// Light camera bind group.
    light_camera_bind_group: wgpu::BindGroup,
}

impl ShadowPass {
    /// Create a new shadow pass.
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADOW_SHADER.into()),
        });

        // Light camera bind group layout (group 0)
        let light_camera_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Shadow Light Camera Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Model bind group layout (group 1)
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Model Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&light_camera_layout, &model_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
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
                targets: &[], // No color targets
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,      // Constant depth bias
                    slope_scale: 2.0, // Slope-scale bias
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let light_camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Light Camera Buffer"),
            size: 64, // mat4x4
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let light_camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Light Camera Bind Group"),
            layout: &light_camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_camera_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            model_layout,
            light_camera_buffer,
            light_camera_bind_group,
        }
    }

    /// Upload the light matrices for this frame.
    pub fn update(&self, queue: &wgpu::Queue, light: &LightRig) {
        let data = light.view_projection().to_cols_array_2d();
        queue.write_buffer(&self.light_camera_buffer, 0, bytemuck::bytes_of(&data));
    }

    /// Record the depth-only pass: clear the shadow map and draw every model.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        shadow_map: &ShadowMap,
        models: &[Model],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: shadow_map.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.light_camera_bind_group, &[]);

        for model in models {
            pass.set_bind_group(1, model.shadow_bind_group(), &[]);
            pass.set_vertex_buffer(0, model.vertex_buffer().slice(..));
            pass.draw(0..model.vertex_count(), 0..1);
        }
    }

    /// Get the model bind group layout.
    #[inline]
    pub fn model_layout(&self) -> &wgpu::BindGroupLayout {
        &self.model_layout
    }
}
