//! A drawable model: shared mesh, material reference, world transform,
//! and the GPU buffers built from them.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::core::Context;
use crate::geometry::Mesh;

/// Per-model uniforms: world matrix and its normal matrix.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ModelUniform {
    /// World (model) matrix.
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of the world matrix.
    pub normal: [[f32; 4]; 4],
}

impl ModelUniform {
    /// Build from a world transform.
    pub fn new(transform: Mat4) -> Self {
        Self {
            model: transform.to_cols_array_2d(),
            normal: transform.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// A model instance.
///
/// The mesh is shared (by reference from the mesh cache); the vertex
/// buffer is this model's own, built once at construction. The stored
/// world matrix is used directly as the per-draw model matrix.
pub struct Model {
    /// Shared mesh data.
    mesh: Arc<Mesh>,
    /// Index into the scene's material list.
    material_index: usize,
    /// World transform.
    transform: Mat4,
    /// Interleaved vertex buffer.
    vertex_buffer: wgpu::Buffer,
    /// Number of vertices to draw.
    vertex_count: u32,
    /// Model uniform buffer (shared by both bind groups).
    uniform_buffer: wgpu::Buffer,
    /// Geometry-pass bind group.
    bind_group: wgpu::BindGroup,
    /// Shadow-pass bind group.
    shadow_bind_group: wgpu::BindGroup,
}

impl Model {
    /// Create a model and its GPU resources.
    pub fn new(
        ctx: &Context,
        mesh: Arc<Mesh>,
        material_index: usize,
        transform: Mat4,
        model_layout: &wgpu::BindGroupLayout,
        shadow_model_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let vertex_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform = ModelUniform::new(transform);
        let uniform_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shadow_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Shadow Bind Group"),
            layout: shadow_model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let vertex_count = mesh.vertex_count();

        Self {
            mesh,
            material_index,
            transform,
            vertex_buffer,
            vertex_count,
            uniform_buffer,
            bind_group,
            shadow_bind_group,
        }
    }

    /// Update the world transform and re-upload the uniforms.
    pub fn set_transform(&mut self, queue: &wgpu::Queue, transform: Mat4) {
        self.transform = transform;
        let uniform = ModelUniform::new(transform);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// The shared mesh.
    #[inline]
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Material index.
    #[inline]
    pub fn material_index(&self) -> usize {
        self.material_index
    }

    /// World transform.
    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Vertex buffer.
    #[inline]
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Geometry-pass bind group.
    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Shadow-pass bind group.
    #[inline]
    pub fn shadow_bind_group(&self) -> &wgpu::BindGroup {
        &self.shadow_bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_model_uniform_uses_stored_matrix_directly() {
        // Rotation and scale must survive into the model matrix; the
        // transform is not decomposed.
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::from_rotation_y(1.0),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let uniform = ModelUniform::new(transform);
        assert_eq!(uniform.model, transform.to_cols_array_2d());
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        let transform = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniform = ModelUniform::new(transform);
        let normal = Mat4::from_cols_array_2d(&uniform.normal);

        // Non-uniform scale: the normal matrix compensates.
        assert!((normal.x_axis.x - 0.5).abs() < 1e-6);
        assert!((normal.y_axis.y - 1.0).abs() < 1e-6);
    }
}
