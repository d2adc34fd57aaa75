//! Vertex types and layouts.

use bytemuck::{Pod, Zeroable};

/// Interleaved scene vertex.
///
/// The attribute order is the contract between model vertex buffers and
/// the geometry-pass pipeline; both sides use [`Vertex::layout`].
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position in local space.
    pub position: [f32; 3],
    /// Texture coordinates.
    pub texcoord: [f32; 2],
    /// Normal vector.
    pub normal: [f32; 3],
    /// Tangent (xyz) and bitangent sign (w).
    pub tangent: [f32; 4],
}

impl Vertex {
    /// Create a new vertex.
    pub const fn new(
        position: [f32; 3],
        texcoord: [f32; 2],
        normal: [f32; 3],
        tangent: [f32; 4],
    ) -> Self {
        Self {
            position,
            texcoord,
            normal,
            tangent,
        }
    }

    /// Get the vertex buffer layout for this vertex type.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Vertex attributes.
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
        // position
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        // texcoord
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x2,
        },
        // normal
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x3,
        },
        // tangent
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32x4,
        },
    ];
}

/// Vertex for fullscreen quad passes (position + uv).
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct FullscreenVertex {
    /// Position in clip space (x, y).
    pub position: [f32; 2],
    /// UV coordinates.
    pub uv: [f32; 2],
}

impl FullscreenVertex {
    /// Vertex buffer layout.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 8,
                    shader_location: 1,
                },
            ],
        }
    }
}

/// Fullscreen quad as a four-vertex triangle strip.
pub const FULLSCREEN_QUAD_VERTICES: [FullscreenVertex; 4] = [
    FullscreenVertex {
        position: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    FullscreenVertex {
        position: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    FullscreenVertex {
        position: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
    FullscreenVertex {
        position: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 48);
        assert_eq!(layout.attributes.len(), 4);
        // Attribute order: position, texcoord, normal, tangent.
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 20);
        assert_eq!(layout.attributes[3].offset, 32);
    }
}
