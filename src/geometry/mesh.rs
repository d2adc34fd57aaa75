//! Mesh data and the shared mesh cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Vertex;
use crate::loaders::{LoadError, ObjLoader};

/// Triangle mesh as an ordered vertex sequence.
///
/// Vertices are already expanded per corner (three per face); models
/// upload them verbatim into their vertex buffers.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Interleaved vertices, three per face.
    pub vertices: Vec<Vertex>,
    /// Number of triangle faces.
    pub num_faces: u32,
}

impl Mesh {
    /// Build a mesh from an expanded vertex list.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        let num_faces = (vertices.len() / 3) as u32;
        Self {
            vertices,
            num_faces,
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Axis-aligned unit cube centered at the origin (12 faces).
    ///
    /// Also serves as the skybox volume; the skybox pipeline only reads
    /// positions.
    pub fn unit_cube() -> Self {
        // One face per cube side: outward normal, +X-ish tangent.
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // (normal, u axis, v axis)
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(36);
        for (normal, u_axis, v_axis) in FACES {
            let n = glam::Vec3::from(normal);
            let u = glam::Vec3::from(u_axis);
            let v = glam::Vec3::from(v_axis);
            let corner = |su: f32, sv: f32| (n + u * su + v * sv) * 0.5;

            let quad = [
                (corner(-1.0, -1.0), [0.0, 1.0]),
                (corner(1.0, -1.0), [1.0, 1.0]),
                (corner(1.0, 1.0), [1.0, 0.0]),
                (corner(-1.0, 1.0), [0.0, 0.0]),
            ];
            let tangent = [u.x, u.y, u.z, 1.0];

            for &index in &[0usize, 1, 2, 0, 2, 3] {
                let (p, uv) = quad[index];
                vertices.push(Vertex::new(p.to_array(), uv, normal, tangent));
            }
        }

        Self::new(vertices)
    }
}

/// Cache sharing loaded meshes by path.
///
/// Models hold `Arc<Mesh>` references; the cache never unloads during a
/// scene's lifetime.
#[derive(Default)]
pub struct MeshCache {
    meshes: HashMap<PathBuf, Arc<Mesh>>,
}

impl MeshCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a mesh from an OBJ file, reusing a previous load of the same path.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Mesh>, LoadError> {
        if let Some(mesh) = self.meshes.get(path) {
            return Ok(mesh.clone());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(path.display().to_string(), e.to_string()))?;
        let mesh = Arc::new(ObjLoader::new().load_from_str(&content)?);
        log::info!(
            "Loaded mesh {} ({} faces)",
            path.display(),
            mesh.num_faces
        );
        self.meshes.insert(path.to_path_buf(), mesh.clone());
        Ok(mesh)
    }

    /// Number of distinct meshes held.
    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_has_twelve_faces() {
        let cube = Mesh::unit_cube();
        assert_eq!(cube.num_faces, 12);
        assert_eq!(cube.vertex_count(), 36);

        // All positions on the half-unit boundary.
        for v in &cube.vertices {
            for c in v.position {
                assert!((c.abs() - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_unit_cube_normals_are_outward() {
        let cube = Mesh::unit_cube();
        for v in &cube.vertices {
            let p = glam::Vec3::from(v.position);
            let n = glam::Vec3::from(v.normal);
            assert!(p.dot(n) > 0.0);
        }
    }
}
