//! Wavefront OBJ file loader.
//!
//! Produces an expanded vertex sequence (three vertices per face) in the
//! interleaved layout the geometry pass consumes. Tangents are taken
//! from the file when present (`vtan`, rare) and default to +X
//! otherwise.

use super::LoadError;
use crate::geometry::{Mesh, Vertex};

/// Wavefront OBJ file loader.
pub struct ObjLoader;

impl Default for ObjLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjLoader {
    /// Create a new OBJ loader.
    pub fn new() -> Self {
        Self
    }

    /// Load a mesh from OBJ file content.
    pub fn load_from_str(&self, content: &str) -> Result<Mesh, LoadError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut texcoords: Vec<[f32; 2]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tangents: Vec<[f32; 4]> = Vec::new();
        let mut vertices: Vec<Vertex> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" if parts.len() >= 4 => {
                    positions.push(parse_vec3(&parts[1..4])?);
                }
                "vt" if parts.len() >= 3 => {
                    let uv = parse_vec2(&parts[1..3])?;
                    texcoords.push(uv);
                }
                "vn" if parts.len() >= 4 => {
                    normals.push(parse_vec3(&parts[1..4])?);
                }
                "vtan" if parts.len() >= 5 => {
                    let v = parse_vec3(&parts[1..4])?;
                    let w = parse_f32(parts[4])?;
                    tangents.push([v[0], v[1], v[2], w]);
                }
                "f" if parts.len() >= 4 => {
                    let corners: Vec<(usize, usize, usize)> = parts[1..]
                        .iter()
                        .map(|p| parse_face_corner(p))
                        .collect::<Result<_, _>>()?;

                    // Fan triangulation for convex polygons.
                    for i in 1..corners.len() - 1 {
                        for &(vi, ti, ni) in &[corners[0], corners[i], corners[i + 1]] {
                            vertices.push(build_vertex(
                                vi, ti, ni, &positions, &texcoords, &normals, &tangents,
                            )?);
                        }
                    }
                }
                _ => {}
            }
        }

        if vertices.is_empty() {
            return Err(LoadError::Malformed("no faces".into()));
        }

        Ok(Mesh::new(vertices))
    }
}

fn build_vertex(
    vi: usize,
    ti: usize,
    ni: usize,
    positions: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    normals: &[[f32; 3]],
    tangents: &[[f32; 4]],
) -> Result<Vertex, LoadError> {
    let position = *positions
        .get(vi.wrapping_sub(1))
        .ok_or_else(|| LoadError::IndexOutOfRange(format!("position {}", vi)))?;

    // Texcoord/normal indices of zero mean the corner omitted them.
    let texcoord = if ti == 0 {
        [0.0, 0.0]
    } else {
        *texcoords
            .get(ti - 1)
            .ok_or_else(|| LoadError::IndexOutOfRange(format!("texcoord {}", ti)))?
    };
    let normal = if ni == 0 {
        [0.0, 0.0, 1.0]
    } else {
        *normals
            .get(ni - 1)
            .ok_or_else(|| LoadError::IndexOutOfRange(format!("normal {}", ni)))?
    };

    // Tangents index by position, falling back to +X.
    let tangent = tangents
        .get(vi.wrapping_sub(1))
        .copied()
        .unwrap_or([1.0, 0.0, 0.0, 1.0]);

    Ok(Vertex::new(position, texcoord, normal, tangent))
}

/// Parse a face corner: `v`, `v/t`, `v//n`, or `v/t/n` (1-indexed, 0 = absent).
fn parse_face_corner(corner: &str) -> Result<(usize, usize, usize), LoadError> {
    let mut indices = [0usize; 3];
    for (slot, part) in corner.split('/').take(3).enumerate() {
        if !part.is_empty() {
            indices[slot] = part
                .parse()
                .map_err(|_| LoadError::Malformed(format!("face corner '{}'", corner)))?;
        }
    }
    Ok((indices[0], indices[1], indices[2]))
}

fn parse_f32(s: &str) -> Result<f32, LoadError> {
    s.parse()
        .map_err(|_| LoadError::Malformed(format!("number '{}'", s)))
}

fn parse_vec2(parts: &[&str]) -> Result<[f32; 2], LoadError> {
    Ok([parse_f32(parts[0])?, parse_f32(parts[1])?])
}

fn parse_vec3(parts: &[&str]) -> Result<[f32; 3], LoadError> {
    Ok([
        parse_f32(parts[0])?,
        parse_f32(parts[1])?,
        parse_f32(parts[2])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn test_triangle() {
        let mesh = ObjLoader::new().load_from_str(TRIANGLE).unwrap();
        assert_eq!(mesh.num_faces, 1);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[1].texcoord, [1.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        // No tangent stream: default tangent.
        assert_eq!(mesh.vertices[0].tangent, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_quad_fan_triangulation() {
        let obj = "
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";
        let mesh = ObjLoader::new().load_from_str(obj).unwrap();
        assert_eq!(mesh.num_faces, 2);
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let obj = "
v 0 0 0
f 1 2 3
";
        assert!(matches!(
            ObjLoader::new().load_from_str(obj),
            Err(LoadError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn test_empty_file_is_malformed() {
        assert!(matches!(
            ObjLoader::new().load_from_str("# nothing\n"),
            Err(LoadError::Malformed(_))
        ));
    }
}
