//! Geometry module: vertex formats, mesh data, and primitives.

mod mesh;
mod vertex;

pub use mesh::{Mesh, MeshCache};
pub use vertex::{FullscreenVertex, Vertex, FULLSCREEN_QUAD_VERTICES};
