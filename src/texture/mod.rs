//! Texture module for image and texture management.

mod cube_texture;
mod texture2d;

pub use cube_texture::{CubeFace, CubeTexture};
pub use texture2d::{Texture2D, TextureRole};
