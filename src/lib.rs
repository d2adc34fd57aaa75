//! # Prism - Deferred PBR Renderer
//!
//! Prism is a physically-based renderer built on wgpu. It loads a
//! declarative scene description, builds GPU resources, and renders
//! frames through a multi-pass deferred pipeline:
//!
//! shadow map -> G-buffer -> shading resolve -> composite.
//!
//! Environment lighting uses a one-shot IBL precompute stage:
//! a GGX-prefiltered specular cubemap, a split-sum BRDF lookup table,
//! and a pair of multi-scatter energy-compensation tables.
//!
//! ## Example
//!
//! ```ignore
//! use prism::prelude::*;
//!
//! let ctx = Context::new_blocking(window, 1080, 1080, &RenderConfig::default())?;
//! let desc = SceneDescription::from_str(&std::fs::read_to_string("helmet.scn")?)?;
//! let mut scene = Scene::from_description(&ctx, &desc, "assets")?;
//! let camera = Camera::new(glam::Vec3::new(0.0, 0.0, 3.0));
//!
//! let mut frame = FrameState::new();
//! scene.render(&ctx, &camera, &mut frame)?;
//! ```

#![warn(missing_docs)]

pub mod camera;
pub mod core;
pub mod deferred;
pub mod geometry;
pub mod ibl;
pub mod loaders;
pub mod scene;
pub mod shadows;
pub mod texture;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::camera::Camera;
    pub use crate::core::{Context, ContextError, FrameState, RenderConfig};
    pub use crate::deferred::GBuffer;
    pub use crate::geometry::{Mesh, MeshCache, Vertex};
    pub use crate::ibl::IblBundle;
    pub use crate::scene::{Material, Model, Scene, SceneDescription, SceneError};
    pub use crate::shadows::{LightRig, ShadowMap};
    pub use crate::texture::{CubeTexture, Texture2D, TextureRole};
}
