//! Scene: description parsing, materials, models, and the per-frame
//! pipeline orchestration.

mod description;
mod material;
mod model;
#[allow(clippy::module_inception)]
mod scene;

pub use description::{MaterialDescription, ModelDescription, SceneDescription};
pub use material::{Material, MaterialDefaults, MaterialUniform};
pub use model::{Model, ModelUniform};
pub use scene::Scene;

use thiserror::Error;

use crate::ibl::IblError;
use crate::loaders::LoadError;

/// Errors fatal to scene construction.
#[derive(Error, Debug)]
pub enum SceneError {
    /// Malformed scene description text.
    #[error("Scene parse error: {0}")]
    Parse(String),

    /// A model referenced a material or transform out of bounds.
    #[error("Model {model} references {kind} {index} but only {len} exist")]
    IndexOutOfBounds {
        /// Index of the offending model.
        model: usize,
        /// Which collection was indexed.
        kind: &'static str,
        /// The out-of-bounds index.
        index: usize,
        /// Size of the collection.
        len: usize,
    },

    /// IBL precompute failed (missing or bad environment faces).
    #[error(transparent)]
    Ibl(#[from] IblError),

    /// A mesh file failed to load.
    #[error(transparent)]
    Mesh(#[from] LoadError),

    /// The render-target set cannot be realized on this device.
    #[error("Render target validation failed: {0}")]
    TargetValidation(String),
}
