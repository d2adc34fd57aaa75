//! Shadow mapping: depth-only light pass and its assets.

mod shadow_map;
mod shadow_pass;

pub use shadow_map::{LightRig, ShadowMap};
pub use shadow_pass::ShadowPass;

/// Shadow map resolution (width and height).
pub const SHADOW_RESOLUTION: u32 = 4096;
