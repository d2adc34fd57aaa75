//! Deferred shading pipeline: G-buffer, geometry, shading, and
//! composite passes.

mod composite_pass;
mod gbuffer;
mod geometry_pass;
mod shading_pass;

pub use composite_pass::{CompositePass, CompositeUniform};
pub use gbuffer::{
    ColorTarget, GBuffer, GBufferChannel, COLOR_TARGET_FORMAT, DEPTH_STENCIL_FORMAT,
    STENCIL_COVERED,
};
pub use geometry_pass::{CameraUniform, GeometryPass, CAMERA_FAR, CAMERA_NEAR};
pub use shading_pass::{ShadingPass, ShadingUniform};
