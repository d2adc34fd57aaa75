//! # Core Module
//!
//! wgpu context management, render configuration, and per-frame state.

mod context;
mod frame;
mod id;

pub use context::{Context, ContextError};
pub use frame::FrameState;
pub use id::Id;

/// Render configuration options.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Enable alpha blending on the surface.
    pub alpha: bool,
    /// Power preference for GPU selection.
    pub power_preference: wgpu::PowerPreference,
    /// Present mode (vsync).
    pub present_mode: wgpu::PresentMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            alpha: false,
            power_preference: wgpu::PowerPreference::HighPerformance,
            present_mode: wgpu::PresentMode::AutoVsync,
        }
    }
}
