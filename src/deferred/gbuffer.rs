//! G-buffer render targets.
//!
//! The attachment table is the contract between the geometry pass
//! (writer) and the shading/composite passes (readers): attachment
//! index and format per semantic channel are fixed at compile time.

/// Semantic channels of the G-buffer, in attachment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GBufferChannel {
    /// World-space position.
    Position = 0,
    /// World-space normal.
    Normal = 1,
    /// Base color (albedo).
    BaseColor = 2,
    /// Roughness / metalness / occlusion.
    Rmo = 3,
    /// Emission.
    Emission = 4,
    /// Linear view-space depth.
    Depth = 5,
}

impl GBufferChannel {
    /// All channels in attachment order.
    pub const ALL: [GBufferChannel; 6] = [
        GBufferChannel::Position,
        GBufferChannel::Normal,
        GBufferChannel::BaseColor,
        GBufferChannel::Rmo,
        GBufferChannel::Emission,
        GBufferChannel::Depth,
    ];

    /// Attachment index of this channel.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Texture format, chosen by the physical quantity stored.
    #[inline]
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            // Positions, normals, RMO, and emission need sign/HDR range.
            GBufferChannel::Position
            | GBufferChannel::Normal
            | GBufferChannel::Rmo
            | GBufferChannel::Emission => wgpu::TextureFormat::Rgba16Float,
            // Base color is LDR.
            GBufferChannel::BaseColor => wgpu::TextureFormat::Rgba8Unorm,
            // Linear depth is a single scalar.
            GBufferChannel::Depth => wgpu::TextureFormat::R16Float,
        }
    }

    /// Debug label.
    fn label(self) -> &'static str {
        match self {
            GBufferChannel::Position => "G-Buffer Position",
            GBufferChannel::Normal => "G-Buffer Normal",
            GBufferChannel::BaseColor => "G-Buffer Base Color",
            GBufferChannel::Rmo => "G-Buffer RMO",
            GBufferChannel::Emission => "G-Buffer Emission",
            GBufferChannel::Depth => "G-Buffer Linear Depth",
        }
    }
}

/// Depth/stencil format of the G-buffer. The stencil plane carries the
/// geometry coverage mask read back by the composite pass.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Format of the HDR resolve color target.
pub const COLOR_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Stencil value stamped on pixels covered by geometry.
pub const STENCIL_COVERED: u32 = 1;

/// An off-screen color render target.
pub struct ColorTarget {
    /// The texture.
    pub texture: wgpu::Texture,
    /// Texture view.
    pub view: wgpu::TextureView,
}

impl ColorTarget {
    /// Create a new render target.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }
}

/// The G-buffer: six color attachments plus a combined depth/stencil
/// target, all sized to the output viewport.
pub struct GBuffer {
    /// Channel targets in attachment order.
    targets: Vec<ColorTarget>,
    /// Combined depth/stencil target.
    depth_stencil: wgpu::Texture,
    /// Depth/stencil view.
    depth_stencil_view: wgpu::TextureView,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
}

impl GBuffer {
    /// Allocate all targets at the given viewport size.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let targets = GBufferChannel::ALL
            .iter()
            .map(|channel| {
                ColorTarget::new(device, width, height, channel.format(), channel.label())
            })
            .collect();

        let depth_stencil = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("G-Buffer Depth Stencil"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_stencil_view = depth_stencil.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            targets,
            depth_stencil,
            depth_stencil_view,
            width,
            height,
        }
    }

    /// Validate the target set against device limits.
    ///
    /// A set that cannot be attached in one pass is a configuration
    /// error fatal to scene construction.
    pub fn validate(device: &wgpu::Device) -> Result<(), String> {
        let limit = device.limits().max_color_attachments as usize;
        if GBufferChannel::ALL.len() > limit {
            return Err(format!(
                "G-buffer needs {} color attachments but the device supports {}",
                GBufferChannel::ALL.len(),
                limit
            ));
        }
        Ok(())
    }

    /// View of one channel.
    #[inline]
    pub fn view(&self, channel: GBufferChannel) -> &wgpu::TextureView {
        &self.targets[channel.index()].view
    }

    /// Texture of one channel.
    #[inline]
    pub fn texture(&self, channel: GBufferChannel) -> &wgpu::Texture {
        &self.targets[channel.index()].texture
    }

    /// Depth/stencil view.
    #[inline]
    pub fn depth_stencil_view(&self) -> &wgpu::TextureView {
        &self.depth_stencil_view
    }

    /// Depth/stencil texture.
    #[inline]
    pub fn depth_stencil_texture(&self) -> &wgpu::Texture {
        &self.depth_stencil
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_order_is_fixed() {
        // The semantic order is part of the pipeline contract.
        let indices: Vec<usize> = GBufferChannel::ALL.iter().map(|c| c.index()).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4, 5]);
        assert_eq!(GBufferChannel::Position.index(), 0);
        assert_eq!(GBufferChannel::Depth.index(), 5);
    }

    #[test]
    fn test_channel_formats() {
        assert_eq!(
            GBufferChannel::Position.format(),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            GBufferChannel::BaseColor.format(),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(GBufferChannel::Depth.format(), wgpu::TextureFormat::R16Float);
        assert_eq!(
            DEPTH_STENCIL_FORMAT,
            wgpu::TextureFormat::Depth24PlusStencil8
        );
    }
}
