/// Scene depth format; sampled by SSAO and god rays.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Offscreen scene color format used when post-processing is on.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const AO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// A texture with its default view.
pub struct Target {
    /// Backing texture.
    pub texture: wgpu::Texture,
    /// Whole-texture view.
    pub view: wgpu::TextureView,
}

impl Target {
    fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
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

/// Size-dependent intermediate textures for one output size.
///
/// Bloom and god rays run at half resolution.
pub struct FrameTargets {
    size: (u32, u32),
    /// Scene depth.
    pub depth: Target,
    /// Scene color before compositing.
    pub hdr: Target,
    /// Ambient occlusion factor.
    pub ao: Target,
    /// Bright pass, then blur ping-pong.
    pub bloom_a: Target,
    /// Blur ping-pong partner.
    pub bloom_b: Target,
    /// Radial light scattering.
    pub god_rays: Target,
}

impl FrameTargets {
    /// Allocate every target for `size`.
    pub fn new(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let half = Self::half(size);
        tracing::debug!(width = size.0, height = size.1, "allocating frame targets");
        Self {
            size,
            depth: Target::new(device, "Scene Depth", size, DEPTH_FORMAT),
            hdr: Target::new(device, "Scene HDR Color", size, HDR_FORMAT),
            ao: Target::new(device, "SSAO Target", size, AO_FORMAT),
            bloom_a: Target::new(device, "Bloom Target A", half, HDR_FORMAT),
            bloom_b: Target::new(device, "Bloom Target B", half, HDR_FORMAT),
            god_rays: Target::new(device, "God Ray Target", half, HDR_FORMAT),
        }
    }

    /// Full-resolution size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Size of the half-resolution targets.
    pub fn half_size(&self) -> (u32, u32) {
        Self::half(self.size)
    }

    fn half((width, height): (u32, u32)) -> (u32, u32) {
        ((width / 2).max(1), (height / 2).max(1))
    }
}
