use std::sync::Arc;

use anyhow::{Context, Result};

/// Device, queue and output description shared by every pass.
pub struct RenderContext {
    /// Logical GPU device used for issuing commands.
    pub device: Arc<wgpu::Device>,
    /// Command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Format of the final color target.
    pub format: wgpu::TextureFormat,
    /// Output dimensions in pixels (width, height).
    pub size: (u32, u32),
}

impl RenderContext {
    /// Wrap a device the host application already owns.
    pub fn from_parts(
        device: Arc<wgpu::Device>,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    ) -> Self {
        Self {
            device,
            queue,
            format,
            size: (size.0.max(1), size.1.max(1)),
        }
    }

    /// Create a context with no surface, for offscreen rendering.
    pub async fn new_headless(size: (u32, u32), format: wgpu::TextureFormat) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to find suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("blockview device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("Failed to create GPU device")?;

        let info = adapter.get_info();
        tracing::info!(
            width = size.0,
            height = size.1,
            format = ?format,
            adapter = %info.name,
            backend = ?info.backend,
            "headless rendering context initialized"
        );

        Ok(Self::from_parts(Arc::new(device), queue, format, size))
    }

    /// Change the output size. Zero dimensions are ignored.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 > 0 && new_size.1 > 0 {
            self.size = new_size;
        }
    }

    /// Get current aspect ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.size.0 as f32 / self.size.1 as f32
    }
}
