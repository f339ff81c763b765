//! Texture readback and PNG output for offscreen frames.

use std::path::Path;
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

/// Pending copy of a color texture into a mappable buffer.
pub struct TextureReadback {
    buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,
    size: (u32, u32),
    format: wgpu::TextureFormat,
}

impl TextureReadback {
    /// Wait for the copy and return tightly packed RGBA8 rows.
    ///
    /// BGRA textures are swizzled; any other format is an error.
    pub fn read_rgba8(self, device: &wgpu::Device) -> Result<Vec<u8>> {
        let swap_red_blue = match self.format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
            other => bail!("unsupported texture format for readback: {other:?}"),
        };

        let slice = self.buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .context("texture readback channel closed")?
            .context("texture readback failed")?;

        let mut rgba = {
            let mapped = slice.get_mapped_range();
            unpad_rows(&mapped, self.padded_bytes_per_row, self.size)
        };
        self.buffer.unmap();

        if swap_red_blue {
            for pixel in rgba.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }
        Ok(rgba)
    }

    /// Pixel dimensions of the copied texture.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Strip row padding from a readback buffer.
fn unpad_rows(padded: &[u8], padded_bytes_per_row: u32, (width, height): (u32, u32)) -> Vec<u8> {
    let row = width as usize * 4;
    let stride = padded_bytes_per_row as usize;
    let mut rgba = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        rgba.extend_from_slice(&padded[start..start + row]);
    }
    rgba
}

/// Record a copy of `texture` into a mappable buffer.
///
/// Submit `encoder` before calling [`TextureReadback::read_rgba8`].
pub fn record_texture_readback(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    texture: &wgpu::Texture,
    format: wgpu::TextureFormat,
    size: (u32, u32),
) -> TextureReadback {
    let (width, height) = size;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = (width * 4).div_ceil(align) * align;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Frame Readback Buffer"),
        size: padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    TextureReadback {
        buffer,
        padded_bytes_per_row,
        size,
        format,
    }
}

/// Write RGBA8 pixels as a PNG, creating parent directories.
pub fn write_png(path: &Path, size: (u32, u32), rgba: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    PngEncoder::new_with_quality(file, CompressionType::Fast, FilterType::NoFilter)
        .write_image(rgba, size.0, size.1, ExtendedColorType::Rgba8)
        .context("failed to encode png")?;
    Ok(())
}
