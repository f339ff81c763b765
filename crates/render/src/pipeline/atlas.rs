use std::path::Path;

use blockview_assets::{TextureAtlasMetadata, MISSING_TEXTURE};
use image::ImageReader;
use thiserror::Error;
use tracing::warn;

/// Failure loading an authored atlas image.
#[derive(Debug, Error)]
pub enum AtlasImageError {
    /// Image decoding failed.
    #[error("failed to decode atlas image: {0}")]
    Image(#[from] image::ImageError),
    /// Image did not match metadata-provided dimensions.
    #[error("atlas image dimensions {found_width}x{found_height} do not match metadata {expected_width}x{expected_height}")]
    DimensionMismatch {
        /// Width implied by the metadata.
        expected_width: u32,
        /// Height implied by the metadata.
        expected_height: u32,
        /// Width read from the file.
        found_width: u32,
        /// Height read from the file.
        found_height: u32,
    },
    /// Generic IO failure.
    #[error("failed to read atlas image: {0}")]
    Io(#[from] std::io::Error),
}

/// RGBA8 atlas pixels ready for upload.
#[derive(Debug, Clone)]
pub struct AtlasImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA rows.
    pub pixels: Vec<u8>,
}

impl AtlasImage {
    /// Decode an image whose size matches `metadata`.
    pub fn load(path: &Path, metadata: &TextureAtlasMetadata) -> Result<Self, AtlasImageError> {
        let rgba = ImageReader::open(path)?.decode()?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width != metadata.atlas_width() || height != metadata.atlas_height() {
            return Err(AtlasImageError::DimensionMismatch {
                expected_width: metadata.atlas_width(),
                expected_height: metadata.atlas_height(),
                found_width: width,
                found_height: height,
            });
        }
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Load `path` if given, otherwise (or on failure) generate tiles.
    pub fn load_or_generate(path: Option<&Path>, metadata: &TextureAtlasMetadata) -> Self {
        if let Some(path) = path {
            match Self::load(path, metadata) {
                Ok(image) => return image,
                Err(err) => warn!("Falling back to generated texture atlas: {err}"),
            }
        }
        Self::generate(metadata)
    }

    /// Flat-shaded tiles with a faint two-tone checker, colored from each
    /// texture name. The placeholder tile is magenta/black.
    pub fn generate(metadata: &TextureAtlasMetadata) -> Self {
        let width = metadata.atlas_width().max(1);
        let height = metadata.atlas_height().max(1);
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        let tile = metadata.tile_size.max(1);
        let stride = tile + metadata.padding * 2;

        for entry in &metadata.entries {
            let base = tile_color(&entry.name);
            let x0 = entry.column * stride;
            let y0 = entry.row * stride;
            // Padding repeats the tile edge so linear filtering never bleeds.
            for dy in 0..stride {
                for dx in 0..stride {
                    let tx = dx.saturating_sub(metadata.padding).min(tile - 1);
                    let ty = dy.saturating_sub(metadata.padding).min(tile - 1);
                    let checker = (tx * 4 / tile + ty * 4 / tile) % 2 == 0;
                    let color = if entry.name == MISSING_TEXTURE {
                        if checker { [255, 0, 255] } else { [0, 0, 0] }
                    } else if checker {
                        base
                    } else {
                        base.map(|c| (c as f32 * 0.85) as u8)
                    };
                    let (x, y) = (x0 + dx, y0 + dy);
                    if x >= width || y >= height {
                        continue;
                    }
                    let offset = ((y * width + x) * 4) as usize;
                    pixels[offset..offset + 4].copy_from_slice(&[color[0], color[1], color[2], 255]);
                }
            }
        }

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Upload as an sRGB texture.
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
        upload_rgba_texture(device, queue, self.width, self.height, &self.pixels, "Texture Atlas")
    }
}

fn tile_color(name: &str) -> [u8; 3] {
    let hash = blake3::hash(name.as_bytes());
    let bytes = hash.as_bytes();
    // Keep colors in a mid range so lighting stays visible.
    [bytes[0], bytes[1], bytes[2]].map(|b| 70 + b / 2)
}

fn upload_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
    label: &str,
) -> wgpu::Texture {
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
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let row_bytes = width as usize * 4;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let padded;
    let data = if padded_row_bytes == row_bytes {
        pixels
    } else {
        let mut rows = vec![0u8; padded_row_bytes * height as usize];
        for row in 0..height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * padded_row_bytes;
            rows[dst_start..dst_start + row_bytes]
                .copy_from_slice(&pixels[src_start..src_start + row_bytes]);
        }
        padded = rows;
        &padded
    };

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(padded_row_bytes as u32),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_atlas_matches_metadata_size() {
        let meta = TextureAtlasMetadata::grid(4, 1, ["stone", "dirt", "glass"]);
        let image = AtlasImage::generate(&meta);
        assert_eq!(image.width, meta.atlas_width());
        assert_eq!(image.height, meta.atlas_height());
        assert_eq!(image.pixels.len(), (image.width * image.height * 4) as usize);
        assert!(image.pixels.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn placeholder_tile_is_magenta() {
        let meta = TextureAtlasMetadata::grid(4, 0, ["stone"]);
        let image = AtlasImage::generate(&meta);
        // Slot 0 is the placeholder; its first texel is on the light checker.
        assert_eq!(&image.pixels[0..4], &[255, 0, 255, 255]);
    }

    #[test]
    fn missing_file_falls_back() {
        let meta = TextureAtlasMetadata::grid(4, 0, ["stone"]);
        let image = AtlasImage::load_or_generate(
            Some(Path::new("/definitely/not/here.png")),
            &meta,
        );
        assert_eq!(image.width, meta.atlas_width());
    }

    #[test]
    fn mismatched_image_is_rejected() {
        let meta = TextureAtlasMetadata::grid(4, 0, ["stone"]);
        let path = std::env::temp_dir().join("blockview-atlas-mismatch.png");
        image::RgbaImage::new(3, 3).save(&path).unwrap();
        let err = AtlasImage::load(&path, &meta).unwrap_err();
        assert!(matches!(err, AtlasImageError::DimensionMismatch { .. }));
    }
}
