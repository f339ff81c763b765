//! Renderer settings persisted as TOML.

use std::fs;
use std::path::Path;

use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::frame::OverlayVisibility;

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "config/render.toml";

/// Output surface size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolutionSettings {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Background gradient.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SkySettings {
    /// Color straight up.
    pub zenith: [f32; 3],
    /// Color at the horizon.
    pub horizon: [f32; 3],
}

impl Default for SkySettings {
    fn default() -> Self {
        Self {
            zenith: [0.22, 0.42, 0.78],
            horizon: [0.70, 0.82, 0.95],
        }
    }
}

/// The single directional light.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LightSettings {
    /// Direction the light travels (from the sun toward the scene).
    pub direction: [f32; 3],
    /// Light color.
    pub color: [f32; 3],
    /// Ambient term added to every lit fragment.
    pub ambient: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            direction: [-0.4, -1.0, -0.3],
            color: [1.0, 0.96, 0.88],
            ambient: 0.35,
        }
    }
}

impl LightSettings {
    /// Normalized travel direction; straight down when the configured vector
    /// is degenerate.
    pub fn direction(&self) -> Vec3 {
        Vec3::from(self.direction)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y)
    }
}

/// Shadow-depth pass.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Run the shadow pass.
    pub enabled: bool,
    /// Square depth-map edge in texels.
    pub resolution: u32,
    /// Depth bias applied when comparing against the map.
    pub bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: 2048,
            bias: 0.002,
        }
    }
}

/// Screen-space ambient occlusion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SsaoSettings {
    /// Run the SSAO stage.
    pub enabled: bool,
    /// Sample radius in pixels.
    pub radius: f32,
    /// Darkening strength.
    pub intensity: f32,
    /// Samples per pixel.
    pub samples: u32,
}

impl Default for SsaoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 6.0,
            intensity: 0.8,
            samples: 12,
        }
    }
}

/// Bright-pass bloom.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Run the bloom stages.
    pub enabled: bool,
    /// Luminance above which a pixel blooms.
    pub threshold: f32,
    /// Strength of the additive composite.
    pub intensity: f32,
    /// Gaussian kernel radius in texels.
    pub radius: u32,
    /// Gaussian sigma.
    pub sigma: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.85,
            intensity: 0.6,
            radius: 6,
            sigma: 3.0,
        }
    }
}

/// Radial blur toward the light.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GodRaySettings {
    /// Run the god-ray stage.
    pub enabled: bool,
    /// Samples along each ray.
    pub samples: u32,
    /// Step scale toward the light.
    pub density: f32,
    /// Per-sample falloff.
    pub decay: f32,
    /// Sample weight.
    pub weight: f32,
    /// Final strength.
    pub exposure: f32,
}

impl Default for GodRaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            samples: 48,
            density: 0.9,
            decay: 0.95,
            weight: 0.4,
            exposure: 0.3,
        }
    }
}

/// Everything the renderer and chunk builder read from disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output size.
    pub resolution: ResolutionSettings,
    /// Chunk edge length in blocks.
    pub chunk_size: u32,
    /// Chunks whose center is farther than this are skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_distance: Option<f32>,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Background gradient.
    pub sky: SkySettings,
    /// Directional light.
    pub light: LightSettings,
    /// Shadow pass.
    pub shadows: ShadowSettings,
    /// SSAO stage.
    pub ssao: SsaoSettings,
    /// Bloom stages.
    pub bloom: BloomSettings,
    /// God-ray stage.
    pub god_rays: GodRaySettings,
    /// Overlays drawn when the caller doesn't override them.
    pub overlays: OverlayVisibility,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: ResolutionSettings::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            draw_distance: None,
            fov_degrees: 60.0,
            sky: SkySettings::default(),
            light: LightSettings::default(),
            shadows: ShadowSettings::default(),
            ssao: SsaoSettings::default(),
            bloom: BloomSettings::default(),
            god_rays: GodRaySettings::default(),
            overlays: OverlayVisibility::default(),
        }
    }
}

impl RenderSettings {
    /// Whether any post-process stage is enabled.
    pub fn post_processing(&self) -> bool {
        self.ssao.enabled || self.bloom.enabled || self.god_rays.enabled
    }

    /// Copy with every optional pass switched off.
    pub fn direct(&self) -> Self {
        let mut settings = self.clone();
        settings.shadows.enabled = false;
        settings.ssao.enabled = false;
        settings.bloom.enabled = false;
        settings.god_rays.enabled = false;
        settings
    }

    /// Load settings from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_SETTINGS_PATH))
    }

    /// Load settings from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        let settings = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<RenderSettings>(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    RenderSettings::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!(
                        "Render settings not found at {}. Using defaults",
                        path.display()
                    );
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                RenderSettings::default()
            }
        };
        settings.sanitized()
    }

    /// Save settings to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.chunk_size == 0 {
            warn!("chunk_size of 0 is invalid; using {DEFAULT_CHUNK_SIZE}");
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        self.resolution.width = self.resolution.width.max(1);
        self.resolution.height = self.resolution.height.max(1);
        self.shadows.resolution = self.shadows.resolution.clamp(1, 8192);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings: RenderSettings = toml::from_str(
            r#"
            chunk_size = 8
            draw_distance = 64.0

            [bloom]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.chunk_size, 8);
        assert_eq!(settings.draw_distance, Some(64.0));
        assert!(!settings.bloom.enabled);
        assert_eq!(settings.bloom.threshold, BloomSettings::default().threshold);
        assert!(settings.ssao.enabled);
    }

    #[test]
    fn save_then_load_matches() {
        let dir = std::env::temp_dir().join("blockview-settings-test");
        let path = dir.join("render.toml");
        let mut settings = RenderSettings::default();
        settings.draw_distance = Some(48.0);
        settings.god_rays.enabled = true;
        settings.save_to_path(&path).unwrap();

        let loaded = RenderSettings::load_from_path(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("blockview-settings-broken.toml");
        fs::write(&path, "chunk_size = \"big\"").unwrap();
        assert_eq!(RenderSettings::load_from_path(&path), RenderSettings::default());
    }

    #[test]
    fn zero_chunk_size_is_replaced() {
        let path = std::env::temp_dir().join("blockview-settings-zero.toml");
        fs::write(&path, "chunk_size = 0").unwrap();
        assert_eq!(RenderSettings::load_from_path(&path).chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn direct_disables_every_optional_pass() {
        let settings = RenderSettings::default().direct();
        assert!(!settings.post_processing());
        assert!(!settings.shadows.enabled);
    }

    #[test]
    fn degenerate_light_points_down() {
        let light = LightSettings {
            direction: [0.0; 3],
            ..LightSettings::default()
        };
        assert_eq!(light.direction(), Vec3::NEG_Y);
    }
}
