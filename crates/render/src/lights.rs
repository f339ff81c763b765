//! Point lights gathered from emissive blocks.

use blockview_assets::LightEmission;
use blockview_core::BlockPos;

/// Maximum number of emissive lights handed to the renderer per frame.
///
/// Emissive blocks beyond the cap are ignored.
pub const MAX_EMISSIVE_LIGHTS: usize = 32;

/// GPU-layout point light (two `vec4`s).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EmissiveLight {
    /// Light position in structure space.
    pub position: [f32; 3],
    /// Scalar intensity.
    pub intensity: f32,
    /// Linear RGB color.
    pub color: [f32; 3],
    /// Padding to 16-byte alignment.
    pub _padding: f32,
}

impl EmissiveLight {
    /// Light at the center of the block at `pos`.
    pub fn at_block(pos: BlockPos, emission: LightEmission) -> Self {
        Self {
            position: pos.center(),
            intensity: emission.intensity,
            color: emission.color,
            _padding: 0.0,
        }
    }
}

/// Capped light list filled during a structure walk.
#[derive(Debug, Default)]
pub struct LightCollector {
    lights: Vec<EmissiveLight>,
    dropped: usize,
}

impl LightCollector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a light. Returns `false` once the cap is reached.
    pub fn push(&mut self, light: EmissiveLight) -> bool {
        if self.lights.len() >= MAX_EMISSIVE_LIGHTS {
            self.dropped += 1;
            return false;
        }
        self.lights.push(light);
        true
    }

    /// Record every light from `lights` until the cap is reached.
    pub fn extend<'a>(&mut self, lights: impl IntoIterator<Item = &'a EmissiveLight>) {
        for light in lights {
            self.push(*light);
        }
    }

    /// Lights beyond the cap that were ignored.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Collected lights (at most [`MAX_EMISSIVE_LIGHTS`]).
    pub fn finish(self) -> Vec<EmissiveLight> {
        if self.dropped > 0 {
            tracing::debug!(
                kept = self.lights.len(),
                dropped = self.dropped,
                "emissive light cap reached"
            );
        }
        self.lights
    }
}

/// Uniform block holding the capped light list.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    /// Fixed-size light array; entries past `count` are zeroed.
    pub lights: [EmissiveLight; MAX_EMISSIVE_LIGHTS],
    /// Number of valid entries.
    pub count: u32,
    /// Padding to 16-byte alignment.
    pub _padding: [u32; 3],
}

impl LightsUniform {
    /// Pack `lights`, truncating past the cap.
    pub fn from_lights(lights: &[EmissiveLight]) -> Self {
        let mut uniform = Self::zeroed();
        let count = lights.len().min(MAX_EMISSIVE_LIGHTS);
        uniform.lights[..count].copy_from_slice(&lights[..count]);
        uniform.count = count as u32;
        uniform
    }

    fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(x: i32) -> EmissiveLight {
        EmissiveLight::at_block(BlockPos::new(x, 0, 0), LightEmission::default())
    }

    #[test]
    fn collector_caps_lights() {
        let mut collector = LightCollector::new();
        for x in 0..(MAX_EMISSIVE_LIGHTS as i32 + 5) {
            collector.push(light(x));
        }
        assert_eq!(collector.dropped(), 5);
        let lights = collector.finish();
        assert_eq!(lights.len(), MAX_EMISSIVE_LIGHTS);
        assert_eq!(lights[0].position, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn uniform_packs_count() {
        let lights: Vec<_> = (0..3).map(light).collect();
        let uniform = LightsUniform::from_lights(&lights);
        assert_eq!(uniform.count, 3);
        assert_eq!(uniform.lights[2].position[0], 2.5);
        let empty: EmissiveLight = bytemuck::Zeroable::zeroed();
        assert_eq!(uniform.lights[3], empty);
        assert_eq!(std::mem::size_of::<LightsUniform>(), 32 * 32 + 16);
    }
}
