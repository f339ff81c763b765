//! Per-frame pass ordering and the CPU-side math the passes share.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

use crate::settings::RenderSettings;

/// Debug overlays requested for one frame.
///
/// Overlays are drawn last and never reach the shadow map or the
/// post-process inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayVisibility {
    /// Ground grid under the structure.
    pub grid: bool,
    /// Outline around the structure bounds.
    pub outline: bool,
    /// Debug lines carried by chunk meshes.
    pub mesh_lines: bool,
}

impl OverlayVisibility {
    /// Nothing drawn.
    pub const NONE: Self = Self {
        grid: false,
        outline: false,
        mesh_lines: false,
    };

    /// Everything drawn.
    pub const ALL: Self = Self {
        grid: true,
        outline: true,
        mesh_lines: true,
    };

    /// Whether any overlay is requested.
    pub fn any(&self) -> bool {
        self.grid || self.outline || self.mesh_lines
    }
}

/// One step of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// Depth from the light's point of view.
    Shadow,
    /// Full-screen background, no depth test.
    Sky,
    /// Opaque chunk layers.
    Opaque,
    /// Transparent chunk layers, blended, after every opaque layer.
    Transparent,
    /// Ambient occlusion from the scene depth.
    Ssao,
    /// Bright-pass extraction.
    BloomExtract,
    /// Separable Gaussian blur of the bright pass.
    BloomBlur,
    /// Radial blur toward the light's screen position.
    GodRays,
    /// Combine scene and post-process results into the output.
    Composite,
    /// Grid, outline and mesh debug lines.
    Overlays,
}

/// Ordered pass list for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    passes: Vec<RenderPass>,
    offscreen: bool,
}

impl FramePlan {
    /// Plan a frame from the settings and the caller's overlay request.
    pub fn new(settings: &RenderSettings, overlays: OverlayVisibility) -> Self {
        let mut passes = Vec::with_capacity(10);
        if settings.shadows.enabled {
            passes.push(RenderPass::Shadow);
        }
        passes.extend([RenderPass::Sky, RenderPass::Opaque, RenderPass::Transparent]);

        let offscreen = settings.post_processing();
        if settings.ssao.enabled {
            passes.push(RenderPass::Ssao);
        }
        if settings.bloom.enabled {
            passes.extend([RenderPass::BloomExtract, RenderPass::BloomBlur]);
        }
        if settings.god_rays.enabled {
            passes.push(RenderPass::GodRays);
        }
        if offscreen {
            passes.push(RenderPass::Composite);
        }
        if overlays.any() {
            passes.push(RenderPass::Overlays);
        }
        Self { passes, offscreen }
    }

    /// Passes in execution order.
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Whether `pass` runs this frame.
    pub fn contains(&self, pass: RenderPass) -> bool {
        self.passes.contains(&pass)
    }

    /// Whether the scene is drawn into the offscreen HDR target and
    /// composited, rather than straight into the output.
    pub fn renders_offscreen(&self) -> bool {
        self.offscreen
    }

    fn position(&self, pass: RenderPass) -> Option<usize> {
        self.passes.iter().position(|p| *p == pass)
    }

    /// Whether `first` runs before `second`. False if either is absent.
    pub fn runs_before(&self, first: RenderPass, second: RenderPass) -> bool {
        matches!(
            (self.position(first), self.position(second)),
            (Some(a), Some(b)) if a < b
        )
    }
}

/// Orthographic light view-projection covering the inclusive box
/// `min..=max`, looking along `direction`.
pub fn light_view_projection(direction: Vec3, min: Vec3, max: Vec3) -> Mat4 {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let center = (min + max) * 0.5;
    let radius = ((max - min).length() * 0.5).max(0.5);
    let eye = center - direction * radius * 2.0;
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(eye, center, up);
    let projection = Mat4::orthographic_rh(-radius, radius, -radius, radius, radius * 0.5, radius * 3.5);
    projection * view
}

/// Texture-space position (0..1, y down) of `point` under `view_proj`.
///
/// `None` when the point is behind the camera.
pub fn project_to_screen(view_proj: Mat4, point: Vec3) -> Option<Vec2> {
    let clip = view_proj * point.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.xy() / clip.w;
    Some(Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5))
}

/// Screen position of a directional light seen from `camera_pos`.
pub fn light_screen_position(
    view_proj: Mat4,
    camera_pos: Vec3,
    light_direction: Vec3,
    distance: f32,
) -> Option<Vec2> {
    let toward_light = -light_direction.try_normalize()?;
    project_to_screen(view_proj, camera_pos + toward_light * distance)
}

/// One-sided weights of a normalized Gaussian kernel: `weights[0]` is the
/// center tap, `weights[i]` applies at offsets `+i` and `-i`.
///
/// `w[0] + 2 * sum(w[1..]) == 1`. A non-positive sigma or zero radius gives
/// the identity kernel.
pub fn gaussian_weights(radius: usize, sigma: f32) -> Vec<f32> {
    if radius == 0 || sigma <= 0.0 {
        return vec![1.0];
    }
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f32> = (0..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let total = raw[0] + 2.0 * raw[1..].iter().sum::<f32>();
    raw.into_iter().map(|w| w / total).collect()
}

/// Values at or below this pass through [`soft_highlight`] unchanged.
pub const HIGHLIGHT_KNEE: f32 = 0.8;

/// Highlight shoulder: identity up to [`HIGHLIGHT_KNEE`], then a smooth
/// curve that approaches but never reaches `1`. Monotonic, continuous in
/// value and slope at the knee.
pub fn soft_highlight(value: f32) -> f32 {
    let value = value.max(0.0);
    if value <= HIGHLIGHT_KNEE {
        return value;
    }
    let range = 1.0 - HIGHLIGHT_KNEE;
    let over = (value - HIGHLIGHT_KNEE) / range;
    HIGHLIGHT_KNEE + range * over / (1.0 + over)
}

/// Additive bloom on top of a scene channel, compressed as a whole so the
/// sum never clips in an 8-bit target.
pub fn bloom_composite(base: f32, bloom: f32, intensity: f32) -> f32 {
    soft_highlight(base + bloom.max(0.0) * intensity.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_plan_is_minimal() {
        let settings = RenderSettings::default().direct();
        let plan = FramePlan::new(&settings, OverlayVisibility::NONE);
        assert_eq!(
            plan.passes(),
            &[RenderPass::Sky, RenderPass::Opaque, RenderPass::Transparent]
        );
        assert!(!plan.renders_offscreen());
    }

    #[test]
    fn full_plan_order() {
        let mut settings = RenderSettings::default();
        settings.god_rays.enabled = true;
        let plan = FramePlan::new(&settings, OverlayVisibility::ALL);
        assert_eq!(
            plan.passes(),
            &[
                RenderPass::Shadow,
                RenderPass::Sky,
                RenderPass::Opaque,
                RenderPass::Transparent,
                RenderPass::Ssao,
                RenderPass::BloomExtract,
                RenderPass::BloomBlur,
                RenderPass::GodRays,
                RenderPass::Composite,
                RenderPass::Overlays,
            ]
        );
        assert!(plan.renders_offscreen());
    }

    #[test]
    fn overlays_follow_composite() {
        let mut settings = RenderSettings::default().direct();
        settings.bloom.enabled = true;
        let plan = FramePlan::new(
            &settings,
            OverlayVisibility {
                grid: true,
                ..OverlayVisibility::NONE
            },
        );
        assert!(plan.runs_before(RenderPass::Composite, RenderPass::Overlays));
        assert!(plan.runs_before(RenderPass::Opaque, RenderPass::Transparent));
        assert!(!plan.contains(RenderPass::Ssao));
    }

    #[test]
    fn light_frustum_contains_box() {
        let min = Vec3::new(-2.0, 0.0, -7.0);
        let max = Vec3::new(10.0, 4.0, 3.0);
        for dir in [Vec3::new(-0.4, -1.0, -0.3), Vec3::NEG_Y, Vec3::new(1.0, -0.2, 0.0)] {
            let m = light_view_projection(dir, min, max);
            for i in 0..8 {
                let corner = Vec3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                );
                let p = m.project_point3(corner);
                assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0, "{dir:?} {corner:?} -> {p:?}");
                assert!((0.0..=1.0).contains(&p.z), "{dir:?} {corner:?} -> {p:?}");
            }
        }
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let vp = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0) * view;
        let ahead = project_to_screen(vp, Vec3::new(0.0, 0.0, -10.0)).unwrap();
        assert!((ahead - Vec2::splat(0.5)).length() < 1e-4);
        assert!(project_to_screen(vp, Vec3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn gaussian_kernel_is_normalized() {
        for (radius, sigma) in [(1, 0.5), (4, 2.0), (8, 3.0)] {
            let w = gaussian_weights(radius, sigma);
            assert_eq!(w.len(), radius + 1);
            let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
            assert!((total - 1.0).abs() < 1e-5);
            assert!(w.windows(2).all(|pair| pair[0] >= pair[1]));
        }
        assert_eq!(gaussian_weights(0, 2.0), vec![1.0]);
        assert_eq!(gaussian_weights(3, 0.0), vec![1.0]);
    }

    #[test]
    fn soft_highlight_is_bounded_and_monotonic() {
        assert_eq!(soft_highlight(0.0), 0.0);
        assert_eq!(soft_highlight(-1.0), 0.0);
        let mut last = 0.0;
        for i in 1..100 {
            let v = soft_highlight(i as f32 * 0.5);
            assert!(v > last && v < 1.0);
            last = v;
        }
    }

    #[test]
    fn soft_highlight_leaves_values_below_knee_alone() {
        for v in [0.1, 0.25, 0.5, HIGHLIGHT_KNEE] {
            assert_eq!(soft_highlight(v), v);
        }
        let just_above = soft_highlight(HIGHLIGHT_KNEE + 1e-3);
        assert!(just_above > HIGHLIGHT_KNEE && just_above < HIGHLIGHT_KNEE + 1.1e-3);
    }

    #[test]
    fn bright_bloom_over_bright_scene_stays_in_range() {
        assert!(bloom_composite(0.9, 1.0, 1.0) < 1.0);
        for base_step in 0..=20 {
            let base = base_step as f32 / 20.0;
            let mut last = bloom_composite(base, 0.0, 1.0);
            for bloom_step in 1..=40 {
                let value = bloom_composite(base, bloom_step as f32 * 0.25, 1.0);
                assert!(value <= 1.0, "base {base} bloom {bloom_step} -> {value}");
                assert!(value >= last);
                last = value;
            }
        }
        assert_eq!(bloom_composite(0.3, 0.0, 2.0), 0.3);
    }
}
