//! Camera-distance culling of chunk mesh entries.

use glam::Vec3;

use crate::builder::MeshEntry;

/// Draw-distance test against chunk centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawDistance {
    camera: Vec3,
    max_distance_sq: Option<f32>,
}

impl DrawDistance {
    /// Cull beyond `max_distance` from `camera`; `None` keeps everything.
    ///
    /// Negative distances behave like zero.
    pub fn new(camera: Vec3, max_distance: Option<f32>) -> Self {
        Self {
            camera,
            max_distance_sq: max_distance.map(|d| {
                let d = d.max(0.0);
                d * d
            }),
        }
    }

    /// No distance limit.
    pub fn unlimited(camera: Vec3) -> Self {
        Self::new(camera, None)
    }

    /// Camera position.
    pub fn camera(&self) -> Vec3 {
        self.camera
    }

    /// Whether a chunk centered at `center` is within range.
    pub fn is_visible(&self, center: Vec3) -> bool {
        match self.max_distance_sq {
            None => true,
            Some(limit) => self.camera.distance_squared(center) <= limit,
        }
    }

    /// Set the `visible` flag on every entry.
    pub fn mark<B>(&self, entries: &mut [MeshEntry<'_, B>]) {
        for entry in entries {
            entry.visible = self.is_visible(entry.center);
        }
    }

    /// Keep the entries within range, preserving order.
    pub fn filter<'a, B>(&self, mut entries: Vec<MeshEntry<'a, B>>) -> Vec<MeshEntry<'a, B>> {
        if self.max_distance_sq.is_none() {
            return entries;
        }
        self.mark(&mut entries);
        entries.retain(|entry| entry.visible);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_inclusive() {
        let cull = DrawDistance::new(Vec3::ZERO, Some(10.0));
        assert!(cull.is_visible(Vec3::new(10.0, 0.0, 0.0)));
        assert!(cull.is_visible(Vec3::new(6.0, 8.0, 0.0)));
        assert!(!cull.is_visible(Vec3::new(6.0, 8.0, 0.1)));
    }

    #[test]
    fn no_limit_sees_everything() {
        let cull = DrawDistance::unlimited(Vec3::splat(-5.0));
        assert!(cull.is_visible(Vec3::splat(1.0e6)));
    }

    #[test]
    fn negative_limit_only_keeps_camera_point() {
        let cull = DrawDistance::new(Vec3::ONE, Some(-3.0));
        assert!(cull.is_visible(Vec3::ONE));
        assert!(!cull.is_visible(Vec3::new(1.0, 1.0, 1.5)));
    }
}
