//! Yaw/pitch camera with view and projection matrices.

use glam::{Mat4, Vec3};

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.001;

/// Perspective camera looking along `yaw`/`pitch`.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in structure space.
    pub position: Vec3,
    /// Rotation around +Y; zero looks along +X.
    pub yaw: f32,
    /// Elevation; positive looks up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width/height).
    pub aspect: f32,
    /// Near clip plane.
    pub near: f32,
    /// Far clip plane.
    pub far: f32,
}

impl Camera {
    /// Camera at the origin looking along +X.
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov: std::f32::consts::FRAC_PI_3,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera at `position` aimed at `target`.
    pub fn looking_at(position: Vec3, target: Vec3, aspect: f32) -> Self {
        let mut camera = Self::new(aspect);
        camera.position = position;
        camera.look_at(target);
        camera
    }

    /// Camera placed diagonally above an inclusive box so the whole box is in
    /// view.
    pub fn framing(min: Vec3, max: Vec3, aspect: f32) -> Self {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1.0);
        let offset = Vec3::new(1.0, 0.8, 1.3).normalize() * radius * 2.4;
        let mut camera = Self::looking_at(center + offset, center, aspect);
        camera.far = camera.far.max(radius * 8.0);
        camera
    }

    /// Aim at `target`. No-op when `target` is the camera position.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize() else {
            return;
        };
        self.pitch = dir.y.asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = dir.z.atan2(dir.x);
    }

    /// Get the forward direction vector.
    pub fn forward(&self) -> Vec3 {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        Vec3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize()
    }

    /// Get the right direction vector.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Get the up direction vector.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    /// Build the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    /// Build the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Build combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Move the camera by a direction vector.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotate the camera by yaw/pitch deltas.
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// Uniform data sent to GPU for camera transforms.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    /// View-projection matrix
    pub view_proj: [[f32; 4]; 4],
    /// Inverse view-projection, for reconstructing view rays
    pub inv_view_proj: [[f32; 4]; 4],
    /// Camera position in structure space
    pub camera_pos: [f32; 4],
}

impl CameraUniform {
    /// Create camera uniform from camera.
    pub fn from_camera(camera: &Camera) -> Self {
        let view_proj = camera.view_projection_matrix();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_along_x() {
        let camera = Camera::new(16.0 / 9.0);
        let forward = camera.forward();
        assert!((forward.x - 1.0).abs() < 0.01);
        assert!(forward.y.abs() < 0.01);
        assert!(forward.z.abs() < 0.01);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new(16.0 / 9.0);
        camera.rotate(0.0, std::f32::consts::PI);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);

        camera.rotate(0.0, -std::f32::consts::PI * 2.0);
        assert!(camera.pitch > -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let camera = Camera::looking_at(Vec3::new(5.0, 5.0, 5.0), Vec3::ZERO, 1.0);
        let expected = (Vec3::ZERO - camera.position).normalize();
        assert!(camera.forward().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn framed_box_projects_inside_clip_space() {
        let min = Vec3::new(-3.0, 0.0, -2.0);
        let max = Vec3::new(4.0, 5.0, 6.0);
        let camera = Camera::framing(min, max, 16.0 / 9.0);
        let vp = camera.view_projection_matrix();
        let center = vp.project_point3((min + max) * 0.5);
        assert!(center.x.abs() < 1e-3 && center.y.abs() < 1e-3);
        assert!(center.z > 0.0 && center.z < 1.0);
    }

    #[test]
    fn view_projection_is_invertible() {
        let camera = Camera::new(16.0 / 9.0);
        assert!(camera.view_projection_matrix().determinant().abs() > 0.0);
    }
}
