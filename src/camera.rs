//! Free-look camera producing the view matrix consumed by the pipeline.
//!
//! Input handling lives with the host application; the renderer only
//! reads orientation state and the vertical field of view.

use glam::{Mat4, Vec3};

/// Default yaw, looking down -Z.
pub const DEFAULT_YAW: f32 = -90.0;
/// Default pitch.
pub const DEFAULT_PITCH: f32 = 0.0;
/// Default vertical field of view in degrees.
pub const DEFAULT_ZOOM: f32 = 45.0;

/// A yaw/pitch camera.
#[derive(Debug, Clone)]
pub struct Camera {
    /// World-space position.
    pub position: Vec3,
    /// Forward direction, derived from yaw and pitch.
    pub front: Vec3,
    /// Camera-space up vector.
    pub up: Vec3,
    /// Camera-space right vector.
    pub right: Vec3,
    /// World up used to re-derive the basis.
    pub world_up: Vec3,
    /// Yaw angle in degrees.
    pub yaw: f32,
    /// Pitch angle in degrees.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
}

impl Camera {
    /// Create a camera at a position, looking down -Z.
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    /// Get the view matrix for this camera.
    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Set yaw and pitch in degrees. Pitch is clamped to avoid flipping.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-89.0, 89.0);
        self.update_vectors();
    }

    /// Re-derive front/right/up from yaw and pitch.
    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_looks_down_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0));
        assert!((camera.front - Vec3::NEG_Z).length() < 1e-5);

        // A point in front of the camera lands in front in view space.
        let view = camera.view_matrix();
        let p = view.transform_point3(Vec3::ZERO);
        assert!(p.z < 0.0);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.set_orientation(0.0, 120.0);
        assert!(camera.pitch <= 89.0);
    }
}
