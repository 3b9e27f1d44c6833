//! Camera pose and projection consumed by the visibility pass

use crate::core::types::{Vec3, Mat4, Quat};

/// Camera with position, rotation, and projection parameters
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.1,
            far: 5000.0,
        }
    }

    /// Create camera looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self::new(position, 60.0, 16.0 / 9.0);
        camera.set_look_at(target, up);
        camera
    }

    /// Rotate the camera to face a target
    pub fn set_look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        self.rotation = Quat::from_mat3(&glam::Mat3::from_cols(right, up, -forward));
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        let rotation_matrix = Mat4::from_quat(self.rotation.conjugate());
        let translation_matrix = Mat4::from_translation(-self.position);
        rotation_matrix * translation_matrix
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Set rotation from euler angles (yaw, pitch in radians)
    pub fn set_rotation_euler(&mut self, yaw: f32, pitch: f32) {
        self.rotation = Quat::from_euler(glam::EulerRot::YXZ, yaw, pitch, 0.0);
    }

    /// Update aspect ratio (call on window resize)
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.aspect = width / height;
    }

    /// Snapshot of the state the visibility pass depends on
    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            rotation: self.rotation,
            projection: self.projection_matrix(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0)
    }
}

/// Camera state recorded at the last visibility pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub projection: Mat4,
}

impl CameraPose {
    /// Whether `other` differs from this pose by at least one of the tolerances.
    ///
    /// Position is compared by squared distance, rotation by angle in degrees.
    /// Any projection change counts as moved.
    pub fn moved_beyond(
        &self,
        other: &CameraPose,
        position_tolerance: f32,
        rotation_tolerance_degrees: f32,
    ) -> bool {
        let position_changed =
            self.position.distance_squared(other.position) >= position_tolerance;
        let rotation_changed =
            self.rotation.angle_between(other.rotation).to_degrees() >= rotation_tolerance_degrees;
        let projection_changed = !self.projection.abs_diff_eq(other.projection, 1e-6);
        position_changed || rotation_changed || projection_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_looks_down_neg_z() {
        let camera = Camera::default();

        // World origin is 5 units in front of the default camera
        let origin_in_camera = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!((origin_in_camera - Vec3::new(0.0, 0.0, -5.0)).length() < 0.001);
    }

    #[test]
    fn test_view_matrix_translation() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(10.0, 0.0, 0.0);

        let view = camera.view_matrix();
        // View matrix should translate world origin to (-10, 0, 0) in camera space
        let origin_in_camera = view.transform_point3(Vec3::ZERO);
        assert!((origin_in_camera.x - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_look_at_faces_target() {
        let target = Vec3::new(30.0, 10.0, 40.0);
        let camera = Camera::look_at(Vec3::new(0.0, 10.0, 0.0), target, Vec3::Y);
        let target_in_camera = camera.view_matrix().transform_point3(target);
        assert!((target_in_camera - Vec3::new(0.0, 0.0, -50.0)).length() < 0.01);
    }

    #[test]
    fn test_pose_tolerance() {
        let camera = Camera::default();
        let pose = camera.pose();
        let mut nudged = camera.clone();
        nudged.position.x += 0.05; // 0.0025 squared, below 0.01
        assert!(!pose.moved_beyond(&nudged.pose(), 0.01, 0.01));

        nudged.position.x += 1.0;
        assert!(pose.moved_beyond(&nudged.pose(), 0.01, 0.01));
    }

    #[test]
    fn test_pose_rotation_and_projection() {
        let camera = Camera::default();
        let pose = camera.pose();

        let mut turned = camera.clone();
        turned.set_rotation_euler(5f32.to_radians(), 0.0);
        assert!(pose.moved_beyond(&turned.pose(), 0.01, 0.01));

        let mut resized = camera.clone();
        resized.set_aspect(800.0, 800.0);
        assert!(pose.moved_beyond(&resized.pose(), 0.01, 0.01));

        assert!(!pose.moved_beyond(&camera.pose(), 0.01, 0.01));
    }
}
