//! View frustum for culling

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Whether the box lies entirely on the negative side of the plane
    pub fn box_outside(&self, aabb: &Aabb) -> bool {
        let r = aabb.half_extent.dot(self.normal.abs());
        let s = self.distance_to_point(aabb.center);
        s + r < 0.0
    }

    fn from_raw(raw: Vec4) -> Self {
        let normal = raw.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self::new(normal / len, raw.w / len)
        } else {
            Self::default()
        }
    }
}

/// View frustum with 6 planes (Left, Right, Bottom, Top, Near, Far)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix (Gribb/Hartmann).
    ///
    /// Assumes glam's `_rh` projections, which map depth to [0, 1].
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        Self {
            planes: [
                Plane::from_raw(rows[3] + rows[0]), // left
                Plane::from_raw(rows[3] - rows[0]), // right
                Plane::from_raw(rows[3] + rows[1]), // bottom
                Plane::from_raw(rows[3] - rows[1]), // top
                Plane::from_raw(rows[2]),           // near
                Plane::from_raw(rows[3] - rows[2]), // far
            ],
        }
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        !self.planes.iter().any(|plane| plane.box_outside(aabb))
    }
}
