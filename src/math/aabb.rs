//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box stored as center and half-extents
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extent: Vec3,
}

impl Aabb {
    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self { center, half_extent }
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.center - self.half_extent
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.center + self.half_extent
    }

    /// Check if `other` lies entirely inside this box
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min().cmple(other.min()).all() && other.max().cmple(self.max()).all()
    }
}
