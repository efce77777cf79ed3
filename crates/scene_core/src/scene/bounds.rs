//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

use nalgebra::Point3;

use crate::foundation::math::{Mat4, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5))
    }
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Same extents, moved to a new center
    pub fn recentered(&self, center: Vec3) -> Self {
        Self::from_center_extents(center, self.extents())
    }

    /// Bounds of this box after an affine transform (Arvo's method)
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&Point3::from(self.center())).coords;
        let extents = self.extents();
        let mut world_extents = Vec3::zeros();

        for row in 0..3 {
            for col in 0..3 {
                world_extents[row] += matrix[(row, col)].abs() * extents[col];
            }
        }

        Self::from_center_extents(center, world_extents)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Squared distance from a point to the box (zero inside)
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        let clamped = point.sup(&self.min).inf(&self.max);
        (point - clamped).magnitude_squared()
    }
}
