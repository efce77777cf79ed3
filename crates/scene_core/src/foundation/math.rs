//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph. Matrices use
//! column vectors, so a local transform is composed as `T * R * S` and a world
//! matrix as `parent_world * local`.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, UnitQuaternion, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Scale factors below this magnitude are treated as degenerate during decomposition.
const DEGENERATE_SCALE: f32 = 1.0e-8;

/// Basis convention used when converting between Euler angles and rotations.
///
/// Rotations are stored as quaternions, so the convention only matters at the
/// Euler boundary (editor input, imported assets). A left-handed source mirrors
/// the X axis, which flips the sign of the X angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Handedness {
    /// Y-up right-handed basis (engine native)
    #[default]
    RightHanded,
    /// Basis mirrored on the X axis
    LeftHanded,
}

impl Handedness {
    /// Sign applied to the X Euler angle for this convention
    pub const fn x_sign(self) -> f32 {
        match self {
            Self::RightHanded => 1.0,
            Self::LeftHanded => -1.0,
        }
    }

    /// Build a rotation from Euler angles (radians, roll/pitch/yaw around X/Y/Z)
    pub fn rotation_from_euler(self, euler: Vec3) -> Quat {
        Quat::from_euler_angles(euler.x * self.x_sign(), euler.y, euler.z)
    }

    /// Extract Euler angles (radians, X/Y/Z) from a rotation
    pub fn euler_from_rotation(self, rotation: &Quat) -> Vec3 {
        let (roll, pitch, yaw) = rotation.euler_angles();
        Vec3::new(roll * self.x_sign(), pitch, yaw)
    }
}

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform from all three parts
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Convert to a transformation matrix (scale, then rotate, then translate)
    pub fn to_matrix(&self) -> Mat4 {
        compose_srt(&self.position, &self.rotation, &self.scale)
    }

    /// Decompose an affine matrix into translation, rotation and scale.
    ///
    /// Shear cannot be represented and is folded into the rotation. A negative
    /// determinant is expressed as a negative X scale.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = translation_of(matrix);

        let mut columns = [
            Vec3::new(matrix.m11, matrix.m21, matrix.m31),
            Vec3::new(matrix.m12, matrix.m22, matrix.m32),
            Vec3::new(matrix.m13, matrix.m23, matrix.m33),
        ];

        let mut scale = Vec3::new(
            columns[0].magnitude(),
            columns[1].magnitude(),
            columns[2].magnitude(),
        );

        for (axis, column) in columns.iter_mut().enumerate() {
            if scale[axis] > DEGENERATE_SCALE {
                *column /= scale[axis];
            }
        }

        let mut basis = Mat3::from_columns(&columns);

        if basis.determinant() < 0.0 {
            scale.x = -scale.x;
            basis.set_column(0, &(-columns[0]));
        }

        Self {
            position,
            rotation: Quat::from_matrix(&basis),
            scale,
        }
    }
}

/// Build `T * R * S` from the three parts
pub fn compose_srt(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
    Mat4::new_translation(position)
        * rotation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(scale)
}

/// Translation column of an affine matrix
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

/// Component-wise comparison of two matrices within `epsilon`
pub fn matrices_approx_eq(a: &Mat4, b: &Mat4, epsilon: f32) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(lhs, rhs)| approx::abs_diff_eq!(*lhs, *rhs, epsilon = epsilon))
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use constants::HALF_PI;

    #[test]
    fn test_srt_order() {
        // Scale is applied before rotation, rotation before translation
        let matrix = compose_srt(
            &Vec3::new(10.0, 0.0, 0.0),
            &Quat::from_axis_angle(&Vec3::z_axis(), HALF_PI),
            &Vec3::new(2.0, 1.0, 1.0),
        );

        let point = matrix.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point.coords, Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_matrix_roundtrip_consistency() {
        let original = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(&Unit::new_normalize(Vec3::new(1.0, 1.0, 1.0)), 0.5),
            Vec3::new(2.0, 1.5, 0.8),
        );

        let reconstructed = Transform::from_matrix(&original.to_matrix());

        assert_relative_eq!(reconstructed.position, original.position, epsilon = 1e-5);
        assert_relative_eq!(reconstructed.scale, original.scale, epsilon = 1e-5);

        // Quaternions might flip sign but represent the same rotation
        let dot = original.rotation.coords.dot(&reconstructed.rotation.coords);
        assert!(dot.abs() > 0.999, "Quaternion rotation mismatch: dot product = {dot}");
    }

    #[test]
    fn test_mirrored_matrix_decomposes_to_negative_x_scale() {
        let mirrored = Mat4::new_nonuniform_scaling(&Vec3::new(-1.0, 1.0, 1.0));
        let transform = Transform::from_matrix(&mirrored);

        assert_relative_eq!(transform.scale, Vec3::new(-1.0, 1.0, 1.0), epsilon = 1e-6);
        assert!(matrices_approx_eq(&transform.to_matrix(), &mirrored, 1e-6));
    }

    #[test]
    fn test_euler_roundtrip_for_both_conventions() {
        let euler = Vec3::new(0.3, -0.4, 1.1);

        for handedness in [Handedness::RightHanded, Handedness::LeftHanded] {
            let rotation = handedness.rotation_from_euler(euler);
            assert_relative_eq!(handedness.euler_from_rotation(&rotation), euler, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_left_handed_mirrors_x_angle() {
        let euler = Vec3::new(0.6, 0.0, 0.0);

        let right = Handedness::RightHanded.rotation_from_euler(euler);
        let left = Handedness::LeftHanded.rotation_from_euler(euler);

        assert_relative_eq!(left, right.inverse(), epsilon = 1e-6);

        // Same angles about Y and Z are unaffected
        let yaw_only = Vec3::new(0.0, 0.0, 0.6);
        assert_relative_eq!(
            Handedness::LeftHanded.rotation_from_euler(yaw_only),
            Handedness::RightHanded.rotation_from_euler(yaw_only),
            epsilon = 1e-6
        );
    }
}
