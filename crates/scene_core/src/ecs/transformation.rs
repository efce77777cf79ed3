//! Transformation facet
//!
//! Local scale, rotation and position plus the cached world matrix. The
//! world matrix is whatever the last update wrote; it is never recomputed on
//! access.

use super::entity::EntityHandle;
use crate::foundation::math::{compose_srt, translation_of, Handedness, Mat4, Quat, Transform, Vec3};

slotmap::new_key_type! {
    /// Handle to a transformation facet slot
    pub struct TransformationHandle;
}

/// Local SRT and cached world matrix of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationFacet {
    pub(crate) owner: EntityHandle,

    /// Local position relative to the parent
    pub position: Vec3,

    /// Local rotation relative to the parent
    pub rotation: Quat,

    /// Local scale factors
    pub scale: Vec3,

    world_matrix: Mat4,
}

impl TransformationFacet {
    pub(crate) fn new(owner: EntityHandle) -> Self {
        Self {
            owner,
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            world_matrix: Mat4::identity(),
        }
    }

    /// Entity owning this facet
    pub fn owner(&self) -> EntityHandle {
        self.owner
    }

    /// Local transform as a value
    pub fn local_transform(&self) -> Transform {
        Transform::new(self.position, self.rotation, self.scale)
    }

    /// Replace the local transform
    pub fn set_local_transform(&mut self, transform: &Transform) {
        self.position = transform.position;
        self.rotation = transform.rotation;
        self.scale = transform.scale;
    }

    /// Local matrix (`T * R * S`)
    pub fn local_matrix(&self) -> Mat4 {
        compose_srt(&self.position, &self.rotation, &self.scale)
    }

    /// Local rotation as Euler angles in the given convention
    pub fn euler_angles(&self, handedness: Handedness) -> Vec3 {
        handedness.euler_from_rotation(&self.rotation)
    }

    /// Set the local rotation from Euler angles in the given convention
    pub fn set_euler_angles(&mut self, euler: Vec3, handedness: Handedness) {
        self.rotation = handedness.rotation_from_euler(euler);
    }

    /// World matrix as of the last update
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// World position as of the last update
    pub fn world_position(&self) -> Vec3 {
        translation_of(&self.world_matrix)
    }

    pub(crate) fn set_world_matrix(&mut self, world: Mat4) {
        self.world_matrix = world;
    }
}
