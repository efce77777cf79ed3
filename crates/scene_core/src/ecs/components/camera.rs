//! Camera component

use serde::{Deserialize, Serialize};

use crate::ecs::entity::Layer;
use crate::ecs::Component;
use crate::foundation::math::{utils, Mat4, Vec3};

/// What the camera clears its target with before drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClearFlag {
    /// Sky box
    #[default]
    Skybox,
    /// Background texture
    Texture,
    /// Background color
    SolidColor,
    /// Depth only
    DepthOnly,
    /// Keep previous contents
    DontClear,
}

/// Projection model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ProjectionType {
    /// Field-of-view perspective
    #[default]
    Perspective,
    /// Parallel projection of `size` half-height
    Orthographic,
    /// Matrix supplied from outside (e.g. an AR platform)
    External,
}

/// Normalized target rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge (0..1)
    pub x: f32,
    /// Bottom edge (0..1)
    pub y: f32,
    /// Width (0..1)
    pub width: f32,
    /// Height (0..1)
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Camera settings; the view comes from the host entity's world matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    /// Clear behavior
    pub clear_flag: ClearFlag,
    /// Color used with [`ClearFlag::SolidColor`]
    pub background_color: Vec3,
    /// Projection model
    pub projection: ProjectionType,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Orthographic half-height
    pub size: f32,
    /// Target rectangle
    pub viewport: Viewport,
    /// Draw order among cameras (lower first)
    pub depth: i32,
    /// Non-default layers this camera renders
    pub culling_mask: Layer,
    /// Matrix used with [`ProjectionType::External`]
    pub external_projection: Mat4,
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self {
            clear_flag: ClearFlag::default(),
            background_color: Vec3::zeros(),
            projection: ProjectionType::default(),
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            size: 5.0,
            viewport: Viewport::default(),
            depth: 0,
            culling_mask: Layer::all(),
            external_projection: Mat4::identity(),
        }
    }
}

impl Component for CameraComponent {}

impl CameraComponent {
    /// Perspective camera
    pub fn perspective(fov_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            fov_degrees,
            near,
            far,
            ..Self::default()
        }
    }

    /// Orthographic camera of the given half-height
    pub fn orthographic(size: f32, near: f32, far: f32) -> Self {
        Self {
            projection: ProjectionType::Orthographic,
            size,
            near,
            far,
            ..Self::default()
        }
    }

    /// Projection matrix for a target of the given aspect ratio (width / height)
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            ProjectionType::Perspective => {
                Mat4::new_perspective(aspect, utils::deg_to_rad(self.fov_degrees), self.near, self.far)
            }
            ProjectionType::Orthographic => {
                let half_width = self.size * aspect;
                Mat4::new_orthographic(
                    -half_width,
                    half_width,
                    -self.size,
                    self.size,
                    self.near,
                    self.far,
                )
            }
            ProjectionType::External => self.external_projection,
        }
    }

    /// View matrix from the host entity's world matrix
    pub fn view_matrix(world: &Mat4) -> Option<Mat4> {
        world.try_inverse()
    }

    /// Whether entities on `layer` are drawn by this camera
    pub fn renders_layer(&self, layer: Layer) -> bool {
        layer.is_empty() || self.culling_mask.intersects(layer)
    }
}
