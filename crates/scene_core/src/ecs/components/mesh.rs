//! Mesh component for entities that can be rendered

use crate::ecs::Component;

/// Reference to mesh and material assets plus draw settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshComponent {
    /// Asset path or key of the mesh
    pub mesh: String,

    /// Material per submesh
    pub materials: Vec<String>,

    /// Whether this object is visible
    pub visible: bool,

    /// Whether the mesh is drawn into shadow maps
    pub cast_shadows: bool,

    /// Whether this material is transparent (affects render order)
    pub is_transparent: bool,
}

impl Component for MeshComponent {}

impl MeshComponent {
    /// Visible opaque mesh with a single material
    pub fn new(mesh: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            materials: vec![material.into()],
            visible: true,
            cast_shadows: true,
            is_transparent: false,
        }
    }

    /// Transparent variant
    #[must_use]
    pub fn transparent(mut self) -> Self {
        self.is_transparent = true;
        self.cast_shadows = false;
        self
    }
}
