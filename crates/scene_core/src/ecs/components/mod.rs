//! Built-in component payloads
//!
//! Plain data consumed by renderers and camera controllers. Placement comes
//! from the host entity's world matrix, never from the component.

pub mod camera;
pub mod light;
pub mod mesh;

pub use camera::{CameraComponent, ClearFlag, ProjectionType, Viewport};
pub use light::{LightComponent, LightFactory, LightType};
pub use mesh::MeshComponent;
