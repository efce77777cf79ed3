//! Lighting component
//!
//! Lights carry photometric settings only. Position and direction come from
//! the host entity: a light shines down its local -Z axis.

use crate::ecs::Component;
use crate::foundation::math::{Mat4, Vec3};

/// Light settings
#[derive(Debug, Clone, PartialEq)]
pub struct LightComponent {
    /// The type of light (directional, point, or spot)
    pub light_type: LightType,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
    /// Maximum range for point/spot lights
    pub range: f32,
    /// Inner cone angle for spot lights in radians
    pub inner_cone: f32,
    /// Outer cone angle for spot lights in radians
    pub outer_cone: f32,
    /// Whether this light should cast shadows
    pub cast_shadows: bool,
}

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Point light that radiates in all directions from a position
    Point,
    /// Spot light that creates a cone of light from a position
    Spot,
}

impl Default for LightComponent {
    fn default() -> Self {
        LightFactory::point(Vec3::new(1.0, 1.0, 1.0), 1.0, 10.0)
    }
}

impl Component for LightComponent {}

impl LightComponent {
    /// World-space direction the light shines in
    pub fn world_direction(world: &Mat4) -> Vec3 {
        world
            .transform_vector(&Vec3::new(0.0, 0.0, -1.0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(0.0, 0.0, -1.0))
    }

    /// Whether a point lies within reach of a point or spot light at `origin`
    pub fn reaches(&self, origin: Vec3, point: Vec3) -> bool {
        match self.light_type {
            LightType::Directional => true,
            LightType::Point | LightType::Spot => (point - origin).magnitude() <= self.range,
        }
    }
}

/// Factory functions for creating light components
pub struct LightFactory;

impl LightFactory {
    /// Directional light
    pub fn directional(color: Vec3, intensity: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Directional,
            color,
            intensity,
            range: 0.0,
            inner_cone: 0.0,
            outer_cone: 0.0,
            cast_shadows: true,
        }
    }

    /// Point light
    pub fn point(color: Vec3, intensity: f32, range: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Point,
            color,
            intensity,
            range,
            inner_cone: 0.0,
            outer_cone: 0.0,
            cast_shadows: false,
        }
    }

    /// Spot light with cone angles in radians
    pub fn spot(color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Spot,
            color,
            intensity,
            range,
            inner_cone,
            outer_cone: outer_cone.max(inner_cone),
            cast_shadows: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_direction_follows_host_rotation() {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let world = Mat4::new_translation(&Vec3::new(3.0, 0.0, 0.0)) * rotation.to_homogeneous();

        assert_relative_eq!(
            LightComponent::world_direction(&world),
            Vec3::new(-1.0, 0.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_spot_cone_is_ordered() {
        let light = LightFactory::spot(Vec3::new(1.0, 1.0, 1.0), 2.0, 15.0, 0.5, 0.3);
        assert_relative_eq!(light.outer_cone, 0.5);
        assert_eq!(light.light_type, LightType::Spot);
    }

    #[test]
    fn test_range() {
        let light = LightFactory::point(Vec3::new(1.0, 1.0, 1.0), 1.0, 5.0);
        assert!(light.reaches(Vec3::zeros(), Vec3::new(3.0, 4.0, 0.0)));
        assert!(!light.reaches(Vec3::zeros(), Vec3::new(3.0, 4.1, 0.0)));
        assert!(LightFactory::directional(Vec3::zeros(), 1.0).reaches(Vec3::zeros(), Vec3::new(1e6, 0.0, 0.0)));
    }
}
