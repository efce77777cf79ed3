//! Scene sizing and convention settings

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Handedness;

/// Pool sizes and conventions for one [`World`](crate::ecs::World)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Maximum number of live entities
    pub entity_capacity: usize,

    /// Maximum number of hierarchy facets
    pub hierarchy_capacity: usize,

    /// Maximum number of transformation facets
    pub transformation_capacity: usize,

    /// Pool size for component types without an explicit entry
    pub default_component_capacity: usize,

    /// Per-type pool sizes keyed by the component's type name (e.g. `"CameraComponent"`)
    pub component_capacities: HashMap<String, usize>,

    /// Spatial map layout
    pub map: MapConfig,

    /// Euler angle convention
    pub handedness: Handedness,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 4096,
            hierarchy_capacity: 4096,
            transformation_capacity: 4096,
            default_component_capacity: 1024,
            component_capacities: HashMap::new(),
            map: MapConfig::default(),
            handedness: Handedness::default(),
        }
    }
}

impl Config for SceneConfig {}

impl SceneConfig {
    /// Pool size for a component type, falling back to the default
    pub fn component_capacity(&self, type_name: &str) -> usize {
        let short_name = type_name.rsplit("::").next().unwrap_or(type_name);
        self.component_capacities
            .get(short_name)
            .or_else(|| self.component_capacities.get(type_name))
            .copied()
            .unwrap_or(self.default_component_capacity)
    }

    /// Check that every pool can hold at least one object and the map has area
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_capacity == 0 {
            return Err(ConfigError::Invalid("entity_capacity must be non-zero".into()));
        }
        if self.default_component_capacity == 0 {
            return Err(ConfigError::Invalid(
                "default_component_capacity must be non-zero".into(),
            ));
        }
        if self.hierarchy_capacity > self.entity_capacity
            || self.transformation_capacity > self.entity_capacity
        {
            log::warn!("Facet pools are larger than the entity pool; extra slots are never used");
        }
        if let Some((name, _)) = self.component_capacities.iter().find(|(_, cap)| **cap == 0) {
            return Err(ConfigError::Invalid(format!("component pool '{name}' has zero capacity")));
        }
        self.map.validate()
    }
}

/// Region grid of the spatial map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Regions along X
    pub regions_x: usize,

    /// Regions along Y
    pub regions_y: usize,

    /// Region extent along X in meters
    pub meters_x: f32,

    /// Region extent along Y in meters
    pub meters_y: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            regions_x: 16,
            regions_y: 16,
            meters_x: 64.0,
            meters_y: 64.0,
        }
    }
}

impl Config for MapConfig {}

impl MapConfig {
    /// Total number of regions
    pub fn region_count(&self) -> usize {
        self.regions_x * self.regions_y
    }

    /// Check that the grid is non-empty and regions have positive size
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions_x == 0 || self.regions_y == 0 {
            return Err(ConfigError::Invalid("map needs at least one region".into()));
        }
        if !(self.meters_x > 0.0 && self.meters_y > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "region size must be positive, got {}x{}",
                self.meters_x, self.meters_y
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SceneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_component_capacity_lookup() {
        let mut config = SceneConfig::default();
        config.component_capacities.insert("CameraComponent".into(), 8);

        assert_eq!(
            config.component_capacity("scene_core::ecs::components::camera::CameraComponent"),
            8
        );
        assert_eq!(config.component_capacity("MeshComponent"), 1024);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SceneConfig = toml::from_str(
            r#"
            entity_capacity = 32
            handedness = "LeftHanded"

            [component_capacities]
            LightComponent = 4

            [map]
            regions_x = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.entity_capacity, 32);
        assert_eq!(config.hierarchy_capacity, 4096);
        assert_eq!(config.handedness, Handedness::LeftHanded);
        assert_eq!(config.component_capacity("LightComponent"), 4);
        assert_eq!(config.map.regions_x, 2);
        assert_eq!(config.map.regions_y, 16);
    }

    #[test]
    fn test_ron_config_parses() {
        let config: SceneConfig =
            ron::from_str("(entity_capacity: 8, map: (meters_x: 10.0, meters_y: 10.0))").unwrap();

        assert_eq!(config.entity_capacity, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = SceneConfig::default();
        config.map.meters_x = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.entity_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.default_component_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.map.regions_x = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
