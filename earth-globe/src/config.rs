use std::path::Path;

use bevy::log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level globe configuration. Every field has a default, so an empty
/// JSON object is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeConfig {
    pub quadtree: QuadtreeConfig,
    pub imagery: Option<ImageryConfig>,
    pub terrain: Option<TerrainConfig>,
    /// Target frames per second of the frame scheduler.
    pub frame_rate: f64,
    pub camera: CameraConfig,
}
impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            quadtree: QuadtreeConfig::default(),
            imagery: None,
            terrain: None,
            frame_rate: 60.0,
            camera: CameraConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuadtreeConfig {
    pub maximum_level: u32,
    /// Screen-space error in pixels above which a tile is refined.
    pub maximum_screen_space_error: f64,
    /// Multiplier on the refinement distance before a tile is merged again.
    pub merge_hysteresis: f64,
    pub tile_width: u32,
    /// Soft limit on cached tiles per surface. Rendered tiles are never evicted.
    pub tile_cache_size: usize,
}
impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            maximum_level: 18,
            maximum_screen_space_error: 2.0,
            merge_hysteresis: 1.5,
            tile_width: 256,
            tile_cache_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageryConfig {
    /// e.g. `https://tile.openstreetmap.org/{z}/{x}/{y}.png`
    pub url: String,
    pub minimum_level: u32,
    pub maximum_level: u32,
}
impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            minimum_level: 0,
            maximum_level: 18,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// e.g. `http://localhost:8080/tilesets/terrain/{z}/{x}/{y}.terrain`
    pub url: String,
    pub maximum_level: u32,
}
impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            maximum_level: 18,
        }
    }
}

/// Initial viewpoint in degrees and meters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Horizontal field of view in degrees.
    pub fov: f64,
}
impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 0.0,
            height: 20000000.0,
            viewport_width: 1024,
            viewport_height: 768,
            fov: 60.0,
        }
    }
}

impl GlobeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GlobeConfig = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config = Self::from_json_str(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !(self.quadtree.maximum_screen_space_error > 0.0) {
            return Err(ConfigError::Invalid(
                "quadtree.maximum_screen_space_error must be positive".into(),
            ));
        }
        if self.quadtree.merge_hysteresis < 1.0 {
            return Err(ConfigError::Invalid(
                "quadtree.merge_hysteresis must be at least 1".into(),
            ));
        }
        if self.quadtree.tile_width == 0 {
            return Err(ConfigError::Invalid("quadtree.tile_width must be positive".into()));
        }
        // children beyond this level no longer fit u32 tile coordinates
        if self.quadtree.maximum_level > 30 {
            return Err(ConfigError::Invalid(format!(
                "quadtree.maximum_level {} exceeds 30",
                self.quadtree.maximum_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = GlobeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, GlobeConfig::default());
        assert_eq!(config.quadtree.maximum_level, 18);
        assert_eq!(config.quadtree.merge_hysteresis, 1.5);
        assert_eq!(config.frame_rate, 60.0);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = GlobeConfig::from_json_str(
            r#"{
                "quadtree": { "maximum_level": 5 },
                "imagery": { "url": "http://tiles/{z}/{x}/{y}.png" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.quadtree.maximum_level, 5);
        assert_eq!(config.quadtree.tile_cache_size, 100);
        let imagery = config.imagery.unwrap();
        assert_eq!(imagery.url, "http://tiles/{z}/{x}/{y}.png");
        assert_eq!(imagery.maximum_level, 18);
        assert!(config.terrain.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            GlobeConfig::from_json_str(r#"{ "frame_rate": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GlobeConfig::from_json_str(r#"{ "quadtree": { "merge_hysteresis": 0.5 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GlobeConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            GlobeConfig::from_path(Path::new("/nonexistent/globe.json")),
            Err(ConfigError::Read(_))
        ));
    }
}
