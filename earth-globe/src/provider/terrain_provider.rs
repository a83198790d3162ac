use earth_scene::{GeographicTilingScheme, TileKey, TilingScheme};

use super::url_template::UrlTemplate;
use crate::{config::TerrainConfig, quadtree::get_estimated_level_zero_geometric_error_for_a_heightmap};

/// Quantized-mesh tiles use 65 height samples per edge for the error estimate.
const QUANTIZED_MESH_HEIGHTMAP_WIDTH: u32 = 65;

pub trait TerrainProvider: Send + Sync {
    fn name(&self) -> &str;
    fn maximum_level(&self) -> u32;
    fn tile_url(&self, key: &TileKey) -> String;
    fn level_maximum_geometric_error(&self, level: u32) -> f64;
}

pub struct QuantizedMeshTerrainProvider {
    pub url: UrlTemplate,
    pub tiling_scheme: GeographicTilingScheme,
    pub maximum_level: u32,
    level_zero_maximum_geometric_error: f64,
}
impl QuantizedMeshTerrainProvider {
    pub fn new(url: UrlTemplate, tiling_scheme: GeographicTilingScheme) -> Self {
        let level_zero_maximum_geometric_error =
            get_estimated_level_zero_geometric_error_for_a_heightmap(
                &tiling_scheme.ellipsoid,
                QUANTIZED_MESH_HEIGHTMAP_WIDTH,
                tiling_scheme.number_of_x_tiles_at_level(0),
            );
        Self {
            url,
            tiling_scheme,
            maximum_level: 18,
            level_zero_maximum_geometric_error,
        }
    }
    pub fn from_config(config: &TerrainConfig, tiling_scheme: GeographicTilingScheme) -> Self {
        let mut provider = Self::new(UrlTemplate::new(config.url.clone()), tiling_scheme);
        provider.maximum_level = config.maximum_level;
        provider
    }
}
impl TerrainProvider for QuantizedMeshTerrainProvider {
    fn name(&self) -> &str {
        "quantized-mesh"
    }
    fn maximum_level(&self) -> u32 {
        self.maximum_level
    }
    fn tile_url(&self, key: &TileKey) -> String {
        self.url
            .resolve(key, self.tiling_scheme.number_of_y_tiles_at_level(key.level))
    }
    fn level_maximum_geometric_error(&self, level: u32) -> f64 {
        self.level_zero_maximum_geometric_error / (1u64 << level.min(63)) as f64
    }
}
