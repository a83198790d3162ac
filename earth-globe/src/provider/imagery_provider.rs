use earth_scene::{GeographicTilingScheme, TileKey, TilingScheme};

use super::url_template::UrlTemplate;
use crate::config::ImageryConfig;

pub trait ImageryProvider: Send + Sync {
    fn name(&self) -> &str;
    fn tile_width(&self) -> u32;
    fn tile_height(&self) -> u32;
    fn minimum_level(&self) -> u32;
    fn maximum_level(&self) -> u32;
    fn tile_url(&self, key: &TileKey) -> String;
}

/// Raster tiles addressed by level, column and row.
pub struct XyzImageryProvider {
    pub url: UrlTemplate,
    pub tiling_scheme: GeographicTilingScheme,
    pub minimum_level: u32,
    pub maximum_level: u32,
}
impl XyzImageryProvider {
    pub fn new(url: UrlTemplate, tiling_scheme: GeographicTilingScheme) -> Self {
        Self {
            url,
            tiling_scheme,
            minimum_level: 0,
            maximum_level: 18,
        }
    }
    pub fn from_config(config: &ImageryConfig, tiling_scheme: GeographicTilingScheme) -> Self {
        Self {
            url: UrlTemplate::new(config.url.clone()),
            tiling_scheme,
            minimum_level: config.minimum_level,
            maximum_level: config.maximum_level,
        }
    }
}
impl ImageryProvider for XyzImageryProvider {
    fn name(&self) -> &str {
        "xyz"
    }
    fn tile_width(&self) -> u32 {
        256
    }
    fn tile_height(&self) -> u32 {
        256
    }
    fn minimum_level(&self) -> u32 {
        self.minimum_level
    }
    fn maximum_level(&self) -> u32 {
        self.maximum_level
    }
    fn tile_url(&self, key: &TileKey) -> String {
        self.url
            .resolve(key, self.tiling_scheme.number_of_y_tiles_at_level(key.level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_url_uses_the_tiling_scheme_rows() {
        let provider = XyzImageryProvider::from_config(
            &ImageryConfig {
                url: "http://a/{z}/{x}/{reverseY}.jpg".into(),
                ..Default::default()
            },
            GeographicTilingScheme::default(),
        );
        assert_eq!(provider.tile_url(&TileKey::new(1, 0, 1)), "http://a/1/1/1.jpg");
        assert_eq!(provider.maximum_level(), 18);
    }
}
