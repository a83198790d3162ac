use bevy::math::UVec2;

use crate::{
    cartographic::Cartographic, ellipsoid::Ellipsoid, rectangle::Rectangle,
    tiling_scheme::TilingScheme,
};

/// Equirectangular tiling. Tiles are numbered from the north-west corner.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicTilingScheme {
    pub ellipsoid: Ellipsoid,
    pub rectangle: Rectangle,
    pub number_of_level_zero_tiles_x: u32,
    pub number_of_level_zero_tiles_y: u32,
}
#[derive(Debug, Clone)]
pub struct GeographicTilingSchemeOptions {
    pub ellipsoid: Ellipsoid,
    pub rectangle: Rectangle,
    pub number_of_level_zero_tiles_x: u32,
    pub number_of_level_zero_tiles_y: u32,
}
impl Default for GeographicTilingSchemeOptions {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            rectangle: Rectangle::MAX_VALUE,
            number_of_level_zero_tiles_x: 1,
            number_of_level_zero_tiles_y: 1,
        }
    }
}
impl Default for GeographicTilingScheme {
    fn default() -> Self {
        Self::new(GeographicTilingSchemeOptions::default())
    }
}
impl GeographicTilingScheme {
    pub fn new(options: GeographicTilingSchemeOptions) -> Self {
        return Self {
            ellipsoid: options.ellipsoid,
            rectangle: options.rectangle,
            number_of_level_zero_tiles_x: options.number_of_level_zero_tiles_x.max(1),
            number_of_level_zero_tiles_y: options.number_of_level_zero_tiles_y.max(1),
        };
    }
}
impl TilingScheme for GeographicTilingScheme {
    fn name(&self) -> &'static str {
        "GeographicTilingScheme"
    }
    fn ellipsoid(&self) -> Ellipsoid {
        return self.ellipsoid;
    }
    fn rectangle(&self) -> Rectangle {
        return self.rectangle;
    }
    fn number_of_x_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_level_zero_tiles_x << level;
    }
    fn number_of_y_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_level_zero_tiles_y << level;
    }
    fn tile_x_y_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle {
        let rectangle = self.rectangle;

        let x_tiles = self.number_of_x_tiles_at_level(level);
        let y_tiles = self.number_of_y_tiles_at_level(level);

        let x_tile_width = rectangle.width() / x_tiles as f64;
        let west = (x as f64) * x_tile_width + rectangle.west;
        let east = ((x + 1) as f64) * x_tile_width + rectangle.west;

        let y_tile_height = rectangle.height() / y_tiles as f64;
        let north = rectangle.north - y as f64 * y_tile_height;
        let south = rectangle.north - (y + 1) as f64 * y_tile_height;
        return Rectangle::new(west, south, east, north);
    }
    fn position_to_tile_x_y(&self, position: &Cartographic, level: u32) -> Option<UVec2> {
        let rectangle = self.rectangle;
        if !rectangle.contains(position) {
            return None;
        }
        let x_tiles = self.number_of_x_tiles_at_level(level);
        let y_tiles = self.number_of_y_tiles_at_level(level);

        let x_tile_width = rectangle.width() / x_tiles as f64;
        let y_tile_height = rectangle.height() / y_tiles as f64;

        let mut longitude = position.longitude;
        if rectangle.east < rectangle.west && longitude < rectangle.west {
            longitude += std::f64::consts::TAU;
        }

        let x_tile_coordinate =
            (((longitude - rectangle.west) / x_tile_width).floor().max(0.0) as u32).min(x_tiles - 1);
        let y_tile_coordinate = (((rectangle.north - position.latitude) / y_tile_height)
            .floor()
            .max(0.0) as u32)
            .min(y_tiles - 1);

        return Some(UVec2::new(x_tile_coordinate, y_tile_coordinate));
    }
}
