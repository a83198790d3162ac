use bevy::math::UVec2;

use crate::{cartographic::Cartographic, ellipsoid::Ellipsoid, rectangle::Rectangle};

pub trait TilingScheme {
    fn name(&self) -> &'static str;
    fn ellipsoid(&self) -> Ellipsoid;
    fn rectangle(&self) -> Rectangle;
    fn number_of_x_tiles_at_level(&self, level: u32) -> u32;
    fn number_of_y_tiles_at_level(&self, level: u32) -> u32;
    fn number_of_tiles_at_level(&self, level: u32) -> u32 {
        return self.number_of_x_tiles_at_level(level) * self.number_of_y_tiles_at_level(level);
    }
    fn tile_x_y_to_rectangle(&self, x: u32, y: u32, level: u32) -> Rectangle;
    fn position_to_tile_x_y(&self, position: &Cartographic, level: u32) -> Option<UVec2>;
}
