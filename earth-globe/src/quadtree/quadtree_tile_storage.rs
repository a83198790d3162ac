use bevy::utils::HashMap;
use earth_scene::{GeographicTilingScheme, TileKey, TilingScheme};

use super::quadtree_tile::{Quadrant, QuadtreeTile};

/// Arena of every tile ever created, keyed by [`TileKey`]. Tiles are never
/// removed; parent and child links are keys into the same map.
pub struct QuadtreeTileStorage {
    map: HashMap<TileKey, QuadtreeTile>,
    pub root: Vec<TileKey>,
}
impl QuadtreeTileStorage {
    pub fn new() -> Self {
        return Self {
            map: HashMap::default(),
            root: vec![],
        };
    }
    pub fn root_len(&self) -> usize {
        return self.root.len();
    }
    pub fn len(&self) -> usize {
        return self.map.len();
    }
    pub fn is_empty(&self) -> bool {
        return self.map.is_empty();
    }
    fn add(&mut self, tile: QuadtreeTile) {
        if tile.parent.is_none() {
            self.root.push(tile.key);
        }
        self.map.insert(tile.key, tile);
    }
    pub fn get(&self, k: &TileKey) -> Option<&QuadtreeTile> {
        return self.map.get(k);
    }
    pub fn get_mut(&mut self, k: &TileKey) -> Option<&mut QuadtreeTile> {
        return self.map.get_mut(k);
    }
    pub fn iter(&self) -> impl Iterator<Item = &QuadtreeTile> {
        self.map.values()
    }
    pub fn create_level_zero_tiles(&mut self, tiling_scheme: &GeographicTilingScheme) {
        let number_of_level_zero_tiles_x = tiling_scheme.number_of_x_tiles_at_level(0);
        let number_of_level_zero_tiles_y = tiling_scheme.number_of_y_tiles_at_level(0);
        for y in 0..number_of_level_zero_tiles_y {
            for x in 0..number_of_level_zero_tiles_x {
                let key = TileKey::new(x, y, 0);
                let rectangle = tiling_scheme.tile_x_y_to_rectangle(x, y, 0);
                let tile = QuadtreeTile::new(key, Quadrant::Root(self.root.len()), None, rectangle);
                self.add(tile);
            }
        }
    }
    /// Creates the four children of `parent_key` on first use and returns
    /// their keys. Child rectangles come from splitting the parent's, so they
    /// cover it exactly.
    pub fn subdivide(&mut self, parent_key: &TileKey) -> Option<[TileKey; 4]> {
        let parent = self.get(parent_key)?;
        if let Some(children) = parent.children {
            return Some(children);
        }
        let keys = parent_key.children();
        let rectangles = parent.rectangle.subdivide();
        for ((key, rectangle), location) in keys.iter().zip(rectangles).zip(Quadrant::CHILDREN) {
            self.add(QuadtreeTile::new(*key, location, Some(*parent_key), rectangle));
        }
        if let Some(parent) = self.get_mut(parent_key) {
            parent.children = Some(keys);
        }
        return Some(keys);
    }
}
