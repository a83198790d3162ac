use serde::{Deserialize, Serialize};

/// Identity of a tile in the quadtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}
impl TileKey {
    pub fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }
    /// Keys of the north-west, north-east, south-west and south-east children.
    pub fn children(&self) -> [TileKey; 4] {
        let level = self.level + 1;
        let x = self.x * 2;
        let y = self.y * 2;
        return [
            TileKey::new(x, y, level),
            TileKey::new(x + 1, y, level),
            TileKey::new(x, y + 1, level),
            TileKey::new(x + 1, y + 1, level),
        ];
    }
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        return Some(TileKey::new(self.x / 2, self.y / 2, self.level - 1));
    }
    pub fn is_ancestor_of(&self, other: &TileKey) -> bool {
        if other.level <= self.level {
            return false;
        }
        let shift = other.level - self.level;
        return other.x >> shift == self.x && other.y >> shift == self.y;
    }
}
impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}
