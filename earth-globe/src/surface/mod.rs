use earth_scene::TileKey;

use crate::quadtree::UpdatedTiles;

pub mod imagery_surface;
pub mod surface_mesh;
pub mod terrain_mesh;
pub mod terrain_surface;
pub mod tile_cache;

pub use imagery_surface::{ImagerySurface, ImageryTile};
pub use surface_mesh::TileSurfaceMesh;
pub use terrain_mesh::TerrainMesh;
pub use terrain_surface::TerrainSurface;
pub use tile_cache::{CacheEntry, TileCache};

/// Load status of one tile as seen by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Pending,
    Ready,
    Failed,
    /// The surface holds nothing for the key.
    Missing,
}

/// A layer draped over the globe that follows the quadtree's tile selection.
pub trait GlobeSurface: Send + Sync {
    fn name(&self) -> &str;
    /// Applies one quadtree update: drops retired tiles and requests the
    /// payloads of newly wanted ones.
    fn reconcile(&mut self, updated: &UpdatedTiles);
    /// Collects finished fetches. Call once per frame.
    fn poll(&mut self);
    fn status(&self, key: &TileKey) -> TileStatus;
}
