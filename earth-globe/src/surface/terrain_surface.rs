use std::sync::Arc;

use bevy::log::{debug, info};
use earth_scene::{Ellipsoid, TileKey};
use quantized_mesh_decoder::{decode, DecodeOptions};

use super::{terrain_mesh::TerrainMesh, tile_cache::TileCache, GlobeSurface, TileStatus};
use crate::{
    fetch::{FetchError, TileFetcher},
    provider::TerrainProvider,
    quadtree::UpdatedTiles,
};

/// Streams quantized-mesh tiles and places them on the ellipsoid. Tiles
/// deeper than the provider's maximum level carry no mesh.
pub struct TerrainSurface {
    provider: Box<dyn TerrainProvider>,
    fetcher: Arc<dyn TileFetcher>,
    cache: TileCache<Option<TerrainMesh>>,
    ellipsoid: Ellipsoid,
}

impl TerrainSurface {
    pub fn new(
        provider: Box<dyn TerrainProvider>,
        fetcher: Arc<dyn TileFetcher>,
        ellipsoid: Ellipsoid,
        cache_size: usize,
    ) -> Self {
        info!("terrain surface '{}' created", provider.name());
        Self {
            provider,
            fetcher,
            cache: TileCache::new(cache_size),
            ellipsoid,
        }
    }
    pub fn mesh(&self, key: &TileKey) -> Option<&TerrainMesh> {
        self.cache.get(key).and_then(|mesh| mesh.as_ref())
    }
    pub fn skirt_height(&self, key: &TileKey) -> f64 {
        self.provider.level_maximum_geometric_error(key.level) * 5.0
    }
}

impl GlobeSurface for TerrainSurface {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn reconcile(&mut self, updated: &UpdatedTiles) {
        let provider = &self.provider;
        let fetcher = &self.fetcher;
        self.cache.reconcile(
            updated,
            |key| key.level <= provider.maximum_level(),
            |tile| fetcher.fetch(provider.tile_url(&tile.key)),
            |_| None,
        );
    }

    fn poll(&mut self) {
        let ellipsoid = self.ellipsoid;
        let settled = self.cache.poll(|tile, bytes| {
            let terrain = decode(&bytes, DecodeOptions::default()).map_err(FetchError::Decode)?;
            debug!(
                "decoded terrain tile {}: {} vertices, {} triangles",
                tile.key,
                terrain.vertex_count(),
                terrain.triangle_count()
            );
            Ok(Some(TerrainMesh::from_terrain(
                &terrain,
                &tile.rectangle,
                &ellipsoid,
            )))
        });
        if !settled.is_empty() {
            debug!("{} terrain tile(s) settled", settled.len());
        }
    }

    fn status(&self, key: &TileKey) -> TileStatus {
        self.cache.status(key)
    }
}
