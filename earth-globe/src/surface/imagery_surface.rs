use std::sync::Arc;

use bevy::log::{debug, info};
use earth_scene::{Ellipsoid, TileKey};

use super::{surface_mesh::TileSurfaceMesh, tile_cache::TileCache, GlobeSurface, TileStatus};
use crate::{
    fetch::TileFetcher,
    provider::ImageryProvider,
    quadtree::UpdatedTiles,
};

/// Raster payload and the grid it is draped on.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryTile {
    /// Encoded image bytes; `None` outside the provider's level range.
    pub image: Option<Vec<u8>>,
    pub mesh: TileSurfaceMesh,
}

pub struct ImagerySurface {
    provider: Box<dyn ImageryProvider>,
    fetcher: Arc<dyn TileFetcher>,
    cache: TileCache<ImageryTile>,
    ellipsoid: Ellipsoid,
}

impl ImagerySurface {
    pub fn new(
        provider: Box<dyn ImageryProvider>,
        fetcher: Arc<dyn TileFetcher>,
        ellipsoid: Ellipsoid,
        cache_size: usize,
    ) -> Self {
        info!("imagery surface '{}' created", provider.name());
        Self {
            provider,
            fetcher,
            cache: TileCache::new(cache_size),
            ellipsoid,
        }
    }
    pub fn tile(&self, key: &TileKey) -> Option<&ImageryTile> {
        self.cache.get(key)
    }
    pub fn cached_tiles(&self) -> usize {
        self.cache.len()
    }
}

impl GlobeSurface for ImagerySurface {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn reconcile(&mut self, updated: &UpdatedTiles) {
        let provider = &self.provider;
        let fetcher = &self.fetcher;
        let ellipsoid = self.ellipsoid;
        self.cache.reconcile(
            updated,
            |key| key.level >= provider.minimum_level() && key.level <= provider.maximum_level(),
            |tile| fetcher.fetch(provider.tile_url(&tile.key)),
            |tile| ImageryTile {
                image: None,
                mesh: TileSurfaceMesh::from_rectangle(&tile.rectangle, &ellipsoid),
            },
        );
    }

    fn poll(&mut self) {
        let ellipsoid = self.ellipsoid;
        let settled = self.cache.poll(|tile, bytes| {
            Ok(ImageryTile {
                image: Some(bytes),
                mesh: TileSurfaceMesh::from_rectangle(&tile.rectangle, &ellipsoid),
            })
        });
        if !settled.is_empty() {
            debug!("{} imagery tile(s) settled", settled.len());
        }
    }

    fn status(&self, key: &TileKey) -> TileStatus {
        self.cache.status(key)
    }
}
