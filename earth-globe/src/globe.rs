use std::sync::Arc;

use bevy::{
    log::{debug, info},
    prelude::Resource,
};
use earth_scene::{Camera, Ellipsoid, Geographic, GeographicTilingScheme};

use crate::{
    config::GlobeConfig,
    event_channel::Subscription,
    fetch::TileFetcher,
    frame_scheduler::FrameTime,
    provider::{QuantizedMeshTerrainProvider, XyzImageryProvider},
    quadtree::{Quadtree, UpdatedTiles},
    surface::{GlobeSurface, ImagerySurface, TerrainSurface, TileStatus},
};

/// The globe scene: a camera, the quadtree that follows it and the surfaces
/// draped over the selected tiles.
#[derive(Resource)]
pub struct Globe {
    pub camera: Camera,
    quadtree: Quadtree,
    surfaces: Vec<(Box<dyn GlobeSurface>, Subscription<UpdatedTiles>)>,
}

impl Globe {
    pub fn new(config: &GlobeConfig) -> Self {
        let mut camera = Camera::default();
        camera.set_viewport(config.camera.viewport_width, config.camera.viewport_height);
        camera.frustum.set_fov(config.camera.fov.to_radians());
        let mut globe = Self {
            camera,
            quadtree: Quadtree::new(GeographicTilingScheme::default(), config.quadtree.clone()),
            surfaces: vec![],
        };
        globe.center_to(
            config.camera.longitude,
            config.camera.latitude,
            config.camera.height,
        );
        globe
    }

    /// Adds the imagery and terrain surfaces named in `config`.
    pub fn add_configured_surfaces(&mut self, config: &GlobeConfig, fetcher: Arc<dyn TileFetcher>) {
        let tiling_scheme = self.quadtree.tiling_scheme().clone();
        let ellipsoid = tiling_scheme.ellipsoid;
        let cache_size = config.quadtree.tile_cache_size;
        if let Some(imagery) = config.imagery.as_ref() {
            let provider = XyzImageryProvider::from_config(imagery, tiling_scheme.clone());
            self.add_surface(Box::new(ImagerySurface::new(
                Box::new(provider),
                fetcher.clone(),
                ellipsoid,
                cache_size,
            )));
        }
        if let Some(terrain) = config.terrain.as_ref() {
            let provider = QuantizedMeshTerrainProvider::from_config(terrain, tiling_scheme);
            self.add_surface(Box::new(TerrainSurface::new(
                Box::new(provider),
                fetcher,
                ellipsoid,
                cache_size,
            )));
        }
    }

    /// Subscribes `surface` to tile updates. The next render republishes
    /// the current tile state so the surface catches up.
    pub fn add_surface(&mut self, surface: Box<dyn GlobeSurface>) {
        info!("adding surface '{}'", surface.name());
        let subscription = self.quadtree.subscribe();
        self.surfaces.push((surface, subscription));
        self.quadtree.broadcast();
    }

    pub fn surface_names(&self) -> Vec<&str> {
        self.surfaces.iter().map(|(surface, _)| surface.name()).collect()
    }

    /// Moves the camera above `longitude`, `latitude` (degrees) at `height`
    /// meters.
    pub fn center_to(&mut self, longitude: f64, latitude: f64, height: f64) {
        self.camera.set_geographic(
            &Ellipsoid::PSEUDO_MERCATOR,
            &Geographic::new(longitude, latitude, height),
        );
    }

    /// Highest level among rendered tiles.
    pub fn level(&self) -> u32 {
        self.quadtree.level()
    }

    pub fn quadtree(&self) -> &Quadtree {
        &self.quadtree
    }

    /// One frame: update the tile selection, let every surface follow it,
    /// then report settled tiles back to the quadtree. A requested tile is
    /// loaded once every surface has it, and retried when any surface
    /// failed or lost it.
    pub fn render(&mut self, frame_time: &FrameTime) {
        let level = self.quadtree.level();
        self.quadtree.update(&self.camera);
        for (surface, subscription) in self.surfaces.iter_mut() {
            for updated in subscription.drain() {
                surface.reconcile(&updated);
            }
            surface.poll();
        }

        for key in self.quadtree.requested_tiles() {
            let mut ready = true;
            let mut retry = false;
            for (surface, _) in self.surfaces.iter() {
                match surface.status(&key) {
                    TileStatus::Ready => {}
                    TileStatus::Pending => ready = false,
                    TileStatus::Failed | TileStatus::Missing => retry = true,
                }
            }
            if retry {
                self.quadtree.mark_failed(&key);
            } else if ready {
                self.quadtree.mark_loaded(&key);
            }
        }
        if self.quadtree.level() != level {
            debug!(
                "frame {}: globe level {} -> {}",
                frame_time.frame,
                level,
                self.quadtree.level()
            );
        }
    }
}
