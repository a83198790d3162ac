use std::collections::BTreeSet;

use bevy::log::{debug, info, warn};
use earth_scene::{Camera, Cartographic, Ellipsoid, GeographicTilingScheme, Rectangle, TileKey, TilingScheme};

use crate::{
    config::QuadtreeConfig,
    event_channel::{EventChannel, Subscription, SubscriptionId},
};

pub mod quadtree_tile;
pub mod quadtree_tile_storage;

pub use quadtree_tile::{Quadrant, QuadtreeTile, QuadtreeTileLoadState};
pub use quadtree_tile_storage::QuadtreeTileStorage;

/// A tile key together with the region it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRef {
    pub key: TileKey,
    pub rectangle: Rectangle,
}

/// Published at most once per [`Quadtree::update`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdatedTiles {
    pub frame: u64,
    /// Highest level among rendered tiles.
    pub level: u32,
    /// The full render set, sorted by key.
    pub wait_rendering: Vec<TileRef>,
    /// Tiles whose payloads were requested during this update.
    pub wait_loading: Vec<TileRef>,
    /// Tiles dropped from the tree during this update.
    pub retired: Vec<TileKey>,
}

/// Estimated geometric error of a level-zero heightmap tile.
pub fn get_estimated_level_zero_geometric_error_for_a_heightmap(
    ellipsoid: &Ellipsoid,
    tile_image_width: u32,
    number_of_tiles_at_level_zero: u32,
) -> f64 {
    return ellipsoid.maximum_radius * 2.0 * std::f64::consts::PI * 0.25
        / (tile_image_width as f64 * number_of_tiles_at_level_zero as f64);
}

/// Quadtree level-of-detail engine. Each [`Quadtree::update`] evaluates the
/// active tiles against the camera and decides which tiles to load, subdivide
/// or merge.
pub struct Quadtree {
    storage: QuadtreeTileStorage,
    tiling_scheme: GeographicTilingScheme,
    config: QuadtreeConfig,
    level_zero_maximum_geometric_error: f64,
    tiles_to_render: BTreeSet<TileKey>,
    /// Parents whose children are loading.
    pending_subdivisions: BTreeSet<TileKey>,
    /// Subdivided parents loading to replace their rendered children.
    pending_merges: BTreeSet<TileKey>,
    frame_number: u64,
    level: u32,
    tiles_invalidated: bool,
    channel: EventChannel<UpdatedTiles>,
}

impl Quadtree {
    pub fn new(tiling_scheme: GeographicTilingScheme, config: QuadtreeConfig) -> Self {
        let level_zero_maximum_geometric_error =
            get_estimated_level_zero_geometric_error_for_a_heightmap(
                &tiling_scheme.ellipsoid,
                config.tile_width,
                tiling_scheme.number_of_x_tiles_at_level(0),
            );
        let mut storage = QuadtreeTileStorage::new();
        storage.create_level_zero_tiles(&tiling_scheme);
        info!(
            "quadtree created with {} root tile(s), maximum level {}",
            storage.root_len(),
            config.maximum_level
        );
        Self {
            storage,
            tiling_scheme,
            config,
            level_zero_maximum_geometric_error,
            tiles_to_render: BTreeSet::new(),
            pending_subdivisions: BTreeSet::new(),
            pending_merges: BTreeSet::new(),
            frame_number: 0,
            level: 0,
            tiles_invalidated: false,
            channel: EventChannel::new(),
        }
    }
    pub fn tiling_scheme(&self) -> &GeographicTilingScheme {
        &self.tiling_scheme
    }
    pub fn config(&self) -> &QuadtreeConfig {
        &self.config
    }
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
    /// Highest level among rendered tiles.
    pub fn level(&self) -> u32 {
        self.level
    }
    pub fn tile(&self, key: &TileKey) -> Option<&QuadtreeTile> {
        self.storage.get(key)
    }
    pub fn tiles_to_render(&self) -> impl Iterator<Item = &TileKey> {
        self.tiles_to_render.iter()
    }
    pub fn requested_tiles(&self) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self
            .storage
            .iter()
            .filter(|tile| tile.state == QuadtreeTileLoadState::Requested)
            .map(|tile| tile.key)
            .collect();
        keys.sort();
        keys
    }
    pub fn subscribe(&mut self) -> Subscription<UpdatedTiles> {
        self.channel.subscribe()
    }
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }
    /// Forces the next update to publish the full state, e.g. after a new
    /// surface was added to the scene.
    pub fn broadcast(&mut self) {
        self.tiles_invalidated = true;
    }

    /// Geometric error of a tile at `level`.
    pub fn get_level_maximum_geometric_error(&self, level: u32) -> f64 {
        return self.level_zero_maximum_geometric_error / (1u64 << level.min(63)) as f64;
    }
    /// Distance below which a tile at `level` exceeds the maximum
    /// screen-space error on this camera.
    pub fn refine_distance(&self, level: u32, camera: &Camera) -> f64 {
        let height = camera.viewport_height as f64;
        let sse_denominator = camera.frustum.sse_denominator();
        return self.get_level_maximum_geometric_error(level) * height
            / (self.config.maximum_screen_space_error * sse_denominator);
    }

    /// Reports that the payload of a requested tile is ready. Reports for
    /// tiles that are not `Requested` are stale and ignored.
    pub fn mark_loaded(&mut self, key: &TileKey) -> bool {
        match self.storage.get_mut(key) {
            Some(tile) if tile.state == QuadtreeTileLoadState::Requested => {
                tile.state = QuadtreeTileLoadState::Loaded;
                true
            }
            Some(tile) => {
                debug!("discarding stale load of tile {} in state {:?}", key, tile.state);
                false
            }
            None => {
                debug!("discarding load of unknown tile {}", key);
                false
            }
        }
    }
    /// Returns a requested tile to `Unloaded`; it is requested again on the
    /// next update.
    pub fn mark_failed(&mut self, key: &TileKey) -> bool {
        match self.storage.get_mut(key) {
            Some(tile) if tile.state == QuadtreeTileLoadState::Requested => {
                warn!("tile {} failed to load, will retry", key);
                tile.state = QuadtreeTileLoadState::Unloaded;
                true
            }
            _ => {
                debug!("discarding stale failure of tile {}", key);
                false
            }
        }
    }

    pub fn update(&mut self, camera: &Camera) {
        self.frame_number += 1;
        let mut changed = self.tiles_invalidated;
        self.tiles_invalidated = false;
        let mut wait_loading: Vec<TileKey> = vec![];
        let mut retired: Vec<TileKey> = vec![];

        changed |= self.promote_pending_merges(&mut retired);
        changed |= self.promote_loaded_roots();
        changed |= self.promote_pending_subdivisions();

        let ellipsoid = self.tiling_scheme.ellipsoid;
        let camera_cartographic = camera.position_cartographic(&ellipsoid);
        self.update_distances(camera, camera_cartographic.as_ref(), &ellipsoid);
        self.cancel_pending_merges(camera);
        self.merge(camera, &mut wait_loading);
        changed |= self.cancel_pending_subdivisions(camera, &mut retired);
        self.refine(camera, &mut wait_loading);
        self.request_unloaded(&mut wait_loading);

        for key in self.tiles_to_render.iter() {
            if let Some(tile) = self.storage.get_mut(key) {
                tile.last_rendered_frame = Some(self.frame_number);
            }
        }
        let level = self.tiles_to_render.iter().map(|key| key.level).max().unwrap_or(0);
        if level != self.level {
            debug!("quadtree level changed from {} to {}", self.level, level);
            self.level = level;
        }

        if changed || !wait_loading.is_empty() || !retired.is_empty() {
            wait_loading.sort();
            wait_loading.dedup();
            retired.sort();
            retired.dedup();
            let event = UpdatedTiles {
                frame: self.frame_number,
                level: self.level,
                wait_rendering: self.tile_refs(self.tiles_to_render.iter()),
                wait_loading: self.tile_refs(wait_loading.iter()),
                retired,
            };
            self.channel.publish(event);
        }
    }

    fn tile_refs<'a>(&self, keys: impl Iterator<Item = &'a TileKey>) -> Vec<TileRef> {
        keys.filter_map(|key| {
            self.storage.get(key).map(|tile| TileRef {
                key: tile.key,
                rectangle: tile.rectangle,
            })
        })
        .collect()
    }

    fn update_distances(
        &mut self,
        camera: &Camera,
        camera_cartographic: Option<&Cartographic>,
        ellipsoid: &Ellipsoid,
    ) {
        let keys: Vec<TileKey> = self
            .tiles_to_render
            .iter()
            .chain(self.pending_subdivisions.iter())
            .copied()
            .collect();
        for key in keys {
            let Some(tile) = self.storage.get_mut(&key) else {
                continue;
            };
            tile.distance =
                distance_to_tile(camera, camera_cartographic, &tile.rectangle, ellipsoid);
        }
        // parents of rendered leaves are merge candidates
        let parents: BTreeSet<TileKey> = self
            .tiles_to_render
            .iter()
            .filter_map(|key| key.parent())
            .collect();
        for key in parents {
            let Some(tile) = self.storage.get_mut(&key) else {
                continue;
            };
            tile.distance =
                distance_to_tile(camera, camera_cartographic, &tile.rectangle, ellipsoid);
        }
    }

    fn state(&self, key: &TileKey) -> Option<QuadtreeTileLoadState> {
        self.storage.get(key).map(|tile| tile.state)
    }

    fn set_state(&mut self, key: &TileKey, state: QuadtreeTileLoadState) {
        if let Some(tile) = self.storage.get_mut(key) {
            tile.state = state;
        }
        if state == QuadtreeTileLoadState::Rendered {
            self.tiles_to_render.insert(*key);
        } else {
            self.tiles_to_render.remove(key);
        }
    }

    fn promote_loaded_roots(&mut self) -> bool {
        let mut changed = false;
        for key in self.storage.root.clone() {
            if self.pending_merges.contains(&key) {
                continue;
            }
            if self.state(&key) == Some(QuadtreeTileLoadState::Loaded) {
                self.set_state(&key, QuadtreeTileLoadState::Rendered);
                changed = true;
            }
        }
        changed
    }

    /// A parent leaves the render set only once all four children are loaded.
    fn promote_pending_subdivisions(&mut self) -> bool {
        let mut changed = false;
        for parent in self.pending_subdivisions.clone() {
            let Some(children) = self.storage.get(&parent).and_then(|tile| tile.children) else {
                self.pending_subdivisions.remove(&parent);
                continue;
            };
            let all_loaded = children
                .iter()
                .all(|child| self.state(child) == Some(QuadtreeTileLoadState::Loaded));
            if !all_loaded {
                continue;
            }
            self.pending_subdivisions.remove(&parent);
            self.set_state(&parent, QuadtreeTileLoadState::Subdivided);
            for child in children {
                self.set_state(&child, QuadtreeTileLoadState::Rendered);
            }
            changed = true;
        }
        changed
    }

    fn exceeds_merge_distance(&self, key: &TileKey, camera: &Camera) -> bool {
        let Some(tile) = self.storage.get(key) else {
            return false;
        };
        tile.distance > self.refine_distance(key.level, camera) * self.config.merge_hysteresis
    }

    /// Starts collapsing subdivided parents whose four children are rendered
    /// leaves. The parent is loaded again first; its children keep rendering
    /// until it is ready.
    fn merge(&mut self, camera: &Camera, wait_loading: &mut Vec<TileKey>) {
        let candidates: BTreeSet<TileKey> = self
            .tiles_to_render
            .iter()
            .filter_map(|key| key.parent())
            .collect();
        for parent in candidates {
            if self.state(&parent) != Some(QuadtreeTileLoadState::Subdivided) {
                continue;
            }
            let Some(children) = self.storage.get(&parent).and_then(|tile| tile.children) else {
                continue;
            };
            let leaves = children
                .iter()
                .all(|child| self.state(child) == Some(QuadtreeTileLoadState::Rendered));
            if !leaves || !self.exceeds_merge_distance(&parent, camera) {
                continue;
            }
            self.set_state(&parent, QuadtreeTileLoadState::Requested);
            self.pending_merges.insert(parent);
            wait_loading.push(parent);
        }
    }

    /// A merged parent replaces its children only once it is loaded.
    fn promote_pending_merges(&mut self, retired: &mut Vec<TileKey>) -> bool {
        let mut changed = false;
        for parent in self.pending_merges.clone() {
            if self.state(&parent) != Some(QuadtreeTileLoadState::Loaded) {
                continue;
            }
            self.pending_merges.remove(&parent);
            if let Some(children) = self.storage.get(&parent).and_then(|tile| tile.children) {
                for child in children {
                    self.retire(child, retired);
                }
            }
            self.set_state(&parent, QuadtreeTileLoadState::Rendered);
            changed = true;
        }
        changed
    }

    /// Keeps the children when the camera came back within refinement range
    /// before the parent loaded.
    fn cancel_pending_merges(&mut self, camera: &Camera) {
        for parent in self.pending_merges.clone() {
            let Some(distance) = self.storage.get(&parent).map(|tile| tile.distance) else {
                self.pending_merges.remove(&parent);
                continue;
            };
            if distance >= self.refine_distance(parent.level, camera) {
                continue;
            }
            self.pending_merges.remove(&parent);
            self.set_state(&parent, QuadtreeTileLoadState::Subdivided);
            debug!("cancelled merge of tile {}", parent);
        }
    }

    /// Retires `key` along with every active tile below it.
    fn retire(&mut self, key: TileKey, retired: &mut Vec<TileKey>) {
        self.pending_merges.remove(&key);
        let subdivided = self.state(&key) == Some(QuadtreeTileLoadState::Subdivided);
        if self.pending_subdivisions.remove(&key) || subdivided {
            if let Some(children) = self.storage.get(&key).and_then(|tile| tile.children) {
                for child in children {
                    self.retire(child, retired);
                }
            }
        }
        self.set_state(&key, QuadtreeTileLoadState::Retired);
        retired.push(key);
    }

    /// Abandons subdivisions the camera has moved away from.
    fn cancel_pending_subdivisions(&mut self, camera: &Camera, retired: &mut Vec<TileKey>) -> bool {
        let mut changed = false;
        for parent in self.pending_subdivisions.clone() {
            if !self.exceeds_merge_distance(&parent, camera) {
                continue;
            }
            self.pending_subdivisions.remove(&parent);
            if let Some(children) = self.storage.get(&parent).and_then(|tile| tile.children) {
                for child in children {
                    self.set_state(&child, QuadtreeTileLoadState::Retired);
                    retired.push(child);
                }
            }
            debug!("cancelled subdivision of tile {}", parent);
            changed = true;
        }
        changed
    }

    fn refine(&mut self, camera: &Camera, wait_loading: &mut Vec<TileKey>) {
        let candidates: Vec<TileKey> = self.tiles_to_render.iter().copied().collect();
        for key in candidates {
            if key.level >= self.config.maximum_level || self.pending_subdivisions.contains(&key) {
                continue;
            }
            let Some(distance) = self.storage.get(&key).map(|tile| tile.distance) else {
                continue;
            };
            if distance >= self.refine_distance(key.level, camera) {
                continue;
            }
            let Some(children) = self.storage.subdivide(&key) else {
                continue;
            };
            for child in children {
                match self.state(&child) {
                    Some(QuadtreeTileLoadState::Unloaded) | Some(QuadtreeTileLoadState::Retired) => {
                        self.set_state(&child, QuadtreeTileLoadState::Requested);
                        wait_loading.push(child);
                    }
                    _ => {}
                }
            }
            self.pending_subdivisions.insert(key);
        }
    }

    /// Requests roots, pending children and merging parents that are
    /// `Unloaded`, including those whose previous load failed.
    fn request_unloaded(&mut self, wait_loading: &mut Vec<TileKey>) {
        let mut keys: Vec<TileKey> = self.storage.root.clone();
        keys.extend(self.pending_merges.iter().copied());
        for parent in self.pending_subdivisions.iter() {
            if let Some(children) = self.storage.get(parent).and_then(|tile| tile.children) {
                keys.extend(children);
            }
        }
        for key in keys {
            if self.state(&key) == Some(QuadtreeTileLoadState::Unloaded) {
                self.set_state(&key, QuadtreeTileLoadState::Requested);
                wait_loading.push(key);
            }
        }
    }
}

/// Distance from the camera to the closest point of the tile on the
/// ellipsoid surface, or the camera height when the camera is above the tile.
pub fn distance_to_tile(
    camera: &Camera,
    camera_cartographic: Option<&Cartographic>,
    rectangle: &Rectangle,
    ellipsoid: &Ellipsoid,
) -> f64 {
    let Some(camera_cartographic) = camera_cartographic else {
        return 0.0;
    };
    if rectangle.contains(camera_cartographic) {
        return camera_cartographic.height.max(0.0);
    }
    let closest = rectangle.closest_cartographic(camera_cartographic);
    let closest = ellipsoid.cartographic_to_cartesian(&closest);
    return camera.position.distance(closest);
}

#[cfg(test)]
mod tests {
    use earth_scene::Geographic;
    use rand::Rng;

    use super::*;

    fn camera_at(height: f64) -> Camera {
        let mut camera = Camera::default();
        camera.set_geographic(&Ellipsoid::WGS84, &Geographic::new(10.0, 20.0, height));
        camera
    }

    fn quadtree(maximum_level: u32) -> Quadtree {
        Quadtree::new(
            GeographicTilingScheme::default(),
            QuadtreeConfig {
                maximum_level,
                ..Default::default()
            },
        )
    }

    /// Loads every requested tile, as a consumer with no surfaces would.
    fn load_all(quadtree: &mut Quadtree) {
        for key in quadtree.requested_tiles() {
            assert!(quadtree.mark_loaded(&key));
        }
    }

    fn settle(quadtree: &mut Quadtree, camera: &Camera) {
        for _ in 0..64 {
            quadtree.update(camera);
            load_all(quadtree);
        }
    }

    fn rendered(quadtree: &Quadtree) -> Vec<TileKey> {
        quadtree.tiles_to_render().copied().collect()
    }

    #[test]
    fn level_zero_geometric_error() {
        let error = get_estimated_level_zero_geometric_error_for_a_heightmap(&Ellipsoid::WGS84, 256, 1);
        assert!((error - 6378137.0 * std::f64::consts::TAU * 0.25 / 256.0).abs() < 1e-6);
        let quadtree = quadtree(18);
        assert_eq!(
            quadtree.get_level_maximum_geometric_error(3),
            quadtree.get_level_maximum_geometric_error(0) / 8.0
        );
    }

    #[test]
    fn root_is_requested_then_rendered() {
        let mut quadtree = quadtree(18);
        let subscription = quadtree.subscribe();
        let camera = camera_at(30000000.0);

        quadtree.update(&camera);
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.frame, 1);
        assert!(event.wait_rendering.is_empty());
        assert_eq!(event.wait_loading.len(), 1);
        assert_eq!(event.wait_loading[0].key, TileKey::new(0, 0, 0));
        assert_eq!(event.wait_loading[0].rectangle, Rectangle::MAX_VALUE);

        // nothing changed, nothing published
        quadtree.update(&camera);
        assert!(subscription.try_recv().is_none());

        assert!(quadtree.mark_loaded(&TileKey::new(0, 0, 0)));
        quadtree.update(&camera);
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.wait_rendering.len(), 1);
        assert!(event.wait_loading.is_empty());
        assert_eq!(quadtree.level(), 0);
        assert!(subscription.try_recv().is_none());
    }

    #[test]
    fn close_camera_subdivides_only_after_all_children_load() {
        let mut quadtree = quadtree(18);
        let subscription = quadtree.subscribe();
        let root = TileKey::new(0, 0, 0);
        quadtree.update(&camera_at(30000000.0));
        quadtree.mark_loaded(&root);
        quadtree.update(&camera_at(30000000.0));
        subscription.drain();

        let camera = camera_at(5000000.0);
        assert!(distance_to_tile(
            &camera,
            camera.position_cartographic(&Ellipsoid::WGS84).as_ref(),
            &Rectangle::MAX_VALUE,
            &Ellipsoid::WGS84
        ) < quadtree.refine_distance(0, &camera));
        quadtree.update(&camera);
        let event = subscription.try_recv().unwrap();
        let mut children = root.children().to_vec();
        children.sort();
        assert_eq!(
            event.wait_loading.iter().map(|t| t.key).collect::<Vec<_>>(),
            children
        );
        // parent keeps rendering while children load
        assert_eq!(rendered(&quadtree), vec![root]);

        let children = root.children();
        for child in &children[..3] {
            quadtree.mark_loaded(child);
        }
        quadtree.update(&camera);
        assert_eq!(rendered(&quadtree), vec![root]);

        quadtree.mark_loaded(&children[3]);
        quadtree.update(&camera);
        let rendered_keys = rendered(&quadtree);
        assert!(!rendered_keys.contains(&root));
        assert_eq!(quadtree.tile(&root).unwrap().state, QuadtreeTileLoadState::Subdivided);
        assert!(quadtree.level() >= 1);
        let events = subscription.drain();
        let last = events.last().unwrap();
        assert!(last.wait_rendering.iter().all(|t| t.key != root));
        let mut sorted = last.wait_rendering.clone();
        sorted.sort_by_key(|t| t.key);
        assert_eq!(sorted, last.wait_rendering);
    }

    #[test]
    fn wait_loading_has_no_duplicates_and_rendered_rectangles_cover_the_globe() {
        let mut quadtree = quadtree(6);
        let subscription = quadtree.subscribe();
        let camera = camera_at(200000.0);
        for _ in 0..40 {
            quadtree.update(&camera);
            load_all(&mut quadtree);
            for event in subscription.drain() {
                let mut keys: Vec<TileKey> = event.wait_loading.iter().map(|t| t.key).collect();
                let len = keys.len();
                keys.dedup();
                assert_eq!(keys.len(), len);
            }
        }
        assert_eq!(quadtree.level(), 6);
        // rendered tiles tile the sphere without overlap
        let area: f64 = quadtree
            .tiles_to_render()
            .map(|key| {
                let tile = quadtree.tile(key).unwrap();
                tile.rectangle.width() * tile.rectangle.height()
            })
            .sum();
        let full = Rectangle::MAX_VALUE.width() * Rectangle::MAX_VALUE.height();
        assert!((area - full).abs() < 1e-9);
        for key in quadtree.tiles_to_render() {
            let mut ancestor = key.parent();
            while let Some(parent) = ancestor {
                assert!(!quadtree.tiles_to_render().any(|k| *k == parent));
                ancestor = parent.parent();
            }
        }
    }

    #[test]
    fn maximum_level_bounds_subdivision() {
        let mut quadtree = quadtree(2);
        settle(&mut quadtree, &camera_at(1000.0));
        assert_eq!(quadtree.level(), 2);
        assert!(quadtree.tiles_to_render().all(|key| key.level <= 2));
    }

    #[test]
    fn far_camera_merges_back_to_the_root() {
        let mut quadtree = quadtree(5);
        settle(&mut quadtree, &camera_at(1000.0));
        assert_eq!(quadtree.level(), 5);
        let subscription = quadtree.subscribe();

        settle(&mut quadtree, &camera_at(40000000.0));
        assert_eq!(rendered(&quadtree), vec![TileKey::new(0, 0, 0)]);
        assert_eq!(quadtree.level(), 0);
        let retired: Vec<TileKey> = subscription
            .drain()
            .into_iter()
            .flat_map(|event| event.retired)
            .collect();
        assert!(retired.contains(&TileKey::new(0, 0, 1)));
        assert_eq!(
            quadtree.tile(&TileKey::new(0, 0, 1)).unwrap().state,
            QuadtreeTileLoadState::Retired
        );
    }

    #[test]
    fn merge_keeps_children_rendered_until_the_parent_loads() {
        let mut quadtree = quadtree(1);
        let root = TileKey::new(0, 0, 0);
        settle(&mut quadtree, &camera_at(1000.0));
        let children = rendered(&quadtree);
        assert_eq!(children.len(), 4);
        let subscription = quadtree.subscribe();

        let camera = camera_at(40000000.0);
        quadtree.update(&camera);
        assert_eq!(quadtree.requested_tiles(), vec![root]);
        assert_eq!(rendered(&quadtree), children);
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.wait_loading[0].key, root);
        assert!(event.retired.is_empty());

        // a failed parent is requested again, the children stay
        assert!(quadtree.mark_failed(&root));
        quadtree.update(&camera);
        assert_eq!(quadtree.requested_tiles(), vec![root]);
        assert_eq!(rendered(&quadtree), children);
        subscription.drain();

        assert!(quadtree.mark_loaded(&root));
        quadtree.update(&camera);
        assert_eq!(rendered(&quadtree), vec![root]);
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.retired, children);
        assert_eq!(event.wait_rendering.len(), 1);
    }

    #[test]
    fn returning_camera_cancels_a_pending_merge() {
        let mut quadtree = quadtree(1);
        let root = TileKey::new(0, 0, 0);
        let near = camera_at(1000.0);
        settle(&mut quadtree, &near);
        let children = rendered(&quadtree);

        quadtree.update(&camera_at(40000000.0));
        assert_eq!(quadtree.requested_tiles(), vec![root]);
        quadtree.update(&near);
        assert!(quadtree.requested_tiles().is_empty());
        assert_eq!(quadtree.tile(&root).unwrap().state, QuadtreeTileLoadState::Subdivided);

        assert!(!quadtree.mark_loaded(&root));
        quadtree.update(&near);
        assert_eq!(rendered(&quadtree), children);
    }

    #[test]
    fn hysteresis_band_neither_merges_nor_refines() {
        let mut quadtree = quadtree(1);
        let root = TileKey::new(0, 0, 0);
        settle(&mut quadtree, &camera_at(1000.0));
        assert_eq!(quadtree.tile(&root).unwrap().state, QuadtreeTileLoadState::Subdivided);

        let probe = camera_at(1.0);
        let refine = quadtree.refine_distance(0, &probe);
        // over the tile the distance is the camera height
        let camera = camera_at(refine * 1.2);
        settle(&mut quadtree, &camera);
        assert_eq!(quadtree.tile(&root).unwrap().state, QuadtreeTileLoadState::Subdivided);

        let camera = camera_at(refine * 1.6);
        settle(&mut quadtree, &camera);
        assert_eq!(rendered(&quadtree), vec![root]);

        // inside the band a merged tile is not refined again
        let camera = camera_at(refine * 1.2);
        settle(&mut quadtree, &camera);
        assert_eq!(rendered(&quadtree), vec![root]);
    }

    #[test]
    fn pending_subdivision_is_cancelled_when_camera_leaves() {
        let mut quadtree = quadtree(18);
        let subscription = quadtree.subscribe();
        let root = TileKey::new(0, 0, 0);
        quadtree.update(&camera_at(30000000.0));
        quadtree.mark_loaded(&root);
        quadtree.update(&camera_at(5000000.0));
        let mut children = root.children().to_vec();
        children.sort();
        assert_eq!(quadtree.requested_tiles(), children);
        subscription.drain();

        quadtree.update(&camera_at(40000000.0));
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.retired, children);
        assert!(quadtree.requested_tiles().is_empty());

        // completions for the cancelled children are stale
        assert!(!quadtree.mark_loaded(&root.children()[0]));
        quadtree.update(&camera_at(40000000.0));
        assert_eq!(rendered(&quadtree), vec![root]);
    }

    #[test]
    fn failed_tiles_are_requested_again() {
        let mut quadtree = quadtree(18);
        let subscription = quadtree.subscribe();
        let root = TileKey::new(0, 0, 0);
        let camera = camera_at(30000000.0);
        quadtree.update(&camera);
        subscription.drain();

        assert!(quadtree.mark_failed(&root));
        assert_eq!(quadtree.tile(&root).unwrap().state, QuadtreeTileLoadState::Unloaded);
        assert!(!quadtree.mark_failed(&root));
        quadtree.update(&camera);
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.wait_loading[0].key, root);
        assert_eq!(quadtree.requested_tiles(), vec![root]);
    }

    #[test]
    fn broadcast_republishes_current_state() {
        let mut quadtree = quadtree(18);
        let camera = camera_at(30000000.0);
        quadtree.update(&camera);
        load_all(&mut quadtree);
        quadtree.update(&camera);

        let subscription = quadtree.subscribe();
        quadtree.update(&camera);
        assert!(subscription.try_recv().is_none());

        quadtree.broadcast();
        quadtree.update(&camera);
        let event = subscription.try_recv().unwrap();
        assert_eq!(event.wait_rendering.len(), 1);
        assert!(event.wait_loading.is_empty());
        assert!(subscription.try_recv().is_none());
    }

    #[test]
    fn random_cameras_keep_a_complete_render_set() {
        let mut rng = rand::thread_rng();
        let mut quadtree = quadtree(8);
        let full = Rectangle::MAX_VALUE.width() * Rectangle::MAX_VALUE.height();
        for _ in 0..20 {
            let mut camera = Camera::default();
            camera.set_geographic(
                &Ellipsoid::WGS84,
                &Geographic::new(
                    rng.gen_range(-180.0..180.0),
                    rng.gen_range(-89.0..89.0),
                    rng.gen_range(1000.0..40000000.0),
                ),
            );
            settle(&mut quadtree, &camera);
            let area: f64 = quadtree
                .tiles_to_render()
                .map(|key| {
                    let tile = quadtree.tile(key).unwrap();
                    tile.rectangle.width() * tile.rectangle.height()
                })
                .sum();
            assert!((area - full).abs() < 1e-9);
            assert!(quadtree.tiles_to_render().all(|key| key.level <= 8));
        }
    }

    #[test]
    fn distance_is_height_over_the_tile_and_chord_elsewhere() {
        let camera = camera_at(1000.0);
        let cartographic = camera.position_cartographic(&Ellipsoid::WGS84);
        let over = Rectangle::from_degrees(0.0, 0.0, 45.0, 45.0);
        let distance = distance_to_tile(&camera, cartographic.as_ref(), &over, &Ellipsoid::WGS84);
        assert!((distance - 1000.0).abs() < 1e-3);

        let away = Rectangle::from_degrees(-90.0, 0.0, -45.0, 45.0);
        let distance = distance_to_tile(&camera, cartographic.as_ref(), &away, &Ellipsoid::WGS84);
        assert!(distance > 5000000.0);
    }
}
