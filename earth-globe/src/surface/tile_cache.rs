use std::collections::HashSet;

use bevy::{
    log::{debug, warn},
    utils::HashMap,
};
use earth_jobs::{JobHandle, JobStatus};
use earth_scene::TileKey;

use super::TileStatus;
use crate::{
    fetch::{FetchError, FetchOutcome},
    quadtree::{TileRef, UpdatedTiles},
};

pub enum CacheEntry<T> {
    Requested(JobHandle<FetchOutcome>),
    Ready(T),
    Failed(String),
}

struct CacheSlot<T> {
    tile: TileRef,
    entry: CacheEntry<T>,
    last_used: u64,
}

/// Per-surface tile payload cache keyed by [`TileKey`].
///
/// A key has at most one outstanding fetch. Removing a key drops its job
/// handle, so a completion arriving later is discarded by the job.
pub struct TileCache<T> {
    slots: HashMap<TileKey, CacheSlot<T>>,
    capacity: usize,
    clock: u64,
    render_set: HashSet<TileKey>,
    /// Requested by the quadtree and not yet rendered or retired.
    loading: HashSet<TileKey>,
}

impl<T> TileCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::default(),
            capacity,
            clock: 0,
            render_set: HashSet::new(),
            loading: HashSet::new(),
        }
    }
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Starts a fetch for `tile` unless one is outstanding or the payload is
    /// already here. Failed entries are fetched again. Returns whether a
    /// fetch was started.
    pub fn request(
        &mut self,
        tile: TileRef,
        fetch: impl FnOnce(&TileRef) -> JobHandle<FetchOutcome>,
    ) -> bool {
        let now = self.tick();
        if let Some(slot) = self.slots.get_mut(&tile.key) {
            slot.last_used = now;
            match slot.entry {
                CacheEntry::Requested(_) | CacheEntry::Ready(_) => return false,
                CacheEntry::Failed(_) => {
                    debug!("retrying tile {}", tile.key);
                }
            }
        }
        let handle = fetch(&tile);
        self.slots.insert(
            tile.key,
            CacheSlot {
                tile,
                entry: CacheEntry::Requested(handle),
                last_used: now,
            },
        );
        true
    }

    /// Stores a value that needs no fetch.
    pub fn insert(&mut self, tile: TileRef, value: T) {
        let now = self.tick();
        self.slots.insert(
            tile.key,
            CacheSlot {
                tile,
                entry: CacheEntry::Ready(value),
                last_used: now,
            },
        );
    }

    /// Polls outstanding fetches and turns finished payloads into values with
    /// `convert`. Returns the keys that settled during this call.
    pub fn poll(
        &mut self,
        mut convert: impl FnMut(&TileRef, Vec<u8>) -> Result<T, FetchError>,
    ) -> Vec<TileKey> {
        let mut settled = vec![];
        for (key, slot) in self.slots.iter_mut() {
            let CacheEntry::Requested(handle) = &mut slot.entry else {
                continue;
            };
            let entry = match handle.poll() {
                JobStatus::Pending => continue,
                JobStatus::Ready(Ok(bytes)) => match convert(&slot.tile, bytes) {
                    Ok(value) => CacheEntry::Ready(value),
                    Err(error) => {
                        warn!("tile {} could not be built: {}", key, error);
                        CacheEntry::Failed(error.to_string())
                    }
                },
                JobStatus::Ready(Err(error)) => {
                    warn!("tile {} failed to load: {}", key, error);
                    CacheEntry::Failed(error.to_string())
                }
                JobStatus::Failed => CacheEntry::Failed(format!("fetch of tile {} was lost", key)),
            };
            slot.entry = entry;
            settled.push(*key);
        }
        settled
    }

    pub fn status(&self, key: &TileKey) -> TileStatus {
        match self.slots.get(key).map(|slot| &slot.entry) {
            Some(CacheEntry::Requested(_)) => TileStatus::Pending,
            Some(CacheEntry::Ready(_)) => TileStatus::Ready,
            Some(CacheEntry::Failed(_)) => TileStatus::Failed,
            None => TileStatus::Missing,
        }
    }

    pub fn get(&self, key: &TileKey) -> Option<&T> {
        match self.slots.get(key).map(|slot| &slot.entry) {
            Some(CacheEntry::Ready(value)) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self, key: &TileKey) -> Option<&str> {
        match self.slots.get(key).map(|slot| &slot.entry) {
            Some(CacheEntry::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Follows one quadtree update: drops retired tiles, makes every wanted
    /// tile available, then trims. Wanted tiles outside `in_range` get a
    /// `placeholder` instead of a fetch. Rendered and loading tiles are kept
    /// through the trim.
    pub fn reconcile(
        &mut self,
        updated: &UpdatedTiles,
        in_range: impl Fn(&TileKey) -> bool,
        mut fetch: impl FnMut(&TileRef) -> JobHandle<FetchOutcome>,
        mut placeholder: impl FnMut(&TileRef) -> T,
    ) {
        for key in updated.retired.iter() {
            self.remove(key);
            self.loading.remove(key);
        }
        self.render_set = updated.wait_rendering.iter().map(|tile| tile.key).collect();
        self.loading.extend(updated.wait_loading.iter().map(|tile| tile.key));
        let render_set = &self.render_set;
        self.loading.retain(|key| !render_set.contains(key));

        for tile in updated.wait_loading.iter().chain(updated.wait_rendering.iter()) {
            if in_range(&tile.key) {
                self.request(*tile, &mut fetch);
            } else if self.status(&tile.key) != TileStatus::Ready {
                let value = placeholder(tile);
                self.insert(*tile, value);
            }
        }

        let keep: HashSet<TileKey> = self.render_set.union(&self.loading).copied().collect();
        self.trim(&keep);
    }

    pub fn remove(&mut self, key: &TileKey) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Evicts least recently used entries until the cache fits its capacity.
    /// Tiles in `keep` and outstanding fetches are never evicted, so the
    /// cache may stay above capacity.
    pub fn trim(&mut self, keep: &HashSet<TileKey>) -> usize {
        if self.slots.len() <= self.capacity {
            return 0;
        }
        let mut candidates: Vec<(u64, TileKey)> = self
            .slots
            .iter()
            .filter(|(key, slot)| {
                !keep.contains(*key) && !matches!(slot.entry, CacheEntry::Requested(_))
            })
            .map(|(key, slot)| (slot.last_used, *key))
            .collect();
        candidates.sort();
        let excess = self.slots.len() - self.capacity;
        let mut evicted = 0;
        for (_, key) in candidates.into_iter().take(excess) {
            self.slots.remove(&key);
            evicted += 1;
        }
        if evicted > 0 {
            debug!("evicted {} cached tile(s)", evicted);
        }
        evicted
    }
}
