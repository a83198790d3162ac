use earth_scene::{Rectangle, TileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuadtreeTileLoadState {
    Unloaded,
    /// Payload requested; waiting for `mark_loaded`/`mark_failed`.
    Requested,
    /// Payload ready but the tile is not displayed yet.
    Loaded,
    Rendered,
    /// Replaced by its four rendered children.
    Subdivided,
    /// Dropped by a merge or a cancelled subdivision. Kept for reuse.
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    Northwest,
    Northeast,
    Southwest,
    Southeast,
    Root(usize),
}
impl Quadrant {
    pub const CHILDREN: [Quadrant; 4] = [
        Quadrant::Northwest,
        Quadrant::Northeast,
        Quadrant::Southwest,
        Quadrant::Southeast,
    ];
}

#[derive(Debug, Clone)]
pub struct QuadtreeTile {
    pub key: TileKey,
    pub location: Quadrant,
    pub rectangle: Rectangle,
    pub parent: Option<TileKey>,
    /// North-west, north-east, south-west and south-east children, once created.
    pub children: Option<[TileKey; 4]>,
    pub state: QuadtreeTileLoadState,
    /// Camera distance computed during the last update.
    pub distance: f64,
    pub last_rendered_frame: Option<u64>,
}
impl QuadtreeTile {
    pub fn new(
        key: TileKey,
        location: Quadrant,
        parent: Option<TileKey>,
        rectangle: Rectangle,
    ) -> Self {
        Self {
            key,
            location,
            rectangle,
            parent,
            children: None,
            state: QuadtreeTileLoadState::Unloaded,
            distance: f64::MAX,
            last_rendered_frame: None,
        }
    }
    pub fn is_rendered(&self) -> bool {
        self.state == QuadtreeTileLoadState::Rendered
    }
}
