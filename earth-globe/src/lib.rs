#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::expect_used
)]

pub mod config;
pub mod event_channel;
pub mod fetch;
pub mod frame_scheduler;
pub mod globe;
pub mod plugin;
pub mod provider;
pub mod quadtree;
pub mod surface;

pub use config::{CameraConfig, ConfigError, GlobeConfig, ImageryConfig, QuadtreeConfig, TerrainConfig};
pub use event_channel::{EventChannel, Subscription, SubscriptionId};
pub use fetch::{FetchError, FetchOutcome, HttpFetcher, TileFetcher};
pub use frame_scheduler::{CallbackId, FrameClock, FrameScheduler, FrameTime};
pub use globe::Globe;
pub use plugin::GlobePlugin;
pub use quadtree::{Quadtree, TileRef, UpdatedTiles};
pub use surface::{GlobeSurface, TileStatus};
