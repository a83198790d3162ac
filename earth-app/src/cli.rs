use std::path::PathBuf;

use clap::Parser;
use earth_globe::{GlobeConfig, ImageryConfig, TerrainConfig};

/// Headless globe: streams the tiles a camera needs.
///
/// CLI values override settings loaded from `--config`.
#[derive(Parser, Debug, Default)]
#[command(name = "earth", about = "Virtual globe tile streamer")]
pub struct CliArgs {
    /// Path to a JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Imagery tile url, e.g. `https://host/{z}/{x}/{y}.png`.
    #[arg(long)]
    pub imagery_url: Option<String>,

    /// Quantized-mesh tile url, e.g. `https://host/{z}/{x}/{y}.terrain`.
    #[arg(long)]
    pub terrain_url: Option<String>,

    /// Deepest quadtree level.
    #[arg(long)]
    pub maximum_level: Option<u32>,

    /// Camera longitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    /// Camera latitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    /// Camera height in meters.
    #[arg(long)]
    pub height: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_cli_overrides(config: &mut GlobeConfig, args: &CliArgs) {
    if let Some(ref url) = args.imagery_url {
        config.imagery.get_or_insert_with(ImageryConfig::default).url = url.clone();
    }
    if let Some(ref url) = args.terrain_url {
        config.terrain.get_or_insert_with(TerrainConfig::default).url = url.clone();
    }
    if let Some(level) = args.maximum_level {
        config.quadtree.maximum_level = level;
    }
    if let Some(longitude) = args.longitude {
        config.camera.longitude = longitude;
    }
    if let Some(latitude) = args.latitude {
        config.camera.latitude = latitude;
    }
    if let Some(height) = args.height {
        config.camera.height = height;
    }
}
