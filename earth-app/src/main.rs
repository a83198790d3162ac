use std::time::Duration;

use bevy::{
    app::ScheduleRunnerPlugin,
    log::{info, warn, Level, LogPlugin},
    prelude::*,
};
use clap::Parser;
use earth_globe::{GlobeConfig, GlobePlugin};

mod cli;

use cli::{apply_cli_overrides, CliArgs};

fn main() {
    let args = CliArgs::parse();
    let (level, unknown_level) = match args.log_level.as_deref().map(str::parse::<Level>) {
        None => (Level::INFO, None),
        Some(Ok(level)) => (level, None),
        Some(Err(_)) => (Level::INFO, args.log_level.clone()),
    };
    let loaded = args.config.as_deref().map(GlobeConfig::from_path);

    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level,
        filter: "wgpu=error,reqwest=warn,hyper=warn".to_string(),
    });
    if let Some(unknown_level) = unknown_level {
        warn!("unknown log level '{}', using info", unknown_level);
    }

    let mut config = match loaded {
        Some(Ok(config)) => config,
        Some(Err(error)) => {
            warn!("{}, using defaults", error);
            GlobeConfig::default()
        }
        None => GlobeConfig::default(),
    };
    apply_cli_overrides(&mut config, &args);
    if let Err(error) = config.validate() {
        warn!("{}, using defaults", error);
        config = GlobeConfig::default();
    }
    info!(
        "starting globe at ({}, {}) height {}",
        config.camera.longitude, config.camera.latitude, config.camera.height
    );

    let wait = Duration::from_secs_f64(1.0 / config.frame_rate);
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(wait)))
        .add_plugins(GlobePlugin { config })
        .run();
}
