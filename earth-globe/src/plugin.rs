use std::sync::Arc;

use bevy::prelude::*;

use crate::{config::GlobeConfig, fetch::HttpFetcher, frame_scheduler::FrameScheduler, globe::Globe};

/// Inserts the [`Globe`] and its [`FrameScheduler`] and renders the globe at
/// the configured frame rate.
pub struct GlobePlugin {
    pub config: GlobeConfig,
}

impl Default for GlobePlugin {
    fn default() -> Self {
        Self {
            config: GlobeConfig::default(),
        }
    }
}

impl bevy::app::Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        let mut globe = Globe::new(&self.config);
        globe.add_configured_surfaces(&self.config, Arc::new(HttpFetcher));
        let mut scheduler = FrameScheduler::<Globe>::new(self.config.frame_rate);
        scheduler.register(|globe, frame_time| globe.render(&frame_time));

        app.insert_resource(globe);
        app.insert_resource(scheduler);
        app.add_systems(Update, tick_frame_scheduler);
    }
}

fn tick_frame_scheduler(
    time: Res<Time>,
    mut scheduler: ResMut<FrameScheduler<Globe>>,
    mut globe: ResMut<Globe>,
) {
    scheduler.tick(&mut globe, time.elapsed_seconds_f64());
}
