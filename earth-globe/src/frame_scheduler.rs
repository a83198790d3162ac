use bevy::{log::debug, prelude::Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

/// Timing handed to every callback of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub frame: u64,
    /// Seconds since the clock started.
    pub elapsed: f64,
    /// Seconds since the previous frame ran.
    pub delta: f64,
}

/// Fixed-rate gate: `tick` answers whether a new frame is due at `now`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: f64,
    last_frame: Option<f64>,
    frame: u64,
}
impl FrameClock {
    pub fn new(frames_per_second: f64) -> Self {
        Self {
            interval: 1.0 / frames_per_second.max(f64::MIN_POSITIVE),
            last_frame: None,
            frame: 0,
        }
    }
    pub fn interval(&self) -> f64 {
        self.interval
    }
    pub fn tick(&mut self, now: f64) -> Option<FrameTime> {
        let delta = match self.last_frame {
            Some(last) if now - last < self.interval => return None,
            Some(last) => now - last,
            None => 0.0,
        };
        self.last_frame = Some(now);
        self.frame += 1;
        Some(FrameTime {
            frame: self.frame,
            elapsed: now,
            delta,
        })
    }
}
impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60.0)
    }
}

pub type FrameCallback<C> = Box<dyn FnMut(&mut C, FrameTime) + Send + Sync>;

/// Owns per-frame callbacks over a context `C` and runs them at most once per
/// frame interval, in registration order.
#[derive(Resource)]
pub struct FrameScheduler<C: Send + Sync + 'static> {
    clock: FrameClock,
    callbacks: Vec<(CallbackId, FrameCallback<C>)>,
    next_id: u64,
}
impl<C: Send + Sync + 'static> FrameScheduler<C> {
    pub fn new(frames_per_second: f64) -> Self {
        Self {
            clock: FrameClock::new(frames_per_second),
            callbacks: vec![],
            next_id: 0,
        }
    }
    pub fn register(
        &mut self,
        callback: impl FnMut(&mut C, FrameTime) + Send + Sync + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }
    pub fn unregister(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(callback, _)| *callback != id);
        self.callbacks.len() != before
    }
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
    /// Runs every callback if a frame is due. Returns the frame that ran.
    pub fn tick(&mut self, context: &mut C, now: f64) -> Option<FrameTime> {
        let frame_time = self.clock.tick(now)?;
        for (_, callback) in self.callbacks.iter_mut() {
            callback(context, frame_time);
        }
        if frame_time.frame % 600 == 0 {
            debug!("frame {} at {:.2}s", frame_time.frame, frame_time.elapsed);
        }
        Some(frame_time)
    }
}
impl<C: Send + Sync + 'static> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self::new(60.0)
    }
}
