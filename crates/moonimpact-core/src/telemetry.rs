use std::time::Duration;

use log::info;

use crate::{frame::TickOutcome, time::FrameTime};

/// Rolling frame statistics, logged once per period.
pub struct Telemetry {
    pub fps: f32,
    pub steps_per_second: f32,
    pub dt_ms: f32,
    pub frames_skipped: u64,
    pub backlog_clamps: u64,

    window: Duration,
    window_frames: u32,
    window_steps: u32,
    period: Duration,
    enabled: bool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            fps: 0.0,
            steps_per_second: 0.0,
            dt_ms: 0.0,
            frames_skipped: 0,
            backlog_clamps: 0,
            window: Duration::ZERO,
            window_frames: 0,
            window_steps: 0,
            period: Duration::from_secs(1),
            enabled: true,
        }
    }

    pub fn configure_fps_logging(&mut self, enabled: bool, period: Duration) {
        self.enabled = enabled;
        self.period = period.max(Duration::from_millis(250));
    }

    /// Feed one tick. `dt` is the wall time the host measured for it.
    /// Returns `true` when a reporting window closed on this tick.
    pub fn frame_tick(&mut self, dt: Duration, outcome: &TickOutcome, time: &FrameTime) -> bool {
        self.dt_ms = dt.as_secs_f32() * 1000.0;
        if !outcome.rendered {
            self.frames_skipped += 1;
        }
        if outcome.backlog_clamped {
            self.backlog_clamps += 1;
        }

        self.window += dt;
        self.window_steps += outcome.steps_run;
        if outcome.rendered {
            self.window_frames += 1;
        }

        if self.window < self.period {
            return false;
        }

        let secs = self.window.as_secs_f32().max(0.0001);
        self.fps = self.window_frames as f32 / secs;
        self.steps_per_second = self.window_steps as f32 / secs;

        if self.enabled {
            info!(
                "fps={:.1} steps/s={:.1} dt_ms={:.2} alpha={:.2} slow={} step={}",
                self.fps,
                self.steps_per_second,
                self.dt_ms,
                time.interpolation_alpha,
                time.is_running_slowly,
                time.step_index
            );
        }

        self.window = Duration::ZERO;
        self.window_frames = 0;
        self.window_steps = 0;
        true
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
