use std::time::Duration;

/// Simulation time as seen by step and render callbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTime {
    /// Sum of all simulated time so far.
    pub total_game_time: Duration,
    /// Elapsed time for the step being run, or for the whole tick once the
    /// step loop has finished.
    pub elapsed_game_time: Duration,
    pub is_running_slowly: bool,

    /// Ticks completed, counting the current one.
    pub frame_index: u64,
    /// Simulation steps run since the scheduler started.
    pub step_index: u64,
    /// Leftover backlog as a fraction of one fixed step, in `[0, 1)`.
    /// Always zero in variable-step mode.
    pub interpolation_alpha: f32,
}

impl FrameTime {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_game_time.as_secs_f32()
    }

    #[inline]
    pub fn total_secs(&self) -> f64 {
        self.total_game_time.as_secs_f64()
    }
}
