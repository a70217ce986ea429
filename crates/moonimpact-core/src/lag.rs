/// Lag units at which the simulation is reported as running slowly.
pub const RUNNING_SLOWLY_THRESHOLD: u32 = 5;

/// Counts how many fixed steps the simulation has fallen behind.
///
/// Every multi-step tick adds `steps - 1`; every single-step tick pays back
/// one unit. The running-slowly flag is raised at
/// [`RUNNING_SLOWLY_THRESHOLD`] and only dropped once the count is back at
/// zero, so isolated hiccups never toggle it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LagCounter {
    frames: u32,
}

impl LagCounter {
    pub const fn new() -> Self {
        Self { frames: 0 }
    }

    #[inline]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Account for one tick that ran `steps` fixed steps and return the new
    /// running-slowly state.
    pub fn record(&mut self, steps: u32, running_slowly: bool) -> bool {
        self.frames = self.frames.saturating_add(steps.saturating_sub(1));

        let mut slow = running_slowly;
        if running_slowly {
            if self.frames == 0 {
                slow = false;
            }
        } else if self.frames >= RUNNING_SLOWLY_THRESHOLD {
            slow = true;
        }

        if steps == 1 && self.frames > 0 {
            self.frames -= 1;
        }
        slow
    }

    pub fn reset(&mut self) {
        self.frames = 0;
    }
}
