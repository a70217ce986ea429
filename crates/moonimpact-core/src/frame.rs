use crate::time::FrameTime;

/// Flags a simulation step may raise on the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LoopControl {
    pub exit_requested: bool,
    pub suppress_draw: bool,
}

/// What a simulation step gets to see and touch.
///
/// Borrowed from the scheduler for the duration of one step.
pub struct FrameContext<'a> {
    time: &'a FrameTime,
    control: &'a mut LoopControl,
}

impl<'a> FrameContext<'a> {
    pub(crate) fn new(time: &'a FrameTime, control: &'a mut LoopControl) -> Self {
        Self { time, control }
    }

    #[inline]
    pub fn time(&self) -> &FrameTime {
        self.time
    }

    /// Stop running steps this tick. The frame is still drawn, then the
    /// tick reports exit to the host.
    #[inline]
    pub fn request_exit(&mut self) {
        self.control.exit_requested = true;
    }

    #[inline]
    pub fn is_exit_requested(&self) -> bool {
        self.control.exit_requested
    }

    /// Skip the render call at the end of this tick. One-shot.
    #[inline]
    pub fn suppress_draw(&mut self) {
        self.control.suppress_draw = true;
    }
}

/// Advances world state by one simulation step.
pub trait SimulationStep {
    fn step(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()>;
}

impl<F> SimulationStep for F
where
    F: FnMut(&mut FrameContext<'_>) -> anyhow::Result<()>,
{
    #[inline]
    fn step(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// Issues one frame of draw work and presents it. Must not block indefinitely.
pub trait RenderFrame {
    fn render(&mut self, time: &FrameTime) -> anyhow::Result<()>;
}

impl<F> RenderFrame for F
where
    F: FnMut(&FrameTime) -> anyhow::Result<()>,
{
    #[inline]
    fn render(&mut self, time: &FrameTime) -> anyhow::Result<()> {
        self(time)
    }
}

/// Summary of one [`FrameScheduler::tick`](crate::scheduler::FrameScheduler::tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub steps_run: u32,
    pub rendered: bool,
    /// The host should close the presentation surface.
    pub exit_requested: bool,
    /// Backlog went over the ceiling and the excess was dropped.
    pub backlog_clamped: bool,
}
