use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};

use crate::{
    clock::{Clock, ClockSample, MonotonicClock},
    config::{target_from_ms, SchedulerConfig},
    error::SchedulerResult,
    frame::{FrameContext, LoopControl, RenderFrame, SimulationStep, TickOutcome},
    lag::LagCounter,
    signals::ExitSignal,
    time::FrameTime,
};

/// Turns a free-running clock into simulation steps and render calls.
///
/// The host calls [`tick`](Self::tick) once per redraw opportunity. Each tick
/// runs zero or more simulation steps, then at most one render call.
/// In fixed-step mode every step advances time by exactly
/// [`target_elapsed_time`](Self::target_elapsed_time); the backlog is
/// clamped to [`max_elapsed_time`](Self::max_elapsed_time) so a stall can
/// never queue more than `max / target` steps into one tick.
pub struct FrameScheduler<C: Clock = MonotonicClock> {
    config: SchedulerConfig,
    clock: C,

    previous_sample: ClockSample,
    accumulated_elapsed_time: Duration,
    lag: LagCounter,
    time: FrameTime,

    control: LoopControl,
    exit_signal: ExitSignal,
    is_active: bool,
}

impl FrameScheduler<MonotonicClock> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> FrameScheduler<C> {
    /// Samples `clock` immediately; the first tick measures from here.
    pub fn with_clock(config: SchedulerConfig, mut clock: C) -> Self {
        let previous_sample = clock.now();
        Self {
            config,
            clock,
            previous_sample,
            accumulated_elapsed_time: Duration::ZERO,
            lag: LagCounter::new(),
            time: FrameTime::new(),
            control: LoopControl::default(),
            exit_signal: ExitSignal::new(),
            is_active: true,
        }
    }

    /// Share an existing exit signal, e.g. one wired to Ctrl-C.
    pub fn with_exit_signal(mut self, signal: ExitSignal) -> Self {
        self.exit_signal = signal;
        self
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    pub fn is_fixed_time_step(&self) -> bool {
        self.config.is_fixed_time_step()
    }

    pub fn set_fixed_time_step(&mut self, fixed: bool) {
        if fixed != self.config.is_fixed_time_step() {
            info!("fixed time step {}", if fixed { "enabled" } else { "disabled" });
        }
        self.config.set_fixed_time_step(fixed);
    }

    #[inline]
    pub fn target_elapsed_time(&self) -> Duration {
        self.config.target_elapsed_time()
    }

    /// Fails without touching the current value if `target` is zero or longer
    /// than the backlog ceiling.
    pub fn set_target_elapsed_time(&mut self, target: Duration) -> SchedulerResult<()> {
        if self.config.set_target_elapsed_time(target)? {
            info!("target elapsed time set to {target:?}");
        }
        Ok(())
    }

    /// Like [`set_target_elapsed_time`](Self::set_target_elapsed_time) for
    /// hosts holding a signed value. Zero, negative and non-finite seconds
    /// are rejected.
    pub fn set_target_elapsed_secs(&mut self, secs: f64) -> SchedulerResult<()> {
        let target = target_from_ms(secs * 1000.0)?;
        self.set_target_elapsed_time(target)
    }

    #[inline]
    pub fn max_elapsed_time(&self) -> Duration {
        self.config.max_elapsed_time()
    }

    #[inline]
    pub fn inactive_sleep_time(&self) -> Duration {
        self.config.inactive_sleep_time()
    }

    #[inline]
    pub fn time(&self) -> &FrameTime {
        &self.time
    }

    #[inline]
    pub fn total_game_time(&self) -> Duration {
        self.time.total_game_time
    }

    #[inline]
    pub fn elapsed_game_time(&self) -> Duration {
        self.time.elapsed_game_time
    }

    #[inline]
    pub fn is_running_slowly(&self) -> bool {
        self.time.is_running_slowly
    }

    /// Wall time measured but not yet turned into simulation steps.
    #[inline]
    pub fn accumulated_elapsed_time(&self) -> Duration {
        self.accumulated_elapsed_time
    }

    #[inline]
    pub fn lag_frames(&self) -> u32 {
        self.lag.frames()
    }

    #[inline]
    pub fn exit_signal(&self) -> ExitSignal {
        self.exit_signal.clone()
    }

    pub fn request_exit(&mut self) {
        self.control.exit_requested = true;
    }

    #[inline]
    pub fn is_exit_requested(&self) -> bool {
        self.control.exit_requested || self.exit_signal.is_exit_requested()
    }

    /// Skip the next render call.
    pub fn suppress_draw(&mut self) {
        self.control.suppress_draw = true;
    }

    /// Inactive schedulers sleep for the inactive sleep time at the start of
    /// every tick. Hosts flip this on focus changes.
    pub fn set_active(&mut self, active: bool) {
        if active != self.is_active {
            debug!("scheduler {}", if active { "active" } else { "inactive" });
        }
        self.is_active = active;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Forget time measured so far, e.g. after a known long stall.
    pub fn reset_elapsed_time(&mut self) {
        self.previous_sample = self.clock.now();
        self.accumulated_elapsed_time = Duration::ZERO;
        self.time.elapsed_game_time = Duration::ZERO;
        self.time.interpolation_alpha = 0.0;
    }

    /// Run one frame: measure, step the simulation, render.
    ///
    /// All `sim` steps of the tick finish before `render` starts. An error
    /// from either callback aborts the tick and is returned unchanged apart
    /// from added context; state already advanced by earlier steps stays.
    pub fn tick<S, R>(&mut self, sim: &mut S, render: &mut R) -> anyhow::Result<TickOutcome>
    where
        S: SimulationStep + ?Sized,
        R: RenderFrame + ?Sized,
    {
        if !self.is_active {
            self.clock.sleep(self.config.inactive_sleep_time());
        }

        let target = self.config.target_elapsed_time();
        self.sync_exit_signal();

        loop {
            self.sample_clock();

            let must_wait = self.config.is_fixed_time_step()
                && self.config.wait_for_target()
                && self.accumulated_elapsed_time < target;
            if !must_wait || self.control.exit_requested {
                break;
            }
            self.clock.sleep(target - self.accumulated_elapsed_time);
            self.sync_exit_signal();
        }

        let mut outcome = TickOutcome::default();

        let max = self.config.max_elapsed_time();
        if self.accumulated_elapsed_time > max {
            debug!(
                "backlog {:?} clamped to {:?}",
                self.accumulated_elapsed_time, max
            );
            self.accumulated_elapsed_time = max;
            outcome.backlog_clamped = true;
        }

        self.time.frame_index += 1;

        if self.config.is_fixed_time_step() {
            outcome.steps_run = self.run_fixed_steps(sim, target)?;
        } else {
            self.run_variable_step(sim)?;
            outcome.steps_run = 1;
        }

        if self.control.suppress_draw {
            self.control.suppress_draw = false;
        } else {
            render.render(&self.time).context("render frame failed")?;
            outcome.rendered = true;
        }

        self.sync_exit_signal();
        if self.control.exit_requested {
            info!("exit requested after frame {}", self.time.frame_index);
            outcome.exit_requested = true;
        }

        Ok(outcome)
    }

    fn run_fixed_steps<S>(&mut self, sim: &mut S, target: Duration) -> anyhow::Result<u32>
    where
        S: SimulationStep + ?Sized,
    {
        self.time.elapsed_game_time = target;

        let mut steps: u32 = 0;
        while self.accumulated_elapsed_time >= target && !self.control.exit_requested {
            self.time.total_game_time += target;
            self.accumulated_elapsed_time -= target;
            self.time.step_index += 1;
            steps += 1;

            let mut ctx = FrameContext::new(&self.time, &mut self.control);
            sim.step(&mut ctx).context("simulation step failed")?;
        }

        let was_slow = self.time.is_running_slowly;
        self.time.is_running_slowly = self.lag.record(steps, was_slow);
        match (was_slow, self.time.is_running_slowly) {
            (false, true) => warn!("running slowly (lag {} steps)", self.lag.frames()),
            (true, false) => info!("caught up with real time"),
            _ => {}
        }

        self.time.elapsed_game_time = target * steps;
        self.time.interpolation_alpha =
            (self.accumulated_elapsed_time.as_secs_f64() / target.as_secs_f64()) as f32;
        Ok(steps)
    }

    fn run_variable_step<S>(&mut self, sim: &mut S) -> anyhow::Result<()>
    where
        S: SimulationStep + ?Sized,
    {
        let elapsed = self.accumulated_elapsed_time;
        self.time.elapsed_game_time = elapsed;
        self.time.total_game_time += elapsed;
        self.time.step_index += 1;
        self.time.interpolation_alpha = 0.0;
        self.accumulated_elapsed_time = Duration::ZERO;

        let mut ctx = FrameContext::new(&self.time, &mut self.control);
        sim.step(&mut ctx).context("simulation step failed")
    }

    fn sample_clock(&mut self) {
        let now = self.clock.now();
        self.accumulated_elapsed_time += now.since(self.previous_sample);
        self.previous_sample = now;
    }

    fn sync_exit_signal(&mut self) {
        if self.exit_signal.is_exit_requested() {
            self.control.exit_requested = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, config::SchedulerConfig};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn fixed(target: Duration, max: Duration) -> SchedulerConfig {
        SchedulerConfig::new(true, target, max, ms(20)).unwrap()
    }

    fn counting_step(count: &mut u32) -> impl FnMut(&mut FrameContext<'_>) -> anyhow::Result<()> + '_ {
        move |_ctx: &mut FrameContext<'_>| {
            *count += 1;
            Ok(())
        }
    }

    fn counting_render(count: &mut u32) -> impl FnMut(&FrameTime) -> anyhow::Result<()> + '_ {
        move |_t: &FrameTime| {
            *count += 1;
            Ok(())
        }
    }

    #[test]
    fn first_tick_measures_from_construction() {
        let clock = ManualClock::new();
        clock.advance(ms(1_000));

        let mut sched = FrameScheduler::with_clock(
            fixed(ms(10), ms(500)).with_wait_for_target(false),
            clock.clone(),
        );
        clock.advance(ms(25));

        let (mut steps, mut frames) = (0, 0);
        let out = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();

        assert_eq!(out.steps_run, 2);
        assert_eq!(steps, 2);
        assert_eq!(sched.accumulated_elapsed_time(), ms(5));
        assert_eq!(sched.total_game_time(), ms(20));
    }

    #[test]
    fn wait_gate_sleeps_until_one_step_accumulated() {
        let clock = ManualClock::new();
        let mut sched = FrameScheduler::with_clock(fixed(ms(10), ms(500)), clock.clone());
        clock.advance(ms(4));

        let (mut steps, mut frames) = (0, 0);
        let out = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();

        assert_eq!(clock.total_slept(), ms(6));
        assert_eq!(clock.sleep_count(), 1);
        assert_eq!(out.steps_run, 1);
        assert_eq!(sched.accumulated_elapsed_time(), Duration::ZERO);
        assert_eq!(frames, 1);
    }

    #[test]
    fn exit_signal_interrupts_wait_gate() {
        let clock = ManualClock::new();
        let signal = ExitSignal::new();
        let mut sched = FrameScheduler::with_clock(fixed(ms(10), ms(500)), clock.clone())
            .with_exit_signal(signal.clone());
        signal.request_exit();

        let (mut steps, mut frames) = (0, 0);
        let out = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();

        assert_eq!(clock.sleep_count(), 0);
        assert_eq!(out.steps_run, 0);
        assert!(out.rendered);
        assert!(out.exit_requested);
    }

    #[test]
    fn step_requesting_exit_stops_loop_but_frame_is_drawn() {
        let clock = ManualClock::new();
        let mut sched = FrameScheduler::with_clock(fixed(ms(10), ms(500)), clock.clone());
        clock.advance(ms(40));

        let mut steps = 0;
        let mut sim = |ctx: &mut FrameContext<'_>| -> anyhow::Result<()> {
            steps += 1;
            ctx.request_exit();
            Ok(())
        };
        let mut frames = 0;
        let out = sched.tick(&mut sim, &mut counting_render(&mut frames)).unwrap();

        assert_eq!(steps, 1);
        assert_eq!(frames, 1);
        assert!(out.exit_requested);
        assert!(sched.is_exit_requested());
        assert_eq!(sched.accumulated_elapsed_time(), ms(30));
    }

    #[test]
    fn variable_step_runs_once_with_whole_backlog() {
        let clock = ManualClock::new();
        let cfg = fixed(ms(10), ms(500)).with_fixed_time_step(false);
        let mut sched = FrameScheduler::with_clock(cfg, clock.clone());
        clock.advance(ms(37));

        let mut seen = Vec::new();
        let mut sim = |ctx: &mut FrameContext<'_>| -> anyhow::Result<()> {
            seen.push(ctx.time().elapsed_game_time);
            Ok(())
        };
        let mut frames = 0;
        let out = sched.tick(&mut sim, &mut counting_render(&mut frames)).unwrap();

        assert_eq!(out.steps_run, 1);
        assert_eq!(seen, vec![ms(37)]);
        assert_eq!(sched.elapsed_game_time(), ms(37));
        assert_eq!(sched.accumulated_elapsed_time(), Duration::ZERO);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn variable_step_backlog_is_clamped_too() {
        let clock = ManualClock::new();
        let cfg = fixed(ms(10), ms(100)).with_fixed_time_step(false);
        let mut sched = FrameScheduler::with_clock(cfg, clock.clone());
        clock.advance(ms(5_000));

        let (mut steps, mut frames) = (0, 0);
        let out = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();

        assert!(out.backlog_clamped);
        assert_eq!(sched.elapsed_game_time(), ms(100));
    }

    #[test]
    fn each_step_sees_one_target_and_tick_reports_aggregate() {
        let clock = ManualClock::new();
        let mut sched = FrameScheduler::with_clock(fixed(ms(10), ms(500)), clock.clone());
        clock.advance(ms(35));

        let mut per_step = Vec::new();
        let mut sim = |ctx: &mut FrameContext<'_>| -> anyhow::Result<()> {
            per_step.push((ctx.time().elapsed_game_time, ctx.time().total_game_time));
            Ok(())
        };
        let mut rendered_with = None;
        let mut render = |t: &FrameTime| -> anyhow::Result<()> {
            rendered_with = Some(t.clone());
            Ok(())
        };
        sched.tick(&mut sim, &mut render).unwrap();

        assert_eq!(per_step, vec![(ms(10), ms(10)), (ms(10), ms(20)), (ms(10), ms(30))]);
        let t = rendered_with.unwrap();
        assert_eq!(t.elapsed_game_time, ms(30));
        assert_eq!(t.total_game_time, ms(30));
        assert_eq!(t.step_index, 3);
        assert_eq!(t.frame_index, 1);
        assert!((t.interpolation_alpha - 0.5).abs() < 1e-6);
    }

    #[test]
    fn inactive_scheduler_sleeps_first() {
        let clock = ManualClock::new();
        let cfg = fixed(ms(10), ms(500)).with_wait_for_target(false);
        let mut sched = FrameScheduler::with_clock(cfg, clock.clone());
        sched.set_active(false);

        let (mut steps, mut frames) = (0, 0);
        let out = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();

        assert_eq!(clock.total_slept(), ms(20));
        assert_eq!(out.steps_run, 2);
    }

    #[test]
    fn reset_elapsed_time_discards_backlog() {
        let clock = ManualClock::new();
        let cfg = fixed(ms(10), ms(500)).with_wait_for_target(false);
        let mut sched = FrameScheduler::with_clock(cfg, clock.clone());
        clock.advance(ms(300));
        sched.reset_elapsed_time();

        let (mut steps, mut frames) = (0, 0);
        let out = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();
        assert_eq!(out.steps_run, 0);
        assert_eq!(frames, 1);
    }

    #[test]
    fn simulation_error_aborts_tick_without_render() {
        let clock = ManualClock::new();
        let mut sched = FrameScheduler::with_clock(fixed(ms(10), ms(500)), clock.clone());
        clock.advance(ms(30));

        let mut sim = |_ctx: &mut FrameContext<'_>| -> anyhow::Result<()> {
            anyhow::bail!("terrain blew up")
        };
        let mut frames = 0;
        let err = sched.tick(&mut sim, &mut counting_render(&mut frames)).unwrap_err();

        assert_eq!(frames, 0);
        assert!(format!("{err:#}").contains("terrain blew up"));
        assert_eq!(sched.total_game_time(), ms(10));
    }

    #[test]
    fn render_error_propagates() {
        let clock = ManualClock::new();
        let mut sched = FrameScheduler::with_clock(fixed(ms(10), ms(500)), clock.clone());
        clock.advance(ms(10));

        let mut steps = 0;
        let mut render = |_t: &FrameTime| -> anyhow::Result<()> { anyhow::bail!("device lost") };
        let err = sched.tick(&mut counting_step(&mut steps), &mut render).unwrap_err();

        assert_eq!(steps, 1);
        assert!(format!("{err:#}").contains("render frame failed"));
    }

    #[test]
    fn host_suppress_draw_skips_one_frame() {
        let clock = ManualClock::new();
        let cfg = fixed(ms(10), ms(500)).with_wait_for_target(false);
        let mut sched = FrameScheduler::with_clock(cfg, clock.clone());
        sched.suppress_draw();

        let (mut steps, mut frames) = (0, 0);
        let first = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();
        let second = sched
            .tick(&mut counting_step(&mut steps), &mut counting_render(&mut frames))
            .unwrap();

        assert!(!first.rendered);
        assert!(second.rendered);
        assert_eq!(frames, 1);
    }

    #[test]
    fn target_reconfiguration() {
        let mut sched = FrameScheduler::with_clock(SchedulerConfig::default(), ManualClock::new());

        sched.set_target_elapsed_time(ms(8)).unwrap();
        assert_eq!(sched.target_elapsed_time(), ms(8));

        assert!(sched.set_target_elapsed_time(Duration::ZERO).is_err());
        assert!(sched.set_target_elapsed_secs(-0.016).is_err());
        assert!(sched.set_target_elapsed_secs(f64::NAN).is_err());
        assert!(sched.set_target_elapsed_time(ms(501)).is_err());
        assert_eq!(sched.target_elapsed_time(), ms(8));

        sched.set_target_elapsed_secs(0.004).unwrap();
        assert_eq!(sched.target_elapsed_time(), ms(4));
    }
}
