//! Monotonic clock sources for [`FrameScheduler`](crate::scheduler::FrameScheduler).
//!
//! The scheduler never reads `Instant::now()` directly. It samples a [`Clock`],
//! which lets tests drive it with a [`ManualClock`] and get exact, repeatable
//! step counts.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// A monotonic reading: time elapsed since the clock started.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockSample {
    elapsed: Duration,
}

impl ClockSample {
    #[inline]
    pub const fn from_elapsed(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    #[inline]
    pub const fn elapsed(self) -> Duration {
        self.elapsed
    }

    /// Time from `earlier` to `self`. Saturates to zero if the source went backwards.
    #[inline]
    pub fn since(self, earlier: ClockSample) -> Duration {
        self.elapsed.saturating_sub(earlier.elapsed)
    }
}

pub trait Clock {
    /// Current reading. Must never decrease between calls.
    fn now(&mut self) -> ClockSample;

    /// Block for at least `how_long`.
    fn sleep(&mut self, how_long: Duration);
}

/// Wall clock backed by [`Instant`], started on construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
    spin_margin: Duration,
}

/// Portion of each sleep that is spun instead of handed to the OS scheduler.
const DEFAULT_SPIN_MARGIN: Duration = Duration::from_millis(1);

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            spin_margin: DEFAULT_SPIN_MARGIN,
        }
    }

    /// Override how much of each sleep is spent spinning. `Duration::ZERO`
    /// sleeps on the OS timer only.
    pub fn with_spin_margin(mut self, margin: Duration) -> Self {
        self.spin_margin = margin;
        self
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&mut self) -> ClockSample {
        ClockSample::from_elapsed(self.start.elapsed())
    }

    fn sleep(&mut self, how_long: Duration) {
        if how_long.is_zero() {
            return;
        }
        let deadline = Instant::now() + how_long;

        // OS sleeps overshoot by up to a scheduler quantum; hand off the bulk
        // and spin the tail.
        if how_long > self.spin_margin {
            std::thread::sleep(how_long - self.spin_margin);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Deterministic clock advanced by hand.
///
/// Clones share the same timeline, so a test can keep one handle and give
/// the other to the scheduler. `sleep` advances the timeline by exactly the
/// requested duration.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
    slept_ns: Arc<AtomicU64>,
    sleeps: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the timeline forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now_ns.fetch_add(duration_to_ns(by), Ordering::AcqRel);
    }

    /// Current reading without going through the [`Clock`] trait.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::Acquire))
    }

    /// Total time spent in [`Clock::sleep`].
    pub fn total_slept(&self) -> Duration {
        Duration::from_nanos(self.slept_ns.load(Ordering::Acquire))
    }

    /// Number of [`Clock::sleep`] calls.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::Acquire)
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&mut self) -> ClockSample {
        ClockSample::from_elapsed(self.elapsed())
    }

    fn sleep(&mut self, how_long: Duration) {
        let ns = duration_to_ns(how_long);
        self.now_ns.fetch_add(ns, Ordering::AcqRel);
        self.slept_ns.fetch_add(ns, Ordering::AcqRel);
        self.sleeps.fetch_add(1, Ordering::AcqRel);
    }
}

#[inline]
fn duration_to_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_since_saturates() {
        let a = ClockSample::from_elapsed(Duration::from_millis(10));
        let b = ClockSample::from_elapsed(Duration::from_millis(4));
        assert_eq!(a.since(b), Duration::from_millis(6));
        assert_eq!(b.since(a), Duration::ZERO);
    }

    #[test]
    fn manual_clock_clones_share_timeline() {
        let handle = ManualClock::new();
        let mut clock = handle.clone();

        handle.advance(Duration::from_millis(5));
        assert_eq!(clock.now().elapsed(), Duration::from_millis(5));

        clock.sleep(Duration::from_millis(3));
        assert_eq!(handle.elapsed(), Duration::from_millis(8));
        assert_eq!(handle.total_slept(), Duration::from_millis(3));
        assert_eq!(handle.sleep_count(), 1);
    }

    #[test]
    fn monotonic_clock_sleeps_at_least_requested() {
        let mut clock = MonotonicClock::new().with_spin_margin(Duration::from_micros(200));
        let before = clock.now();
        clock.sleep(Duration::from_millis(2));
        let after = clock.now();
        assert!(after.since(before) >= Duration::from_millis(2));
    }
}
