use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};

/// 166 667 ticks of 100 ns, i.e. 60 Hz.
pub const DEFAULT_TARGET_ELAPSED: Duration = Duration::from_nanos(16_666_700);
pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_millis(500);
pub const DEFAULT_INACTIVE_SLEEP: Duration = Duration::from_millis(20);

/// Validated timing policy for [`FrameScheduler`](crate::scheduler::FrameScheduler).
///
/// Fields are private so a `SchedulerConfig` can only hold a positive target
/// step and a backlog ceiling no shorter than one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    fixed_time_step: bool,
    target_elapsed_time: Duration,
    max_elapsed_time: Duration,
    inactive_sleep_time: Duration,
    wait_for_target: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: true,
            target_elapsed_time: DEFAULT_TARGET_ELAPSED,
            max_elapsed_time: DEFAULT_MAX_ELAPSED,
            inactive_sleep_time: DEFAULT_INACTIVE_SLEEP,
            wait_for_target: true,
        }
    }
}

impl SchedulerConfig {
    pub fn new(
        fixed_time_step: bool,
        target_elapsed_time: Duration,
        max_elapsed_time: Duration,
        inactive_sleep_time: Duration,
    ) -> SchedulerResult<Self> {
        let cfg = Self {
            fixed_time_step,
            target_elapsed_time: check_target(target_elapsed_time)?,
            max_elapsed_time,
            inactive_sleep_time,
            wait_for_target: true,
        };
        cfg.check_max()?;
        Ok(cfg)
    }

    /// Whether a fixed-step tick blocks until one full step has accumulated.
    /// Hosts paced by vsync or an event loop may turn this off and let ticks
    /// run zero steps instead.
    pub fn with_wait_for_target(mut self, wait: bool) -> Self {
        self.wait_for_target = wait;
        self
    }

    pub fn with_fixed_time_step(mut self, fixed: bool) -> Self {
        self.fixed_time_step = fixed;
        self
    }

    #[inline]
    pub fn is_fixed_time_step(&self) -> bool {
        self.fixed_time_step
    }

    #[inline]
    pub fn target_elapsed_time(&self) -> Duration {
        self.target_elapsed_time
    }

    #[inline]
    pub fn max_elapsed_time(&self) -> Duration {
        self.max_elapsed_time
    }

    #[inline]
    pub fn inactive_sleep_time(&self) -> Duration {
        self.inactive_sleep_time
    }

    #[inline]
    pub fn wait_for_target(&self) -> bool {
        self.wait_for_target
    }

    /// Upper bound on simulation steps a single tick can run.
    pub fn max_steps_per_tick(&self) -> u64 {
        let per = self.max_elapsed_time.as_nanos() / self.target_elapsed_time.as_nanos();
        u64::try_from(per).unwrap_or(u64::MAX)
    }

    pub(crate) fn set_fixed_time_step(&mut self, fixed: bool) {
        self.fixed_time_step = fixed;
    }

    /// Returns `Ok(false)` when `target` equals the current value.
    pub(crate) fn set_target_elapsed_time(&mut self, target: Duration) -> SchedulerResult<bool> {
        let target = check_target(target)?;
        if target == self.target_elapsed_time {
            return Ok(false);
        }
        if target > self.max_elapsed_time {
            return Err(SchedulerError::MaxElapsedBelowTarget {
                max: self.max_elapsed_time,
                target,
            });
        }
        self.target_elapsed_time = target;
        Ok(true)
    }

    fn check_max(&self) -> SchedulerResult<()> {
        if self.max_elapsed_time.is_zero() {
            return Err(SchedulerError::MaxElapsedTimeOutOfRange { value_ms: 0.0 });
        }
        if self.max_elapsed_time < self.target_elapsed_time {
            return Err(SchedulerError::MaxElapsedBelowTarget {
                max: self.max_elapsed_time,
                target: self.target_elapsed_time,
            });
        }
        Ok(())
    }
}

fn check_target(target: Duration) -> SchedulerResult<Duration> {
    if target.is_zero() {
        return Err(SchedulerError::TargetElapsedTimeOutOfRange { value_ms: 0.0 });
    }
    Ok(target)
}

/// Converts a millisecond value from config or the host into a [`Duration`].
/// `None` for NaN, infinities, negatives and values that overflow.
pub fn duration_from_ms(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    let ns = (ms * 1_000_000.0).round();
    if ns >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(ns as u64))
}

/// Positive, non-zero milliseconds or a [`SchedulerError::TargetElapsedTimeOutOfRange`].
pub fn target_from_ms(ms: f64) -> SchedulerResult<Duration> {
    match duration_from_ms(ms) {
        Some(d) if !d.is_zero() => Ok(d),
        _ => Err(SchedulerError::TargetElapsedTimeOutOfRange { value_ms: ms }),
    }
}

// ---------------------------------------------------------------------------
// File config (moonimpact.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoonImpactConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl MoonImpactConfig {
    pub fn from_toml_str(text: &str) -> SchedulerResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

pub fn load_config_toml(path: impl AsRef<Path>) -> SchedulerResult<MoonImpactConfig> {
    let text = fs::read_to_string(path)?;
    MoonImpactConfig::from_toml_str(&text)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_title() -> String { "Moon Impact Simulator".to_string() }
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 1024 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: default_title(), width: default_width(), height: default_height() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_true")]
    pub fixed_time_step: bool,
    #[serde(default = "default_target_ms")]
    pub target_elapsed_ms: f64,
    #[serde(default = "default_max_ms")]
    pub max_elapsed_ms: f64,
    #[serde(default = "default_inactive_ms")]
    pub inactive_sleep_ms: f64,
    #[serde(default = "default_true")]
    pub wait_for_target: bool,
    #[serde(default = "default_true")]
    pub log_fps: bool,
    #[serde(default = "default_fps_period_ms")]
    pub fps_log_period_ms: u32,
}

fn default_true() -> bool { true }
fn default_target_ms() -> f64 { 16.6667 }
fn default_max_ms() -> f64 { 500.0 }
fn default_inactive_ms() -> f64 { 20.0 }
fn default_fps_period_ms() -> u32 { 1000 }

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: true,
            target_elapsed_ms: default_target_ms(),
            max_elapsed_ms: default_max_ms(),
            inactive_sleep_ms: default_inactive_ms(),
            wait_for_target: true,
            log_fps: true,
            fps_log_period_ms: default_fps_period_ms(),
        }
    }
}

impl FrameConfig {
    pub fn to_scheduler_config(&self) -> SchedulerResult<SchedulerConfig> {
        let target = target_from_ms(self.target_elapsed_ms)?;
        let max = match duration_from_ms(self.max_elapsed_ms) {
            Some(d) if !d.is_zero() => d,
            _ => {
                return Err(SchedulerError::MaxElapsedTimeOutOfRange {
                    value_ms: self.max_elapsed_ms,
                })
            }
        };
        let inactive = duration_from_ms(self.inactive_sleep_ms).ok_or(
            SchedulerError::InactiveSleepOutOfRange { value_ms: self.inactive_sleep_ms },
        )?;

        Ok(SchedulerConfig::new(self.fixed_time_step, target, max, inactive)?
            .with_wait_for_target(self.wait_for_target))
    }

    pub fn fps_log_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.fps_log_period_ms.max(250)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// "poll" or "wait"
    #[serde(default = "default_control_flow")]
    pub control_flow: String,
}

fn default_control_flow() -> String { "poll".to_string() }

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { control_flow: default_control_flow() }
    }
}

impl RuntimeConfig {
    pub fn is_poll(&self) -> bool {
        self.control_flow.trim().eq_ignore_ascii_case("poll")
    }
}
