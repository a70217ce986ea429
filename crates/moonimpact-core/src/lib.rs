//! Moon Impact core
//!
//! Frame scheduling for the terrain viewer: a clock abstraction, the
//! fixed/variable timestep scheduler that drives simulation and render
//! callbacks, and the render-side parameter caches it feeds.

pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod lag;
pub mod logging;
pub mod params;
pub mod scheduler;
pub mod signals;
pub mod telemetry;
pub mod time;

// ===============================
// Public facade
// ===============================

pub use clock::{Clock, ClockSample, ManualClock, MonotonicClock};
pub use config::{load_config_toml, MoonImpactConfig, SchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use frame::{FrameContext, RenderFrame, SimulationStep, TickOutcome};
pub use scheduler::FrameScheduler;
pub use signals::ExitSignal;
pub use time::FrameTime;
