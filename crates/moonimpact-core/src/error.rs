use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("target elapsed time must be positive and non-zero (got {value_ms} ms)")]
    TargetElapsedTimeOutOfRange { value_ms: f64 },

    #[error("max elapsed time must be positive and non-zero (got {value_ms} ms)")]
    MaxElapsedTimeOutOfRange { value_ms: f64 },

    #[error("max elapsed time {max:?} is shorter than the target step {target:?}")]
    MaxElapsedBelowTarget { max: Duration, target: Duration },

    #[error("inactive sleep time must be finite and not negative (got {value_ms} ms)")]
    InactiveSleepOutOfRange { value_ms: f64 },

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
