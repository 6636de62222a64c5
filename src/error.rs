//! Configuration errors.
//!
//! Sampling failures are not errors here: a missed echo or an implausible
//! distance travels as [`crate::Sample::Invalid`] and is counted by the
//! batch. The only fallible step is accepting a [`crate::Config`].

use thiserror_no_std::Error;

/// A configuration value that would break the sampling or level math.
#[derive(Error, Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum ConfigError {
    #[error("batch size {size} outside 1..={max}")]
    BatchSize { size: usize, max: usize },

    #[error("distance window [{min}, {max}] mm is empty")]
    DistanceWindow { min: f32, max: f32 },

    #[error("acceptance ratio {0} outside (0, 1]")]
    AcceptanceRatio(f32),

    #[error("container height {0} mm must be positive")]
    ContainerHeight(f32),

    #[error("sensor mount height {0} mm is not a finite number")]
    MountHeight(f32),

    #[error("speed of sound {0} mm/us must be positive")]
    SoundSpeed(f32),

    #[error("sample interval must be at least 1 ms")]
    SampleInterval,

    #[error("report interval must be at least 1 ms")]
    ReportInterval,

    #[error("echo timeout must be at least 1 us")]
    EchoTimeout,

    #[error("default distance {0} mm is not a finite number")]
    DefaultDistance(f32),
}
