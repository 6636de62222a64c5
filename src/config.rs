//! Physical constants and pacing for the level estimator.

use libm::{ceilf, fabsf, roundf, sqrtf};

use crate::error::ConfigError;

/// Upper bound for [`Config::batch_size`]; the batch buffer is allocated for this many samples.
pub const MAX_BATCH_SIZE: usize = 64;

/// The configuration for the sampler, the batch policy and the level mapping.
///
/// All distances are in millimeters and all durations in the unit named by the field.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct Config {
    /// Distance from the sensor face to the bottom of the container.
    pub sensor_mount_height_mm: f32,
    /// Height of the container, the span that maps onto 0..=100 %.
    pub container_height_mm: f32,
    /// Propagation speed of the pulse in the medium.
    pub sound_speed_mm_per_us: f32,
    /// Samples per batch (N).
    pub batch_size: usize,
    /// Minimum spacing between two probes.
    pub sample_interval_ms: u64,
    /// Smallest plausible distance, inclusive.
    pub valid_distance_min_mm: f32,
    /// Largest plausible distance, inclusive.
    pub valid_distance_max_mm: f32,
    /// How long to wait for each echo edge before giving up.
    pub echo_timeout_us: u32,
    /// Fraction of valid samples a batch needs before its mean is published.
    pub acceptance_ratio: f32,
    /// Reading published before the first accepted batch. `None` leaves the level unavailable until then.
    pub default_distance_mm: Option<f32>,
    /// Period of the level report that also forces a fresh batch.
    pub report_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor_mount_height_mm: 200.0,
            container_height_mm: 104.0,
            sound_speed_mm_per_us: 0.343,
            batch_size: 15,
            sample_interval_ms: 200,
            valid_distance_min_mm: 50.0,
            valid_distance_max_mm: 300.0,
            echo_timeout_us: 30_000,
            acceptance_ratio: 0.8,
            default_distance_mm: Some(96.0),
            report_interval_ms: 5000,
        }
    }
}

impl Config {
    /// Check every field against the ranges the sampler and the level mapping rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSize {
                size: self.batch_size,
                max: MAX_BATCH_SIZE,
            });
        }

        let (min, max) = (self.valid_distance_min_mm, self.valid_distance_max_mm);
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::DistanceWindow { min, max });
        }

        // NaN fails both comparisons and lands in the error branch
        if !(self.acceptance_ratio > 0.0 && self.acceptance_ratio <= 1.0) {
            return Err(ConfigError::AcceptanceRatio(self.acceptance_ratio));
        }

        if !(self.container_height_mm > 0.0) || !self.container_height_mm.is_finite() {
            return Err(ConfigError::ContainerHeight(self.container_height_mm));
        }

        if !self.sensor_mount_height_mm.is_finite() {
            return Err(ConfigError::MountHeight(self.sensor_mount_height_mm));
        }

        if !(self.sound_speed_mm_per_us > 0.0) || !self.sound_speed_mm_per_us.is_finite() {
            return Err(ConfigError::SoundSpeed(self.sound_speed_mm_per_us));
        }

        if self.sample_interval_ms == 0 {
            return Err(ConfigError::SampleInterval);
        }

        if self.report_interval_ms == 0 {
            return Err(ConfigError::ReportInterval);
        }

        if self.echo_timeout_us == 0 {
            return Err(ConfigError::EchoTimeout);
        }

        match self.default_distance_mm {
            Some(d) if !d.is_finite() => Err(ConfigError::DefaultDistance(d)),
            _ => Ok(()),
        }
    }

    /// Smallest number of valid samples, at least one, that satisfies
    /// `valid >= acceptance_ratio * batch_size`.
    ///
    /// Products within a few ULPs of an integer count as that integer, so the default
    /// 0.8 of 15 asks for 12 valid samples, not 13.
    pub fn required_valid_samples(&self) -> usize {
        let exact = self.acceptance_ratio * self.batch_size as f32;
        let nearest = roundf(exact);
        let tolerance = f32::EPSILON * exact.max(1.0) * 4.0;
        let required = if fabsf(exact - nearest) <= tolerance {
            nearest
        } else {
            ceilf(exact)
        };
        (required as usize).max(1)
    }

    /// Replace the sound speed with the value for air at `celsius`.
    pub fn with_air_temperature(mut self, celsius: f32) -> Self {
        self.sound_speed_mm_per_us = speed_of_sound_mm_per_us(celsius);
        self
    }
}

/// Speed of sound in dry air at the given temperature, in millimeters per microsecond.
pub fn speed_of_sound_mm_per_us(celsius: f32) -> f32 {
    // 331.5 m/s at 0 °C, and m/s equals mm/ms
    0.3315 * sqrtf(1.0 + (celsius / 273.15))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn default_batch_needs_twelve_of_fifteen() {
        assert_eq!(Config::default().required_valid_samples(), 12);
    }

    #[test]
    fn fractional_threshold_rounds_up() {
        let config = Config {
            batch_size: 10,
            acceptance_ratio: 0.75,
            ..Config::default()
        };
        assert_eq!(config.required_valid_samples(), 8);
    }

    #[test]
    fn full_ratio_needs_every_sample() {
        let config = Config {
            acceptance_ratio: 1.0,
            ..Config::default()
        };
        assert_eq!(config.required_valid_samples(), 15);
    }

    #[test]
    fn nearly_integral_threshold_still_rounds_up() {
        // 0.6667 * 3 = 2.0001, two valid samples are not enough
        let config = Config {
            batch_size: 3,
            acceptance_ratio: 0.6667,
            ..Config::default()
        };
        assert_eq!(config.required_valid_samples(), 3);
    }

    #[test]
    fn rejects_empty_batch() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BatchSize {
                size: 0,
                max: MAX_BATCH_SIZE
            })
        );
    }

    #[test]
    fn rejects_oversized_batch() {
        let config = Config {
            batch_size: MAX_BATCH_SIZE + 1,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BatchSize { .. })
        ));
    }

    #[test]
    fn rejects_inverted_window() {
        let config = Config {
            valid_distance_min_mm: 300.0,
            valid_distance_max_mm: 50.0,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DistanceWindow {
                min: 300.0,
                max: 50.0
            })
        );
    }

    #[test]
    fn rejects_ratio_out_of_bounds() {
        for ratio in [0.0, -0.5, 1.5, f32::NAN] {
            let config = Config {
                acceptance_ratio: ratio,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::AcceptanceRatio(_))
            ));
        }
    }

    #[test]
    fn rejects_non_finite_window() {
        let config = Config {
            valid_distance_min_mm: f32::NAN,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DistanceWindow { .. })
        ));

        let config = Config {
            valid_distance_max_mm: f32::INFINITY,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DistanceWindow { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_mount_height() {
        let config = Config {
            sensor_mount_height_mm: f32::NAN,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MountHeight(_))
        ));
    }

    #[test]
    fn rejects_non_positive_sound_speed() {
        for speed in [0.0, -0.343] {
            let config = Config {
                sound_speed_mm_per_us: speed,
                ..Config::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::SoundSpeed(speed)));
        }
    }

    #[test]
    fn rejects_non_finite_default_reading() {
        let config = Config {
            default_distance_mm: Some(f32::INFINITY),
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DefaultDistance(f32::INFINITY))
        );
    }

    #[test]
    fn rejects_flat_container() {
        let config = Config {
            container_height_mm: 0.0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ContainerHeight(0.0)));
    }

    #[test]
    fn rejects_zero_intervals() {
        let config = Config {
            sample_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SampleInterval));

        let config = Config {
            echo_timeout_us: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EchoTimeout));

        let config = Config {
            report_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ReportInterval));
    }

    #[test]
    fn missing_default_reading_is_valid() {
        let config = Config {
            default_distance_mm: None,
            ..Config::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn speed_of_sound_at_0() {
        assert!(fabsf(speed_of_sound_mm_per_us(0.0) - 0.3315) < 1e-6);
    }

    #[test]
    fn speed_of_sound_at_20() {
        assert_eq!(roundf(speed_of_sound_mm_per_us(20.0) * 1000.0), 343.0);
    }

    #[test]
    fn air_temperature_replaces_sound_speed() {
        let config = Config::default().with_air_temperature(40.0);
        assert_eq!(roundf(config.sound_speed_mm_per_us * 1000.0), 355.0);
    }
}
