//! Fill percentage from a distance reading.

use libm::roundf;

use crate::config::Config;

/// Fill level of the container in percent, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, defmt::Format)]
pub struct FillLevel(u8);

impl FillLevel {
    pub const EMPTY: FillLevel = FillLevel(0);
    pub const FULL: FillLevel = FillLevel(100);

    /// Map a distance from the sensor face to a fill level.
    ///
    /// `round((mount height - distance) / container height * 100)`, clamped. Readings that
    /// make no physical sense (negative, beyond the bottom, not a number) clamp like any other.
    pub fn from_distance(distance_mm: f32, config: &Config) -> Self {
        let filled = (config.sensor_mount_height_mm - distance_mm) / config.container_height_mm;
        let percent = roundf(filled * 100.0);
        if percent >= 100.0 {
            Self::FULL
        } else if percent > 0.0 {
            FillLevel(percent as u8)
        } else {
            // also catches NaN
            Self::EMPTY
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn near_surface_is_full() {
        // (200 - 96) / 104 = 1.0
        assert_eq!(FillLevel::from_distance(96.0, &Config::default()), FillLevel::FULL);
    }

    #[test]
    fn distance_beyond_bottom_is_empty() {
        assert_eq!(
            FillLevel::from_distance(250.0, &Config::default()),
            FillLevel::EMPTY
        );
    }

    #[test]
    fn half_full() {
        // (200 - 148) / 104 = 0.5
        assert_eq!(
            FillLevel::from_distance(148.0, &Config::default()).percent(),
            50
        );
    }

    #[test]
    fn rounds_to_nearest_percent() {
        // (200 - 120) / 104 = 0.769...
        assert_eq!(
            FillLevel::from_distance(120.0, &Config::default()).percent(),
            77
        );
    }

    #[test]
    fn nonsense_readings_clamp() {
        let config = Config::default();
        assert_eq!(FillLevel::from_distance(-500.0, &config), FillLevel::FULL);
        assert_eq!(FillLevel::from_distance(f32::NAN, &config), FillLevel::EMPTY);
        assert_eq!(
            FillLevel::from_distance(f32::INFINITY, &config),
            FillLevel::EMPTY
        );
        assert_eq!(
            FillLevel::from_distance(f32::NEG_INFINITY, &config),
            FillLevel::FULL
        );
    }

    proptest! {
        #[test]
        fn level_is_always_a_percentage(reading in any::<f32>()) {
            let level = FillLevel::from_distance(reading, &Config::default());
            prop_assert!(level.percent() <= 100);
        }

        #[test]
        fn level_follows_linear_law(reading in 96.0f32..=200.0) {
            let config = Config::default();
            let expected = roundf((200.0 - reading) / 104.0 * 100.0) as u8;
            prop_assert_eq!(FillLevel::from_distance(reading, &config).percent(), expected);
        }
    }
}
