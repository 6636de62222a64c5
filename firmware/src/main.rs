//! # Water level monitor
//! Samples an HC-SR04 mounted above a glass every 200ms, publishes the batch average when
//! enough echoes came back and logs the fill level every 5s.
//!
//! ## Note
//!
//! Most of the hc-sr04 sensors are rated for 5V. The Raspberry Pi Pico is a 3.3V device.
//! The trigger pin can be connected directly, 3.3V is enough to trigger the sensor.
//! The echo pin must go through a voltage divider, the sensor drives it at 5V.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::{Delay, Instant, Timer};
use water_level::{BatchAggregator, Config, LevelMonitor, Now, RangeSampler};
use {defmt_rtt as _, panic_probe as _};

/// Poll period of the main loop, well below the sample interval.
const POLL_INTERVAL_MS: u64 = 10;

struct EmbassyClock;

impl Now for EmbassyClock {
    fn now_micros(&self) -> u64 {
        Instant::now().as_micros()
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let trigger = Output::new(p.PIN_13, Level::Low);
    let echo = Input::new(p.PIN_28, Pull::None);

    let config = Config::default();
    info!("=== Water Level Sensor ===");
    info!(
        "Samples: {} | Interval: {}ms",
        config.batch_size, config.sample_interval_ms
    );

    let sampler = RangeSampler::new(trigger, echo, &config, EmbassyClock, Delay);
    let aggregator = unwrap!(BatchAggregator::new(sampler, config));
    let mut monitor = LevelMonitor::new(aggregator, Instant::now().as_millis());

    loop {
        if let Some(report) = monitor.poll(Instant::now().as_millis()).await {
            match report.level {
                Some(level) => info!(">>> Water Level: {}% <<<", level.percent()),
                None => warn!(">>> Water Level: no reading yet <<<"),
            }
        }
        Timer::after_millis(POLL_INTERVAL_MS).await;
    }
}
