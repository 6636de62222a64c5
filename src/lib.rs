//! # water_level
//!
//! Fill level estimation for a container watched by an HC-SR04 style ultrasonic sensor
//! mounted above it.
//!
//! Single probes are noisy and often fail, so the crate never trusts one on its own:
//!
//! - [`RangeSampler`] runs one pulse-echo cycle and returns a [`Sample`], either a plausible
//!   distance or an invalid marker.
//! - [`BatchAggregator`] collects a fixed number of samples on a fixed cadence, then publishes
//!   their mean only if enough of them were valid. Otherwise the previous reading stays.
//! - [`FillLevel`] maps the published distance onto 0..=100 %.
//! - [`LevelMonitor`] reports that level periodically and restarts the batch each time.
//!
//! Everything runs from one cooperative loop. The only blocking step is the bounded wait for
//! the echo.
//!
//! ## Features
//!
//! - `blocking_trigger`: (Default) Block for the 10us trigger pulse instead of awaiting it.
//!   An async delay that short picks up a few microseconds of scheduling overhead.
//!
//! # Example
//!
//! ```rust, ignore
//! let config = Config::default().with_air_temperature(21.5);
//! let sampler = RangeSampler::new(trigger, echo, &config, EmbassyClock, Delay);
//! let aggregator = unwrap!(BatchAggregator::new(sampler, config));
//! let mut monitor = LevelMonitor::new(aggregator, Instant::now().as_millis());
//!
//! loop {
//!     if let Some(report) = monitor.poll(Instant::now().as_millis()).await {
//!         info!(">>> Water Level: {}% <<<", report.level.map(FillLevel::percent));
//!     }
//!     Timer::after_millis(10).await;
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod aggregator;
pub mod batch;
pub mod config;
pub mod error;
pub mod level;
pub mod monitor;
pub mod sampler;

pub use aggregator::{BatchAggregator, Evaluation, PublishedReading, State, TickOutcome, Verdict};
pub use batch::{AggregateResult, Batch, Spread};
pub use config::{speed_of_sound_mm_per_us, Config, MAX_BATCH_SIZE};
pub use error::ConfigError;
pub use level::FillLevel;
pub use monitor::{LevelMonitor, LevelReport};
pub use sampler::{Now, RangeSampler, Ranging, Sample, SampleFault};
