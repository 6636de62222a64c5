//! One pulse-echo ranging cycle on an HC-SR04 style sensor.
//!
//! The sampler triggers the sensor, times the echo pulse and turns the round trip into a
//! distance. Anything that does not look like a real reflection from the liquid surface
//! comes back as [`Sample::Invalid`]; a failed probe is expected and frequent, so it is data
//! rather than an error.
//!
//! ```rust, ignore
//! let trigger = Output::new(p.PIN_13, Level::Low);
//! let echo = Input::new(p.PIN_28, Pull::None);
//!
//! struct EmbassyClock;
//!
//! impl Now for EmbassyClock {
//!     fn now_micros(&self) -> u64 {
//!         Instant::now().as_micros()
//!     }
//! }
//!
//! let mut sampler = RangeSampler::new(trigger, echo, &Config::default(), EmbassyClock, Delay);
//! match sampler.measure().await {
//!     Sample::Valid(mm) => info!("{} mm", mm),
//!     Sample::Invalid(fault) => info!("no reading: {:?}", fault),
//! }
//! ```

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use embedded_hal_async::{delay::DelayNs as DelayNsAsync, digital::Wait};
use futures::{select_biased, FutureExt};

use crate::config::Config;

/// Why a probe produced no usable distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SampleFault {
    /// No echo edge arrived within the echo timeout.
    NoEcho,
    /// The echo converted to a distance outside the plausible window.
    OutOfRange,
    /// The echo line was already high before triggering, or a pin reported an error.
    Line,
}

/// A single distance measurement in millimeters, or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum Sample {
    Valid(f32),
    Invalid(SampleFault),
}

impl Sample {
    /// Classify a round trip time the way the timing channel reports it: zero means no echo.
    pub fn from_echo(elapsed_us: u32, config: &Config) -> Self {
        if elapsed_us == 0 {
            return Sample::Invalid(SampleFault::NoEcho);
        }
        let distance = echo_distance_mm(elapsed_us, config.sound_speed_mm_per_us);
        if is_plausible(distance, config) {
            Sample::Valid(distance)
        } else {
            Sample::Invalid(SampleFault::OutOfRange)
        }
    }

    pub fn distance_mm(&self) -> Option<f32> {
        match *self {
            Sample::Valid(mm) => Some(mm),
            Sample::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Sample::Valid(_))
    }
}

/// Distance for a round trip of `elapsed_us`. The pulse travels there and back, so the time is halved.
pub fn echo_distance_mm(elapsed_us: u32, sound_speed_mm_per_us: f32) -> f32 {
    (elapsed_us as f32 / 2.0) * sound_speed_mm_per_us
}

/// Whether `distance_mm` lies inside the configured window, bounds included.
pub fn is_plausible(distance_mm: f32, config: &Config) -> bool {
    distance_mm >= config.valid_distance_min_mm && distance_mm <= config.valid_distance_max_mm
}

pub trait Now {
    // The time elapsed since startup in microseconds
    fn now_micros(&self) -> u64;
}

/// Anything that can produce one [`Sample`] per call.
///
/// [`RangeSampler`] is the hardware implementation; the aggregator only sees this trait.
#[allow(async_fn_in_trait)]
pub trait Ranging {
    async fn measure(&mut self) -> Sample;
}

/// Pulse-echo sampler driving a trigger output and timing an echo input.
///
/// # Note
///
/// A probe waits at most [`Config::echo_timeout_us`] for the whole echo, both edges together.
/// That wait is the only place the poll loop blocks.
pub struct RangeSampler<TRIGPIN, ECHOPIN, CLOCK, DELAY> {
    trigger: TRIGPIN,
    echo: ECHOPIN,
    config: Config,
    clock: CLOCK,
    delay: DELAY,
}

impl<TRIGPIN, ECHOPIN, CLOCK, DELAY> RangeSampler<TRIGPIN, ECHOPIN, CLOCK, DELAY>
where
    TRIGPIN: OutputPin,
    ECHOPIN: InputPin + Wait,
    CLOCK: Now,
    DELAY: DelayNs + DelayNsAsync,
{
    /// Initialize a new sampler.
    /// Requires trigger pin and an echo pin, measurements are taken on the echo pin.
    /// Sound speed, echo timeout and the plausible window are taken from `config`.
    /// Requires a clock that will provide the time in microseconds via the `Now` trait.
    /// Requires a delay that implements DelayNs, sync and async.
    pub fn new(trigger: TRIGPIN, echo: ECHOPIN, config: &Config, clock: CLOCK, delay: DELAY) -> Self {
        Self {
            trigger,
            echo,
            config: *config,
            clock,
            delay,
        }
    }

    /// Run one ranging cycle.
    pub async fn measure(&mut self) -> Sample {
        match self.probe().await {
            Ok(elapsed_us) => Sample::from_echo(elapsed_us, &self.config),
            Err(fault) => Sample::Invalid(fault),
        }
    }

    async fn probe(&mut self) -> Result<u32, SampleFault> {
        self.trigger_pulse().await?;
        self.wait_echo_micros().await
    }

    async fn trigger_pulse(&mut self) -> Result<(), SampleFault> {
        // a high echo line means the previous echo is still ringing
        match self.echo.is_high() {
            Ok(false) => (),
            Ok(true) | Err(_) => return Err(SampleFault::Line),
        }

        self.trigger.set_low().map_err(|_| SampleFault::Line)?;
        DelayNs::delay_us(&mut self.delay, 2);

        self.trigger.set_high().map_err(|_| SampleFault::Line)?;

        // Either block for or wait for 10us, depending on active feature flag
        #[cfg(feature = "blocking_trigger")]
        DelayNs::delay_us(&mut self.delay, 10);
        #[cfg(not(feature = "blocking_trigger"))]
        DelayNsAsync::delay_us(&mut self.delay, 10).await;

        self.trigger.set_low().map_err(|_| SampleFault::Line)
    }

    /// Width of the echo pulse in microseconds, or 0 if the echo did not complete in time.
    ///
    /// `echo_timeout_us` is one budget for both edges, counted from before the rising edge.
    async fn wait_echo_micros(&mut self) -> Result<u32, SampleFault> {
        let timeout_us = self.config.echo_timeout_us;
        let armed = Now::now_micros(&self.clock);

        let start = select_biased! {
            res = self.echo.wait_for_high().fuse() => match res {
                Ok(()) => Now::now_micros(&self.clock),
                Err(_) => return Err(SampleFault::Line),
            },
            _ = DelayNsAsync::delay_us(&mut self.delay, timeout_us).fuse() => {
                return Ok(0);
            }
        };

        let spent = start.saturating_sub(armed);
        let remaining_us = match u64::from(timeout_us).checked_sub(spent) {
            Some(0) | None => return Ok(0),
            // bounded by timeout_us, fits
            Some(left) => left as u32,
        };

        let end = select_biased! {
            res = self.echo.wait_for_low().fuse() => match res {
                Ok(()) => Now::now_micros(&self.clock),
                Err(_) => return Err(SampleFault::Line),
            },
            _ = DelayNsAsync::delay_us(&mut self.delay, remaining_us).fuse() => {
                return Ok(0);
            }
        };

        Ok(u32::try_from(end.saturating_sub(start)).unwrap_or(u32::MAX))
    }
}

impl<TRIGPIN, ECHOPIN, CLOCK, DELAY> Ranging for RangeSampler<TRIGPIN, ECHOPIN, CLOCK, DELAY>
where
    TRIGPIN: OutputPin,
    ECHOPIN: InputPin + Wait,
    CLOCK: Now,
    DELAY: DelayNs + DelayNsAsync,
{
    async fn measure(&mut self) -> Sample {
        RangeSampler::measure(self).await
    }
}
