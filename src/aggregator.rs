//! Batch collection state machine.
//!
//! A [`BatchAggregator`] asks its [`Ranging`] source for one sample per due tick, seals the
//! batch once it holds `batch_size` samples and evaluates it on the spot. An accepted batch
//! replaces the [`PublishedReading`] with its mean; a rejected one leaves it untouched. Either
//! way the next batch starts immediately, so the machine never stops once started.

use crate::batch::{AggregateResult, Batch};
use crate::config::Config;
use crate::error::ConfigError;
use crate::level::FillLevel;
use crate::sampler::{Ranging, Sample};

/// Where the aggregator is in its batch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum State {
    /// Constructed, no batch started yet.
    Idle,
    /// A batch is filling up.
    Collecting,
    /// Full batch awaiting evaluation. Never observable between calls.
    Sealed,
}

/// Whether a sealed batch had enough valid samples to be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// The last trusted mean distance. Persists across rejected batches.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct PublishedReading(Option<f32>);

impl PublishedReading {
    pub fn distance_mm(&self) -> Option<f32> {
        self.0
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }
}

/// What happened to a sealed batch.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct Evaluation {
    pub result: AggregateResult,
    pub verdict: Verdict,
    /// The published reading after the verdict was applied.
    pub published: PublishedReading,
}

/// Result of one [`BatchAggregator::tick`].
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum TickOutcome {
    /// Idle, or the sample interval has not elapsed yet.
    NotDue,
    /// A sample was taken and the batch still has room.
    Sampled(Sample),
    /// The sample completed the batch, which was evaluated and replaced by a new one.
    Evaluated(Sample, Evaluation),
}

/// Collects samples from `S` into batches and keeps the last trusted reading.
pub struct BatchAggregator<S> {
    sampler: S,
    config: Config,
    required_valid: usize,
    state: State,
    batch: Batch,
    errors: usize,
    batch_started_ms: u64,
    last_sample_ms: u64,
    published: PublishedReading,
    evaluated_batches: u32,
}

impl<S: Ranging> BatchAggregator<S> {
    /// Validate `config` and build an idle aggregator seeded with the default reading.
    pub fn new(sampler: S, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sampler,
            required_valid: config.required_valid_samples(),
            state: State::Idle,
            batch: Batch::new(config.batch_size),
            errors: 0,
            batch_started_ms: 0,
            last_sample_ms: 0,
            published: PublishedReading(config.default_distance_mm),
            evaluated_batches: 0,
            config,
        })
    }

    /// Begin a new batch at `now_ms`, dropping whatever the current one holds.
    ///
    /// The first sample is due one interval after this call.
    pub fn start_batch(&mut self, now_ms: u64) {
        if self.state == State::Collecting && !self.batch.is_empty() {
            defmt::debug!(
                "batch restarted at {} ms, discarding {}/{} samples",
                now_ms,
                self.batch.len(),
                self.batch.capacity()
            );
        }
        self.batch.clear();
        self.errors = 0;
        self.batch_started_ms = now_ms;
        self.last_sample_ms = now_ms;
        self.state = State::Collecting;
    }

    /// Take one sample if it is due, and evaluate the batch if that sample filled it.
    pub async fn tick(&mut self, now_ms: u64) -> TickOutcome {
        match self.state {
            State::Collecting => (),
            // evaluate() always leaves the machine collecting
            State::Idle | State::Sealed => return TickOutcome::NotDue,
        }

        if now_ms.saturating_sub(self.last_sample_ms) < self.config.sample_interval_ms {
            return TickOutcome::NotDue;
        }
        self.last_sample_ms = now_ms;

        let sample = self.sampler.measure().await;
        let index = self.batch.len();
        match sample {
            Sample::Valid(mm) => defmt::trace!("sample {}: {} mm", index, mm),
            Sample::Invalid(fault) => {
                self.errors += 1;
                defmt::trace!("sample {}: {}", index, fault);
            }
        }

        if self.batch.push(sample).is_ok() && !self.batch.is_sealed() {
            return TickOutcome::Sampled(sample);
        }

        self.state = State::Sealed;
        TickOutcome::Evaluated(sample, self.evaluate(now_ms))
    }

    /// Summarize the sealed batch, apply the acceptance policy and start over.
    fn evaluate(&mut self, now_ms: u64) -> Evaluation {
        let result = self.batch.summarize();
        let size = self.batch.capacity();

        let verdict = match result.spread {
            Some(spread) if result.valid >= self.required_valid => {
                self.published = PublishedReading(Some(spread.mean_mm));
                defmt::info!(
                    "OK: {}/{} | range {}-{} mm | avg {} mm",
                    result.valid,
                    size,
                    spread.min_mm,
                    spread.max_mm,
                    spread.mean_mm
                );
                Verdict::Accepted
            }
            _ => {
                defmt::warn!(
                    "FAIL: only {}/{} valid, need {}",
                    result.valid,
                    size,
                    self.required_valid
                );
                Verdict::Rejected
            }
        };

        self.evaluated_batches = self.evaluated_batches.wrapping_add(1);
        let evaluation = Evaluation {
            result,
            verdict,
            published: self.published,
        };
        self.start_batch(now_ms);
        evaluation
    }

    /// Fill level for the published reading, `None` while there has never been one.
    pub fn current_level(&self) -> Option<FillLevel> {
        self.published
            .distance_mm()
            .map(|mm| FillLevel::from_distance(mm, &self.config))
    }

    pub fn published(&self) -> PublishedReading {
        self.published
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Invalid samples in the current batch.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn batch_started_ms(&self) -> u64 {
        self.batch_started_ms
    }

    /// Batches evaluated since construction, accepted or not.
    pub fn evaluated_batches(&self) -> u32 {
        self.evaluated_batches
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }
}
