//! Fixed-capacity sample batches and their summary statistics.

use heapless::Vec;

use crate::config::MAX_BATCH_SIZE;
use crate::sampler::Sample;

/// Ordered samples of one collection cycle, sealed once `capacity` of them are in.
#[derive(Debug, Clone)]
pub struct Batch {
    samples: Vec<Sample, MAX_BATCH_SIZE>,
    capacity: usize,
}

impl Batch {
    /// An empty batch. `capacity` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::new(),
            capacity: capacity.clamp(1, MAX_BATCH_SIZE),
        }
    }

    /// Append a sample. A sealed batch refuses it and hands it back.
    pub fn push(&mut self, sample: Sample) -> Result<(), Sample> {
        if self.is_sealed() {
            return Err(sample);
        }
        self.samples.push(sample)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_sealed(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Count, range and mean over the valid samples. Non-finite distances count as invalid.
    pub fn summarize(&self) -> AggregateResult {
        let mut valid = 0usize;
        let mut sum = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        let distances = self.samples.iter().filter_map(Sample::distance_mm);
        for mm in distances.filter(|mm| mm.is_finite()) {
            valid += 1;
            sum += f64::from(mm);
            min = min.min(mm);
            max = max.max(mm);
        }

        let spread = (valid > 0).then(|| Spread {
            min_mm: min,
            max_mm: max,
            // rounding in the division must not push the mean past the extremes
            mean_mm: ((sum / valid as f64) as f32).clamp(min, max),
        });

        AggregateResult {
            valid,
            invalid: self.samples.len() - valid,
            spread,
        }
    }
}

/// Range and mean of the valid samples in a batch.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct Spread {
    pub min_mm: f32,
    pub max_mm: f32,
    pub mean_mm: f32,
}

/// Summary of a sealed batch. `spread` is `None` when no sample was valid.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct AggregateResult {
    pub valid: usize,
    pub invalid: usize,
    pub spread: Option<Spread>,
}

impl AggregateResult {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }

    pub fn mean_mm(&self) -> Option<f32> {
        self.spread.map(|s| s.mean_mm)
    }
}
