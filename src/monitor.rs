//! Periodic level report on top of the aggregator.
//!
//! Every `report_interval_ms` the monitor reports the current level and forces a fresh batch.
//! That timer runs independently of batch completion, so a batch in flight when the report
//! fires is discarded.

use crate::aggregator::{BatchAggregator, PublishedReading};
use crate::level::FillLevel;
use crate::sampler::Ranging;

#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct LevelReport {
    pub at_ms: u64,
    /// `None` only when no reading was ever published.
    pub level: Option<FillLevel>,
    pub published: PublishedReading,
}

pub struct LevelMonitor<S> {
    aggregator: BatchAggregator<S>,
    last_report_ms: u64,
}

impl<S: Ranging> LevelMonitor<S> {
    /// Take over `aggregator` and start its first batch at `now_ms`.
    ///
    /// The report clock starts at zero, like the boot clock, so the first report comes
    /// `report_interval_ms` after boot rather than after this call.
    pub fn new(mut aggregator: BatchAggregator<S>, now_ms: u64) -> Self {
        aggregator.start_batch(now_ms);
        Self {
            aggregator,
            last_report_ms: 0,
        }
    }

    /// Advance the aggregator and, when a report is due, produce it and restart the batch.
    pub async fn poll(&mut self, now_ms: u64) -> Option<LevelReport> {
        self.aggregator.tick(now_ms).await;

        let interval = self.aggregator.config().report_interval_ms;
        if now_ms.saturating_sub(self.last_report_ms) < interval {
            return None;
        }
        self.last_report_ms = now_ms;

        let report = LevelReport {
            at_ms: now_ms,
            level: self.aggregator.current_level(),
            published: self.aggregator.published(),
        };
        self.aggregator.start_batch(now_ms);
        Some(report)
    }

    pub fn aggregator(&self) -> &BatchAggregator<S> {
        &self.aggregator
    }
}
