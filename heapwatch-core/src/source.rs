use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MetricReadError;
use crate::sample::Sample;

/// A connected management endpoint that can be polled for metrics.
///
/// `read` aggregates heap usage, class-loading counters and per-pool usage
/// into one [`Sample`] stamped with `at`. It either returns a complete sample
/// or fails as a whole.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn read(&self, at: DateTime<Utc>) -> Result<Sample, MetricReadError>;
}
