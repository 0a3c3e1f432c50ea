use std::path::Path;

use async_trait::async_trait;

use crate::error::{SnapshotError, WriteError};
use crate::sample::Sample;

/// Asks the managed process to write a full heap snapshot to `path`.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn capture(&self, path: &Path) -> Result<(), SnapshotError>;
}

/// Append-only destination of the sampled time series.
///
/// Every successful `append` is flushed before it returns. `close` must be
/// safe to call on a sink that was never opened or is already closed.
#[async_trait]
pub trait RecordSink: Send {
    async fn open(&mut self) -> Result<(), WriteError>;

    async fn append(&mut self, sample: &Sample) -> Result<(), WriteError>;

    async fn close(&mut self);

    /// Human readable destination, used in log output.
    fn destination(&self) -> String;
}
