use std::path::PathBuf;

use heapwatch_core::{MetricReadError, SnapshotError, WriteError};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// A failure scoped to one tick. The loop keeps running after any of these.
#[derive(Debug, thiserror::Error)]
pub enum TickFailure {
    #[error("Reading metrics failed: {0}")]
    Read(#[source] MetricReadError),

    #[error("Writing sample failed: {0}")]
    Write(#[source] WriteError),

    #[error("Capturing heap dump at {path} failed: {error}")]
    Snapshot {
        path: PathBuf,
        #[source]
        error: SnapshotError,
    },
}

impl TickFailure {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Write(_) => "write",
            Self::Snapshot { .. } => "snapshot",
        }
    }
}

/// Receives tick-scoped failures from the sampling loop.
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: TickFailure);
}

/// Reports failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, failure: TickFailure) {
        match &failure {
            TickFailure::Snapshot { path, error } if error.dump_written() => {
                warn!(
                    operation = failure.operation(),
                    path = %path.display(),
                    "{}",
                    failure
                );
            }
            TickFailure::Snapshot { path, .. } => {
                error!(
                    operation = failure.operation(),
                    path = %path.display(),
                    "{}",
                    failure
                );
            }
            _ => error!(operation = failure.operation(), "{}", failure),
        }
    }
}

/// Forwards failures to a channel, for callers that want to react to them.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<TickFailure>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TickFailure>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl FailureReporter for ChannelReporter {
    fn report(&self, failure: TickFailure) {
        if let Err(mpsc::error::SendError(failure)) = self.sender.send(failure) {
            // Receiver is gone; do not lose the failure entirely.
            LogReporter.report(failure);
        }
    }
}
