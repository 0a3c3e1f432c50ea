//! Error taxonomy of the sampling engine.
//!
//! Only [`ConnectionError`] is meant to be fatal; every other error is
//! scoped to a single tick and is reported without stopping the loop.

use std::path::PathBuf;

use crate::http::RetryError;

/// The management endpoint could not be reached or did not look like one.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid endpoint address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to reach management endpoint {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: RetryError,
    },

    #[error("Management endpoint {endpoint} did not answer like an agent: {reason}")]
    Handshake { endpoint: String, reason: String },

    #[error("Failed to set up HTTP client: {0}")]
    Client(#[source] anyhow::Error),
}

/// One poll could not be aggregated into a complete sample.
#[derive(Debug, thiserror::Error)]
pub enum MetricReadError {
    #[error("Failed to query metrics: {0}")]
    Transport(#[from] RetryError),

    #[error("Endpoint rejected read of {metric} (status {status}): {message}")]
    Remote {
        metric: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response for {metric}: {reason}")]
    Malformed { metric: String, reason: String },

    #[error("Inconsistent reading for {metric}: {reason}")]
    Inconsistent { metric: String, reason: String },
}

/// Persisting a row failed.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Record sink {path} is not open")]
    NotOpen { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A heap snapshot could not be produced (or not fully prepared).
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot path {path} has no parent directory")]
    InvalidPath { path: PathBuf },

    #[error("Failed to create parent directory {dir}: {source}")]
    CreateDirectory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve heap dump directory {dir}: {source}")]
    ResolveDirectory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set write permission for directory {dir}: {source}")]
    DirectoryPermissions {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to request heap dump at {path}: {source}")]
    Request {
        path: PathBuf,
        #[source]
        source: RetryError,
    },

    #[error("Endpoint rejected heap dump at {path} (status {status}): {message}")]
    Rejected {
        path: PathBuf,
        status: u16,
        message: String,
    },

    /// The dump exists, only the final permission change failed.
    #[error("Failed to set permissions for heap dump {path}: {source}")]
    FilePermissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    /// Whether the heap dump itself was written despite this error.
    pub fn dump_written(&self) -> bool {
        matches!(self, Self::FilePermissions { .. })
    }
}
