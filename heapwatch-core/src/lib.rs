//! Shared model, sinks and the Jolokia transport used by the heapwatch binaries.

pub mod clock;
pub mod error;
pub mod http;
pub mod jolokia;
pub mod record;
pub mod sample;
pub mod settings;
pub mod sink;
pub mod source;
pub mod trigger;
pub mod utils;

pub use clock::{Clock, SystemClock};
pub use error::{ConnectionError, MetricReadError, SnapshotError, WriteError};
pub use sample::{ClassLoading, MemoryUsage, PoolUsage, Sample};
pub use sink::{RecordSink, SnapshotSink};
pub use source::MetricSource;
pub use trigger::TriggerPolicy;
