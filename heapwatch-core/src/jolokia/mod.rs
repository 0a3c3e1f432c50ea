//! Transport for JVMs exposing JMX through a Jolokia agent.

pub mod client;
pub mod protocol;
pub mod snapshot;
pub mod source;

pub use client::JolokiaClient;
pub use snapshot::JolokiaSnapshotSink;
pub use source::JolokiaMetricSource;
