//! heapwatch library
//!
//! Configuration, logging, shutdown handling and the sampling scheduler
//! shared by the `heapwatch` and `heapdump` binaries.

pub mod init_telemetry;
pub mod scheduler;
pub mod settings;
pub mod stop_flag;
