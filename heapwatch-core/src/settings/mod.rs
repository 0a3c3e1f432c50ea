pub mod endpoint;
pub mod output;
pub mod sampler;
pub mod scheduler_interval;
