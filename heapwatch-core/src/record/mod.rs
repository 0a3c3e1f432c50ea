//! Row layout of the sampled time series and its CSV destination.

pub mod csv;

use chrono::Local;

use crate::sample::{MemoryUsage, Sample};
use crate::utils::format::{format_gigabytes, UNDEFINED};

pub use self::csv::CsvRecordSink;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const HEADER: [&str; 9] = [
    "Timestamp",
    "Heap Init (GB)",
    "Heap Used (GB)",
    "Heap Committed (GB)",
    "Heap Max (GB)",
    "Loaded Class Count",
    "Total Loaded Class Count",
    "Unloaded Class Count",
    "Memory Pools",
];

/// Renders a sample as the unescaped fields of one row, in header order.
pub fn row_fields(sample: &Sample) -> Vec<String> {
    let heap = sample.heap();
    let classes = sample.classes();

    vec![
        sample
            .timestamp()
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        format_gigabytes(heap.init()),
        format_gigabytes(Some(heap.used())),
        format_gigabytes(Some(heap.committed())),
        format_gigabytes(heap.max()),
        classes.loaded.to_string(),
        classes.total_loaded.to_string(),
        classes.unloaded.to_string(),
        pools_field(sample),
    ]
}

/// `name:init=Xgb,used=Ygb,committed=Zgb,max=Wgb;` per pool, no separator.
pub fn pools_field(sample: &Sample) -> String {
    sample
        .pools()
        .iter()
        .map(|pool| format!("{}:{};", pool.name, usage_summary(&pool.usage)))
        .collect()
}

fn usage_summary(usage: &MemoryUsage) -> String {
    format!(
        "init={},used={},committed={},max={}",
        with_unit(usage.init()),
        with_unit(Some(usage.used())),
        with_unit(Some(usage.committed())),
        with_unit(usage.max()),
    )
}

fn with_unit(bytes: Option<u64>) -> String {
    match bytes {
        Some(_) => format!("{}gb", format_gigabytes(bytes)),
        None => UNDEFINED.to_string(),
    }
}
