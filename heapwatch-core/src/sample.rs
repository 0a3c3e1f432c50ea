//! One poll's worth of memory and class-loading readings.
//!
//! All values are validated on construction, so a [`Sample`] that exists is
//! complete: every pool carries all four byte-counts and the heap usage obeys
//! `used <= committed <= max` whenever `max` is defined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MetricReadError;

/// Byte-counts of a memory area as reported by the managed process.
///
/// `init` and `max` are optional because the JVM reports `-1` when they are
/// undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    init: Option<u64>,
    used: u64,
    committed: u64,
    max: Option<u64>,
}

impl MemoryUsage {
    pub fn new(
        init: Option<u64>,
        used: u64,
        committed: u64,
        max: Option<u64>,
    ) -> Result<Self, String> {
        if used > committed {
            return Err(format!("used ({used}) exceeds committed ({committed})"));
        }
        if let Some(max) = max {
            if committed > max {
                return Err(format!("committed ({committed}) exceeds max ({max})"));
            }
        }
        Ok(Self {
            init,
            used,
            committed,
            max,
        })
    }

    /// Builds a usage from raw JMX values where any negative value means
    /// "undefined". Only `init` and `max` may be undefined.
    pub fn from_jmx(init: i64, used: i64, committed: i64, max: i64) -> Result<Self, String> {
        let defined = |value: i64| u64::try_from(value).ok();
        let used = defined(used).ok_or_else(|| format!("negative used value {used}"))?;
        let committed =
            defined(committed).ok_or_else(|| format!("negative committed value {committed}"))?;
        Self::new(defined(init), used, committed, defined(max))
    }

    pub fn init(&self) -> Option<u64> {
        self.init
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn max(&self) -> Option<u64> {
        self.max
    }
}

/// Usage of a single named memory pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolUsage {
    pub name: String,
    pub usage: MemoryUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLoading {
    pub loaded: u64,
    pub total_loaded: u64,
    pub unloaded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    heap: MemoryUsage,
    classes: ClassLoading,
    pools: Vec<PoolUsage>,
}

impl Sample {
    pub fn new(
        timestamp: DateTime<Utc>,
        heap: MemoryUsage,
        classes: ClassLoading,
        pools: Vec<PoolUsage>,
    ) -> Result<Self, MetricReadError> {
        if classes.unloaded > classes.total_loaded {
            return Err(MetricReadError::Inconsistent {
                metric: "ClassLoading".to_string(),
                reason: format!(
                    "unloaded class count {} exceeds total loaded class count {}",
                    classes.unloaded, classes.total_loaded
                ),
            });
        }
        if let Some(pool) = pools.iter().find(|pool| pool.name.is_empty()) {
            return Err(MetricReadError::Inconsistent {
                metric: "MemoryPool".to_string(),
                reason: format!("pool without a name: {pool:?}"),
            });
        }

        Ok(Self {
            timestamp,
            heap,
            classes,
            pools,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn heap(&self) -> &MemoryUsage {
        &self.heap
    }

    pub fn classes(&self) -> &ClassLoading {
        &self.classes
    }

    pub fn pools(&self) -> &[PoolUsage] {
        &self.pools
    }
}
