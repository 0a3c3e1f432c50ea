//! Wire types of the Jolokia JMX-over-HTTP protocol, limited to the requests
//! heapwatch issues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MetricReadError;
use crate::sample::{ClassLoading, MemoryUsage, PoolUsage};

pub const MEMORY_MBEAN: &str = "java.lang:type=Memory";
pub const CLASS_LOADING_MBEAN: &str = "java.lang:type=ClassLoading";
pub const MEMORY_POOL_PATTERN: &str = "java.lang:type=MemoryPool,name=*";
pub const HOTSPOT_DIAGNOSTIC_MBEAN: &str = "com.sun.management:type=HotSpotDiagnostic";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JolokiaRequest {
    Read {
        mbean: String,
        attribute: Value,
    },
    Exec {
        mbean: String,
        operation: String,
        arguments: Vec<Value>,
    },
}

impl JolokiaRequest {
    pub fn read(mbean: &str, attributes: &[&str]) -> Self {
        let attribute = match attributes {
            [single] => Value::from(*single),
            many => Value::from(many.to_vec()),
        };
        Self::Read {
            mbean: mbean.to_string(),
            attribute,
        }
    }

    pub fn exec(mbean: &str, operation: &str, arguments: Vec<Value>) -> Self {
        Self::Exec {
            mbean: mbean.to_string(),
            operation: operation.to_string(),
            arguments,
        }
    }

    pub fn mbean(&self) -> &str {
        match self {
            Self::Read { mbean, .. } | Self::Exec { mbean, .. } => mbean,
        }
    }
}

/// One entry of a (bulk) Jolokia response.
#[derive(Debug, Clone, Deserialize)]
pub struct JolokiaResponse {
    pub status: u16,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

impl JolokiaResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn error_message(&self) -> String {
        match (&self.error_type, &self.error) {
            (_, Some(error)) => error.clone(),
            (Some(error_type), None) => error_type.clone(),
            (None, None) => "no error message".to_string(),
        }
    }

    /// Returns the value of a successful entry, or the remote error naming
    /// `metric`.
    pub fn into_value(self, metric: &str) -> Result<Value, MetricReadError> {
        if !self.is_success() {
            return Err(MetricReadError::Remote {
                metric: metric.to_string(),
                status: self.status,
                message: self.error_message(),
            });
        }
        self.value.ok_or_else(|| MetricReadError::Malformed {
            metric: metric.to_string(),
            reason: "response carries no value".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawUsage {
    init: i64,
    used: i64,
    committed: i64,
    max: i64,
}

impl RawUsage {
    fn into_usage(self, metric: &str) -> Result<MemoryUsage, MetricReadError> {
        MemoryUsage::from_jmx(self.init, self.used, self.committed, self.max).map_err(|reason| {
            MetricReadError::Inconsistent {
                metric: metric.to_string(),
                reason,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawClassLoading {
    loaded_class_count: i64,
    total_loaded_class_count: i64,
    unloaded_class_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPool {
    name: String,
    usage: Option<RawUsage>,
}

fn decode<T>(value: Value, metric: &str) -> Result<T, MetricReadError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|e| MetricReadError::Malformed {
        metric: metric.to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_heap_usage(value: Value) -> Result<MemoryUsage, MetricReadError> {
    let metric = format!("{MEMORY_MBEAN}/HeapMemoryUsage");
    decode::<RawUsage>(value, &metric)?.into_usage(&metric)
}

pub fn parse_class_loading(value: Value) -> Result<ClassLoading, MetricReadError> {
    let raw: RawClassLoading = decode(value, CLASS_LOADING_MBEAN)?;
    let count = |value: i64, attribute: &str| {
        u64::try_from(value).map_err(|_| MetricReadError::Inconsistent {
            metric: format!("{CLASS_LOADING_MBEAN}/{attribute}"),
            reason: format!("negative count {value}"),
        })
    };

    Ok(ClassLoading {
        loaded: count(raw.loaded_class_count, "LoadedClassCount")?,
        total_loaded: count(raw.total_loaded_class_count, "TotalLoadedClassCount")?,
        unloaded: count(raw.unloaded_class_count, "UnloadedClassCount")?,
    })
}

/// Parses the answer of a wildcard pool read, keyed by MBean name.
///
/// Pools without usage (invalid pools) are skipped; the result is ordered by
/// pool name.
pub fn parse_pools(value: Value) -> Result<Vec<PoolUsage>, MetricReadError> {
    let raw: BTreeMap<String, RawPool> = decode(value, MEMORY_POOL_PATTERN)?;

    let mut pools = Vec::with_capacity(raw.len());
    for (mbean, pool) in raw {
        let Some(usage) = pool.usage else {
            continue;
        };
        pools.push(PoolUsage {
            usage: usage.into_usage(&mbean)?,
            name: pool.name,
        });
    }
    pools.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pools)
}
