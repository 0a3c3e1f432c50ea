use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::client::JolokiaClient;
use super::protocol::{
    parse_class_loading, parse_heap_usage, parse_pools, JolokiaRequest, CLASS_LOADING_MBEAN,
    MEMORY_MBEAN, MEMORY_POOL_PATTERN,
};
use crate::error::MetricReadError;
use crate::sample::Sample;
use crate::source::MetricSource;

/// Polls heap, class-loading and pool usage with a single bulk request, so
/// every reading in a [`Sample`] comes from the same round trip.
#[derive(Debug, Clone)]
pub struct JolokiaMetricSource {
    client: JolokiaClient,
    requests: Vec<JolokiaRequest>,
}

impl JolokiaMetricSource {
    pub fn new(client: JolokiaClient) -> Self {
        let requests = vec![
            JolokiaRequest::read(MEMORY_MBEAN, &["HeapMemoryUsage"]),
            JolokiaRequest::read(
                CLASS_LOADING_MBEAN,
                &[
                    "LoadedClassCount",
                    "TotalLoadedClassCount",
                    "UnloadedClassCount",
                ],
            ),
            JolokiaRequest::read(MEMORY_POOL_PATTERN, &["Name", "Usage"]),
        ];
        Self { client, requests }
    }
}

#[async_trait]
impl MetricSource for JolokiaMetricSource {
    #[instrument(skip(self), fields(endpoint = %self.client.base_url()))]
    async fn read(&self, at: DateTime<Utc>) -> Result<Sample, MetricReadError> {
        let responses = self.client.bulk(&self.requests).await?;

        if responses.len() != self.requests.len() {
            return Err(MetricReadError::Malformed {
                metric: "bulk read".to_string(),
                reason: format!(
                    "expected {} responses, got {}",
                    self.requests.len(),
                    responses.len()
                ),
            });
        }

        let mut values = Vec::with_capacity(responses.len());
        for (request, response) in self.requests.iter().zip(responses) {
            values.push(response.into_value(request.mbean())?);
        }

        let mut values = values.into_iter();
        let (Some(heap), Some(classes), Some(pools)) = (values.next(), values.next(), values.next())
        else {
            return Err(MetricReadError::Malformed {
                metric: "bulk read".to_string(),
                reason: "missing response entries".to_string(),
            });
        };

        let sample = Sample::new(
            at,
            parse_heap_usage(heap)?,
            parse_class_loading(classes)?,
            parse_pools(pools)?,
        )?;
        debug!(
            heap_used = sample.heap().used(),
            pools = sample.pools().len(),
            "Read metrics"
        );
        Ok(sample)
    }
}
