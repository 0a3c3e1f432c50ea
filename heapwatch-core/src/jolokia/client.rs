use std::time::Duration;

use serde::Deserialize;
use tracing::{info, instrument};

use super::protocol::{JolokiaRequest, JolokiaResponse};
use crate::error::ConnectionError;
use crate::http::{HttpClient, RetryConfig, RetryError};
use crate::settings::endpoint::EndpointSettings;

#[derive(Debug, Deserialize)]
struct VersionValue {
    agent: Option<String>,
    protocol: Option<String>,
}

/// Handle to a Jolokia agent attached to the managed process.
#[derive(Debug, Clone)]
pub struct JolokiaClient {
    http: HttpClient,
    base_url: String,
    snapshot_timeout: Duration,
    agent_version: String,
}

impl JolokiaClient {
    /// Validates `endpoint` and performs the version handshake.
    #[instrument(skip(settings))]
    pub async fn connect(
        endpoint: &str,
        settings: &EndpointSettings,
    ) -> Result<Self, ConnectionError> {
        let base_url = normalize_endpoint(endpoint)?;

        let mut builder = HttpClient::builder()
            .with_timeout(settings.request_timeout.into())
            .with_retry_config(RetryConfig {
                max_retries: settings.max_retries,
                ..RetryConfig::default()
            });
        if let Some(username) = &settings.username {
            builder = builder.with_basic_auth(username.clone(), settings.password.clone());
        }
        let http = builder.build().map_err(ConnectionError::Client)?;

        let version: JolokiaResponse = http
            .get_json(&format!("{base_url}/version"))
            .await
            .map_err(|source| ConnectionError::Unreachable {
                endpoint: base_url.clone(),
                source,
            })?;

        if !version.is_success() {
            return Err(ConnectionError::Handshake {
                endpoint: base_url,
                reason: format!(
                    "version request answered with status {}: {}",
                    version.status,
                    version.error_message()
                ),
            });
        }

        let value: VersionValue = version
            .value
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ConnectionError::Handshake {
                endpoint: base_url.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ConnectionError::Handshake {
                endpoint: base_url.clone(),
                reason: "version response carries no value".to_string(),
            })?;

        let agent_version = value.agent.ok_or_else(|| ConnectionError::Handshake {
            endpoint: base_url.clone(),
            reason: "version response does not name an agent".to_string(),
        })?;

        info!(
            endpoint = %base_url,
            agent = %agent_version,
            protocol = value.protocol.as_deref().unwrap_or("unknown"),
            "Connected to management endpoint"
        );

        Ok(Self {
            http,
            base_url,
            snapshot_timeout: settings.snapshot_timeout.into(),
            agent_version,
        })
    }

    /// Sends several requests in one round trip. The answer has one entry
    /// per request, in request order.
    pub async fn bulk(
        &self,
        requests: &[JolokiaRequest],
    ) -> Result<Vec<JolokiaResponse>, RetryError> {
        self.http
            .post_json(&format!("{}/", self.base_url), &requests)
            .await
    }

    /// Executes a single (possibly long running) operation. Never retried:
    /// a timed out operation may still be running inside the JVM.
    pub async fn exec(&self, request: &JolokiaRequest) -> Result<JolokiaResponse, RetryError> {
        self.http
            .post_json_once(
                &format!("{}/", self.base_url),
                request,
                self.snapshot_timeout,
            )
            .await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn agent_version(&self) -> &str {
        &self.agent_version
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<String, ConnectionError> {
    let url = url::Url::parse(endpoint.trim()).map_err(|e| ConnectionError::InvalidAddress {
        address: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConnectionError::InvalidAddress {
                address: endpoint.to_string(),
                reason: format!("unsupported scheme '{other}', expected http or https"),
            })
        }
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
