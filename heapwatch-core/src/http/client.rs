use super::error::HttpError;
use super::retry::{with_retry, RetryConfig, RetryError};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct BasicAuth {
    username: String,
    password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    default_timeout: Duration,
    retry_config: RetryConfig,
    basic_auth: Option<BasicAuth>,
}

pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    retry_config: Option<RetryConfig>,
    basic_auth: Option<BasicAuth>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            timeout: None,
            retry_config: None,
            basic_auth: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = Some(retry_config);
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }

    pub fn build(self) -> anyhow::Result<HttpClient> {
        let client = reqwest::Client::builder().build()?;

        Ok(HttpClient {
            client,
            default_timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
            retry_config: self.retry_config.unwrap_or_default(),
            basic_auth: self.basic_auth,
        })
    }
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    pub fn new() -> anyhow::Result<Self> {
        Self::builder().build()
    }

    /// Best effort message for a non-success answer. Jolokia puts a human
    /// readable message into `error`.
    async fn extract_error_message(response: Response) -> String {
        let status = response.status();
        let fallback = || {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        };

        let Ok(body) = response.text().await else {
            return fallback();
        };
        let from_json = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .or_else(|| json.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            });

        match from_json {
            Some(message) => message,
            None if !body.trim().is_empty() && body.len() < 500 => body.trim().to_string(),
            None => fallback(),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.basic_auth {
            Some(auth) => request.basic_auth(&auth.username, auth.password.as_ref()),
            None => request,
        }
    }

    async fn read_json<R>(response: Response) -> Result<R, HttpError>
    where
        R: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if !status.is_success() {
            let error_msg = Self::extract_error_message(response).await;
            return Err(HttpError::status(status.as_u16(), error_msg));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))
    }

    pub async fn get_json<T>(&self, url: &str) -> Result<T, RetryError>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!("GET request to {}", url);
        with_retry(
            || async {
                let response = self
                    .authorize(self.client.get(url))
                    .timeout(self.default_timeout)
                    .send()
                    .await?;
                Self::read_json(response).await
            },
            &self.retry_config,
        )
        .await
    }

    /// POSTs `body` as JSON and decodes the JSON answer, retrying per the
    /// client's [`RetryConfig`].
    pub async fn post_json<T, R>(&self, url: &str, body: &T) -> Result<R, RetryError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        self.send_post(url, body, self.default_timeout, &self.retry_config)
            .await
    }

    /// Sends `body` exactly once with an explicit timeout. Meant for
    /// operations with side effects on the endpoint, which must not be
    /// repeated when an attempt times out.
    pub async fn post_json_once<T, R>(
        &self,
        url: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<R, RetryError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        self.send_post(url, body, timeout, &RetryConfig::none())
            .await
    }

    async fn send_post<T, R>(
        &self,
        url: &str,
        body: &T,
        timeout: Duration,
        retry_config: &RetryConfig,
    ) -> Result<R, RetryError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        debug!("POST request to {}", url);
        with_retry(
            || async {
                let response = self
                    .authorize(self.client.post(url))
                    .timeout(timeout)
                    .json(body)
                    .send()
                    .await?;
                Self::read_json(response).await
            },
            retry_config,
        )
        .await
    }
}
