//! Errors of a single HTTP exchange with the management endpoint.
//!
//! # Examples
//!
//! ```
//! use heapwatch_core::http::HttpError;
//!
//! let err = HttpError::status(503, "agent restarting");
//! assert_eq!(err.status_code(), Some(503));
//! assert!(err.is_retriable());
//! ```

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Non-success answer, with the best message found in the body.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    /// The body was not the JSON we expected.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_timeout() => Self::Timeout,
            None if err.is_decode() => Self::Decode(err.to_string()),
            None => Self::Network(err),
        }
    }
}

impl HttpError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Timeout | Self::Decode(_) => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_some_and(|s| (500..600).contains(&s))
    }

    /// 401 or 403, i.e. the agent wants (other) credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status_code(), Some(401 | 403))
    }

    /// Server errors and transport hiccups are worth another attempt;
    /// client errors and undecodable bodies are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Status { .. } => self.is_server_error(),
            Self::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Timeout => true,
            Self::Decode(_) => false,
        }
    }
}
