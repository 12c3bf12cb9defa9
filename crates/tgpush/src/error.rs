use std::time::Duration;

use reqwest::StatusCode;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, SendError>;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("proxy host resolution failed: proxyHost={host}")]
    ProxyResolution { host: String },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("dispatch cancelled")]
    Cancelled,
}

impl SendError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Errors detected before any request leaves the process.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::ProxyResolution { .. } | Self::InvalidUrl { .. }
        )
    }

    /// Whether another attempt may succeed.
    ///
    /// Client errors other than 408 and 429 mean the remote API already
    /// answered, so repeating the same request is pointless.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source } => !source.is_builder(),
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Configuration { .. }
            | Self::ProxyResolution { .. }
            | Self::InvalidUrl { .. }
            | Self::Cancelled => false,
        }
    }
}
