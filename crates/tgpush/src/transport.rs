//! HTTP transport.
//!
//! [`Transport`] performs exactly one network round-trip per call; timeouts
//! and retries are the dispatcher's business. The `reqwest` implementation
//! builds a client per attempt so proxy credentials stay scoped to the
//! request that asked for them and no connection is reused between attempts.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, SendError};
use crate::request::{DeliveryRequest, HttpMethod};
use crate::settings::{DEFAULT_USER_AGENT, RequestSettings};

/// Executes a single attempt of a [`DeliveryRequest`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` once and return the body of a 2xx response.
    async fn execute(&self, request: &DeliveryRequest) -> Result<String>;
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client options for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Skip TLS certificate validation.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
    /// Client-level timeout; the dispatcher enforces its own as well.
    pub timeout: Option<Duration>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl From<&RequestSettings> for HttpTransportConfig {
    fn from(settings: &RequestSettings) -> Self {
        Self {
            accept_invalid_certs: settings.accept_invalid_certs,
            user_agent: settings.user_agent.clone(),
            timeout: settings.retry_policy().timeout(),
        }
    }
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        install_rustls_provider();
        Self { config }
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn build_client(&self, request: &DeliveryRequest) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(&self.config.user_agent)
            .danger_accept_invalid_certs(self.config.accept_invalid_certs);

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }

        // Environment proxies are ignored: either the configured one or none.
        builder = match request.proxy() {
            Some(proxy) => builder.proxy(proxy.to_reqwest()?),
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| SendError::config(format!("failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &DeliveryRequest) -> Result<String> {
        let client = self.build_client(request)?;

        let mut builder = match request.method() {
            HttpMethod::Get => client.get(request.url()),
            HttpMethod::Post => client.post(request.url()),
        };
        builder = builder.headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_owned());
        }

        debug!(
            method = %request.method(),
            url = %request.display_url(),
            proxied = request.proxy().is_some(),
            "Sending Telegram request"
        );

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SendError::HttpStatus { status, body });
        }

        Ok(body)
    }
}
