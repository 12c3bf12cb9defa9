//! `sendMessage` request construction.
//!
//! Pure data transformation: nothing here touches the network. Proxy
//! resolution happens afterwards and is attached with
//! [`DeliveryRequest::with_proxy`].

use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, PRAGMA};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::encode::{EncodeMode, encode};
use crate::error::{Result, SendError};
use crate::proxy::ResolvedProxy;
use crate::settings::TelegramSettings;

/// Base URL of the public Telegram Bot API.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// HTTP method used to call `sendMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[default]
    #[serde(alias = "post")]
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Endpoint for `api_token`: verbatim when it already is an HTTP URL,
/// otherwise the canonical Bot API `sendMessage` URL.
pub fn endpoint_url(api_token: &str) -> String {
    if api_token.starts_with("http") {
        api_token.to_string()
    } else {
        format!("{TELEGRAM_API_BASE}/bot{api_token}/sendMessage")
    }
}

/// A fully assembled outbound request. Immutable once built.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    method: HttpMethod,
    url: String,
    display_url: String,
    chat_id: String,
    raw_content: String,
    encoded_content: String,
    headers: HeaderMap,
    body: Option<String>,
    proxy: Option<ResolvedProxy>,
}

impl DeliveryRequest {
    /// Build the request for `content` according to `settings`.
    pub fn build(settings: &TelegramSettings, content: &str) -> Result<Self> {
        let api_token = settings.api_token.trim();
        if api_token.is_empty() {
            return Err(SendError::config("Telegram api token is not configured"));
        }

        let endpoint = endpoint_url(api_token);
        let mut parsed = Url::parse(&endpoint).map_err(|e| SendError::InvalidUrl {
            input: redact_endpoint(&endpoint, api_token),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let chat_id = settings.chat_id.clone();

        let (url, encoded_content, body) = match settings.method {
            HttpMethod::Get => {
                let encoded = encode(Some(content), EncodeMode::UrlQuery);
                // `append_pair` form-encodes with the same rules as `encode`.
                parsed
                    .query_pairs_mut()
                    .append_pair("chat_id", &chat_id)
                    .append_pair("text", content);
                (parsed.to_string(), encoded, None)
            }
            HttpMethod::Post => {
                let encoded = encode(Some(content), EncodeMode::JsonBody);
                let body = json!({
                    "chat_id": chat_id,
                    "text": encoded,
                    "parse_mode": "HTML",
                    "disable_web_page_preview": "true",
                });
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                (endpoint.clone(), encoded, Some(body.to_string()))
            }
        };

        Ok(Self {
            method: settings.method,
            display_url: redact_endpoint(&endpoint, api_token),
            url,
            chat_id,
            raw_content: content.to_string(),
            encoded_content,
            headers,
            body,
            proxy: None,
        })
    }

    /// Route this request through `proxy`.
    pub fn with_proxy(self, proxy: Option<ResolvedProxy>) -> Self {
        Self { proxy, ..self }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Final request URL, query string included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Endpoint with the bot token masked, safe to log.
    pub fn display_url(&self) -> &str {
        &self.display_url
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    pub fn encoded_content(&self) -> &str {
        &self.encoded_content
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn proxy(&self) -> Option<&ResolvedProxy> {
        self.proxy.as_ref()
    }
}

fn redact_endpoint(endpoint: &str, api_token: &str) -> String {
    if endpoint.starts_with(TELEGRAM_API_BASE) && !api_token.starts_with("http") {
        return endpoint.replace(&format!("/bot{api_token}/"), "/bot***/");
    }

    // Gateway URLs may embed credentials anywhere; keep only the origin.
    match Url::parse(endpoint) {
        Ok(url) => format!("{}/***", url.origin().ascii_serialization()),
        Err(_) => "***".to_string(),
    }
}
