//! User-facing settings consumed by the dispatch engine.
//!
//! These mirror what a settings store hands over for one Telegram sender plus
//! the global request options shared by every sender. They are plain serde
//! types so embedders can keep them in whatever format they like.

use serde::{Deserialize, Deserializer, Serialize};

use crate::proxy::ProxyType;
use crate::request::HttpMethod;
use crate::retry::RetryPolicy;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DELAY_TIME_SECS: u64 = 1;
pub const DEFAULT_USER_AGENT: &str = concat!("tgpush/", env!("CARGO_PKG_VERSION"));

/// Settings for one Telegram sender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token, or a full `http(s)://` URL of an API-compatible gateway.
    #[serde(default)]
    pub api_token: String,
    /// Target chat ID (user, group, or channel).
    #[serde(default)]
    pub chat_id: String,
    /// HTTP method used to call `sendMessage`.
    #[serde(default)]
    pub method: HttpMethod,
    /// Optional outbound proxy.
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Proxy settings as entered by the user.
///
/// `port` stays textual because settings stores keep it that way; an
/// unparsable port falls back to [`crate::proxy::DEFAULT_PROXY_PORT`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub proxy_type: ProxyType,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub port: String,
    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("proxy_type", &self.proxy_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_enabled", &self.auth_enabled)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ProxyConfig {
    /// Whether the settings ask for a proxy at all.
    pub fn is_configured(&self) -> bool {
        self.proxy_type != ProxyType::None
            && !self.host.trim().is_empty()
            && !self.port.trim().is_empty()
    }

    /// Credentials to present, if authentication is enabled and at least
    /// one of username or password is non-empty.
    pub fn credentials(&self) -> Option<(String, String)> {
        if !self.auth_enabled {
            return None;
        }

        let username = self.username.clone().unwrap_or_default();
        let password = self.password.clone().unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            return None;
        }

        Some((username, password))
    }
}

/// Global request options shared by every sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSettings {
    /// Per-attempt timeout in seconds; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional attempts after the first failed one.
    #[serde(default)]
    pub retry_times: u32,
    /// Delay before the first retry, also added for each later retry.
    #[serde(default = "default_delay_time_secs")]
    pub delay_time_secs: u64,
    /// Skip TLS certificate validation.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_delay_time_secs() -> u64 {
    DEFAULT_DELAY_TIME_SECS
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_times: 0,
            delay_time_secs: DEFAULT_DELAY_TIME_SECS,
            accept_invalid_certs: true,
            user_agent: default_user_agent(),
        }
    }
}

impl RequestSettings {
    /// Retry policy with a linear backoff of `delay_time_secs` per retry.
    pub fn retry_policy(&self) -> RetryPolicy {
        let delay_ms = self.delay_time_secs.saturating_mul(1000);
        RetryPolicy {
            timeout_ms: self.timeout_secs.saturating_mul(1000),
            max_retries: self.retry_times,
            initial_delay_ms: delay_ms,
            delay_increment_ms: delay_ms,
        }
    }
}

/// Complete configuration for one sender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderConfig {
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub request: RequestSettings,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u64),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_settings_default() {
        let settings = RequestSettings::default();
        assert_eq!(settings.timeout_secs, 10);
        assert_eq!(settings.retry_times, 0);
        assert_eq!(settings.delay_time_secs, 1);
        assert!(settings.accept_invalid_certs);
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let settings = RequestSettings {
            timeout_secs: 5,
            retry_times: 3,
            delay_time_secs: 2,
            ..Default::default()
        };

        let policy = settings.retry_policy();
        assert_eq!(policy.timeout_ms, 5000);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay_ms, 2000);
        assert_eq!(policy.delay_increment_ms, 2000);
    }

    #[test]
    fn test_telegram_settings_deserialize_defaults() {
        let settings: TelegramSettings = serde_json::from_value(json!({
            "api_token": "123:ABC",
            "chat_id": "456",
        }))
        .unwrap();

        assert_eq!(settings.method, HttpMethod::Post);
        assert_eq!(settings.proxy.proxy_type, ProxyType::None);
        assert!(!settings.proxy.is_configured());
    }

    #[test]
    fn test_proxy_port_accepts_number_or_string() {
        let numeric: ProxyConfig = serde_json::from_value(json!({
            "proxy_type": "socks",
            "host": "127.0.0.1",
            "port": 1080,
        }))
        .unwrap();
        assert_eq!(numeric.port, "1080");
        assert!(numeric.is_configured());

        let textual: ProxyConfig = serde_json::from_value(json!({
            "proxy_type": "http",
            "host": "127.0.0.1",
            "port": "8080",
        }))
        .unwrap();
        assert_eq!(textual.port, "8080");
    }

    #[test]
    fn test_proxy_credentials() {
        let mut proxy = ProxyConfig {
            proxy_type: ProxyType::Http,
            host: "proxy".to_string(),
            port: "3128".to_string(),
            auth_enabled: true,
            username: Some("user".to_string()),
            password: None,
        };
        assert_eq!(
            proxy.credentials(),
            Some(("user".to_string(), String::new()))
        );

        proxy.username = Some(String::new());
        assert_eq!(proxy.credentials(), None);

        proxy.password = Some("secret".to_string());
        proxy.auth_enabled = false;
        assert_eq!(proxy.credentials(), None);
    }

    #[test]
    fn test_proxy_debug_hides_password() {
        let proxy = ProxyConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let rendered = format!("{proxy:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
