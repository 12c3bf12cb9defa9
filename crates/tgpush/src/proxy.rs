//! Proxy resolution.
//!
//! A configured proxy host is resolved to an IP address before anything is
//! sent; a host that does not resolve aborts the dispatch. Credentials end up
//! on the per-dispatch `reqwest` client only: HTTP proxies receive them as
//! `Proxy-Authorization: Basic ..`, SOCKS5 proxies in the username/password
//! handshake. Nothing is registered process-wide, so concurrent dispatches
//! with different proxy accounts never see each other's credentials.

use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use reqwest::Proxy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SendError};
use crate::settings::ProxyConfig;

/// Port used when the configured one does not parse.
pub const DEFAULT_PROXY_PORT: u16 = 7890;

/// Proxy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// Direct connection.
    #[default]
    None,
    /// HTTP proxy (CONNECT for HTTPS targets).
    Http,
    /// SOCKS5 proxy.
    Socks,
}

/// Username/password presented to the proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A proxy whose host has been resolved to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProxy {
    pub proxy_type: ProxyType,
    /// Host as configured, kept for diagnostics.
    pub host: String,
    pub addr: SocketAddr,
    pub credentials: Option<ProxyCredentials>,
}

impl ResolvedProxy {
    /// Proxy URL for the client. SOCKS uses `socks5h` so the target host
    /// name is resolved by the proxy, not locally.
    pub fn proxy_url(&self) -> String {
        match self.proxy_type {
            ProxyType::Socks => format!("socks5h://{}", self.addr),
            ProxyType::Http | ProxyType::None => format!("http://{}", self.addr),
        }
    }

    /// Build the `reqwest` proxy, credentials included.
    pub fn to_reqwest(&self) -> Result<Proxy> {
        let url = self.proxy_url();
        let mut proxy = Proxy::all(&url).map_err(|e| SendError::InvalidUrl {
            input: url.clone(),
            reason: e.to_string(),
        })?;

        if let Some(credentials) = &self.credentials {
            proxy = proxy.basic_auth(&credentials.username, &credentials.password);
        }

        Ok(proxy)
    }
}

/// DNS lookup seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `host` to its IP addresses.
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system's `getaddrinfo` via Tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Parse a configured port, falling back to [`DEFAULT_PROXY_PORT`].
pub fn parse_port(port: &str) -> u16 {
    port.trim().parse().unwrap_or(DEFAULT_PROXY_PORT)
}

fn literal_ip(host: &str) -> Option<IpAddr> {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse().ok()
}

/// Decide whether and how to proxy a dispatch.
///
/// Returns `Ok(None)` for a direct connection. Fails with
/// [`SendError::ProxyResolution`] when the host yields no address.
pub async fn resolve_proxy(
    config: &ProxyConfig,
    resolver: &dyn HostResolver,
) -> Result<Option<ResolvedProxy>> {
    if !config.is_configured() {
        return Ok(None);
    }

    let host = config.host.trim();
    let port = parse_port(&config.port);
    debug!(proxy_host = %host, proxy_port = port, proxy_type = ?config.proxy_type, "Resolving proxy");

    let ip = match literal_ip(host) {
        Some(ip) => ip,
        None => match resolver.resolve(host, port).await {
            Ok(ips) => ips.into_iter().next().ok_or_else(|| {
                warn!(proxy_host = %host, "Proxy host resolved to no addresses");
                SendError::ProxyResolution {
                    host: host.to_string(),
                }
            })?,
            Err(error) => {
                warn!(proxy_host = %host, error = %error, "Proxy host resolution failed");
                return Err(SendError::ProxyResolution {
                    host: host.to_string(),
                });
            }
        },
    };

    let credentials = config
        .credentials()
        .map(|(username, password)| ProxyCredentials { username, password });

    debug!(
        proxy_addr = %SocketAddr::new(ip, port),
        authenticated = credentials.is_some(),
        "Proxy resolved"
    );

    Ok(Some(ResolvedProxy {
        proxy_type: config.proxy_type,
        host: host.to_string(),
        addr: SocketAddr::new(ip, port),
        credentials,
    }))
}
