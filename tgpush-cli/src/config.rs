//! Settings file loading and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use tgpush::SenderConfig;
use tracing::debug;

use crate::cli::Args;
use crate::error::{CliError, Result};

const CONFIG_DIR_NAME: &str = "tgpush";
const CONFIG_FILE_NAME: &str = "config.toml";
const MASK: &str = "***";

/// `<config dir>/tgpush/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load settings from `path`, or from the default location when it exists.
///
/// An explicit path must exist; a missing default file yields the defaults.
pub fn load(path: Option<&Path>) -> Result<SenderConfig> {
    match path {
        Some(path) => read(path),
        None => match default_config_path() {
            Some(path) if path.is_file() => read(&path),
            _ => {
                debug!("No settings file found, using defaults");
                Ok(SenderConfig::default())
            }
        },
    }
}

fn read(path: &Path) -> Result<SenderConfig> {
    debug!(path = %path.display(), "Loading settings");
    let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply every flag that was given on top of the loaded settings.
pub fn apply_overrides(config: &mut SenderConfig, args: &Args) {
    let telegram = &mut config.telegram;
    if let Some(token) = &args.api_token {
        telegram.api_token = token.clone();
    }
    if let Some(chat_id) = &args.chat_id {
        telegram.chat_id = chat_id.clone();
    }
    if let Some(method) = args.method {
        telegram.method = method;
    }

    let proxy = &mut telegram.proxy;
    if let Some(proxy_type) = args.proxy_type {
        proxy.proxy_type = proxy_type;
    }
    if let Some(host) = &args.proxy_host {
        proxy.host = host.clone();
    }
    if let Some(port) = &args.proxy_port {
        proxy.port = port.clone();
    }
    if args.proxy_username.is_some() || args.proxy_password.is_some() {
        proxy.auth_enabled = true;
        proxy.username = args.proxy_username.clone().or(proxy.username.take());
        proxy.password = args.proxy_password.clone().or(proxy.password.take());
    }

    let request = &mut config.request;
    if let Some(timeout) = args.timeout {
        request.timeout_secs = timeout;
    }
    if let Some(retries) = args.retries {
        request.retry_times = retries;
    }
    if let Some(delay) = args.retry_delay {
        request.delay_time_secs = delay;
    }
    if args.verify_tls {
        request.accept_invalid_certs = false;
    }
}

/// Effective settings as TOML with the token and proxy password masked.
pub fn render_masked(config: &SenderConfig) -> Result<String> {
    let mut masked = config.clone();
    if !masked.telegram.api_token.is_empty() {
        masked.telegram.api_token = MASK.to_string();
    }
    if masked.telegram.proxy.password.is_some() {
        masked.telegram.proxy.password = Some(MASK.to_string());
    }
    Ok(toml::to_string_pretty(&masked)?)
}
