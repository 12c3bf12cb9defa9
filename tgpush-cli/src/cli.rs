use std::path::PathBuf;

use clap::Parser;
use tgpush::{HttpMethod, LogId, ProxyType};

#[derive(Parser, Debug)]
#[command(author, version, about = "Send a message through the Telegram Bot API", long_about = None)]
pub struct Args {
    /// Message text. Read from stdin when omitted.
    pub message: Option<String>,

    /// Settings file (TOML). Defaults to `<config dir>/tgpush/config.toml` when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bot token, or the full URL of an API-compatible gateway
    #[arg(long, env = "TGPUSH_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Target chat ID
    #[arg(long, env = "TGPUSH_CHAT_ID")]
    pub chat_id: Option<String>,

    /// HTTP method used to call sendMessage
    #[arg(long, value_enum)]
    pub method: Option<HttpMethod>,

    /// Proxy kind
    #[arg(long, value_enum)]
    pub proxy_type: Option<ProxyType>,

    /// Proxy host name or IP address
    #[arg(long)]
    pub proxy_host: Option<String>,

    /// Proxy port
    #[arg(long)]
    pub proxy_port: Option<String>,

    /// Proxy username; enables proxy authentication
    #[arg(long)]
    pub proxy_username: Option<String>,

    /// Proxy password; enables proxy authentication
    #[arg(long, env = "TGPUSH_PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// Per-attempt timeout in seconds (0 disables it)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Retries after the first failed attempt
    #[arg(long)]
    pub retries: Option<u32>,

    /// Backoff step between retries in seconds
    #[arg(long, value_name = "SECONDS")]
    pub retry_delay: Option<u64>,

    /// Validate TLS certificates
    #[arg(long)]
    pub verify_tls: bool,

    /// Delivery log entry to report the outcome under
    #[arg(long)]
    pub log_id: Option<LogId>,

    /// Rule ID used to correlate log output
    #[arg(long)]
    pub rule_id: Option<i64>,

    /// Rule name used to correlate log output
    #[arg(long, requires = "rule_id")]
    pub rule_name: Option<String>,

    /// Print the effective settings (secrets masked) and exit
    #[arg(long)]
    pub print_config: bool,

    /// Print the outcome as single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
