//! Telegram Bot API notification dispatch.
//!
//! Sends a finished message text to a chat through `sendMessage`, either as
//! a GET with query parameters or as a POST with an HTML-escaped JSON body,
//! optionally through an (authenticated) HTTP or SOCKS5 proxy. Dispatches run
//! on the Tokio runtime under a timeout and linear-backoff retry policy, and
//! each one reports a single terminal outcome to a [`LogSink`].
//!
//! # Example
//!
//! ```ignore
//! use tgpush::{Dispatcher, RequestSettings, TelegramSettings};
//!
//! let dispatcher = Dispatcher::new(&RequestSettings::default());
//! let settings = TelegramSettings {
//!     api_token: "123456:ABC-DEF".to_string(),
//!     chat_id: "987654321".to_string(),
//!     ..Default::default()
//! };
//!
//! // Fire and forget; the outcome goes to the dispatcher's log sink.
//! dispatcher.dispatch(&settings, "Backup finished", None, Some(42));
//! ```

pub mod classify;
pub mod dispatcher;
pub mod encode;
pub mod error;
pub mod proxy;
pub mod request;
pub mod retry;
pub mod settings;
pub mod transport;

pub use classify::{
    DeliveryOutcome, FailureKind, LogId, LogSink, LogStatus, TelegramResult, TracingLogSink,
};
pub use dispatcher::{DispatchHandle, Dispatcher, DispatcherBuilder, RuleContext};
pub use encode::{EncodeMode, encode, html_encode, url_encode};
pub use error::{Result, SendError};
pub use proxy::{
    DEFAULT_PROXY_PORT, HostResolver, ProxyCredentials, ProxyType, ResolvedProxy, SystemResolver,
};
pub use request::{DeliveryRequest, HttpMethod, TELEGRAM_API_BASE};
pub use retry::RetryPolicy;
pub use settings::{ProxyConfig, RequestSettings, SenderConfig, TelegramSettings};
pub use transport::{HttpTransport, HttpTransportConfig, Transport};
