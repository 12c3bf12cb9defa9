//! Outcome classification and reporting.
//!
//! A 2xx response is only a success when Telegram's result envelope says
//! `"ok": true`; anything else is recorded as a failure with the raw body so
//! the API's own error text survives for diagnosis.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SendError;

/// Caller-supplied identifier of a delivery log entry.
pub type LogId = i64;

/// Delivery state codes understood by the log store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Failed,
    Pending,
    Success,
}

impl LogStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Failed => 0,
            Self::Pending => 1,
            Self::Success => 2,
        }
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed => f.write_str("failed"),
            Self::Pending => f.write_str("pending"),
            Self::Success => f.write_str("success"),
        }
    }
}

/// Why a dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rejected before any request was sent.
    Configuration,
    /// Network error, timeout or HTTP error status after all retries.
    Transport,
    /// HTTP success, but the API answered `ok != true`.
    RemoteRejection,
    /// Dispatcher shut down before the dispatch finished.
    Cancelled,
}

/// Terminal result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Success { body: String },
    Failure { kind: FailureKind, detail: String },
}

impl DeliveryOutcome {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn status(&self) -> LogStatus {
        match self {
            Self::Success { .. } => LogStatus::Success,
            Self::Failure { .. } => LogStatus::Failed,
        }
    }

    /// Message stored alongside the status.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { body } => body,
            Self::Failure { detail, .. } => detail,
        }
    }
}

/// Telegram Bot API result envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramResult {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

/// Classify the body of a 2xx response.
pub fn classify_response(body: String) -> DeliveryOutcome {
    match serde_json::from_str::<TelegramResult>(&body) {
        Ok(TelegramResult { ok: Some(true), .. }) => DeliveryOutcome::Success { body },
        Ok(result) => {
            warn!(
                error_code = ?result.error_code,
                description = result.description.as_deref().unwrap_or_default(),
                "Telegram rejected the message"
            );
            DeliveryOutcome::failure(FailureKind::RemoteRejection, body)
        }
        Err(error) => {
            warn!(error = %error, "Telegram response is not a result envelope");
            DeliveryOutcome::failure(FailureKind::RemoteRejection, body)
        }
    }
}

/// Classify an error that ended a dispatch.
pub fn classify_error(error: &SendError) -> DeliveryOutcome {
    let kind = match error {
        SendError::Cancelled => FailureKind::Cancelled,
        e if e.is_configuration() => FailureKind::Configuration,
        _ => FailureKind::Transport,
    };
    DeliveryOutcome::failure(kind, error.to_string())
}

/// Destination for terminal delivery states.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Record the final state of log entry `log_id`.
    async fn record_outcome(&self, log_id: LogId, status: LogStatus, message: &str);
}

/// Sink that only emits tracing events, for embedders without a history store.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    async fn record_outcome(&self, log_id: LogId, status: LogStatus, message: &str) {
        info!(log_id, status = status.code(), detail = message, "Delivery outcome recorded");
    }
}

/// Forward `outcome` to `sink` unless `log_id` is absent.
pub async fn report(sink: &dyn LogSink, log_id: Option<LogId>, outcome: &DeliveryOutcome) {
    let Some(log_id) = log_id else {
        return;
    };
    sink.record_outcome(log_id, outcome.status(), outcome.message())
        .await;
}
