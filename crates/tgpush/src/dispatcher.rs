//! Dispatch engine.
//!
//! [`Dispatcher::dispatch`] spawns a task and returns immediately. The task
//! builds the request, resolves the proxy, runs the attempts under the
//! [`RetryPolicy`] and reports exactly one [`DeliveryOutcome`] to the
//! [`LogSink`]. Configuration errors never reach the transport and are not
//! retried.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::classify::{
    DeliveryOutcome, FailureKind, LogId, LogSink, TracingLogSink, classify_error,
    classify_response, report,
};
use crate::error::{Result, SendError};
use crate::proxy::{HostResolver, SystemResolver, resolve_proxy};
use crate::request::DeliveryRequest;
use crate::retry::RetryPolicy;
use crate::settings::{RequestSettings, TelegramSettings};
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};

/// Rule on whose behalf a message is sent. Only used to correlate logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    pub id: i64,
    pub name: String,
}

/// Handle to a spawned dispatch.
///
/// Dropping it detaches the dispatch; the outcome is still reported to the
/// sink.
#[derive(Debug)]
pub struct DispatchHandle {
    handle: JoinHandle<DeliveryOutcome>,
}

impl DispatchHandle {
    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> DeliveryOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(error) => DeliveryOutcome::failure(
                FailureKind::Transport,
                format!("dispatch task failed: {error}"),
            ),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn HostResolver>,
    sink: Arc<dyn LogSink>,
    policy: RetryPolicy,
    cancellation_token: CancellationToken,
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    settings: RequestSettings,
    transport: Option<Arc<dyn Transport>>,
    resolver: Option<Arc<dyn HostResolver>>,
    sink: Option<Arc<dyn LogSink>>,
    policy: Option<RetryPolicy>,
}

impl DispatcherBuilder {
    fn new(settings: RequestSettings) -> Self {
        Self {
            settings,
            transport: None,
            resolver: None,
            sink: None,
            policy: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the policy derived from the request settings.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> Dispatcher {
        let policy = self
            .policy
            .unwrap_or_else(|| self.settings.retry_policy());
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(HttpTransport::new(HttpTransportConfig::from(&self.settings)))
        });

        Dispatcher {
            inner: Arc::new(Inner {
                transport,
                resolver: self.resolver.unwrap_or_else(|| Arc::new(SystemResolver)),
                sink: self.sink.unwrap_or_else(|| Arc::new(TracingLogSink)),
                policy,
                cancellation_token: CancellationToken::new(),
            }),
        }
    }
}

/// Sends Telegram messages under a shared request policy.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Dispatcher with the `reqwest` transport, system DNS and a tracing sink.
    pub fn new(settings: &RequestSettings) -> Self {
        Self::builder(settings.clone()).build()
    }

    pub fn builder(settings: RequestSettings) -> DispatcherBuilder {
        DispatcherBuilder::new(settings)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Fire a send. Must be called from within a Tokio runtime.
    ///
    /// The outcome is reported to the sink under `log_id`; with no log id
    /// nothing is recorded.
    pub fn dispatch(
        &self,
        settings: &TelegramSettings,
        content: impl Into<String>,
        rule: Option<&RuleContext>,
        log_id: Option<LogId>,
    ) -> DispatchHandle {
        let inner = self.inner.clone();
        let settings = settings.clone();
        let content = content.into();
        let span = info_span!(
            "telegram_dispatch",
            log_id = ?log_id,
            rule_id = ?rule.map(|r| r.id),
            rule = ?rule.map(|r| r.name.as_str()),
        );

        let handle = tokio::spawn(
            async move { inner.run(&settings, &content, log_id).await }.instrument(span),
        );

        DispatchHandle { handle }
    }

    /// Run a send to completion on the current task and report it.
    pub async fn send(
        &self,
        settings: &TelegramSettings,
        content: &str,
        log_id: Option<LogId>,
    ) -> DeliveryOutcome {
        self.inner.run(settings, content, log_id).await
    }

    /// Run the attempts for an already built request.
    pub async fn execute_with_retry(&self, request: &DeliveryRequest) -> Result<String> {
        self.inner.execute_with_retry(request).await
    }

    /// Cancel in-flight dispatches. Each still reports a single
    /// [`FailureKind::Cancelled`] outcome, and later dispatches fail the
    /// same way.
    pub fn shutdown(&self) {
        info!("Shutting down Telegram dispatcher");
        self.inner.cancellation_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.cancellation_token.is_cancelled()
    }
}

impl Inner {
    async fn run(
        &self,
        settings: &TelegramSettings,
        content: &str,
        log_id: Option<LogId>,
    ) -> DeliveryOutcome {
        let outcome = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => classify_error(&SendError::Cancelled),
            outcome = self.deliver(settings, content) => outcome,
        };

        match &outcome {
            DeliveryOutcome::Success { .. } => info!("Telegram message delivered"),
            DeliveryOutcome::Failure { kind, detail } => {
                warn!(kind = ?kind, detail = %detail, "Telegram message not delivered")
            }
        }

        report(self.sink.as_ref(), log_id, &outcome).await;
        outcome
    }

    async fn deliver(&self, settings: &TelegramSettings, content: &str) -> DeliveryOutcome {
        let request = match self.prepare(settings, content).await {
            Ok(request) => request,
            Err(error) => return classify_error(&error),
        };

        match self.execute_with_retry(&request).await {
            Ok(body) => classify_response(body),
            Err(error) => classify_error(&error),
        }
    }

    async fn prepare(
        &self,
        settings: &TelegramSettings,
        content: &str,
    ) -> Result<DeliveryRequest> {
        let request = DeliveryRequest::build(settings, content)?;
        debug!(
            method = %request.method(),
            url = %request.display_url(),
            "Built Telegram request"
        );

        let proxy = resolve_proxy(&settings.proxy, self.resolver.as_ref()).await?;
        Ok(request.with_proxy(proxy))
    }

    async fn execute_with_retry(&self, request: &DeliveryRequest) -> Result<String> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match self.policy.timeout() {
                Some(timeout) => tokio::time::timeout(timeout, self.transport.execute(request))
                    .await
                    .unwrap_or_else(|_| Err(SendError::Timeout { timeout })),
                None => self.transport.execute(request).await,
            };

            match result {
                Ok(body) => {
                    debug!(attempt, "Telegram request completed");
                    return Ok(body);
                }
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.delay_before_retry(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        error = %error,
                        "Telegram request failed, retrying in {:?}",
                        delay
                    );
                    sleep(delay).await;
                }
                Err(error) => {
                    debug!(attempt, error = %error, "Telegram request failed");
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::LogStatus;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTransport {
        calls: AtomicUsize,
        body: String,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn execute(&self, _request: &DeliveryRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<(LogId, LogStatus, String)>>,
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn record_outcome(&self, log_id: LogId, status: LogStatus, message: &str) {
            self.records
                .lock()
                .push((log_id, status, message.to_string()));
        }
    }

    fn settings() -> TelegramSettings {
        TelegramSettings {
            api_token: "123:ABC".to_string(),
            chat_id: "42".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_builder_uses_settings_policy() {
        let settings = RequestSettings {
            timeout_secs: 3,
            retry_times: 2,
            delay_time_secs: 4,
            ..Default::default()
        };
        let dispatcher = Dispatcher::builder(settings).build();

        assert_eq!(dispatcher.policy().timeout_ms, 3000);
        assert_eq!(dispatcher.policy().max_retries, 2);
        assert_eq!(dispatcher.policy().initial_delay_ms, 4000);
    }

    #[tokio::test]
    async fn test_send_success_records_once() {
        let transport = Arc::new(FixedTransport {
            calls: AtomicUsize::new(0),
            body: r#"{"ok":true}"#.to_string(),
        });
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::builder(RequestSettings::default())
            .transport(transport.clone())
            .sink(sink.clone())
            .build();

        let outcome = dispatcher.send(&settings(), "hello", Some(1)).await;

        assert!(outcome.is_success());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *sink.records.lock(),
            vec![(1, LogStatus::Success, r#"{"ok":true}"#.to_string())]
        );
    }

    #[tokio::test]
    async fn test_shutdown_cancels_with_single_outcome() {
        let transport = Arc::new(FixedTransport {
            calls: AtomicUsize::new(0),
            body: r#"{"ok":true}"#.to_string(),
        });
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::builder(RequestSettings::default())
            .transport(transport.clone())
            .sink(sink.clone())
            .build();

        dispatcher.shutdown();
        assert!(dispatcher.is_shutdown());

        let outcome = dispatcher
            .dispatch(&settings(), "hello", None, Some(9))
            .outcome()
            .await;

        assert_eq!(
            outcome,
            DeliveryOutcome::failure(FailureKind::Cancelled, "dispatch cancelled")
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        let records = sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1, LogStatus::Failed);
    }
}
