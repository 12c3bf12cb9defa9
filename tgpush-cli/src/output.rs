use chrono::{DateTime, Utc};
use serde::Serialize;
use tgpush::{DeliveryOutcome, LogId, LogStatus};

/// Outcome line printed on stdout.
#[derive(Debug, Serialize)]
pub struct OutcomeRecord<'a> {
    pub log_id: Option<LogId>,
    pub rule_id: Option<i64>,
    pub status: LogStatus,
    pub status_code: i32,
    #[serde(flatten)]
    pub outcome: &'a DeliveryOutcome,
    pub finished_at: DateTime<Utc>,
}

impl<'a> OutcomeRecord<'a> {
    pub fn new(outcome: &'a DeliveryOutcome, log_id: Option<LogId>, rule_id: Option<i64>) -> Self {
        let status = outcome.status();
        Self {
            log_id,
            rule_id,
            status,
            status_code: status.code(),
            outcome,
            finished_at: Utc::now(),
        }
    }

    pub fn render(&self, compact: bool) -> serde_json::Result<String> {
        if compact {
            serde_json::to_string(self)
        } else {
            serde_json::to_string_pretty(self)
        }
    }
}
