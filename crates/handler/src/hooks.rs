use async_trait::async_trait;
use faultline_core::{
    BaseError, ErrorCategory, ErrorReport, ErrorSeverity, RecoveryResult, TroubleshootingStep,
};
use faultline_recovery::RecoveryManager;
use serde::Serialize;

/// Recovery backend used by the handler
#[async_trait]
pub trait RecoveryService: Send + Sync {
    async fn attempt_recovery(&self, error: &BaseError, max_attempts: u32) -> RecoveryResult;
}

#[async_trait]
impl RecoveryService for RecoveryManager {
    async fn attempt_recovery(&self, error: &BaseError, max_attempts: u32) -> RecoveryResult {
        RecoveryManager::attempt_recovery(self, error, max_attempts).await
    }
}

/// Observer called with every completed report
///
/// Any `Fn(&BaseError, &ErrorReport) -> anyhow::Result<()>` closure is a
/// listener.
pub trait ErrorListener: Send + Sync {
    fn on_error(&self, error: &BaseError, report: &ErrorReport) -> anyhow::Result<()>;
}

impl<F> ErrorListener for F
where
    F: Fn(&BaseError, &ErrorReport) -> anyhow::Result<()> + Send + Sync,
{
    fn on_error(&self, error: &BaseError, report: &ErrorReport) -> anyhow::Result<()> {
        self(error, report)
    }
}

/// Redacted view of a report forwarded to telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub recovered: bool,
    pub duration_ms: f64,
}

impl TelemetrySummary {
    pub fn from_report(report: &ErrorReport) -> Self {
        Self {
            category: report.error().category(),
            severity: report.error().severity(),
            recovered: report.recovered(),
            duration_ms: report.handling_duration().as_secs_f64() * 1000.0,
        }
    }
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn send(&self, summary: TelemetrySummary) -> anyhow::Result<()>;
}

/// What a user-facing surface needs to explain an unrecovered error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserNotice {
    pub code: String,
    pub user_message: String,
    pub troubleshooting_steps: Vec<TroubleshootingStep>,
}

impl UserNotice {
    pub fn from_error(error: &BaseError) -> Self {
        Self {
            code: error.code().to_string(),
            user_message: error.user_message().to_string(),
            troubleshooting_steps: error.troubleshooting_steps().to_vec(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: UserNotice) -> anyhow::Result<()>;
}
