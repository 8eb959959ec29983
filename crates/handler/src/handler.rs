use crate::{
    ErrorHandlerConfig, ErrorListener, ErrorMetrics, NotificationSink, RecoveryService,
    TelemetrySink, TelemetrySummary, UserNotice,
};
use faultline_core::constants::GENERIC_ERROR_CODE;
use faultline_core::{
    BaseError, ErrorCategory, ErrorContext, ErrorReport, ErrorSeverity, RecoveryAction,
    RecoveryResult, TroubleshootingStep,
};
use faultline_logging::{LogContext, LogLevel, Logger};
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Stages an error passes through in [`ErrorHandler::handle_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Logged,
    RecoveryAttempted,
    RecoverySkipped,
    ReportBuilt,
    ListenersNotified,
    TelemetrySent,
    TelemetrySkipped,
    Faulted,
}

/// Central entry point for categorized errors
pub struct ErrorHandler {
    config: ErrorHandlerConfig,
    logger: Logger,
    recovery: Option<Arc<dyn RecoveryService>>,
    listeners: RwLock<Vec<Arc<dyn ErrorListener>>>,
    history: RwLock<VecDeque<ErrorReport>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    notifications: Option<Arc<dyn NotificationSink>>,
}

impl ErrorHandler {
    pub fn new(config: ErrorHandlerConfig, logger: &Logger) -> Self {
        Self {
            config,
            logger: logger.child(LogContext::component("error-handler")),
            recovery: None,
            listeners: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            telemetry: None,
            notifications: None,
        }
    }

    pub fn with_recovery(mut self, recovery: Arc<dyn RecoveryService>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(sink);
        self
    }

    pub fn config(&self) -> &ErrorHandlerConfig {
        &self.config
    }

    /// Run `error` through the pipeline and return its report
    ///
    /// Never fails. If logging, recovery or report construction panics the
    /// returned report has `handled = false` and listeners, telemetry and
    /// notifications are skipped.
    pub async fn handle_error(&self, error: BaseError) -> ErrorReport {
        let started = Instant::now();
        self.trace_stage(PipelineStage::Received, &error);

        let staged = AssertUnwindSafe(self.run_core_stages(&error, started))
            .catch_unwind()
            .await;

        let report = match staged {
            Ok(report) => report,
            Err(_) => {
                self.trace_stage(PipelineStage::Faulted, &error);
                let report = ErrorReport::faulted(error, started);
                self.logger.log(
                    LogLevel::Critical,
                    "Error handling pipeline faulted",
                    Some(json!({
                        "report_id": report.id().to_string(),
                        "code": report.error().code(),
                    })),
                    None,
                );
                self.append(report.clone());
                return report;
            }
        };

        self.append(report.clone());
        self.notify_listeners(&report);
        self.trace_stage(PipelineStage::ListenersNotified, report.error());

        if self.config.enable_telemetry {
            if let Some(sink) = &self.telemetry {
                self.send_telemetry(sink.as_ref(), &report).await;
            }
            self.trace_stage(PipelineStage::TelemetrySent, report.error());
        } else {
            self.trace_stage(PipelineStage::TelemetrySkipped, report.error());
        }

        if self.config.enable_user_notifications && !report.recovered() {
            if let Some(sink) = &self.notifications {
                self.send_notification(sink.as_ref(), &report);
            }
        }

        report
    }

    /// Wrap an untyped failure as a `GENERIC_ERROR` in the system category
    /// with medium severity and handle it
    pub async fn handle_generic_error(
        &self,
        error: impl Into<anyhow::Error>,
        context: ErrorContext,
    ) -> ErrorReport {
        self.handle_generic_error_as(error, context, ErrorCategory::System, ErrorSeverity::Medium)
            .await
    }

    pub async fn handle_generic_error_as(
        &self,
        error: impl Into<anyhow::Error>,
        context: ErrorContext,
        category: ErrorCategory,
        severity: ErrorSeverity,
    ) -> ErrorReport {
        let error = generic_error(error.into(), context, category, severity);
        self.handle_error(error).await
    }

    pub fn on_error(&self, listener: Arc<dyn ErrorListener>) {
        self.listeners.write().push(listener);
    }

    /// Remove a listener by identity
    pub fn remove_error_listener(&self, listener: &Arc<dyn ErrorListener>) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn metrics(&self) -> ErrorMetrics {
        ErrorMetrics::from_reports(self.history.read().iter())
    }

    /// Up to `limit` reports, most recent first
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorReport> {
        self.history
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    async fn run_core_stages(&self, error: &BaseError, started: Instant) -> ErrorReport {
        self.log_error(error);
        self.trace_stage(PipelineStage::Logged, error);

        let recovery = self.attempt_recovery(error).await;
        let report = ErrorReport::completed(error.clone(), recovery.as_ref(), started);
        self.trace_stage(PipelineStage::ReportBuilt, error);
        report
    }

    fn log_error(&self, error: &BaseError) {
        let level = match error.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => LogLevel::Error,
            ErrorSeverity::Medium => LogLevel::Warn,
            ErrorSeverity::Low if self.config.log_level <= LogLevel::Info => LogLevel::Info,
            ErrorSeverity::Low => return,
        };
        let context = LogContext {
            component: None,
            request_id: error.context().request_id.clone(),
            user_id: error.context().user_id.clone(),
            session_id: error.context().session_id.clone(),
        };
        self.logger.log(
            level,
            error.technical_message(),
            Some(error.to_json()),
            Some(&context),
        );
    }

    async fn attempt_recovery(&self, error: &BaseError) -> Option<RecoveryResult> {
        let recovery = match &self.recovery {
            Some(recovery) if self.config.enable_recovery && error.is_recoverable() => recovery,
            _ => {
                self.trace_stage(PipelineStage::RecoverySkipped, error);
                return None;
            }
        };

        let result = recovery
            .attempt_recovery(error, self.config.max_recovery_attempts)
            .await;
        self.trace_stage(PipelineStage::RecoveryAttempted, error);
        Some(result)
    }

    fn append(&self, report: ErrorReport) {
        let mut history = self.history.write();
        history.push_back(report);
        if let Some(limit) = self.config.history_limit {
            while history.len() > limit {
                history.pop_front();
            }
        }
    }

    fn notify_listeners(&self, report: &ErrorReport) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                listener.on_error(report.error(), report)
            }));
            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(_) => "listener panicked".to_string(),
            };
            self.logger.log(
                LogLevel::Warn,
                "Error listener failed",
                Some(json!({ "report_id": report.id().to_string(), "reason": reason })),
                None,
            );
        }
    }

    async fn send_telemetry(&self, sink: &dyn TelemetrySink, report: &ErrorReport) {
        let summary = TelemetrySummary::from_report(report);
        let outcome = AssertUnwindSafe(sink.send(summary)).catch_unwind().await;
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{e:#}"),
            Err(_) => "telemetry sink panicked".to_string(),
        };
        self.logger.log(
            LogLevel::Warn,
            "Telemetry hook failed",
            Some(json!({ "report_id": report.id().to_string(), "reason": reason })),
            None,
        );
    }

    fn send_notification(&self, sink: &dyn NotificationSink, report: &ErrorReport) {
        let notice = UserNotice::from_error(report.error());
        let outcome = catch_unwind(AssertUnwindSafe(|| sink.notify(notice)));
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{e:#}"),
            Err(_) => "notification sink panicked".to_string(),
        };
        self.logger.log(
            LogLevel::Warn,
            "Notification hook failed",
            Some(json!({ "report_id": report.id().to_string(), "reason": reason })),
            None,
        );
    }

    fn trace_stage(&self, stage: PipelineStage, error: &BaseError) {
        debug!(stage = ?stage, code = error.code(), "Error pipeline stage");
    }
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("config", &self.config)
            .field("listeners", &self.listener_count())
            .field("history", &self.history.read().len())
            .finish()
    }
}

fn generic_error(
    error: anyhow::Error,
    context: ErrorContext,
    category: ErrorCategory,
    severity: ErrorSeverity,
) -> BaseError {
    BaseError::builder(category, GENERIC_ERROR_CODE)
        .severity(severity)
        .recoverable(severity != ErrorSeverity::Critical)
        .context(context)
        .technical_message(format!("{error:#}"))
        .recovery_action(RecoveryAction::retry(
            "Retry the operation",
            1,
            Duration::from_millis(1000),
        ))
        .troubleshooting_steps(vec![TroubleshootingStep::new(
            1,
            "Try the operation again; if the problem persists, restart the application",
        )
        .expected_outcome("The operation completes without error")])
        .cause_boxed(error.into())
        .build()
}
