//! Error handling pipeline
//!
//! [`ErrorHandler::handle_error`] logs a categorized error, hands recoverable
//! errors to a [`RecoveryService`], records an [`faultline_core::ErrorReport`]
//! in history and notifies listeners and optional telemetry and notification
//! hooks. It never fails: faults inside the pipeline become reports with
//! `handled = false`.

mod config;
mod handler;
mod hooks;
mod metrics;

pub use config::ErrorHandlerConfig;
pub use handler::{ErrorHandler, PipelineStage};
pub use hooks::{
    ErrorListener, NotificationSink, RecoveryService, TelemetrySink, TelemetrySummary, UserNotice,
};
pub use metrics::ErrorMetrics;
