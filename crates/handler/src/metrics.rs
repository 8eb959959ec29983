use faultline_core::{ErrorCategory, ErrorReport, ErrorSeverity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Aggregate view of the handler's history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorMetrics {
    pub total_errors: usize,
    pub errors_by_category: BTreeMap<ErrorCategory, usize>,
    pub errors_by_severity: BTreeMap<ErrorSeverity, usize>,
    /// Recovered reports over total reports, 0 for an empty history
    pub recovery_success_rate: f64,
    #[serde(
        rename = "average_handling_time_ms",
        serialize_with = "faultline_core::serialize_millis"
    )]
    pub average_handling_time: Duration,
}

impl ErrorMetrics {
    /// Compute the snapshot in a single pass
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a ErrorReport>) -> Self {
        let mut metrics = ErrorMetrics::default();
        let mut recovered = 0usize;
        let mut total_duration = Duration::ZERO;

        for report in reports {
            metrics.total_errors += 1;
            *metrics
                .errors_by_category
                .entry(report.error().category())
                .or_default() += 1;
            *metrics
                .errors_by_severity
                .entry(report.error().severity())
                .or_default() += 1;
            if report.recovered() {
                recovered += 1;
            }
            total_duration += report.handling_duration();
        }

        if metrics.total_errors > 0 {
            metrics.recovery_success_rate = recovered as f64 / metrics.total_errors as f64;
            metrics.average_handling_time =
                total_duration.div_f64(metrics.total_errors as f64);
        }
        metrics
    }
}
