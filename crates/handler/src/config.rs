use faultline_core::constants::DEFAULT_MAX_RECOVERY_ATTEMPTS;
use faultline_logging::LogLevel;
use serde::{Deserialize, Serialize};

/// Behaviour switches for an [`crate::ErrorHandler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlerConfig {
    pub enable_recovery: bool,
    pub max_recovery_attempts: u32,
    /// Minimum verbosity; low-severity errors are only logged at `info` or below
    pub log_level: LogLevel,
    pub enable_telemetry: bool,
    pub enable_user_notifications: bool,
    /// Maximum number of reports kept in history; `None` keeps every report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            enable_recovery: true,
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            log_level: LogLevel::Info,
            enable_telemetry: false,
            enable_user_notifications: true,
            history_limit: None,
        }
    }
}
