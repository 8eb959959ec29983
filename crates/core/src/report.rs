use crate::constants::NO_STRATEGY;
use crate::BaseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Outcome of a recovery attempt sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
    pub success: bool,
    pub attempts: u32,
    pub strategy_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RecoveryResult {
    /// No registered strategy matched the error
    pub fn no_strategy() -> Self {
        Self {
            success: false,
            attempts: 0,
            strategy_name: NO_STRATEGY.to_string(),
            message: "no strategy available".to_string(),
            details: None,
        }
    }

    pub fn succeeded(
        strategy_name: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            success: true,
            attempts,
            strategy_name: strategy_name.into(),
            message: message.into(),
            details,
        }
    }

    /// Every candidate strategy ran out of attempts
    pub fn exhausted(strategy_name: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: false,
            attempts,
            strategy_name: strategy_name.into(),
            message: "all recovery attempts failed".to_string(),
            details: None,
        }
    }
}

/// Record of how one error was handled
///
/// Only constructible through [`ErrorReport::completed`] and
/// [`ErrorReport::faulted`], which uphold `recovered => recovery_attempts > 0`
/// and `!handled => !recovered && recovery_attempts == 0`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    id: Uuid,
    error: BaseError,
    handled: bool,
    recovered: bool,
    recovery_attempts: u32,
    timestamp: DateTime<Utc>,
    #[serde(rename = "handling_duration_ms", serialize_with = "serialize_millis")]
    handling_duration: Duration,
}

impl ErrorReport {
    /// Report for an error that went through the whole pipeline
    pub fn completed(error: BaseError, recovery: Option<&RecoveryResult>, started: Instant) -> Self {
        let (recovered, recovery_attempts) = match recovery {
            Some(result) => (result.success && result.attempts > 0, result.attempts),
            None => (false, 0),
        };

        Self {
            id: Uuid::new_v4(),
            error,
            handled: true,
            recovered,
            recovery_attempts,
            timestamp: Utc::now(),
            handling_duration: started.elapsed(),
        }
    }

    /// Degraded report for an error whose handling pipeline itself failed
    pub fn faulted(error: BaseError, started: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            error,
            handled: false,
            recovered: false,
            recovery_attempts: 0,
            timestamp: Utc::now(),
            handling_duration: started.elapsed(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn error(&self) -> &BaseError {
        &self.error
    }

    pub fn handled(&self) -> bool {
        self.handled
    }

    pub fn recovered(&self) -> bool {
        self.recovered
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery_attempts
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn handling_duration(&self) -> Duration {
        self.handling_duration
    }
}

/// Serialize a [`Duration`] as fractional milliseconds
///
/// For use with `#[serde(serialize_with = "...")]`.
pub fn serialize_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
