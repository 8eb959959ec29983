use super::{
    ErrorBuilder, ErrorCategory, ErrorContext, ErrorSeverity, RecoveryAction, TroubleshootingStep,
};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub(crate) type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A categorized failure with diagnostic and remediation metadata
///
/// Values are immutable once built; use [`ErrorBuilder`] to construct them.
/// Cloning is cheap enough to hand the same error to reports and listeners.
#[derive(Clone)]
pub struct BaseError {
    pub(crate) code: String,
    pub(crate) category: ErrorCategory,
    pub(crate) severity: ErrorSeverity,
    pub(crate) recoverable: bool,
    pub(crate) context: ErrorContext,
    pub(crate) details: Map<String, Value>,
    pub(crate) cause: Option<Cause>,
    pub(crate) recovery_actions: Vec<RecoveryAction>,
    pub(crate) troubleshooting_steps: Vec<TroubleshootingStep>,
    pub(crate) user_message: String,
    pub(crate) technical_message: String,
}

impl BaseError {
    /// Start building an error of the given category and code
    pub fn builder(category: ErrorCategory, code: impl Into<String>) -> ErrorBuilder {
        ErrorBuilder::new(category, code)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Get a string-valued detail
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn recovery_actions(&self) -> &[RecoveryAction] {
        &self.recovery_actions
    }

    pub fn troubleshooting_steps(&self) -> &[TroubleshootingStep] {
        &self.troubleshooting_steps
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn technical_message(&self) -> &str {
        &self.technical_message
    }

    /// Check whether any suggested action can run without the user
    pub fn has_automated_recovery(&self) -> bool {
        self.recovery_actions.iter().any(|action| action.automated)
    }

    /// Render the error as a JSON document
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for BaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.technical_message)
    }
}

impl fmt::Debug for BaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseError")
            .field("code", &self.code)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("recoverable", &self.recoverable)
            .field("technical_message", &self.technical_message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish_non_exhaustive()
    }
}

impl std::error::Error for BaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct BaseErrorRecord<'a> {
    code: &'a str,
    category: ErrorCategory,
    severity: ErrorSeverity,
    recoverable: bool,
    context: &'a ErrorContext,
    #[serde(skip_serializing_if = "Map::is_empty")]
    details: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
    recovery_actions: &'a [RecoveryAction],
    troubleshooting_steps: &'a [TroubleshootingStep],
    user_message: &'a str,
    technical_message: &'a str,
}

impl Serialize for BaseError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BaseErrorRecord {
            code: &self.code,
            category: self.category,
            severity: self.severity,
            recoverable: self.recoverable,
            context: &self.context,
            details: &self.details,
            cause: self.cause.as_ref().map(|cause| cause.to_string()),
            recovery_actions: &self.recovery_actions,
            troubleshooting_steps: &self.troubleshooting_steps,
            user_message: &self.user_message,
            technical_message: &self.technical_message,
        }
        .serialize(serializer)
    }
}
