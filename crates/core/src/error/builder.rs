use super::base::Cause;
use super::{
    BaseError, Catalog, ErrorCategory, ErrorContext, ErrorSeverity, RecoveryAction,
    TroubleshootingStep,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Builder for creating errors with a fluent API
///
/// Anything left unset is filled from the [`Catalog`] entry for the error's
/// `(category, code)` when [`ErrorBuilder::build`] runs.
#[derive(Debug, Clone)]
#[must_use]
pub struct ErrorBuilder {
    code: String,
    category: ErrorCategory,
    severity: Option<ErrorSeverity>,
    recoverable: Option<bool>,
    context: Option<ErrorContext>,
    details: Map<String, Value>,
    cause: Option<CauseSlot>,
    recovery_actions: Option<Vec<RecoveryAction>>,
    troubleshooting_steps: Option<Vec<TroubleshootingStep>>,
    user_message: Option<String>,
    technical_message: Option<String>,
}

#[derive(Clone)]
struct CauseSlot(Cause);

impl std::fmt::Debug for CauseSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ErrorBuilder {
    pub fn new(category: ErrorCategory, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            category,
            severity: None,
            recoverable: None,
            context: None,
            details: Map::new(),
            cause: None,
            recovery_actions: None,
            troubleshooting_steps: None,
            user_message: None,
            technical_message: None,
        }
    }

    pub fn severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = Some(recoverable);
        self
    }

    pub fn context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn details(mut self, details: Map<String, Value>) -> Self {
        self.details.extend(details);
        self
    }

    pub fn cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(CauseSlot(Arc::new(cause)));
        self
    }

    pub fn cause_boxed(mut self, cause: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        self.cause = Some(CauseSlot(Arc::from(cause)));
        self
    }

    pub fn recovery_action(mut self, action: RecoveryAction) -> Self {
        self.recovery_actions.get_or_insert_with(Vec::new).push(action);
        self
    }

    pub fn recovery_actions(mut self, actions: Vec<RecoveryAction>) -> Self {
        self.recovery_actions = Some(actions);
        self
    }

    /// Append a troubleshooting step; steps are renumbered in insertion order
    pub fn troubleshooting_step(
        mut self,
        description: impl Into<String>,
        action: Option<&str>,
        expected_outcome: Option<&str>,
    ) -> Self {
        let steps = self.troubleshooting_steps.get_or_insert_with(Vec::new);
        let mut step = TroubleshootingStep::new(steps.len() as u32 + 1, description);
        step.action = action.map(str::to_string);
        step.expected_outcome = expected_outcome.map(str::to_string);
        steps.push(step);
        self
    }

    pub fn troubleshooting_steps(mut self, steps: Vec<TroubleshootingStep>) -> Self {
        self.troubleshooting_steps = Some(steps);
        self
    }

    pub fn user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    pub fn technical_message(mut self, message: impl Into<String>) -> Self {
        self.technical_message = Some(message.into());
        self
    }

    /// Build the error against the built-in catalog
    pub fn build(self) -> BaseError {
        self.build_with(Catalog::builtin())
    }

    /// Build the error against a caller-provided catalog
    pub fn build_with(self, catalog: &Catalog) -> BaseError {
        let defaults = catalog.lookup(self.category, &self.code);
        let technical_message = self
            .technical_message
            .unwrap_or_else(|| format!("{} error: {}", self.category, self.code));

        BaseError {
            severity: self.severity.unwrap_or(defaults.severity),
            recoverable: self.recoverable.unwrap_or(defaults.recoverable),
            context: self.context.unwrap_or_default(),
            details: self.details,
            cause: self.cause.map(|slot| slot.0),
            recovery_actions: self
                .recovery_actions
                .unwrap_or_else(|| defaults.recovery_actions.clone()),
            troubleshooting_steps: self
                .troubleshooting_steps
                .unwrap_or_else(|| defaults.troubleshooting_steps.clone()),
            user_message: self
                .user_message
                .unwrap_or_else(|| defaults.user_message.clone()),
            technical_message,
            code: self.code,
            category: self.category,
        }
    }

    // Shorthands for the failures collaborators raise most often.

    pub fn connection_failed(service: impl Into<String>) -> Self {
        let service = service.into();
        Self::new(ErrorCategory::Connection, "CONNECTION_FAILED")
            .technical_message(format!("Connection to {service} failed"))
            .detail("service", json!(service))
    }

    pub fn connection_timeout(service: impl Into<String>, timeout_ms: u64) -> Self {
        let service = service.into();
        Self::new(ErrorCategory::Connection, "CONNECTION_TIMEOUT")
            .technical_message(format!("Connection to {service} timed out after {timeout_ms}ms"))
            .detail("service", json!(service))
            .detail("timeout_ms", json!(timeout_ms))
    }

    pub fn model_unavailable(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(ErrorCategory::Model, "MODEL_UNAVAILABLE")
            .technical_message(format!("Model {model} is unavailable"))
            .detail("model", json!(model))
    }

    pub fn document_processing(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let reason = reason.into();
        Self::new(ErrorCategory::DocumentProcessing, "DOCUMENT_PROCESSING_FAILED")
            .technical_message(format!("Failed to process {file_name}: {reason}"))
            .detail("file_name", json!(file_name))
    }

    pub fn workflow_step(workflow: impl Into<String>, step: impl Into<String>) -> Self {
        let workflow = workflow.into();
        let step = step.into();
        Self::new(ErrorCategory::Workflow, "WORKFLOW_STEP_FAILED")
            .technical_message(format!("Step {step} of workflow {workflow} failed"))
            .detail("workflow", json!(workflow))
            .detail("step", json!(step))
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorCategory::Filesystem, "FILE_NOT_FOUND")
            .technical_message(format!("File not found: {path}"))
            .detail("path", json!(path))
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        let reason = reason.into();
        Self::new(ErrorCategory::Validation, "VALIDATION_FAILED")
            .technical_message(format!("Validation failed for {field}: {reason}"))
            .detail("field", json!(field))
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Authentication, "AUTHENTICATION_FAILED")
            .technical_message(reason.into())
    }

    pub fn authorization(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(ErrorCategory::Authorization, "ACCESS_DENIED")
            .technical_message(format!("Access denied to {resource}"))
            .detail("resource", json!(resource))
    }

    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        let key = key.into();
        let reason = reason.into();
        Self::new(ErrorCategory::Configuration, "CONFIGURATION_INVALID")
            .technical_message(format!("Invalid configuration for {key}: {reason}"))
            .detail("key", json!(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_applies_catalog_defaults() {
        let error = ErrorBuilder::connection_failed("vector-store").build();

        assert_eq!(error.category(), ErrorCategory::Connection);
        assert_eq!(error.severity(), ErrorSeverity::High);
        assert!(error.is_recoverable());
        assert!(!error.recovery_actions().is_empty());
        assert!(!error.troubleshooting_steps().is_empty());
        assert!(!error.user_message().is_empty());
        assert_eq!(error.detail_str("service"), Some("vector-store"));
    }

    #[test]
    fn test_explicit_fields_override_defaults() {
        let error = ErrorBuilder::validation("email", "not an address")
            .severity(ErrorSeverity::Medium)
            .recoverable(true)
            .user_message("Please check the email address")
            .recovery_actions(vec![])
            .build();

        assert_eq!(error.severity(), ErrorSeverity::Medium);
        assert!(error.is_recoverable());
        assert_eq!(error.user_message(), "Please check the email address");
        assert!(error.recovery_actions().is_empty());
    }

    #[test]
    fn test_troubleshooting_steps_are_numbered() {
        let error = ErrorBuilder::new(ErrorCategory::System, "DISK_FULL")
            .troubleshooting_step("Free disk space", Some("rm old logs"), None)
            .troubleshooting_step("Retry the operation", None, Some("The write succeeds"))
            .build();

        let steps = error.troubleshooting_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step, 1);
        assert_eq!(steps[0].action.as_deref(), Some("rm old logs"));
        assert_eq!(steps[1].step, 2);
        assert_eq!(steps[1].expected_outcome.as_deref(), Some("The write succeeds"));
    }

    #[test]
    fn test_default_technical_message() {
        let error = ErrorBuilder::new(ErrorCategory::Cache, "CACHE_EVICTED").build();
        assert_eq!(error.technical_message(), "cache error: CACHE_EVICTED");
    }
}
