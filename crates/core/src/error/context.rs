use super::{BaseError, ErrorBuilder, ErrorCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Where and for whom an error happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            operation: None,
            user_id: None,
            session_id: None,
            request_id: None,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn add(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for turning plain failures into categorized errors
pub trait IntoBaseError<T> {
    /// Categorize the failure with the catalog defaults for `code`
    fn categorize(self, category: ErrorCategory, code: &str) -> Result<T, BaseError>;

    /// Categorize the failure and customize the resulting error
    fn categorize_with<F>(self, category: ErrorCategory, code: &str, f: F) -> Result<T, BaseError>
    where
        F: FnOnce(ErrorBuilder) -> ErrorBuilder;
}

impl<T, E> IntoBaseError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn categorize(self, category: ErrorCategory, code: &str) -> Result<T, BaseError> {
        self.categorize_with(category, code, |builder| builder)
    }

    fn categorize_with<F>(self, category: ErrorCategory, code: &str, f: F) -> Result<T, BaseError>
    where
        F: FnOnce(ErrorBuilder) -> ErrorBuilder,
    {
        self.map_err(|e| {
            let builder = ErrorBuilder::new(category, code)
                .technical_message(e.to_string())
                .cause(e);
            f(builder).build()
        })
    }
}

impl<T> IntoBaseError<T> for Option<T> {
    fn categorize(self, category: ErrorCategory, code: &str) -> Result<T, BaseError> {
        self.categorize_with(category, code, |builder| builder)
    }

    fn categorize_with<F>(self, category: ErrorCategory, code: &str, f: F) -> Result<T, BaseError>
    where
        F: FnOnce(ErrorBuilder) -> ErrorBuilder,
    {
        self.ok_or_else(|| {
            let builder = ErrorBuilder::new(category, code).technical_message("Expected value was absent");
            f(builder).build()
        })
    }
}
