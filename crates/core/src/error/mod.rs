mod base;
mod builder;
mod catalog;
mod config;
mod context;
mod remediation;

pub use base::BaseError;
pub use builder::ErrorBuilder;
pub use catalog::{Catalog, CatalogEntry};
pub use config::ConfigError;
pub use context::{ErrorContext, IntoBaseError};
pub use remediation::{RecoveryAction, RecoveryActionKind, TroubleshootingStep};

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Plumbing errors raised by the faultline crates themselves
///
/// Application failures are modelled as [`BaseError`] values; this type only
/// covers faults of the infrastructure (config loading, transports, I/O).
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Transport {transport} failed: {reason}")]
    Transport { transport: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn transport(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    /// Check if retrying the failed operation can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Transport { .. })
    }

    /// Get the taxonomy category this fault belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Serialization(_) => ErrorCategory::Validation,
            Error::Io(_) => ErrorCategory::Filesystem,
            Error::Transport { .. } | Error::Internal(_) => ErrorCategory::System,
        }
    }

    /// Convert this fault into a categorized [`BaseError`]
    pub fn into_base_error(self) -> BaseError {
        let code = match &self {
            Error::Config(_) => "CONFIGURATION_INVALID",
            Error::Serialization(_) => "SERIALIZATION_FAILED",
            Error::Io(_) => "IO_FAILURE",
            Error::Transport { .. } => "TRANSPORT_FAILURE",
            Error::Internal(_) => "INTERNAL_ERROR",
        };
        let recoverable = self.is_recoverable();
        ErrorBuilder::new(self.category(), code)
            .technical_message(self.to_string())
            .recoverable(recoverable)
            .cause(self)
            .build()
    }
}

/// Error categories for classification and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Connection,
    Model,
    DocumentProcessing,
    Workflow,
    Filesystem,
    Validation,
    Authentication,
    Authorization,
    Network,
    Database,
    Cache,
    Configuration,
    System,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 13] = [
        ErrorCategory::Connection,
        ErrorCategory::Model,
        ErrorCategory::DocumentProcessing,
        ErrorCategory::Workflow,
        ErrorCategory::Filesystem,
        ErrorCategory::Validation,
        ErrorCategory::Authentication,
        ErrorCategory::Authorization,
        ErrorCategory::Network,
        ErrorCategory::Database,
        ErrorCategory::Cache,
        ErrorCategory::Configuration,
        ErrorCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Connection => "connection",
            ErrorCategory::Model => "model",
            ErrorCategory::DocumentProcessing => "document-processing",
            ErrorCategory::Workflow => "workflow",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Network => "network",
            ErrorCategory::Database => "database",
            ErrorCategory::Cache => "cache",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::System => "system",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ErrorCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ConfigError::invalid_field("category", format!("unknown category '{s}'")))
    }
}

/// How bad a failure is, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub const ALL: [ErrorSeverity; 4] = [
        ErrorSeverity::Low,
        ErrorSeverity::Medium,
        ErrorSeverity::High,
        ErrorSeverity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorSeverity {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ErrorSeverity::Low),
            "medium" => Ok(ErrorSeverity::Medium),
            "high" => Ok(ErrorSeverity::High),
            "critical" => Ok(ErrorSeverity::Critical),
            _ => Err(ConfigError::invalid_field(
                "severity",
                format!("unknown severity '{s}'"),
            )),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
