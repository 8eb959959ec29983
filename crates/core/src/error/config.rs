use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading, overriding or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Configuration value out of range: {field} = {value} (expected {expected})")]
    OutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration from {origin}: {reason}")]
    Parse { origin: String, reason: String },

    #[error("Invalid value '{value}' for {var_name}: {reason}")]
    InvalidEnvVar {
        var_name: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn out_of_range(
        field: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn parse(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_env_var(
        var_name: impl Into<String>,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidEnvVar {
            var_name: var_name.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the setting or variable at fault, when there is one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidField { field, .. } | Self::OutOfRange { field, .. } => Some(field),
            Self::InvalidEnvVar { var_name, .. } => Some(var_name),
            Self::Read { .. } | Self::Parse { .. } => None,
        }
    }
}
