use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of remediation a recovery action describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryActionKind {
    Retry,
    Fallback,
    Manual,
    Ignore,
}

/// Suggested remediation attached to an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAction {
    pub kind: RecoveryActionKind,
    pub description: String,
    /// Whether the system can perform this action without the user
    pub automated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl RecoveryAction {
    pub fn retry(description: impl Into<String>, max_attempts: u32, delay: Duration) -> Self {
        Self {
            kind: RecoveryActionKind::Retry,
            description: description.into(),
            automated: true,
            max_attempts: Some(max_attempts),
            delay_ms: Some(delay.as_millis() as u64),
        }
    }

    pub fn fallback(description: impl Into<String>) -> Self {
        Self {
            kind: RecoveryActionKind::Fallback,
            description: description.into(),
            automated: true,
            max_attempts: None,
            delay_ms: None,
        }
    }

    pub fn manual(description: impl Into<String>) -> Self {
        Self {
            kind: RecoveryActionKind::Manual,
            description: description.into(),
            automated: false,
            max_attempts: None,
            delay_ms: None,
        }
    }

    pub fn ignore(description: impl Into<String>) -> Self {
        Self {
            kind: RecoveryActionKind::Ignore,
            description: description.into(),
            automated: true,
            max_attempts: None,
            delay_ms: None,
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

/// A numbered step of a troubleshooting guide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroubleshootingStep {
    pub step: u32,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
}

impl TroubleshootingStep {
    pub fn new(step: u32, description: impl Into<String>) -> Self {
        Self {
            step,
            description: description.into(),
            action: None,
            expected_outcome: None,
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = Some(outcome.into());
        self
    }
}
