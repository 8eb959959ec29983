//! Default strategies seeded by [`crate::RecoveryManager::with_builtins`]
//!
//! Each built-in is a [`BuiltinStrategy`] delegating to a [`Probe`]. The default
//! probes only inspect the error details and the local environment; hosts
//! swap in real reconnect or fallback logic with [`BuiltinStrategy::with_probe`].

use crate::{MatchRule, RecoveryStrategy, StrategyOutcome};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use faultline_core::{BaseError, ErrorCategory};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// The operation a built-in strategy performs on each attempt
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, error: &BaseError, attempt: u32) -> anyhow::Result<StrategyOutcome>;
}

pub struct BuiltinStrategy {
    name: &'static str,
    rule: MatchRule,
    max_attempts: u32,
    delay: Duration,
    probe: Arc<dyn Probe>,
}

impl BuiltinStrategy {
    /// All built-ins in the order they are registered
    pub fn all() -> Vec<BuiltinStrategy> {
        vec![
            Self::connection_retry(),
            Self::model_fallback(),
            Self::document_processing_fallback(),
            Self::filesystem_retry(),
            Self::workflow_step_retry(),
            Self::configuration_defaults(),
        ]
    }

    pub fn connection_retry() -> Self {
        Self {
            name: "connection-retry",
            rule: MatchRule::categories([ErrorCategory::Connection, ErrorCategory::Network]),
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            probe: Arc::new(TcpConnectProbe::default()),
        }
    }

    pub fn model_fallback() -> Self {
        Self {
            name: "model-fallback",
            rule: MatchRule::category(ErrorCategory::Model),
            max_attempts: 2,
            delay: Duration::from_millis(500),
            probe: Arc::new(ModelFallbackProbe),
        }
    }

    pub fn document_processing_fallback() -> Self {
        Self {
            name: "document-processing-fallback",
            rule: MatchRule::category(ErrorCategory::DocumentProcessing),
            max_attempts: 2,
            delay: Duration::from_millis(1000),
            probe: Arc::new(ProcessorFallbackProbe),
        }
    }

    pub fn filesystem_retry() -> Self {
        Self {
            name: "filesystem-retry",
            rule: MatchRule::category(ErrorCategory::Filesystem),
            max_attempts: 3,
            delay: Duration::from_millis(500),
            probe: Arc::new(PathProbe),
        }
    }

    pub fn workflow_step_retry() -> Self {
        Self {
            name: "workflow-step-retry",
            rule: MatchRule::category(ErrorCategory::Workflow),
            max_attempts: 3,
            delay: Duration::from_millis(2000),
            probe: Arc::new(DetachedStepRunner),
        }
    }

    pub fn configuration_defaults() -> Self {
        Self {
            name: "configuration-defaults",
            rule: MatchRule::category(ErrorCategory::Configuration),
            max_attempts: 1,
            delay: Duration::ZERO,
            probe: Arc::new(DefaultValueProbe),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RecoveryStrategy for BuiltinStrategy {
    fn name(&self) -> &str {
        self.name
    }

    fn match_rule(&self) -> &MatchRule {
        &self.rule
    }

    async fn execute(&self, error: &BaseError, attempt: u32) -> anyhow::Result<StrategyOutcome> {
        self.probe.probe(error, attempt).await
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

/// Opens a TCP connection to `details.endpoint` (`host:port`)
#[derive(Debug, Clone)]
pub struct TcpConnectProbe {
    pub connect_timeout: Duration,
}

impl Default for TcpConnectProbe {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl Probe for TcpConnectProbe {
    async fn probe(&self, error: &BaseError, attempt: u32) -> anyhow::Result<StrategyOutcome> {
        let endpoint = error
            .detail_str("endpoint")
            .ok_or_else(|| anyhow!("error carries no endpoint to reconnect to"))?;

        timeout(self.connect_timeout, TcpStream::connect(endpoint))
            .await
            .with_context(|| format!("connecting to {endpoint} timed out"))?
            .with_context(|| format!("connecting to {endpoint} failed"))?;

        Ok(
            StrategyOutcome::recovered(format!("reconnected to {endpoint}"))
                .with_details(json!({ "endpoint": endpoint, "attempt": attempt })),
        )
    }
}

/// Picks the first entry of `details.fallback_models` that differs from
/// `details.model`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelFallbackProbe;

#[async_trait]
impl Probe for ModelFallbackProbe {
    async fn probe(&self, error: &BaseError, _attempt: u32) -> anyhow::Result<StrategyOutcome> {
        let current = error.detail_str("model");
        let fallback = error
            .detail("fallback_models")
            .and_then(|models| models.as_array())
            .into_iter()
            .flatten()
            .filter_map(|model| model.as_str())
            .find(|model| Some(*model) != current);

        match fallback {
            Some(model) => Ok(StrategyOutcome::recovered(format!("switched to model {model}"))
                .with_details(json!({ "model": model }))),
            None => Ok(StrategyOutcome::failed("no alternative model available")),
        }
    }
}

/// Uses `details.fallback_processor` when the error names one
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorFallbackProbe;

#[async_trait]
impl Probe for ProcessorFallbackProbe {
    async fn probe(&self, error: &BaseError, _attempt: u32) -> anyhow::Result<StrategyOutcome> {
        match error.detail_str("fallback_processor") {
            Some(processor) => Ok(StrategyOutcome::recovered(format!(
                "retrying with processor {processor}"
            ))
            .with_details(json!({ "processor": processor }))),
            None => Ok(StrategyOutcome::failed("no fallback processor configured")),
        }
    }
}

/// Checks whether `details.path` has become available
#[derive(Debug, Clone, Copy, Default)]
pub struct PathProbe;

#[async_trait]
impl Probe for PathProbe {
    async fn probe(&self, error: &BaseError, _attempt: u32) -> anyhow::Result<StrategyOutcome> {
        let Some(path) = error.detail_str("path") else {
            bail!("error carries no path to re-check");
        };

        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(StrategyOutcome::recovered(format!("{path} is available"))
                .with_details(json!({ "path": path, "size": metadata.len() }))),
            Err(e) => Ok(StrategyOutcome::failed(format!("{path} still unavailable: {e}"))),
        }
    }
}

/// Placeholder until the host attaches a probe that can re-run workflow steps
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedStepRunner;

#[async_trait]
impl Probe for DetachedStepRunner {
    async fn probe(&self, _error: &BaseError, _attempt: u32) -> anyhow::Result<StrategyOutcome> {
        Ok(StrategyOutcome::failed("no step runner attached"))
    }
}

/// Applies `details.default_value` in place of the invalid setting
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueProbe;

#[async_trait]
impl Probe for DefaultValueProbe {
    async fn probe(&self, error: &BaseError, _attempt: u32) -> anyhow::Result<StrategyOutcome> {
        match error.detail("default_value") {
            Some(value) => Ok(StrategyOutcome::recovered("applied default configuration value")
                .with_details(json!({
                    "key": error.detail("key"),
                    "applied": value,
                }))),
            None => Ok(StrategyOutcome::failed("no default value available")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::ErrorBuilder;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connection_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let error = ErrorBuilder::connection_failed("api")
            .detail("endpoint", json!(endpoint))
            .build();

        let outcome = BuiltinStrategy::connection_retry()
            .execute(&error, 1)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.details.unwrap()["endpoint"], endpoint);
    }

    #[tokio::test]
    async fn test_connection_probe_without_endpoint_fails() {
        let error = ErrorBuilder::connection_failed("api").build();
        assert!(BuiltinStrategy::connection_retry()
            .execute(&error, 1)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_model_fallback_skips_current_model() {
        let error = ErrorBuilder::model_unavailable("large")
            .detail("fallback_models", json!(["large", "small"]))
            .build();
        let outcome = BuiltinStrategy::model_fallback()
            .execute(&error, 1)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.details.unwrap()["model"], "small");

        let stuck = ErrorBuilder::model_unavailable("large")
            .detail("fallback_models", json!(["large"]))
            .build();
        let outcome = BuiltinStrategy::model_fallback()
            .execute(&stuck, 1)
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_document_fallback_processor() {
        let error = ErrorBuilder::document_processing("report.pdf", "corrupt xref")
            .detail("fallback_processor", json!("ocr"))
            .build();
        let outcome = BuiltinStrategy::document_processing_fallback()
            .execute(&error, 1)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.details.unwrap()["processor"], "ocr");
    }

    #[tokio::test]
    async fn test_filesystem_probe_rechecks_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("late.txt");
        let error = ErrorBuilder::file_not_found(path.to_string_lossy()).build();
        let strategy = BuiltinStrategy::filesystem_retry();

        assert!(!strategy.execute(&error, 1).await.unwrap().success);
        std::fs::write(&path, "now here").unwrap();
        assert!(strategy.execute(&error, 2).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_workflow_needs_runner() {
        let error = ErrorBuilder::workflow_step("ingest", "parse").build();
        let outcome = BuiltinStrategy::workflow_step_retry()
            .execute(&error, 1)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "no step runner attached");
    }

    #[tokio::test]
    async fn test_configuration_defaults() {
        let error = ErrorBuilder::configuration("timeout_ms", "negative")
            .detail("default_value", json!(3000))
            .build();
        let outcome = BuiltinStrategy::configuration_defaults()
            .execute(&error, 1)
            .await
            .unwrap();
        assert!(outcome.success);
        let details = outcome.details.unwrap();
        assert_eq!(details["applied"], 3000);
        assert_eq!(details["key"], "timeout_ms");
    }

    struct AlwaysRecovers;

    #[async_trait]
    impl Probe for AlwaysRecovers {
        async fn probe(&self, _error: &BaseError, attempt: u32) -> anyhow::Result<StrategyOutcome> {
            Ok(StrategyOutcome::recovered(format!("step re-run on attempt {attempt}")))
        }
    }

    #[tokio::test]
    async fn test_probe_is_replaceable() {
        let strategy = BuiltinStrategy::workflow_step_retry().with_probe(Arc::new(AlwaysRecovers));
        let error = ErrorBuilder::workflow_step("ingest", "parse").build();
        assert!(strategy.execute(&error, 1).await.unwrap().success);
        assert_eq!(strategy.name(), "workflow-step-retry");
    }
}
