use crate::MatchRule;
use async_trait::async_trait;
use faultline_core::BaseError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// What a single recovery attempt reported
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub success: bool,
    pub message: String,
    pub details: Option<Value>,
}

impl StrategyOutcome {
    pub fn recovered(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A named, retryable way of recovering from a class of errors
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    /// Registry key; registering a second strategy with the same name replaces
    /// the first
    fn name(&self) -> &str;

    fn match_rule(&self) -> &MatchRule;

    fn matches(&self, error: &BaseError) -> bool {
        self.match_rule().matches(error)
    }

    /// Run attempt number `attempt` (starting at 1)
    async fn execute(&self, error: &BaseError, attempt: u32) -> anyhow::Result<StrategyOutcome>;

    fn max_attempts(&self) -> u32;

    /// Base delay before the second attempt; doubled for each later one
    fn delay(&self) -> Duration;
}

type ExecuteFn =
    dyn for<'a> Fn(&'a BaseError, u32) -> BoxFuture<'a, anyhow::Result<StrategyOutcome>> + Send + Sync;

/// Strategy assembled from a match rule and an async closure
///
/// ```ignore
/// let strategy = FnStrategy::new("reconnect", MatchRule::category(ErrorCategory::Network), |_, attempt| {
///     async move { Ok(StrategyOutcome::recovered(format!("reconnected on {attempt}"))) }.boxed()
/// });
/// ```
#[derive(Clone)]
pub struct FnStrategy {
    name: String,
    rule: MatchRule,
    max_attempts: u32,
    delay: Duration,
    execute: Arc<ExecuteFn>,
}

impl FnStrategy {
    pub fn new<F>(name: impl Into<String>, rule: MatchRule, execute: F) -> Self
    where
        F: for<'a> Fn(&'a BaseError, u32) -> BoxFuture<'a, anyhow::Result<StrategyOutcome>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            rule,
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            execute: Arc::new(execute),
        }
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
impl RecoveryStrategy for FnStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn match_rule(&self) -> &MatchRule {
        &self.rule
    }

    async fn execute(&self, error: &BaseError, attempt: u32) -> anyhow::Result<StrategyOutcome> {
        (self.execute)(error, attempt).await
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

impl std::fmt::Debug for FnStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStrategy")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}
