use crate::{BuiltinStrategy, RecoveryConfig, RecoveryStrategy, StrategyOutcome};
use faultline_core::{BaseError, RecoveryResult};
use faultline_logging::{LogContext, LogLevel, Logger};
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Ordered registry of recovery strategies plus the retry loop that drives them
pub struct RecoveryManager {
    strategies: RwLock<Vec<Arc<dyn RecoveryStrategy>>>,
    config: RecoveryConfig,
    logger: Logger,
}

impl RecoveryManager {
    /// Manager with an empty registry
    pub fn new(config: RecoveryConfig, logger: &Logger) -> Self {
        Self {
            strategies: RwLock::new(Vec::new()),
            config,
            logger: logger.child(LogContext::component("recovery")),
        }
    }

    /// Manager seeded with one built-in strategy per recoverable category
    pub fn with_builtins(config: RecoveryConfig, logger: &Logger) -> Self {
        let manager = Self::new(config, logger);
        for strategy in BuiltinStrategy::all() {
            manager.register_strategy(Arc::new(strategy));
        }
        manager
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Append a strategy, or replace the one already registered under its name
    /// while keeping that entry's position
    pub fn register_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        let mut strategies = self.strategies.write();
        match strategies.iter().position(|s| s.name() == strategy.name()) {
            Some(index) => {
                debug!(strategy = strategy.name(), "Replacing recovery strategy");
                strategies[index] = strategy;
            }
            None => {
                debug!(strategy = strategy.name(), "Registering recovery strategy");
                strategies.push(strategy);
            }
        }
    }

    pub fn remove_strategy(&self, name: &str) -> bool {
        let mut strategies = self.strategies.write();
        let before = strategies.len();
        strategies.retain(|s| s.name() != name);
        strategies.len() != before
    }

    /// Registered strategy names in the order they are tried
    pub fn strategies(&self) -> Vec<String> {
        self.strategies
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Try every matching strategy until one recovers the error
    ///
    /// Each strategy gets `min(max_attempts, strategy.max_attempts())`
    /// attempts. Errors, panics and timeouts inside `execute` count as failed
    /// attempts.
    pub async fn attempt_recovery(&self, error: &BaseError, max_attempts: u32) -> RecoveryResult {
        let candidates: Vec<Arc<dyn RecoveryStrategy>> = self
            .strategies
            .read()
            .iter()
            .filter(|s| s.matches(error))
            .cloned()
            .collect();

        let Some(first) = candidates.first() else {
            self.logger.log(
                LogLevel::Debug,
                "No recovery strategy matches error",
                Some(json!({ "code": error.code(), "category": error.category() })),
                None,
            );
            return RecoveryResult::no_strategy();
        };
        let first_name = first.name().to_string();

        for strategy in &candidates {
            let attempts = max_attempts.min(strategy.max_attempts());
            for attempt in 1..=attempts {
                let delay = self.config.delay_before(strategy.delay(), attempt);
                if !delay.is_zero() {
                    debug!(
                        strategy = strategy.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Waiting before recovery attempt"
                    );
                    sleep(delay).await;
                }

                self.logger.log(
                    LogLevel::Debug,
                    "Attempting recovery",
                    Some(json!({
                        "strategy": strategy.name(),
                        "attempt": attempt,
                        "code": error.code(),
                    })),
                    None,
                );

                match self.run_attempt(strategy.as_ref(), error, attempt).await {
                    Ok(outcome) if outcome.success => {
                        self.logger.log(
                            LogLevel::Info,
                            "Recovery succeeded",
                            Some(json!({
                                "strategy": strategy.name(),
                                "attempt": attempt,
                                "message": outcome.message,
                            })),
                            None,
                        );
                        return RecoveryResult::succeeded(
                            strategy.name(),
                            attempt,
                            outcome.message,
                            outcome.details,
                        );
                    }
                    Ok(outcome) => {
                        self.logger.log(
                            LogLevel::Debug,
                            "Recovery attempt unsuccessful",
                            Some(json!({
                                "strategy": strategy.name(),
                                "attempt": attempt,
                                "message": outcome.message,
                            })),
                            None,
                        );
                    }
                    Err(e) => {
                        self.logger.log(
                            LogLevel::Warn,
                            "Recovery attempt failed",
                            Some(json!({
                                "strategy": strategy.name(),
                                "attempt": attempt,
                                "reason": format!("{e:#}"),
                            })),
                            None,
                        );
                    }
                }
            }
        }

        self.logger.log(
            LogLevel::Warn,
            "All recovery attempts failed",
            Some(json!({
                "code": error.code(),
                "strategies": candidates.iter().map(|s| s.name()).collect::<Vec<_>>(),
            })),
            None,
        );
        RecoveryResult::exhausted(first_name, max_attempts)
    }

    async fn run_attempt(
        &self,
        strategy: &dyn RecoveryStrategy,
        error: &BaseError,
        attempt: u32,
    ) -> anyhow::Result<StrategyOutcome> {
        let guarded = AssertUnwindSafe(strategy.execute(error, attempt)).catch_unwind();

        let outcome = match self.config.attempt_timeout {
            Some(limit) => timeout(limit, guarded)
                .await
                .map_err(|_| anyhow::anyhow!("attempt timed out after {}ms", limit.as_millis()))?,
            None => guarded.await,
        };

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!(
                "strategy panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
    }
}

impl std::fmt::Debug for RecoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryManager")
            .field("strategies", &self.strategies())
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnStrategy, MatchRule};
    use anyhow::bail;
    use faultline_core::{ErrorBuilder, ErrorCategory};
    use faultline_logging::{LoggerConfig, MemoryTransport};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn manager() -> RecoveryManager {
        RecoveryManager::new(RecoveryConfig::default(), &Logger::silent())
    }

    fn connection_error() -> BaseError {
        ErrorBuilder::connection_failed("api").build()
    }

    /// Fails until `succeed_on`, counting every call
    fn counting(name: &str, succeed_on: u32, calls: Arc<AtomicU32>) -> FnStrategy {
        FnStrategy::new(
            name,
            MatchRule::category(ErrorCategory::Connection),
            move |_, attempt| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt >= succeed_on {
                        Ok(StrategyOutcome::recovered(format!("ok on {attempt}")))
                    } else {
                        Ok(StrategyOutcome::failed("not yet"))
                    }
                }
                .boxed()
            },
        )
        .with_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_no_matching_strategy() {
        let manager = manager();
        let calls = Arc::new(AtomicU32::new(0));
        manager.register_strategy(Arc::new(counting("conn", 1, calls.clone())));

        let result = manager
            .attempt_recovery(&ErrorBuilder::validation("f", "bad").build(), 3)
            .await;

        assert_eq!(result, RecoveryResult::no_strategy());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let manager = manager();
        let calls = Arc::new(AtomicU32::new(0));
        manager.register_strategy(Arc::new(
            counting("conn", 3, calls.clone()).with_max_attempts(5),
        ));

        let result = manager.attempt_recovery(&connection_error(), 3).await;

        assert!(result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.strategy_name, "conn");
        assert_eq!(result.message, "ok on 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_attempts() {
        let manager = manager();
        let calls = Arc::new(AtomicU32::new(0));
        manager.register_strategy(Arc::new(
            counting("conn", 99, calls.clone())
                .with_delay(Duration::from_millis(100))
                .with_max_attempts(4),
        ));

        let started = tokio::time::Instant::now();
        let result = manager.attempt_recovery(&connection_error(), 4).await;

        // 100 + 200 + 400
        assert_eq!(started.elapsed(), Duration::from_millis(700));
        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reports_first_candidate() {
        let manager = manager();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        manager.register_strategy(Arc::new(
            counting("first", 99, first.clone()).with_max_attempts(2),
        ));
        manager.register_strategy(Arc::new(counting("second", 99, second.clone())));

        let result = manager.attempt_recovery(&connection_error(), 3).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.strategy_name, "first");
        assert_eq!(result.message, "all recovery attempts failed");
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_strategy_recovers_after_first_exhausts() {
        let manager = manager();
        manager.register_strategy(Arc::new(
            counting("first", 99, Arc::new(AtomicU32::new(0))).with_max_attempts(2),
        ));
        manager.register_strategy(Arc::new(counting("second", 1, Arc::new(AtomicU32::new(0)))));

        let result = manager.attempt_recovery(&connection_error(), 3).await;

        assert!(result.success);
        assert_eq!(result.strategy_name, "second");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_and_panics_count_as_failed_attempts() {
        let memory = Arc::new(MemoryTransport::new(100));
        let logger = Logger::new(LoggerConfig {
            level: LogLevel::Debug,
            transports: vec![memory.clone()],
            ..Default::default()
        });
        let manager = RecoveryManager::new(RecoveryConfig::default(), &logger);
        manager.register_strategy(Arc::new(
            FnStrategy::new("flaky", MatchRule::Any, |_, attempt| {
                async move {
                    match attempt {
                        1 => bail!("socket reset"),
                        2 => panic!("probe crashed"),
                        _ => Ok(StrategyOutcome::recovered("third time lucky")),
                    }
                }
                .boxed()
            })
            .with_delay(Duration::from_millis(5)),
        ));

        let result = manager.attempt_recovery(&connection_error(), 3).await;

        assert!(result.success);
        assert_eq!(result.attempts, 3);
        let failures = memory.entries_by_level(LogLevel::Warn);
        assert_eq!(failures.len(), 2);
        assert!(failures[0].data.as_ref().unwrap()["reason"]
            .as_str()
            .unwrap()
            .contains("socket reset"));
        assert!(failures[1].data.as_ref().unwrap()["reason"]
            .as_str()
            .unwrap()
            .contains("probe crashed"));
        assert_eq!(failures[1].component.as_deref(), Some("recovery"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let manager = RecoveryManager::new(
            RecoveryConfig {
                attempt_timeout: Some(Duration::from_secs(1)),
                ..Default::default()
            },
            &Logger::silent(),
        );
        manager.register_strategy(Arc::new(
            FnStrategy::new("slow", MatchRule::Any, |_, attempt| {
                async move {
                    if attempt == 1 {
                        sleep(Duration::from_secs(60)).await;
                    }
                    Ok(StrategyOutcome::recovered("fast enough"))
                }
                .boxed()
            })
            .with_delay(Duration::from_millis(10)),
        ));

        let result = manager.attempt_recovery(&connection_error(), 3).await;

        assert!(result.success);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_register_replace_and_remove() {
        let manager = manager();
        let calls = Arc::new(AtomicU32::new(0));
        manager.register_strategy(Arc::new(counting("a", 1, calls.clone())));
        manager.register_strategy(Arc::new(counting("b", 1, calls.clone())));
        manager.register_strategy(Arc::new(counting("c", 1, calls.clone())));
        assert_eq!(manager.strategies(), vec!["a", "b", "c"]);

        manager.register_strategy(Arc::new(
            counting("b", 1, calls.clone()).with_max_attempts(9),
        ));
        assert_eq!(manager.strategies(), vec!["a", "b", "c"]);

        assert!(manager.remove_strategy("b"));
        assert!(!manager.remove_strategy("b"));
        assert_eq!(manager.strategies(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_builtins_registered_in_order() {
        let manager = RecoveryManager::with_builtins(RecoveryConfig::default(), &Logger::silent());
        assert_eq!(
            manager.strategies(),
            vec![
                "connection-retry",
                "model-fallback",
                "document-processing-fallback",
                "filesystem-retry",
                "workflow-step-retry",
                "configuration-defaults",
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_max_attempts_runs_nothing() {
        let manager = manager();
        let calls = Arc::new(AtomicU32::new(0));
        manager.register_strategy(Arc::new(counting("conn", 1, calls.clone())));

        let result = manager.attempt_recovery(&connection_error(), 0).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
