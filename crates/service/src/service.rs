use crate::Config;
use anyhow::Result;
use faultline_core::{BaseError, ErrorReport};
use faultline_handler::{ErrorHandler, ErrorMetrics};
use faultline_logging::{
    ConsoleTransport, FileTransport, FileTransportConfig, JsonFormatter, Logger, LoggerConfig,
    TracingTransport, Transport,
};
use faultline_recovery::RecoveryManager;
use std::sync::Arc;
use tracing::{debug, info};

/// A logger, recovery manager and error handler wired from one [`Config`]
pub struct Faultline {
    config: Config,
    logger: Arc<Logger>,
    recovery: Arc<RecoveryManager>,
    handler: Arc<ErrorHandler>,
}

impl Faultline {
    /// Validate `config` and build the service
    pub async fn init(config: Config) -> Result<Self> {
        Self::init_with_transports(config, Vec::new()).await
    }

    /// Like [`Faultline::init`], with extra transports appended after the
    /// configured ones
    pub async fn init_with_transports(
        config: Config,
        extra: Vec<Arc<dyn Transport>>,
    ) -> Result<Self> {
        config.validate()?;

        let level = config.logging.level()?;
        let mut transports: Vec<Arc<dyn Transport>> = Vec::new();

        if config.logging.console {
            let formatter = config.logging.format()?.formatter(config.logging.colors);
            transports.push(Arc::new(
                ConsoleTransport::new(level, config.logging.colors).with_formatter(formatter),
            ));
        }

        if let Some(path) = &config.logging.file_path {
            debug!(path = %path.display(), "Enabling file logging");
            let file = FileTransport::new(FileTransportConfig {
                path: path.clone(),
                level,
                max_file_size: config.logging.max_file_size,
                max_files: config.logging.max_files,
            })?
            .with_formatter(Box::new(JsonFormatter));
            transports.push(Arc::new(file));
        }

        if config.logging.tracing {
            transports.push(Arc::new(TracingTransport::new(level)));
        }

        transports.extend(extra);

        let logger = Arc::new(Logger::new(LoggerConfig {
            name: config.logging.name.clone(),
            level,
            transports,
            enable_stack_trace: config.logging.enable_stack_trace,
            enable_performance_tracking: config.logging.enable_performance_tracking,
        }));

        let recovery_config = config.recovery.to_recovery_config();
        let recovery = Arc::new(if config.recovery.builtins {
            RecoveryManager::with_builtins(recovery_config, &logger)
        } else {
            RecoveryManager::new(recovery_config, &logger)
        });

        let handler = Arc::new(
            ErrorHandler::new(config.handler.clone(), &logger).with_recovery(recovery.clone()),
        );

        info!(
            logger = %config.logging.name,
            transports = ?logger.transport_names(),
            strategies = recovery.strategies().len(),
            "Faultline initialized"
        );

        Ok(Self {
            config,
            logger,
            recovery,
            handler,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn recovery(&self) -> &Arc<RecoveryManager> {
        &self.recovery
    }

    pub fn handler(&self) -> &Arc<ErrorHandler> {
        &self.handler
    }

    pub async fn handle_error(&self, error: BaseError) -> ErrorReport {
        self.handler.handle_error(error).await
    }

    pub fn metrics(&self) -> ErrorMetrics {
        self.handler.metrics()
    }

    /// Flush and close every transport
    pub async fn close(&self) {
        self.logger.flush().await;
        self.logger.close().await;
        debug!("Faultline closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::{ErrorBuilder, ErrorCategory};
    use faultline_logging::{LogLevel, MemoryTransport};
    use serde_json::json;
    use std::net::TcpListener;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.logging.console = false;
        config.logging.level = "debug".to_string();
        config
    }

    #[tokio::test]
    async fn test_init_wires_components() {
        let memory = Arc::new(MemoryTransport::new(100));
        let service = Faultline::init_with_transports(quiet_config(), vec![memory.clone()])
            .await
            .unwrap();

        assert_eq!(service.logger().transport_names(), vec!["memory"]);
        assert_eq!(service.recovery().strategies().len(), 6);

        service
            .handle_error(ErrorBuilder::validation("email", "missing @").build())
            .await;
        assert_eq!(service.metrics().total_errors, 1);
        assert!(!memory.entries_by_level(LogLevel::Info).is_empty());
        service.close().await;
    }

    #[tokio::test]
    async fn test_tracing_bridge_selected_by_config() {
        let mut config = quiet_config();
        config.logging.tracing = true;
        let service = Faultline::init(config).await.unwrap();

        assert_eq!(service.logger().transport_names(), vec!["tracing"]);
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let mut config = quiet_config();
        config.logging.format = "xml".to_string();
        assert!(Faultline::init(config).await.is_err());
    }

    #[tokio::test]
    async fn test_builtin_recovery_through_service() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let service = Faultline::init(quiet_config()).await.unwrap();

        let report = service
            .handle_error(
                ErrorBuilder::connection_failed("api")
                    .detail("endpoint", json!(endpoint))
                    .build(),
            )
            .await;

        assert!(report.recovered());
        assert_eq!(report.recovery_attempts(), 1);
        assert_eq!(report.error().category(), ErrorCategory::Connection);
    }

    #[tokio::test]
    async fn test_service_logger_controls_pipeline_output() {
        let memory = Arc::new(MemoryTransport::new(100));
        let mut config = quiet_config();
        config.recovery.builtins = false;
        let service = Faultline::init_with_transports(config, vec![memory.clone()])
            .await
            .unwrap();

        service.logger().set_level(LogLevel::Critical);
        service
            .handle_error(ErrorBuilder::file_not_found("/missing/settings.toml").build())
            .await;
        assert_eq!(memory.count(), 0);

        service.logger().set_level(LogLevel::Debug);
        let late = Arc::new(MemoryTransport::new(100).with_name("late"));
        service.logger().add_transport(late.clone());
        service
            .handle_error(ErrorBuilder::file_not_found("/missing/settings.toml").build())
            .await;
        assert!(!late.entries_by_level(LogLevel::Warn).is_empty());

        assert!(service.logger().remove_transport("late"));
        let before = late.count();
        service
            .handle_error(ErrorBuilder::validation("email", "missing @").build())
            .await;
        assert_eq!(late.count(), before);
    }

    #[tokio::test]
    async fn test_without_builtins() {
        let mut config = quiet_config();
        config.recovery.builtins = false;
        let service = Faultline::init(config).await.unwrap();

        assert!(service.recovery().strategies().is_empty());
        let report = service
            .handle_error(ErrorBuilder::connection_failed("api").build())
            .await;
        assert!(!report.recovered());
        assert_eq!(report.recovery_attempts(), 0);
    }
}
