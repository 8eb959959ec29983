use faultline_core::constants::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE};
use faultline_core::ConfigError;
use faultline_handler::ErrorHandlerConfig;
use faultline_logging::{LogFormat, LogLevel};
use faultline_recovery::RecoveryConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a TOML configuration file
pub const CONFIG_PATH_VAR: &str = "FAULTLINE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingSettings,
    pub handler: ErrorHandlerConfig,
    pub recovery: RecoverySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub name: String,
    pub level: String,
    pub format: String,
    pub console: bool,
    pub colors: bool,
    /// Also forward entries to the process-wide `tracing` subscriber
    pub tracing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub max_file_size: u64,
    pub max_files: usize,
    pub enable_stack_trace: bool,
    pub enable_performance_tracking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Register the built-in strategies at startup
    pub builtins: bool,
    /// 0 disables the per-attempt timeout
    pub attempt_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    pub jitter: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            name: "faultline".to_string(),
            level: "info".to_string(),
            format: "console".to_string(),
            console: true,
            colors: true,
            tracing: false,
            file_path: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            enable_stack_trace: false,
            enable_performance_tracking: false,
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            builtins: true,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
            max_delay_ms: None,
            jitter: false,
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse()
    }

    pub fn format(&self) -> Result<LogFormat, ConfigError> {
        self.format.parse()
    }
}

impl RecoverySettings {
    pub fn to_recovery_config(&self) -> RecoveryConfig {
        RecoveryConfig {
            attempt_timeout: (self.attempt_timeout_ms > 0)
                .then(|| Duration::from_millis(self.attempt_timeout_ms)),
            max_delay: self.max_delay_ms.map(Duration::from_millis),
            jitter: self.jitter,
        }
    }
}

impl Config {
    /// Defaults, then the file named by `FAULTLINE_CONFIG`, then `FAULTLINE_*`
    /// environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Config::from_file(path)?,
            Err(_) => Config::default(),
        };

        config.load_from_env()?;

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        toml::from_str(&content).map_err(|e| ConfigError::parse(path.display().to_string(), e))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::parse("inline TOML", e))
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn load_from_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply `FAULTLINE_*` overrides resolved through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // Logging settings
        if let Some(name) = lookup("FAULTLINE_LOG_NAME") {
            self.logging.name = name;
        }
        if let Some(level) = lookup("FAULTLINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("FAULTLINE_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(console) = lookup("FAULTLINE_LOG_CONSOLE") {
            self.logging.console = parse_var("FAULTLINE_LOG_CONSOLE", &console)?;
        }
        if let Some(colors) = lookup("FAULTLINE_LOG_COLORS") {
            self.logging.colors = parse_var("FAULTLINE_LOG_COLORS", &colors)?;
        }
        if let Some(tracing) = lookup("FAULTLINE_LOG_TRACING") {
            self.logging.tracing = parse_var("FAULTLINE_LOG_TRACING", &tracing)?;
        }
        if let Some(path) = lookup("FAULTLINE_LOG_FILE") {
            self.logging.file_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(size) = lookup("FAULTLINE_LOG_MAX_FILE_SIZE") {
            self.logging.max_file_size = parse_var("FAULTLINE_LOG_MAX_FILE_SIZE", &size)?;
        }
        if let Some(files) = lookup("FAULTLINE_LOG_MAX_FILES") {
            self.logging.max_files = parse_var("FAULTLINE_LOG_MAX_FILES", &files)?;
        }

        // Handler settings
        if let Some(enabled) = lookup("FAULTLINE_ENABLE_RECOVERY") {
            self.handler.enable_recovery = parse_var("FAULTLINE_ENABLE_RECOVERY", &enabled)?;
        }
        if let Some(attempts) = lookup("FAULTLINE_MAX_RECOVERY_ATTEMPTS") {
            self.handler.max_recovery_attempts =
                parse_var("FAULTLINE_MAX_RECOVERY_ATTEMPTS", &attempts)?;
        }
        if let Some(level) = lookup("FAULTLINE_HANDLER_LOG_LEVEL") {
            self.handler.log_level = parse_var("FAULTLINE_HANDLER_LOG_LEVEL", &level)?;
        }
        if let Some(enabled) = lookup("FAULTLINE_ENABLE_TELEMETRY") {
            self.handler.enable_telemetry = parse_var("FAULTLINE_ENABLE_TELEMETRY", &enabled)?;
        }
        if let Some(enabled) = lookup("FAULTLINE_ENABLE_NOTIFICATIONS") {
            self.handler.enable_user_notifications =
                parse_var("FAULTLINE_ENABLE_NOTIFICATIONS", &enabled)?;
        }
        if let Some(limit) = lookup("FAULTLINE_HISTORY_LIMIT") {
            self.handler.history_limit = Some(parse_var("FAULTLINE_HISTORY_LIMIT", &limit)?);
        }

        // Recovery settings
        if let Some(timeout) = lookup("FAULTLINE_ATTEMPT_TIMEOUT_MS") {
            self.recovery.attempt_timeout_ms = parse_var("FAULTLINE_ATTEMPT_TIMEOUT_MS", &timeout)?;
        }
        if let Some(delay) = lookup("FAULTLINE_MAX_DELAY_MS") {
            self.recovery.max_delay_ms = Some(parse_var("FAULTLINE_MAX_DELAY_MS", &delay)?);
        }
        if let Some(jitter) = lookup("FAULTLINE_JITTER") {
            self.recovery.jitter = parse_var("FAULTLINE_JITTER", &jitter)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate logging settings
        if self.logging.name.is_empty() {
            return Err(ConfigError::invalid_field(
                "logging.name",
                "Logger name cannot be empty",
            ));
        }
        self.logging.level()?;
        self.logging.format()?;
        if self.logging.file_path.is_some() {
            if self.logging.max_file_size == 0 {
                return Err(ConfigError::out_of_range(
                    "logging.max_file_size",
                    0,
                    "greater than 0",
                ));
            }
            if self.logging.max_files == 0 {
                return Err(ConfigError::out_of_range(
                    "logging.max_files",
                    0,
                    "greater than 0",
                ));
            }
        }

        // Validate handler settings
        if self.handler.history_limit == Some(0) {
            return Err(ConfigError::out_of_range(
                "handler.history_limit",
                0,
                "greater than 0",
            ));
        }

        Ok(())
    }

    /// Default location for the log file when file logging is requested
    /// without an explicit path
    pub fn default_log_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("faultline")
            .join("faultline.log")
    }
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid_env_var(var, value, e))
}
