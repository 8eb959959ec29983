use crate::{report_fallback, ConsoleTransport, LogContext, LogEntry, LogLevel, Transport};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::backtrace::Backtrace;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Construction parameters for a [`Logger`]
#[derive(Clone)]
pub struct LoggerConfig {
    pub name: String,
    pub level: LogLevel,
    pub transports: Vec<Arc<dyn Transport>>,
    /// Attach a captured backtrace to entries written by [`Logger::log_error`]
    pub enable_stack_trace: bool,
    /// Emit timer entries from [`Logger::start_timer`] and friends
    pub enable_performance_tracking: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: "faultline".to_string(),
            level: LogLevel::Info,
            transports: vec![Arc::new(ConsoleTransport::default())],
            enable_stack_trace: false,
            enable_performance_tracking: false,
        }
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transports: Vec<&str> = self.transports.iter().map(|t| t.name()).collect();
        f.debug_struct("LoggerConfig")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("transports", &transports)
            .field("enable_stack_trace", &self.enable_stack_trace)
            .field("enable_performance_tracking", &self.enable_performance_tracking)
            .finish()
    }
}

/// Multi-transport logging facade
///
/// Loggers derived through [`Logger::child`] share the level and transport
/// list of the logger they came from; only the context is their own.
pub struct Logger {
    name: String,
    level: Arc<RwLock<LogLevel>>,
    transports: Arc<RwLock<Vec<Arc<dyn Transport>>>>,
    context: LogContext,
    enable_stack_trace: bool,
    enable_performance_tracking: bool,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            name: config.name,
            level: Arc::new(RwLock::new(config.level)),
            transports: Arc::new(RwLock::new(config.transports)),
            context: LogContext::default(),
            enable_stack_trace: config.enable_stack_trace,
            enable_performance_tracking: config.enable_performance_tracking,
        }
    }

    /// A logger with no transports
    pub fn silent() -> Self {
        Self::new(LoggerConfig {
            transports: Vec::new(),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn transport_names(&self) -> Vec<String> {
        self.transports
            .read()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    pub fn add_transport(&self, transport: Arc<dyn Transport>) {
        self.transports.write().push(transport);
    }

    /// Remove every transport registered under `name`
    pub fn remove_transport(&self, name: &str) -> bool {
        let mut transports = self.transports.write();
        let before = transports.len();
        transports.retain(|t| t.name() != name);
        transports.len() != before
    }

    /// Derive a logger with `context` layered over the current one
    ///
    /// Level changes and transport additions or removals made through either
    /// logger are seen by both.
    pub fn child(&self, context: LogContext) -> Logger {
        Logger {
            name: self.name.clone(),
            level: Arc::clone(&self.level),
            transports: Arc::clone(&self.transports),
            context: self.context.merge(&context),
            enable_stack_trace: self.enable_stack_trace,
            enable_performance_tracking: self.enable_performance_tracking,
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, None, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None, None);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message, None, None);
    }

    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<Value>,
        context: Option<&LogContext>,
    ) {
        if level < self.level() {
            return;
        }

        let context = match context {
            Some(overrides) => self.context.merge(overrides),
            None => self.context.clone(),
        };
        let mut entry = LogEntry::new(level, message).with_context(&context);
        entry.logger = Some(self.name.clone());
        entry.data = data;
        self.dispatch(&entry);
    }

    /// Log `error` at error level with its type, message and source chain
    /// under the `error` key of the entry data
    pub fn log_error<E>(
        &self,
        error: &E,
        message: Option<&str>,
        data: Option<Value>,
        context: Option<&LogContext>,
    ) where
        E: std::error::Error + ?Sized,
    {
        let mut sources = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            sources.push(Value::String(cause.to_string()));
            source = cause.source();
        }

        let mut details = Map::new();
        details.insert("name".to_string(), json!(short_type_name::<E>()));
        details.insert("message".to_string(), json!(error.to_string()));
        if !sources.is_empty() {
            details.insert("sources".to_string(), Value::Array(sources));
        }
        if self.enable_stack_trace {
            details.insert(
                "backtrace".to_string(),
                json!(Backtrace::force_capture().to_string()),
            );
        }

        let mut payload = match data {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
            None => Map::new(),
        };
        payload.insert("error".to_string(), Value::Object(details));

        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        self.log(LogLevel::Error, message, Some(Value::Object(payload)), context);
    }

    /// Start a timer that reports its duration when stopped or dropped
    pub fn start_timer(&self, name: impl Into<String>) -> Timer<'_> {
        Timer {
            logger: self,
            name: name.into(),
            started: Instant::now(),
            stopped: false,
        }
    }

    pub async fn with_timing<F>(&self, name: impl Into<String>, future: F) -> F::Output
    where
        F: Future,
    {
        let timer = self.start_timer(name);
        let output = future.await;
        timer.stop();
        output
    }

    pub fn with_timing_sync<T>(&self, name: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let timer = self.start_timer(name);
        let output = f();
        timer.stop();
        output
    }

    pub async fn flush(&self) {
        let transports = self.transports.read().clone();
        let results = join_all(transports.iter().map(|t| t.flush())).await;
        for (transport, result) in transports.iter().zip(results) {
            if let Err(e) = result {
                report_fallback(transport.name(), &e);
            }
        }
    }

    /// Close every transport concurrently
    pub async fn close(&self) {
        let transports = self.transports.read().clone();
        let results = join_all(transports.iter().map(|t| t.close())).await;
        for (transport, result) in transports.iter().zip(results) {
            if let Err(e) = result {
                report_fallback(transport.name(), &e);
            }
        }
    }

    fn dispatch(&self, entry: &LogEntry) {
        let transports = self.transports.read().clone();
        for transport in transports.iter().filter(|t| t.accepts(entry.level)) {
            match catch_unwind(AssertUnwindSafe(|| transport.log(entry))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => report_fallback(transport.name(), &e),
                Err(_) => report_fallback(transport.name(), &"transport panicked"),
            }
        }
    }

    fn record_timing(&self, name: &str, elapsed: Duration) {
        if !self.enable_performance_tracking {
            return;
        }
        self.log(
            LogLevel::Debug,
            format!("Timer {name} finished"),
            Some(json!({
                "timer": name,
                "duration_ms": elapsed.as_secs_f64() * 1000.0,
            })),
            None,
        );
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("transports", &self.transport_names())
            .field("context", &self.context)
            .finish()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Scoped timer; emits a debug entry once, on `stop` or on drop
pub struct Timer<'a> {
    logger: &'a Logger,
    name: String,
    started: Instant,
    stopped: bool,
}

impl Timer<'_> {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.logger.record_timing(&self.name, elapsed);
        }
        elapsed
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
