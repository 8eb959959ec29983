use crate::{LogEntry, LogLevel, Transport};
use async_trait::async_trait;
use faultline_core::Result;
use tracing::{debug, error, info, warn};

/// Forwards entries into the `tracing` ecosystem
///
/// Lets hosts that already install a `tracing` subscriber receive facade
/// output through their existing pipeline.
#[derive(Debug, Clone)]
pub struct TracingTransport {
    name: String,
    level: LogLevel,
}

impl TracingTransport {
    pub fn new(level: LogLevel) -> Self {
        Self {
            name: "tracing".to_string(),
            level,
        }
    }
}

impl Default for TracingTransport {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

#[async_trait]
impl Transport for TracingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, entry: &LogEntry) -> Result<()> {
        let logger = entry.logger.as_deref().unwrap_or_default();
        let component = entry.component.as_deref().unwrap_or_default();
        let request_id = entry.request_id.as_deref().unwrap_or_default();
        let data = entry
            .data
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();

        match entry.level {
            LogLevel::Debug => debug!(
                logger = %logger,
                component = %component,
                request_id = %request_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Info => info!(
                logger = %logger,
                component = %component,
                request_id = %request_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Warn => warn!(
                logger = %logger,
                component = %component,
                request_id = %request_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Error => error!(
                logger = %logger,
                component = %component,
                request_id = %request_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Critical => error!(
                logger = %logger,
                component = %component,
                request_id = %request_id,
                data = %data,
                critical = true,
                "{}",
                entry.message
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogContext, Logger, LoggerConfig};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a fmt subscriber and return everything it printed
    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_forwards_entry_fields() {
        let transport = TracingTransport::default();
        let mut entry = LogEntry::new(LogLevel::Critical, "pool exhausted")
            .with_context(&LogContext::component("recovery").with_request("req-7"));
        entry.logger = Some("app".to_string());

        let output = capture(|| transport.log(&entry).unwrap());

        assert!(output.contains("ERROR"));
        assert!(output.contains("pool exhausted"));
        assert!(output.contains("component=recovery"));
        assert!(output.contains("request_id=req-7"));
        assert!(output.contains("critical=true"));
    }

    #[test]
    fn test_levels_map_to_tracing_levels() {
        let transport = TracingTransport::default();
        let output = capture(|| {
            transport.log(&LogEntry::new(LogLevel::Debug, "d")).unwrap();
            transport.log(&LogEntry::new(LogLevel::Info, "i")).unwrap();
            transport.log(&LogEntry::new(LogLevel::Warn, "w")).unwrap();
        });

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("DEBUG"));
        assert!(lines[1].contains("INFO"));
        assert!(lines[2].contains("WARN"));
    }

    #[test]
    fn test_logger_fan_out_respects_transport_level() {
        let logger = Logger::new(LoggerConfig {
            level: LogLevel::Debug,
            transports: vec![Arc::new(TracingTransport::new(LogLevel::Warn))],
            ..Default::default()
        });

        let output = capture(|| {
            logger.info("skipped");
            logger.error("forwarded");
        });

        assert!(!output.contains("skipped"));
        assert!(output.contains("forwarded"));
        assert!(output.contains("logger=faultline"));
    }
}
