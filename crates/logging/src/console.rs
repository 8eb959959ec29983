use crate::format::{ConsoleFormatter, Formatter};
use crate::{LogEntry, LogLevel, Transport};
use async_trait::async_trait;
use faultline_core::Result;
use std::io::Write;

/// Standard stream a console entry is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

impl ConsoleStream {
    /// Warnings and above go to stderr
    pub fn for_level(level: LogLevel) -> Self {
        if level >= LogLevel::Warn {
            ConsoleStream::Stderr
        } else {
            ConsoleStream::Stdout
        }
    }
}

/// Writes formatted entries to stdout, or stderr for warnings and above
pub struct ConsoleTransport {
    name: String,
    level: LogLevel,
    formatter: Box<dyn Formatter>,
}

impl ConsoleTransport {
    pub fn new(level: LogLevel, colors: bool) -> Self {
        Self {
            name: "console".to_string(),
            level,
            formatter: Box::new(ConsoleFormatter::new(colors)),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Target stream and formatted line for `entry`
    pub fn render(&self, entry: &LogEntry) -> (ConsoleStream, String) {
        (ConsoleStream::for_level(entry.level), self.formatter.format(entry))
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new(LogLevel::Info, true)
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, entry: &LogEntry) -> Result<()> {
        match self.render(entry) {
            (ConsoleStream::Stdout, line) => writeln!(std::io::stdout().lock(), "{line}")?,
            (ConsoleStream::Stderr, line) => writeln!(std::io::stderr().lock(), "{line}")?,
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompactFormatter, JsonFormatter};

    #[test]
    fn test_levels_route_to_streams() {
        let transport = ConsoleTransport::new(LogLevel::Debug, false);

        for level in [LogLevel::Debug, LogLevel::Info] {
            let (stream, _) = transport.render(&LogEntry::new(level, "quiet"));
            assert_eq!(stream, ConsoleStream::Stdout, "{level:?}");
        }
        for level in [LogLevel::Warn, LogLevel::Error, LogLevel::Critical] {
            let (stream, _) = transport.render(&LogEntry::new(level, "loud"));
            assert_eq!(stream, ConsoleStream::Stderr, "{level:?}");
        }
    }

    #[test]
    fn test_default_formatter_without_colors() {
        let transport = ConsoleTransport::new(LogLevel::Info, false);
        let (_, line) = transport.render(&LogEntry::new(LogLevel::Info, "ready"));

        assert!(line.ends_with(" ready"));
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn test_custom_formatter_is_used() {
        let transport =
            ConsoleTransport::new(LogLevel::Info, true).with_formatter(Box::new(JsonFormatter));
        let (stream, line) = transport.render(&LogEntry::new(LogLevel::Error, "disk full"));

        assert_eq!(stream, ConsoleStream::Stderr);
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["message"], "disk full");

        let compact = ConsoleTransport::new(LogLevel::Info, false)
            .with_name("compact")
            .with_formatter(Box::new(CompactFormatter));
        let (_, line) = compact.render(&LogEntry::new(LogLevel::Warn, "slow"));
        assert_eq!(compact.name(), "compact");
        assert!(line.contains("slow"));
        assert!(serde_json::from_str::<serde_json::Value>(&line).is_err());
    }

    #[test]
    fn test_transport_level_gate() {
        let transport = ConsoleTransport::new(LogLevel::Warn, false);
        assert!(!transport.accepts(LogLevel::Info));
        assert!(transport.accepts(LogLevel::Error));
        assert!(transport.log(&LogEntry::new(LogLevel::Warn, "written")).is_ok());
    }
}
