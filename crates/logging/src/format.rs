//! Pure conversions from [`LogEntry`] to output text

use crate::{LogEntry, LogLevel};
use faultline_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";

/// Converts a log entry into a single output record
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry) -> String;
}

/// Selectable output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Console,
    Simple,
    Compact,
}

impl LogFormat {
    pub fn formatter(&self, colors: bool) -> Box<dyn Formatter> {
        match self {
            LogFormat::Json => Box::new(JsonFormatter),
            LogFormat::Console => Box::new(ConsoleFormatter::new(colors)),
            LogFormat::Simple => Box::new(SimpleFormatter),
            LogFormat::Compact => Box::new(CompactFormatter),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "console" | "pretty" => Ok(LogFormat::Console),
            "simple" => Ok(LogFormat::Simple),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(ConfigError::invalid_field(
                "format",
                format!("Invalid log format: {s}. Valid options: json, console, simple, compact"),
            )),
        }
    }
}

/// Compact JSON object; optional fields appear only when present
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        serde_json::to_string(entry).unwrap_or_else(|e| {
            serde_json::json!({
                "timestamp": entry.timestamp,
                "level": entry.level,
                "message": entry.message,
                "format_error": e.to_string(),
            })
            .to_string()
        })
    }
}

/// Human-oriented header line followed by a pretty-printed data block
#[derive(Debug, Clone, Copy)]
pub struct ConsoleFormatter {
    colors: bool,
}

impl ConsoleFormatter {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }

    fn level_color(level: LogLevel) -> &'static str {
        match level {
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Critical => "\x1b[1;35m",
        }
    }
}

impl Formatter for ConsoleFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let mut out = String::new();

        if self.colors {
            let color = Self::level_color(entry.level);
            let _ = write!(
                out,
                "{DIM}{timestamp}{RESET} {color}{:<8}{RESET}",
                entry.level.label()
            );
        } else {
            let _ = write!(out, "{timestamp} {:<8}", entry.level.label());
        }

        let origin = match (&entry.logger, &entry.component) {
            (Some(logger), Some(component)) => Some(format!("{logger}:{component}")),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        };
        if let Some(origin) = origin {
            if self.colors {
                let _ = write!(out, " {BOLD}[{origin}]{RESET}");
            } else {
                let _ = write!(out, " [{origin}]");
            }
        }

        let _ = write!(out, " {}", entry.message);

        if let Some(request_id) = &entry.request_id {
            let _ = write!(out, " (request={request_id})");
        }

        if let Some(data) = &entry.data {
            let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            for line in pretty.lines() {
                out.push_str("\n    ");
                out.push_str(line);
            }
        }

        out
    }
}

/// Plain timestamped line
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFormatter;

impl Formatter for SimpleFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        let mut out = format!(
            "{} [{}]",
            entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            entry.level.label()
        );
        if let Some(component) = &entry.component {
            let _ = write!(out, " [{component}]");
        }
        let _ = write!(out, " {}", entry.message);
        if let Some(data) = &entry.data {
            let _ = write!(out, " {data}");
        }
        out
    }
}

/// Single-letter level and wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactFormatter;

impl Formatter for CompactFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        let time = entry.timestamp.format("%H:%M:%S");
        match &entry.component {
            Some(component) => format!(
                "{} {time} {component}: {}",
                entry.level.letter(),
                entry.message
            ),
            None => format!("{} {time} {}", entry.level.letter(), entry.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogContext;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry() -> LogEntry {
        let mut entry = LogEntry::new(LogLevel::Warn, "disk almost full")
            .with_context(&LogContext::component("storage"));
        entry.timestamp = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        entry
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let line = JsonFormatter.format(&entry());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "warn");
        assert_eq!(value["component"], "storage");
        assert!(value.get("data").is_none());
        assert!(value.get("request_id").is_none());
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_simple_line() {
        let line = SimpleFormatter.format(&entry().with_data(json!({"free_mb": 12})));
        assert_eq!(
            line,
            "2024-03-09T14:05:07.000Z [WARN] [storage] disk almost full {\"free_mb\":12}"
        );
    }

    #[test]
    fn test_compact_line() {
        assert_eq!(
            CompactFormatter.format(&entry()),
            "W 14:05:07 storage: disk almost full"
        );
    }

    #[test]
    fn test_console_without_colors() {
        let line = ConsoleFormatter::new(false).format(&entry().with_data(json!({"free_mb": 12})));
        let mut lines = line.lines();
        assert_eq!(
            lines.next().unwrap(),
            "2024-03-09 14:05:07.000 WARN     [storage] disk almost full"
        );
        assert!(line.contains("\"free_mb\": 12"));
        assert!(!line.contains('\x1b'));
    }

    #[test]
    fn test_console_with_colors() {
        let line = ConsoleFormatter::new(true).format(&entry());
        assert!(line.contains("\x1b[33m"));
        assert!(line.ends_with("disk almost full"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Console);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
