//! Structured logging facade with pluggable transports
//!
//! A [`Logger`] builds each [`LogEntry`] once and fans it out to every
//! transport whose level admits it. Transport failures never reach the caller;
//! they are reported on the stderr fallback channel instead.

use async_trait::async_trait;
use faultline_core::Result;
use std::fmt::Display;

mod bridge;
mod console;
mod entry;
mod file;
pub mod format;
mod logger;
mod memory;
mod null;

pub use bridge::TracingTransport;
pub use console::{ConsoleStream, ConsoleTransport};
pub use entry::{LogContext, LogEntry, LogLevel};
pub use file::{rotated_path, FileTransport, FileTransportConfig};
pub use format::{
    CompactFormatter, ConsoleFormatter, Formatter, JsonFormatter, LogFormat, SimpleFormatter,
};
pub use logger::{Logger, LoggerConfig, Timer};
pub use memory::MemoryTransport;
pub use null::NullTransport;

/// Destination for log entries
///
/// `log` must not block on I/O: transports that write somewhere slow hand the
/// record off to a background task and surface completion through `flush`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Unique name used by [`Logger::remove_transport`]
    fn name(&self) -> &str;

    /// Minimum level this transport accepts
    fn level(&self) -> LogLevel;

    fn accepts(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    fn log(&self, entry: &LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Last-resort channel for failures inside the logging pipeline itself
pub(crate) fn report_fallback(source: &str, error: &dyn Display) {
    eprintln!("[faultline-logging] {source}: {error}");
}
