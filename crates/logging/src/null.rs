use crate::{LogEntry, LogLevel, Transport};
use async_trait::async_trait;
use faultline_core::Result;

/// Discards every entry
#[derive(Debug, Clone)]
pub struct NullTransport {
    name: String,
}

impl NullTransport {
    pub fn new() -> Self {
        Self {
            name: "null".to_string(),
        }
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for NullTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }

    fn log(&self, _entry: &LogEntry) -> Result<()> {
        Ok(())
    }
}
