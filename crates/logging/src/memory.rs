use crate::{LogEntry, LogLevel, Transport};
use async_trait::async_trait;
use faultline_core::constants::DEFAULT_MEMORY_ENTRIES;
use faultline_core::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::trace;

/// Bounded in-memory transport for tests and introspection
///
/// Once `max_entries` is reached the oldest entry is evicted for every new one.
pub struct MemoryTransport {
    name: String,
    level: LogLevel,
    max_entries: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl MemoryTransport {
    pub fn new(max_entries: usize) -> Self {
        Self {
            name: "memory".to_string(),
            level: LogLevel::Debug,
            max_entries: max_entries.max(1),
            entries: Mutex::new(VecDeque::with_capacity(max_entries.clamp(1, 4096))),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Retained entries with exactly the given level, oldest first
    pub fn entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.level == level)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every retained entry, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_ENTRIES)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, entry: &LogEntry) -> Result<()> {
        let mut entries = self.entries.lock();
        while entries.len() >= self.max_entries {
            entries.pop_front();
            trace!(transport = %self.name, "Memory transport evicted oldest entry");
        }
        entries.push_back(entry.clone());
        Ok(())
    }
}
