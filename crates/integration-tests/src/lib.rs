//! Shared helpers for faultline integration tests

pub mod common;

// Re-export commonly used types for tests
pub use faultline_core::{
    BaseError, ErrorBuilder, ErrorCategory, ErrorContext, ErrorReport, ErrorSeverity,
};
pub use faultline_logging::{LogLevel, Logger, MemoryTransport};
pub use faultline_service::{Config, Faultline};
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;
