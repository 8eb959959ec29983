pub mod config;
pub mod service;

pub use config::{Config, LoggingSettings, RecoverySettings};
pub use service::Faultline;
