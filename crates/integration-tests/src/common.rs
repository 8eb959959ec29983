//! Common utilities for integration tests

use crate::*;
use faultline_handler::ErrorListener;
use parking_lot::Mutex;
use std::path::Path;
use tempfile::TempDir;

/// Configuration with console output off and debug-level logging
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.logging.console = false;
    config.logging.level = "debug".to_string();
    config
}

/// Same as [`quiet_config`], plus a rotating log file inside `dir`
pub fn file_logging_config(dir: &Path, max_file_size: u64, max_files: usize) -> Config {
    let mut config = quiet_config();
    config.logging.file_path = Some(dir.join("logs").join("faultline.log"));
    config.logging.max_file_size = max_file_size;
    config.logging.max_files = max_files;
    config
}

/// A service whose log output is captured in memory
pub async fn create_test_service(config: Config) -> (Faultline, Arc<MemoryTransport>) {
    let memory = Arc::new(MemoryTransport::new(10_000));
    let service = Faultline::init_with_transports(config, vec![memory.clone()])
        .await
        .expect("Failed to initialize service");
    (service, memory)
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Listener keeping every report it sees
#[derive(Default)]
pub struct RecordingListener {
    reports: Mutex<Vec<ErrorReport>>,
}

impl RecordingListener {
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }
}

impl ErrorListener for RecordingListener {
    fn on_error(&self, _error: &BaseError, report: &ErrorReport) -> anyhow::Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}

/// Read every line of the active log file and its rotated siblings
pub fn read_log_lines(path: &Path, max_files: usize) -> Vec<Value> {
    let mut paths = vec![path.to_path_buf()];
    paths.extend((1..=max_files).map(|i| faultline_logging::rotated_path(path, i)));

    paths
        .iter()
        .filter(|p| p.exists())
        .flat_map(|p| {
            std::fs::read_to_string(p)
                .expect("Failed to read log file")
                .lines()
                .map(|line| serde_json::from_str(line).expect("Log line is not JSON"))
                .collect::<Vec<Value>>()
        })
        .collect()
}
