use crate::format::{Formatter, JsonFormatter};
use crate::{report_fallback, LogEntry, LogLevel, Transport};
use async_trait::async_trait;
use faultline_core::constants::{DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE};
use faultline_core::{Error, Result};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Configuration for a rotating file transport
#[derive(Debug, Clone)]
pub struct FileTransportConfig {
    pub path: PathBuf,
    pub level: LogLevel,
    /// Size in bytes at which the active file is rotated
    pub max_file_size: u64,
    /// Number of rotated files kept next to the active one
    pub max_files: usize,
}

impl FileTransportConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            level: LogLevel::Info,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

enum Command {
    Write(String),
    Flush(oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<Result<()>>),
}

/// Appends newline-delimited records to a file with size-based rotation
///
/// All file access happens on a single writer task fed through a channel, so
/// rotation never races with a write and `log` never blocks the caller.
pub struct FileTransport {
    name: String,
    level: LogLevel,
    path: PathBuf,
    formatter: Box<dyn Formatter>,
    sender: mpsc::UnboundedSender<Command>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl FileTransport {
    /// Create the transport and spawn its writer task on the current runtime
    ///
    /// Fails when called outside a tokio runtime.
    pub fn new(config: FileTransportConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::transport("file", format!("no tokio runtime for writer task: {e}")))?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = FileWriter {
            path: config.path.clone(),
            max_file_size: config.max_file_size.max(1),
            max_files: config.max_files,
            state: FileState::Closed,
            written: 0,
        };
        let handle = runtime.spawn(writer.run(receiver));

        Ok(Self {
            name: "file".to_string(),
            level: config.level,
            path: config.path,
            formatter: Box::new(JsonFormatter),
            sender,
            writer: Mutex::new(Some(handle)),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn request(&self, make: impl FnOnce(oneshot::Sender<Result<()>>) -> Command) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(make(ack))
            .map_err(|_| Error::transport(&self.name, "writer task has stopped"))?;
        done.await
            .map_err(|_| Error::transport(&self.name, "writer task dropped the request"))?
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, entry: &LogEntry) -> Result<()> {
        let line = self.formatter.format(entry);
        self.sender
            .send(Command::Write(line))
            .map_err(|_| Error::transport(&self.name, "writer task has stopped"))
    }

    async fn flush(&self) -> Result<()> {
        self.request(Command::Flush).await
    }

    async fn close(&self) -> Result<()> {
        let result = self.request(Command::Close).await;
        let handle = self.writer.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| Error::transport(&self.name, format!("writer task failed: {e}")))?;
        }
        result
    }
}

/// Lifecycle of the active file handle
enum FileState {
    Closed,
    Open(File),
    Rotating,
}

struct FileWriter {
    path: PathBuf,
    max_file_size: u64,
    max_files: usize,
    state: FileState,
    written: u64,
}

impl FileWriter {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = receiver.recv().await {
            match command {
                Command::Write(line) => {
                    if let Err(e) = self.write(&line).await {
                        report_fallback(&format!("file transport {}", self.path.display()), &e);
                        // Reopen on the next write
                        self.state = FileState::Closed;
                    }
                }
                Command::Flush(ack) => {
                    let _ = ack.send(self.flush().await);
                }
                Command::Close(ack) => {
                    let result = self.flush().await;
                    self.state = FileState::Closed;
                    let _ = ack.send(result);
                    return;
                }
            }
        }

        if let Err(e) = self.flush().await {
            report_fallback(&format!("file transport {}", self.path.display()), &e);
        }
    }

    async fn write(&mut self, line: &str) -> Result<()> {
        if matches!(self.state, FileState::Closed) {
            self.open().await?;
        }
        if self.written >= self.max_file_size {
            self.rotate().await?;
        }

        let FileState::Open(file) = &mut self.state else {
            return Err(Error::Internal("log file is not open".to_string()));
        };
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let FileState::Open(file) = &mut self.state {
            file.flush().await?;
        }
        Ok(())
    }

    /// Open the active file, rotating first if it is already over the limit
    async fn open(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let existing = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let written = if existing >= self.max_file_size {
            self.state = FileState::Rotating;
            rotate_files(&self.path, self.max_files).await?;
            0
        } else {
            existing
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        debug!(path = %self.path.display(), size = written, "Opened log file");

        self.state = FileState::Open(file);
        self.written = written;
        Ok(())
    }

    async fn rotate(&mut self) -> Result<()> {
        if let FileState::Open(mut file) = std::mem::replace(&mut self.state, FileState::Rotating) {
            file.flush().await?;
        }

        let rotated = rotate_files(&self.path, self.max_files).await;
        self.state = FileState::Closed;
        self.written = 0;
        rotated?;

        info!(path = %self.path.display(), "Rotated log file");
        self.open().await
    }
}

/// Path of the `index`-th rotated file: `app.log` becomes `app.<index>.log`
pub fn rotated_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{index}"),
    };
    path.with_file_name(name)
}

/// Shift `name.k.ext` to `name.(k+1).ext`, dropping anything past `max_files`,
/// then move the active file to `name.1.ext`
async fn rotate_files(path: &Path, max_files: usize) -> Result<()> {
    if max_files == 0 {
        return remove_if_exists(path).await;
    }

    remove_if_exists(&rotated_path(path, max_files)).await?;
    for index in (1..max_files).rev() {
        rename_if_exists(&rotated_path(path, index), &rotated_path(path, index + 1)).await?;
    }
    rename_if_exists(path, &rotated_path(path, 1)).await
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn rename_if_exists(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SimpleFormatter;
    use tempfile::TempDir;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
    }

    fn config(dir: &TempDir, max_file_size: u64, max_files: usize) -> FileTransportConfig {
        FileTransportConfig {
            path: dir.path().join("logs").join("app.log"),
            level: LogLevel::Debug,
            max_file_size,
            max_files,
        }
    }

    #[test]
    fn test_rotated_path() {
        let path = Path::new("/var/log/app.log");
        assert_eq!(rotated_path(path, 1), PathBuf::from("/var/log/app.1.log"));
        assert_eq!(rotated_path(Path::new("trace"), 3), PathBuf::from("trace.3"));
    }

    #[tokio::test]
    async fn test_writes_json_lines_and_creates_directories() {
        let dir = TempDir::new().unwrap();
        let transport = FileTransport::new(config(&dir, 1024 * 1024, 3)).unwrap();

        transport.log(&entry("first")).unwrap();
        transport.log(&entry("second")).unwrap();
        transport.flush().await.unwrap();

        let content = std::fs::read_to_string(transport.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["message"], "first");
        assert_eq!(first["level"], "info");
    }

    #[tokio::test]
    async fn test_rotation_moves_previous_content() {
        let dir = TempDir::new().unwrap();
        let transport = FileTransport::new(config(&dir, 64, 3)).unwrap();

        // Each JSON record is well over 64 bytes, so every write after the
        // first starts by rotating.
        transport.log(&entry("before rotation")).unwrap();
        transport.log(&entry("after rotation")).unwrap();
        transport.flush().await.unwrap();

        let active = std::fs::read_to_string(transport.path()).unwrap();
        let rotated = std::fs::read_to_string(rotated_path(transport.path(), 1)).unwrap();
        assert!(rotated.contains("before rotation"));
        assert!(!rotated.contains("after rotation"));
        assert!(active.contains("after rotation"));
        assert_eq!(active.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_rotation_retains_at_most_max_files() {
        let dir = TempDir::new().unwrap();
        let transport = FileTransport::new(config(&dir, 1, 2))
            .unwrap()
            .with_formatter(Box::new(SimpleFormatter));

        for i in 0..5 {
            transport.log(&entry(&format!("record {i}"))).unwrap();
        }
        transport.flush().await.unwrap();

        let path = transport.path();
        assert!(std::fs::read_to_string(path).unwrap().contains("record 4"));
        assert!(std::fs::read_to_string(rotated_path(path, 1)).unwrap().contains("record 3"));
        assert!(std::fs::read_to_string(rotated_path(path, 2)).unwrap().contains("record 2"));
        assert!(!rotated_path(path, 3).exists());
    }

    #[tokio::test]
    async fn test_oversized_existing_file_rotated_on_open() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 16, 1);
        std::fs::create_dir_all(cfg.path.parent().unwrap()).unwrap();
        std::fs::write(&cfg.path, "left over from a previous run\n").unwrap();

        let transport = FileTransport::new(cfg).unwrap();
        transport.log(&entry("fresh")).unwrap();
        transport.flush().await.unwrap();

        let rotated = std::fs::read_to_string(rotated_path(transport.path(), 1)).unwrap();
        assert!(rotated.contains("left over"));
        let active = std::fs::read_to_string(transport.path()).unwrap();
        assert!(active.contains("fresh"));
        assert!(!active.contains("left over"));
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let dir = TempDir::new().unwrap();
        let err = FileTransport::new(config(&dir, 1024, 1)).err().unwrap();
        assert!(err.to_string().contains("no tokio runtime"));
        assert!(!dir.path().join("logs").exists());
    }

    #[tokio::test]
    async fn test_log_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let transport = FileTransport::new(config(&dir, 1024, 1)).unwrap();
        transport.log(&entry("last words")).unwrap();
        transport.close().await.unwrap();

        assert!(transport.log(&entry("too late")).is_err());
        let content = std::fs::read_to_string(transport.path()).unwrap();
        assert!(content.contains("last words"));
    }
}
