use std::time::Duration;

/// Error code assigned to failures wrapped by the generic handler path
pub const GENERIC_ERROR_CODE: &str = "GENERIC_ERROR";

/// Strategy name reported when no recovery strategy matched
pub const NO_STRATEGY: &str = "none";

/// Default number of reports returned by recent-error queries
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Default maximum recovery attempts per handled error
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Default per-attempt timeout for recovery strategies (30 seconds)
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum size of a log file before rotation (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of rotated log files to keep
pub const DEFAULT_MAX_FILES: usize = 5;

/// Default capacity of the in-memory log transport
pub const DEFAULT_MEMORY_ENTRIES: usize = 1000;
