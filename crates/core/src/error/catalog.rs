use super::{ErrorCategory, ErrorSeverity, RecoveryAction, TroubleshootingStep};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

/// Default diagnostic data applied to errors at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub severity: ErrorSeverity,
    pub recoverable: bool,
    pub user_message: String,
    pub recovery_actions: Vec<RecoveryAction>,
    pub troubleshooting_steps: Vec<TroubleshootingStep>,
}

impl CatalogEntry {
    pub fn new(severity: ErrorSeverity, recoverable: bool, user_message: impl Into<String>) -> Self {
        Self {
            severity,
            recoverable,
            user_message: user_message.into(),
            recovery_actions: Vec::new(),
            troubleshooting_steps: Vec::new(),
        }
    }

    pub fn action(mut self, action: RecoveryAction) -> Self {
        self.recovery_actions.push(action);
        self
    }

    pub fn step(mut self, description: &str, action: Option<&str>, expected: Option<&str>) -> Self {
        let mut step = TroubleshootingStep::new(self.troubleshooting_steps.len() as u32 + 1, description);
        step.action = action.map(str::to_string);
        step.expected_outcome = expected.map(str::to_string);
        self.troubleshooting_steps.push(step);
        self
    }
}

/// Lookup table of default error data keyed by `(category, code)`
///
/// Lookups fall back from the exact code to the category entry, and from
/// there to a generic entry, so every error gets complete defaults.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: HashMap<ErrorCategory, CatalogEntry>,
    codes: HashMap<(ErrorCategory, String), CatalogEntry>,
    fallback: CatalogEntry,
}

static BUILTIN: Lazy<Catalog> = Lazy::new(Catalog::with_builtin_entries);

impl Catalog {
    /// Create a catalog with no entries besides the generic fallback
    pub fn empty() -> Self {
        Self {
            categories: HashMap::new(),
            codes: HashMap::new(),
            fallback: CatalogEntry::new(
                ErrorSeverity::Medium,
                false,
                "An unexpected error occurred. Please try again.",
            )
            .step("Retry the operation", None, Some("The operation completes"))
            .step(
                "Contact support if the problem persists",
                None,
                None,
            ),
        }
    }

    /// The process-wide built-in catalog
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    pub fn insert_category(&mut self, category: ErrorCategory, entry: CatalogEntry) -> &mut Self {
        self.categories.insert(category, entry);
        self
    }

    pub fn insert_code(
        &mut self,
        category: ErrorCategory,
        code: impl Into<String>,
        entry: CatalogEntry,
    ) -> &mut Self {
        self.codes.insert((category, code.into()), entry);
        self
    }

    pub fn lookup(&self, category: ErrorCategory, code: &str) -> &CatalogEntry {
        self.codes
            .get(&(category, code.to_string()))
            .or_else(|| self.categories.get(&category))
            .unwrap_or(&self.fallback)
    }

    fn with_builtin_entries() -> Self {
        use ErrorCategory::*;
        use ErrorSeverity::*;

        let mut catalog = Self::empty();

        catalog
            .insert_category(
                Connection,
                CatalogEntry::new(High, true, "We lost the connection to a service. Retrying shortly.")
                    .action(RecoveryAction::retry("Reconnect to the service", 3, Duration::from_secs(1)))
                    .action(RecoveryAction::manual("Check your network connection"))
                    .step("Check that the service is running", None, Some("The service responds to health checks"))
                    .step("Verify network connectivity", Some("ping the service host"), Some("Packets are returned"))
                    .step("Retry the operation", None, Some("The connection is re-established")),
            )
            .insert_category(
                Model,
                CatalogEntry::new(High, true, "The AI model is unavailable. Switching to an alternative.")
                    .action(RecoveryAction::fallback("Use an alternative model"))
                    .action(RecoveryAction::retry("Retry with the same model", 2, Duration::from_secs(2)))
                    .step("Check the model provider status page", None, Some("The provider reports no outage"))
                    .step("Verify the model name and API key", None, Some("The model is listed for the account")),
            )
            .insert_category(
                DocumentProcessing,
                CatalogEntry::new(Medium, true, "We could not process the document.")
                    .action(RecoveryAction::fallback("Use an alternative document processor"))
                    .action(RecoveryAction::manual("Upload the document in a different format"))
                    .step("Check that the file is not corrupted", Some("open the file locally"), Some("The file opens"))
                    .step("Check that the format is supported", None, Some("The format is PDF, DOCX, TXT or Markdown")),
            )
            .insert_category(
                Workflow,
                CatalogEntry::new(Medium, true, "A workflow step failed. Retrying the step.")
                    .action(RecoveryAction::retry("Retry the failed step", 2, Duration::from_millis(500)))
                    .step("Review the workflow step inputs", None, Some("Inputs match the step schema"))
                    .step("Re-run the workflow from the failed step", None, None),
            )
            .insert_category(
                Filesystem,
                CatalogEntry::new(Medium, true, "A file operation failed.")
                    .action(RecoveryAction::retry("Retry the file operation", 3, Duration::from_millis(500)))
                    .step("Check that the path exists", Some("ls the parent directory"), Some("The path is listed"))
                    .step("Check file permissions", None, Some("The process can read and write the path"))
                    .step("Check available disk space", Some("df -h"), Some("Enough space is free")),
            )
            .insert_category(
                Validation,
                CatalogEntry::new(Low, false, "Some of the provided information is invalid.")
                    .action(RecoveryAction::manual("Correct the highlighted input"))
                    .step("Review the highlighted fields", None, Some("All fields pass validation")),
            )
            .insert_category(
                Authentication,
                CatalogEntry::new(High, false, "Please sign in again.")
                    .action(RecoveryAction::manual("Sign in again"))
                    .step("Sign out and sign back in", None, Some("A new session is created"))
                    .step("Check that the API key has not expired", None, None),
            )
            .insert_category(
                Authorization,
                CatalogEntry::new(High, false, "You do not have permission to perform this action.")
                    .action(RecoveryAction::manual("Request access from an administrator"))
                    .step("Confirm which permission is required", None, None)
                    .step("Ask an administrator to grant access", None, Some("The action is allowed")),
            )
            .insert_category(
                Network,
                CatalogEntry::new(High, true, "A network problem occurred. Retrying shortly.")
                    .action(RecoveryAction::retry("Retry the request", 3, Duration::from_secs(1)))
                    .step("Check your internet connection", None, Some("Other sites load"))
                    .step("Check proxy and firewall settings", None, None),
            )
            .insert_category(
                Database,
                CatalogEntry::new(High, true, "We could not reach the database.")
                    .action(RecoveryAction::retry("Retry the query", 3, Duration::from_secs(1)))
                    .step("Check that the database is running", None, Some("The database accepts connections"))
                    .step("Check the connection pool limits", None, None),
            )
            .insert_category(
                Cache,
                CatalogEntry::new(Low, true, "A cached value was unavailable; results may load slower.")
                    .action(RecoveryAction::ignore("Continue without the cache"))
                    .step("Clear the cache", None, Some("Fresh values are fetched")),
            )
            .insert_category(
                Configuration,
                CatalogEntry::new(High, true, "A setting is invalid. Default values are being used.")
                    .action(RecoveryAction::fallback("Fall back to the default value"))
                    .action(RecoveryAction::manual("Fix the setting"))
                    .step("Open the settings and review the reported key", None, None)
                    .step("Reset the setting to its default", None, Some("The application starts normally")),
            )
            .insert_category(
                System,
                CatalogEntry::new(Critical, false, "Something went wrong. Please restart the application.")
                    .action(RecoveryAction::manual("Restart the application"))
                    .step("Restart the application", None, Some("The application starts normally"))
                    .step("Collect logs and contact support", None, None),
            );

        catalog
            .insert_code(
                Connection,
                "CONNECTION_TIMEOUT",
                CatalogEntry::new(Medium, true, "The service is taking too long to respond. Retrying.")
                    .action(RecoveryAction::retry("Retry with a longer timeout", 3, Duration::from_secs(2)))
                    .step("Check the service latency", None, Some("Responses arrive within the timeout"))
                    .step("Retry the operation", None, None),
            )
            .insert_code(
                Model,
                "MODEL_RATE_LIMITED",
                CatalogEntry::new(Medium, true, "The AI model is busy. Retrying in a moment.")
                    .action(RecoveryAction::retry("Retry after the rate limit window", 3, Duration::from_secs(5)))
                    .action(RecoveryAction::fallback("Use an alternative model"))
                    .step("Wait for the rate limit window to reset", None, None)
                    .step("Reduce request frequency", None, Some("Requests are accepted")),
            )
            .insert_code(
                Filesystem,
                "FILE_NOT_FOUND",
                CatalogEntry::new(Medium, false, "The file could not be found.")
                    .action(RecoveryAction::manual("Select the file again"))
                    .step("Check the file path", None, Some("The file exists at the path"))
                    .step("Select the file again", None, None),
            )
            .insert_code(
                DocumentProcessing,
                "DOCUMENT_TOO_LARGE",
                CatalogEntry::new(Low, false, "The document is too large to process.")
                    .action(RecoveryAction::manual("Split the document into smaller parts"))
                    .step("Split the document into smaller files", None, Some("Each file is under the size limit")),
            );

        catalog
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_builtin_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_builtin_defaults() {
        let catalog = Catalog::builtin();
        for category in ErrorCategory::ALL {
            let entry = catalog.lookup(category, "UNLISTED_CODE");
            assert_ne!(entry, &Catalog::empty().fallback, "{category} uses the fallback");
            assert!(!entry.troubleshooting_steps.is_empty());
        }
    }

    #[test]
    fn test_code_entry_takes_precedence() {
        let catalog = Catalog::builtin();
        let entry = catalog.lookup(ErrorCategory::Filesystem, "FILE_NOT_FOUND");
        assert!(!entry.recoverable);
        let category_entry = catalog.lookup(ErrorCategory::Filesystem, "FILE_LOCKED");
        assert!(category_entry.recoverable);
    }

    #[test]
    fn test_empty_catalog_falls_back() {
        let catalog = Catalog::empty();
        let entry = catalog.lookup(ErrorCategory::Model, "ANY");
        assert_eq!(entry.severity, ErrorSeverity::Medium);
        assert!(!entry.recoverable);
        assert_eq!(entry.troubleshooting_steps.len(), 2);
    }

    #[test]
    fn test_custom_catalog() {
        let mut catalog = Catalog::empty();
        catalog.insert_category(
            ErrorCategory::Cache,
            CatalogEntry::new(ErrorSeverity::High, true, "cache down"),
        );
        let error = crate::ErrorBuilder::new(ErrorCategory::Cache, "CACHE_DOWN").build_with(&catalog);
        assert_eq!(error.severity(), ErrorSeverity::High);
        assert_eq!(error.user_message(), "cache down");
    }
}
