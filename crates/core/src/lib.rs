pub mod constants;
pub mod error;
pub mod report;

pub use error::{
    BaseError, Catalog, CatalogEntry, ConfigError, Error, ErrorBuilder, ErrorCategory,
    ErrorContext, ErrorSeverity, IntoBaseError, RecoveryAction, RecoveryActionKind, Result,
    TroubleshootingStep,
};
pub use report::{serialize_millis, ErrorReport, RecoveryResult};
