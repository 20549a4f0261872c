//! Error types for sqlorm

use std::time::Duration;
use thiserror::Error;

/// Result type alias for sqlorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed error type drivers use to report failures.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for model registration, statement building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Registration target is not a struct with named fields
    #[error("only structs with named fields can be registered, got {0}")]
    PointerOnly(&'static str),

    /// Malformed `key=value` pair in a field tag
    #[error("invalid tag content: {0:?}")]
    InvalidTagContent(String),

    /// Field name not present in the model
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Column name not present in the model
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// Two fields map to the same column
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// A model for this type has already been published
    #[error("model already registered for {0}")]
    AlreadyRegistered(&'static str),

    /// INSERT without any value row
    #[error("insert requires at least one row")]
    InsertZeroRow,

    /// DELETE without WHERE. The generated SQL is still returned for inspection.
    #[error("refusing to delete every row: {sql}")]
    DeleteAll { sql: String },

    /// Query returned no rows where one was expected
    #[error("no rows in result set")]
    NoRows,

    /// Upsert on a dialect that needs a conflict target, without one
    #[error("upsert requires conflict columns for this dialect")]
    MissingConflictColumns,

    /// A value could not be converted to the requested Rust type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Row decode/mapping error
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),

    /// Query timeout error
    #[error("query timeout after {0:?}")]
    Timeout(Duration),

    /// Error reported by the database driver, passed through unchanged
    #[error(transparent)]
    Driver(DriverError),

    /// A transactional closure failed and the transaction was rolled back
    #[error(
        "transaction rolled back: {source} (rollback: {}, panicked: {panicked})",
        rollback_outcome(.rollback)
    )]
    Transaction {
        source: Box<OrmError>,
        rollback: Option<Box<OrmError>>,
        panicked: bool,
    },

    /// A transactional closure panicked
    #[error("panic: {0}")]
    Panic(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

fn rollback_outcome(rollback: &Option<Box<OrmError>>) -> String {
    match rollback {
        Some(err) => format!("failed: {err}"),
        None => "ok".to_string(),
    }
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap a driver error
    pub fn driver(err: impl Into<DriverError>) -> Self {
        Self::Driver(err.into())
    }

    /// Check if this is a "no rows" error
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Check if this is the unconditional-delete guard
    pub fn is_delete_all(&self) -> bool {
        matches!(self, Self::DeleteAll { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
