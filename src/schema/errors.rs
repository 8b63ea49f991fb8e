//! Catalog error types
//!
//! Error codes:
//! - CINDER_DUPLICATE_TABLE (REJECT)
//! - CINDER_DUPLICATE_INDEX (REJECT)
//! - CINDER_UNKNOWN_TABLE (REJECT)
//! - CINDER_UNKNOWN_INDEX (REJECT)
//! - CINDER_UNKNOWN_COLUMN (REJECT)
//! - CINDER_TYPE_MISMATCH (REJECT)

use std::fmt;

use thiserror::Error;

use crate::index::IndexError;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Catalog request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Catalog error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Table name already registered
    CinderDuplicateTable,
    /// Index name already registered on the table
    CinderDuplicateIndex,
    /// Table not found
    CinderUnknownTable,
    /// Index not found on the table
    CinderUnknownIndex,
    /// Column position or name outside the row type
    CinderUnknownColumn,
    /// Row does not fit the table's row type
    CinderTypeMismatch,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::CinderDuplicateTable => "CINDER_DUPLICATE_TABLE",
            SchemaErrorCode::CinderDuplicateIndex => "CINDER_DUPLICATE_INDEX",
            SchemaErrorCode::CinderUnknownTable => "CINDER_UNKNOWN_TABLE",
            SchemaErrorCode::CinderUnknownIndex => "CINDER_UNKNOWN_INDEX",
            SchemaErrorCode::CinderUnknownColumn => "CINDER_UNKNOWN_COLUMN",
            SchemaErrorCode::CinderTypeMismatch => "CINDER_TYPE_MISMATCH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Catalog error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    table: Option<String>,
}

impl SchemaError {
    pub fn duplicate_table(table: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::CinderDuplicateTable,
            message: format!("Table '{}' already exists", t),
            table: Some(t),
        }
    }

    pub fn duplicate_index(table: impl Into<String>, index: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::CinderDuplicateIndex,
            message: format!("Index '{}' already exists on table '{}'", index.into(), t),
            table: Some(t),
        }
    }

    pub fn unknown_table(table: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::CinderUnknownTable,
            message: format!("Table '{}' not found", t),
            table: Some(t),
        }
    }

    pub fn unknown_index(table: impl Into<String>, index: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::CinderUnknownIndex,
            message: format!("Index '{}' not found on table '{}'", index.into(), t),
            table: Some(t),
        }
    }

    pub fn unknown_column(table: impl Into<String>, column: impl fmt::Display) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::CinderUnknownColumn,
            message: format!("Column '{}' does not exist in table '{}'", column, t),
            table: Some(t),
        }
    }

    pub fn type_mismatch(table: impl Into<String>, reason: impl fmt::Display) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::CinderTypeMismatch,
            message: format!("Row rejected by table '{}': {}", t, reason),
            table: Some(t),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the table name if applicable
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for catalog operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors from a row write
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The row does not fit the table
    #[error(transparent)]
    Rejected(#[from] SchemaError),

    /// Row or index storage failed
    #[error(transparent)]
    Storage(#[from] IndexError),
}

impl WriteError {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            WriteError::Rejected(e) => e.code().code(),
            WriteError::Storage(e) => e.code().code(),
        }
    }
}

/// Result type for row writes
pub type WriteResult<T> = Result<T, WriteError>;
