//! Index storage error types
//!
//! Error codes:
//! - CINDER_STORAGE_IO (ERROR)
//! - CINDER_INDEX_REBUILD_FAILED (ERROR)

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed, the process stays healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Underlying storage read or write failed
    CinderStorageIo,
    /// Index rebuild aborted
    CinderIndexRebuildFailed,
}

impl IndexErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::CinderStorageIo => "CINDER_STORAGE_IO",
            IndexErrorCode::CinderIndexRebuildFailed => "CINDER_INDEX_REBUILD_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    partition: Option<u32>,
}

impl IndexError {
    /// Create a storage I/O error
    pub fn storage_io(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::CinderStorageIo,
            message: reason.into(),
            partition: None,
        }
    }

    /// Create a storage I/O error scoped to one partition
    pub fn partition_io(partition: u32, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::CinderStorageIo,
            message: format!("Partition {}: {}", partition, reason.into()),
            partition: Some(partition),
        }
    }

    /// Create a rebuild failed error for a table or index
    pub fn rebuild_failed(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            code: IndexErrorCode::CinderIndexRebuildFailed,
            message: format!("Index rebuild of '{}' failed: {}", target.into(), reason),
            partition: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

    /// Returns the partition if applicable
    pub fn partition(&self) -> Option<u32> {
        self.partition
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
