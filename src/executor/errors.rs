//! Scan execution errors
//!
//! Error codes:
//! - CINDER_QUERY_CANCELLED
//! - CINDER_STORAGE_IO
//! - CINDER_EVALUATION_FAILED
//! - CINDER_UNKNOWN_TABLE
//!
//! A missing index or a node outside the colocation group is not an error:
//! the scan is simply empty.

use thiserror::Error;
use uuid::Uuid;

use crate::index::IndexError;
use crate::planner::ExprError;

/// Result type for scan execution
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors surfaced by a running scan
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    /// The query's cancellation signal was raised
    #[error("Query {0} cancelled")]
    Cancelled(Uuid),

    /// Index or table storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] IndexError),

    /// A bound, filter or projection could not be evaluated
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] ExprError),

    /// The scanned table no longer exists
    #[error("Table '{0}' not found")]
    UnknownTable(String),
}

impl ScanError {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::Cancelled(_) => "CINDER_QUERY_CANCELLED",
            ScanError::Storage(_) => "CINDER_STORAGE_IO",
            ScanError::Evaluation(_) => "CINDER_EVALUATION_FAILED",
            ScanError::UnknownTable(_) => "CINDER_UNKNOWN_TABLE",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled(_))
    }
}
