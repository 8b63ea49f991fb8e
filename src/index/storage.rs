//! Storage abstractions consumed by the scan executors
//!
//! The index storage is a sorted, seekable store per partition. The core
//! relies on exactly two read operations: `seek` to a position at or after
//! a key prefix, and `next` on the resulting cursor. Table storage exposes a
//! plain per-partition row cursor used by table scans and index rebuilds.

use crate::schema::{Collation, Row, Value};

use super::errors::IndexResult;

/// Partition number within a cache
pub type PartitionId = u32;

/// Stable row identity within a table
pub type RowId = u64;

/// One entry returned by an index cursor
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Collation column values, in collation order
    pub key: Vec<Value>,
    /// Row identity
    pub row_id: RowId,
    /// Full table row
    pub row: Row,
}

/// Forward cursor over one partition of an index
pub trait IndexCursor: Send {
    /// Returns the next entry, `None` at end of partition
    fn next(&mut self) -> IndexResult<Option<IndexEntry>>;
}

/// Sorted index storage, partitioned
pub trait IndexStorage: Send + Sync {
    /// Sort order of the stored keys (table column positions)
    fn collation(&self) -> &Collation;

    /// Opens a cursor positioned at or after the given key prefix.
    ///
    /// `None` positions the cursor at the first entry of the partition.
    fn seek(&self, partition: PartitionId, lower: Option<&[Value]>)
        -> IndexResult<Box<dyn IndexCursor>>;

    /// Adds a row to the index
    fn insert(&self, partition: PartitionId, row_id: RowId, row: &Row) -> IndexResult<()>;

    /// Removes a row from the index
    fn remove(&self, partition: PartitionId, row_id: RowId, row: &Row) -> IndexResult<()>;

    /// Drops every entry of every partition
    fn clear(&self) -> IndexResult<()>;

    /// Total number of entries
    fn entry_count(&self) -> usize;
}

/// Forward cursor over one partition of a table
pub trait RowCursor: Send {
    fn next(&mut self) -> IndexResult<Option<(RowId, Row)>>;
}

/// Partitioned primary row storage
pub trait TableStorage: Send + Sync {
    /// Partitions that currently hold data, ascending
    fn partitions(&self) -> Vec<PartitionId>;

    /// Opens a cursor over one partition, in row id order
    fn scan(&self, partition: PartitionId) -> IndexResult<Box<dyn RowCursor>>;

    /// Inserts or replaces a row
    fn insert(&self, partition: PartitionId, row_id: RowId, row: Row) -> IndexResult<Option<Row>>;

    /// Removes a row, returning it if present
    fn remove(&self, partition: PartitionId, row_id: RowId) -> IndexResult<Option<Row>>;

    /// Total number of rows
    fn row_count(&self) -> usize;
}
