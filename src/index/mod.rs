//! Index subsystem for cinder
//!
//! Sorted, partitioned secondary indexes over table rows, plus the rebuild
//! flag that tells the planner when index contents cannot be trusted.
//!
//! # Invariants
//!
//! - Index entries are written after the primary row write
//! - Within one partition, cursors return entries in index order
//! - Cursors read the partition snapshot taken when they were opened
//! - The rebuild flag is raised for the full duration of a rebuild

mod availability;
mod errors;
mod key;
mod memory;
mod rebuild;
mod storage;

pub use availability::{RebuildFlag, RebuildGuard};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use key::{compare_prefix, IndexKey, KeyPart, RangeBound};
pub use memory::{MemoryIndexStorage, MemoryTableStorage};
pub use rebuild::{IndexRebuildJob, RebuildStats};
pub use storage::{
    IndexCursor, IndexEntry, IndexStorage, PartitionId, RowCursor, RowId, TableStorage,
};
