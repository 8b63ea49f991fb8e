//! Scan executor subsystem for cinder
//!
//! Runs physical scan plans on one node of a colocation group and yields
//! rows lazily.
//!
//! # Execution Flow (strict order)
//!
//! 1. Check colocation membership (non-members return nothing)
//! 2. Resolve the index (a missing index returns nothing)
//! 3. On first pull, evaluate the lower and upper bounds
//! 4. Seek every local partition to the lower bound
//! 5. Stop each partition once the upper bound is passed
//! 6. Project, filter, then transform each row
//!
//! # Invariants
//!
//! - Storage is never touched before the first pull
//! - Cancellation is observed between partitions and between rows
//! - An error ends the scan; it is yielded exactly once

mod colocation;
mod context;
mod errors;
pub mod index_scan;
mod pipeline;
pub mod table_scan;

#[cfg(test)]
pub(crate) mod test_support;

pub use colocation::ColocationGroup;
pub use context::{ExecutionContext, NodeId};
pub use errors::{ScanError, ScanResult};
pub use index_scan::IndexScan;
pub use pipeline::{
    expr_filter, fixed_bound, lower_bound_supplier, project_transform, upper_bound_supplier,
    BoundSupplier, RowFilter, RowTransform,
};
pub use table_scan::TableScan;
