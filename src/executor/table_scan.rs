//! Table scan executor
//!
//! Fallback access path: reads every local partition of the primary row
//! storage in ascending partition order and applies the full filter. Shares
//! the membership, cancellation and error handling rules of the index scan.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::index::{PartitionId, RowCursor, TableStorage};
use crate::schema::{RequiredColumns, Row};

use super::colocation::ColocationGroup;
use super::context::ExecutionContext;
use super::errors::{ScanError, ScanResult};
use super::pipeline::{
    report_failure, report_skipped, CancelCheck, RowFilter, RowPipeline, RowTransform,
};

const SCAN_KIND: &str = "table";

/// Starts a table scan over the partitions this node owns in `group`
pub fn scan(
    ctx: &ExecutionContext,
    storage: Arc<dyn TableStorage>,
    group: &ColocationGroup,
    filter: Option<RowFilter>,
    transform: Option<RowTransform>,
    required: Option<RequiredColumns>,
) -> TableScan {
    let pipeline = RowPipeline::new(required, filter, transform, Arc::clone(ctx.metrics()));
    let partitions = match group.partitions(&ctx.local_node()) {
        Some(partitions) => {
            ctx.metrics().increment_scans_started();
            partitions.iter().copied().collect()
        }
        None => {
            report_skipped(ctx, SCAN_KIND, "not_member");
            VecDeque::new()
        }
    };

    TableScan {
        ctx: ctx.clone(),
        cancel: CancelCheck::new(ctx.cancel_check_interval()),
        pipeline,
        storage,
        partitions,
        cursor: None,
        done: false,
    }
}

/// Lazy table scan; see [`scan`]
pub struct TableScan {
    ctx: ExecutionContext,
    cancel: CancelCheck,
    pipeline: RowPipeline,
    storage: Arc<dyn TableStorage>,
    partitions: VecDeque<PartitionId>,
    cursor: Option<Box<dyn RowCursor>>,
    done: bool,
}

impl TableScan {
    fn fail(&mut self, err: ScanError) -> Option<ScanResult<Row>> {
        self.done = true;
        self.cursor = None;
        self.partitions.clear();
        report_failure(&self.ctx, SCAN_KIND, &err);
        Some(Err(err))
    }

    /// Next raw row across partitions, opening cursors as needed
    fn next_raw(&mut self) -> ScanResult<Option<Row>> {
        loop {
            if let Some(cursor) = self.cursor.as_mut() {
                if let Some((_, row)) = cursor.next()? {
                    return Ok(Some(row));
                }
                self.cursor = None;
            }
            let Some(partition) = self.partitions.pop_front() else {
                return Ok(None);
            };
            if self.ctx.is_cancelled() {
                return Err(ScanError::Cancelled(self.ctx.query_id()));
            }
            self.cursor = Some(self.storage.scan(partition)?);
        }
    }
}

impl Iterator for TableScan {
    type Item = ScanResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let row = match self.next_raw() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => return self.fail(e),
            };
            if self.cancel.tick(&self.ctx) {
                let query = self.ctx.query_id();
                return self.fail(ScanError::Cancelled(query));
            }
            match self.pipeline.process(row) {
                Ok(Some(row)) => return Some(Ok(row)),
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::pipeline::expr_filter;
    use crate::index::MemoryTableStorage;
    use crate::planner::expr::{col, gt, lit};
    use crate::row;
    use uuid::Uuid;

    fn storage() -> Arc<dyn TableStorage> {
        let storage = MemoryTableStorage::new();
        storage.insert(2, 1, row![20, "b"]).unwrap();
        storage.insert(1, 2, row![10, "a"]).unwrap();
        storage.insert(3, 3, row![30, "c"]).unwrap();
        storage.insert(1, 4, row![11, "d"]).unwrap();
        Arc::new(storage)
    }

    #[test]
    fn test_partitions_ascending() {
        let node = Uuid::new_v4();
        let ctx = ExecutionContext::for_node(node, Default::default());
        let group = ColocationGroup::new().with_node(node, [2, 1]);

        let rows: Vec<Row> = scan(&ctx, storage(), &group, None, None, None)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows, vec![row![10, "a"], row![11, "d"], row![20, "b"]]);
    }

    #[test]
    fn test_filter_applied() {
        let node = Uuid::new_v4();
        let ctx = ExecutionContext::for_node(node, Default::default());
        let group = ColocationGroup::new().with_node(node, [1, 2, 3]);
        let filter = expr_filter(gt(col(0), lit(15)), &ctx);

        let rows: Vec<Row> = scan(&ctx, storage(), &group, Some(filter), None, None)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows, vec![row![20, "b"], row![30, "c"]]);
        assert_eq!(ctx.metrics().snapshot().rows_filtered, 2);
    }

    #[test]
    fn test_not_member_is_empty() {
        let ctx = ExecutionContext::for_node(Uuid::new_v4(), Default::default());
        let group = ColocationGroup::new().with_node(Uuid::new_v4(), [1]);

        assert_eq!(scan(&ctx, storage(), &group, None, None, None).count(), 0);
        let snap = ctx.metrics().snapshot();
        assert_eq!(snap.scans_skipped, 1);
        assert_eq!(snap.scans_started, 0);
    }

    #[test]
    fn test_cancelled_before_first_partition() {
        let node = Uuid::new_v4();
        let ctx = ExecutionContext::for_node(node, Default::default());
        let group = ColocationGroup::new().with_node(node, [1]);

        let mut s = scan(&ctx, storage(), &group, None, None, None);
        ctx.cancel();
        assert!(s.next().unwrap().unwrap_err().is_cancelled());
        assert!(s.next().is_none());
    }
}
