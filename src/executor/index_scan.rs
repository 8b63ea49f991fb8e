//! Index scan executor
//!
//! A lazy, single-pass iterator over the local partitions of one index.
//!
//! - Nothing is evaluated or opened until the first pull
//! - A node outside the colocation group, or a missing index, yields an
//!   exhausted scan without touching storage
//! - Each partition cursor seeks to the lower bound and stops once the upper
//!   bound is passed
//! - Partitions are merged by index key so the output keeps index order;
//!   equal keys come out by partition, then row id
//! - An error (including cancellation) is yielded once and ends the scan

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::index::{
    IndexCursor, IndexEntry, IndexResult, IndexStorage, KeyPart, PartitionId, RangeBound, RowId,
};
use crate::schema::{Collation, RequiredColumns, Row, TableIndex};

use super::colocation::ColocationGroup;
use super::context::ExecutionContext;
use super::errors::{ScanError, ScanResult};
use super::pipeline::{
    report_failure, report_skipped, BoundSupplier, CancelCheck, RowFilter, RowPipeline,
    RowTransform,
};

const SCAN_KIND: &str = "index";

/// Starts an index scan over the partitions this node owns in `group`.
///
/// `index` is `None` when the planned index is no longer registered.
#[allow(clippy::too_many_arguments)]
pub fn scan(
    ctx: &ExecutionContext,
    index: Option<&TableIndex>,
    group: &ColocationGroup,
    filter: Option<RowFilter>,
    lower: BoundSupplier,
    upper: BoundSupplier,
    transform: Option<RowTransform>,
    required: Option<RequiredColumns>,
) -> IndexScan {
    let pipeline = RowPipeline::new(required, filter, transform, Arc::clone(ctx.metrics()));
    let state = match (group.partitions(&ctx.local_node()), index) {
        (None, _) => {
            report_skipped(ctx, SCAN_KIND, "not_member");
            State::Done
        }
        (Some(_), None) => {
            report_skipped(ctx, SCAN_KIND, "index_unavailable");
            State::Done
        }
        (Some(partitions), Some(index)) => {
            ctx.metrics().increment_scans_started();
            State::Pending(Pending {
                storage: Arc::clone(index.storage()),
                partitions: partitions.to_vec(),
                lower,
                upper,
            })
        }
    };

    IndexScan {
        ctx: ctx.clone(),
        cancel: CancelCheck::new(ctx.cancel_check_interval()),
        pipeline,
        state,
    }
}

/// Lazy index scan; see [`scan`]
pub struct IndexScan {
    ctx: ExecutionContext,
    cancel: CancelCheck,
    pipeline: RowPipeline,
    state: State,
}

enum State {
    Pending(Pending),
    Merging(Merge),
    Done,
}

struct Pending {
    storage: Arc<dyn IndexStorage>,
    partitions: Vec<PartitionId>,
    lower: BoundSupplier,
    upper: BoundSupplier,
}

struct Merge {
    collation: Collation,
    lower: RangeBound,
    upper: RangeBound,
    /// One slot per partition; `None` once exhausted
    cursors: Vec<Option<Box<dyn IndexCursor>>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl Merge {
    /// Next in-range entry of a cursor, `None` when it is exhausted or past
    /// the upper bound
    fn advance(&self, cursor: &mut dyn IndexCursor) -> IndexResult<Option<IndexEntry>> {
        while let Some(entry) = cursor.next()? {
            if self.lower.below_lower(&entry.key, &self.collation) {
                continue;
            }
            if self.upper.above_upper(&entry.key, &self.collation) {
                return Ok(None);
            }
            return Ok(Some(entry));
        }
        Ok(None)
    }

    /// Pulls the next entry of `slot` into the heap
    fn refill(&mut self, slot: usize) -> IndexResult<()> {
        let Some(mut cursor) = self.cursors.get_mut(slot).and_then(Option::take) else {
            return Ok(());
        };
        if let Some(entry) = self.advance(cursor.as_mut())? {
            self.push(slot, entry);
            self.cursors[slot] = Some(cursor);
        }
        Ok(())
    }

    fn push(&mut self, slot: usize, entry: IndexEntry) {
        let key = entry
            .key
            .into_iter()
            .zip(self.collation.fields())
            .map(|(v, fc)| KeyPart::new(v, fc.direction))
            .collect();
        self.heap.push(Reverse(HeapEntry {
            key,
            slot,
            row_id: entry.row_id,
            row: entry.row,
        }));
    }
}

struct HeapEntry {
    key: Vec<KeyPart>,
    slot: usize,
    row_id: RowId,
    row: Row,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then(self.slot.cmp(&other.slot))
            .then(self.row_id.cmp(&other.row_id))
    }
}

impl IndexScan {
    /// Evaluates the bounds and opens every partition cursor
    fn open(&self, pending: Pending) -> ScanResult<Option<Merge>> {
        let lower = (pending.lower)()?;
        let upper = (pending.upper)()?;
        if lower.is_empty_range() || upper.is_empty_range() {
            return Ok(None);
        }

        let mut merge = Merge {
            collation: pending.storage.collation().clone(),
            lower,
            upper,
            cursors: Vec::with_capacity(pending.partitions.len()),
            heap: BinaryHeap::with_capacity(pending.partitions.len()),
        };

        for (slot, partition) in pending.partitions.iter().enumerate() {
            if self.ctx.is_cancelled() {
                return Err(ScanError::Cancelled(self.ctx.query_id()));
            }
            let mut cursor = pending
                .storage
                .seek(*partition, merge.lower.seek_values())?;
            match merge.advance(cursor.as_mut())? {
                Some(entry) => {
                    merge.push(slot, entry);
                    merge.cursors.push(Some(cursor));
                }
                None => merge.cursors.push(None),
            }
        }

        Ok(Some(merge))
    }

    fn fail(&mut self, err: ScanError) -> Option<ScanResult<Row>> {
        self.state = State::Done;
        report_failure(&self.ctx, SCAN_KIND, &err);
        Some(Err(err))
    }
}

impl Iterator for IndexScan {
    type Item = ScanResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Done => return None,
                State::Pending(pending) => match self.open(pending) {
                    Ok(Some(merge)) => self.state = State::Merging(merge),
                    Ok(None) => return None,
                    Err(e) => return self.fail(e),
                },
                State::Merging(mut merge) => {
                    let Some(Reverse(head)) = merge.heap.pop() else {
                        return None;
                    };
                    if let Err(e) = merge.refill(head.slot) {
                        return self.fail(e.into());
                    }
                    if self.cancel.tick(&self.ctx) {
                        let query = self.ctx.query_id();
                        return self.fail(ScanError::Cancelled(query));
                    }
                    self.state = State::Merging(merge);
                    match self.pipeline.process(head.row) {
                        Ok(Some(row)) => return Some(Ok(row)),
                        Ok(None) => continue,
                        Err(e) => return self.fail(e),
                    }
                }
            }
        }
    }
}
