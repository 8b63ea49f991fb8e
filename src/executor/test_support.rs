//! Fixtures for executor unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::index::{
    IndexCursor, IndexError, IndexResult, IndexStorage, MemoryIndexStorage, PartitionId,
    RangeBound, RowId,
};
use crate::planner::ExprError;
use crate::schema::{Collation, Row, Value};

use super::pipeline::{fixed_bound, BoundSupplier};

pub fn unbounded() -> BoundSupplier {
    fixed_bound(RangeBound::Unbounded)
}

pub fn bound(b: RangeBound) -> BoundSupplier {
    fixed_bound(b)
}

pub fn failing_bound() -> BoundSupplier {
    Arc::new(|| -> Result<RangeBound, ExprError> {
        Err(ExprError::TypeMismatch("bad bound".into()))
    })
}

/// Memory index that counts seeks and can be told to fail them
pub struct CountingIndexStorage {
    inner: MemoryIndexStorage,
    seeks: AtomicUsize,
    fail_seeks: AtomicBool,
}

impl CountingIndexStorage {
    pub fn new(collation: Collation) -> Self {
        Self {
            inner: MemoryIndexStorage::new(collation),
            seeks: AtomicUsize::new(0),
            fail_seeks: AtomicBool::new(false),
        }
    }

    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::SeqCst)
    }

    pub fn fail_seeks(&self) {
        self.fail_seeks.store(true, Ordering::SeqCst);
    }
}

impl IndexStorage for CountingIndexStorage {
    fn collation(&self) -> &Collation {
        self.inner.collation()
    }

    fn seek(
        &self,
        partition: PartitionId,
        lower: Option<&[Value]>,
    ) -> IndexResult<Box<dyn IndexCursor>> {
        self.seeks.fetch_add(1, Ordering::SeqCst);
        if self.fail_seeks.load(Ordering::SeqCst) {
            return Err(IndexError::partition_io(partition, "injected seek failure"));
        }
        self.inner.seek(partition, lower)
    }

    fn insert(&self, partition: PartitionId, row_id: RowId, row: &Row) -> IndexResult<()> {
        self.inner.insert(partition, row_id, row)
    }

    fn remove(&self, partition: PartitionId, row_id: RowId, row: &Row) -> IndexResult<()> {
        self.inner.remove(partition, row_id, row)
    }

    fn clear(&self) -> IndexResult<()> {
        self.inner.clear()
    }

    fn entry_count(&self) -> usize {
        self.inner.entry_count()
    }
}
