//! BTreeMap-backed index and table storage
//!
//! Each partition is an `Arc<BTreeMap>` replaced copy-on-write by writers.
//! Cursors hold the partition snapshot they were opened on, so a scan that
//! started before a concurrent rebuild completes against that snapshot.
//!
//! Cost: a write to a partition that no cursor holds updates the map in
//! place. While any cursor holds it, the write first clones the whole
//! partition, so writes racing long scans are O(partition size). Storage
//! meant for large partitions under concurrent scans should implement the
//! traits over a persistent or MVCC structure instead.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::schema::{Collation, Row, Value};

use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;
use super::storage::{
    IndexCursor, IndexEntry, IndexStorage, PartitionId, RowCursor, RowId, TableStorage,
};

type IndexPartition = Arc<BTreeMap<IndexKey, Row>>;

fn read_lock<T>(lock: &RwLock<T>) -> IndexResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| IndexError::storage_io("storage lock poisoned"))
}

fn write_lock<T>(lock: &RwLock<T>) -> IndexResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| IndexError::storage_io("storage lock poisoned"))
}

/// In-memory sorted index storage
#[derive(Debug)]
pub struct MemoryIndexStorage {
    collation: Collation,
    partitions: RwLock<BTreeMap<PartitionId, IndexPartition>>,
}

impl MemoryIndexStorage {
    /// Creates an empty index with the given sort order
    pub fn new(collation: Collation) -> Self {
        Self {
            collation,
            partitions: RwLock::new(BTreeMap::new()),
        }
    }

    fn snapshot(&self, partition: PartitionId) -> IndexResult<Option<IndexPartition>> {
        Ok(read_lock(&self.partitions)?.get(&partition).cloned())
    }
}

impl IndexStorage for MemoryIndexStorage {
    fn collation(&self) -> &Collation {
        &self.collation
    }

    fn seek(
        &self,
        partition: PartitionId,
        lower: Option<&[Value]>,
    ) -> IndexResult<Box<dyn IndexCursor>> {
        let snapshot = self.snapshot(partition)?.unwrap_or_default();
        let next_from = match lower {
            Some(prefix) => Bound::Included(IndexKey::seek_position(prefix, &self.collation)),
            None => Bound::Unbounded,
        };
        Ok(Box::new(MemoryIndexCursor {
            snapshot,
            next_from,
        }))
    }

    fn insert(&self, partition: PartitionId, row_id: RowId, row: &Row) -> IndexResult<()> {
        let key = IndexKey::from_row(row, &self.collation, row_id);
        let mut partitions = write_lock(&self.partitions)?;
        let tree = partitions.entry(partition).or_default();
        Arc::make_mut(tree).insert(key, row.clone());
        Ok(())
    }

    fn remove(&self, partition: PartitionId, row_id: RowId, row: &Row) -> IndexResult<()> {
        let key = IndexKey::from_row(row, &self.collation, row_id);
        let mut partitions = write_lock(&self.partitions)?;
        if let Some(tree) = partitions.get_mut(&partition) {
            Arc::make_mut(tree).remove(&key);
            if tree.is_empty() {
                partitions.remove(&partition);
            }
        }
        Ok(())
    }

    fn clear(&self) -> IndexResult<()> {
        write_lock(&self.partitions)?.clear();
        Ok(())
    }

    fn entry_count(&self) -> usize {
        read_lock(&self.partitions)
            .map(|p| p.values().map(|t| t.len()).sum())
            .unwrap_or(0)
    }
}

struct MemoryIndexCursor {
    snapshot: IndexPartition,
    next_from: Bound<IndexKey>,
}

impl IndexCursor for MemoryIndexCursor {
    fn next(&mut self) -> IndexResult<Option<IndexEntry>> {
        let found = self
            .snapshot
            .range((self.next_from.clone(), Bound::Unbounded))
            .next()
            .map(|(k, r)| (k.clone(), r.clone()));

        Ok(found.map(|(key, row)| {
            let entry = IndexEntry {
                key: key.values(),
                row_id: key.row_id(),
                row,
            };
            self.next_from = Bound::Excluded(key);
            entry
        }))
    }
}

type TablePartition = Arc<BTreeMap<RowId, Row>>;

/// In-memory partitioned row storage
#[derive(Debug, Default)]
pub struct MemoryTableStorage {
    partitions: RwLock<BTreeMap<PartitionId, TablePartition>>,
}

impl MemoryTableStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStorage for MemoryTableStorage {
    fn partitions(&self) -> Vec<PartitionId> {
        read_lock(&self.partitions)
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default()
    }

    fn scan(&self, partition: PartitionId) -> IndexResult<Box<dyn RowCursor>> {
        let snapshot = read_lock(&self.partitions)?
            .get(&partition)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(MemoryRowCursor {
            snapshot,
            next_from: Bound::Unbounded,
        }))
    }

    fn insert(&self, partition: PartitionId, row_id: RowId, row: Row) -> IndexResult<Option<Row>> {
        let mut partitions = write_lock(&self.partitions)?;
        let tree = partitions.entry(partition).or_default();
        Ok(Arc::make_mut(tree).insert(row_id, row))
    }

    fn remove(&self, partition: PartitionId, row_id: RowId) -> IndexResult<Option<Row>> {
        let mut partitions = write_lock(&self.partitions)?;
        let removed = match partitions.get_mut(&partition) {
            Some(tree) => Arc::make_mut(tree).remove(&row_id),
            None => None,
        };
        if partitions.get(&partition).is_some_and(|t| t.is_empty()) {
            partitions.remove(&partition);
        }
        Ok(removed)
    }

    fn row_count(&self) -> usize {
        read_lock(&self.partitions)
            .map(|p| p.values().map(|t| t.len()).sum())
            .unwrap_or(0)
    }
}

struct MemoryRowCursor {
    snapshot: TablePartition,
    next_from: Bound<RowId>,
}

impl RowCursor for MemoryRowCursor {
    fn next(&mut self) -> IndexResult<Option<(RowId, Row)>> {
        let found = self
            .snapshot
            .range((self.next_from, Bound::Unbounded))
            .next()
            .map(|(id, row)| (*id, row.clone()));
        if let Some((id, _)) = &found {
            self.next_from = Bound::Excluded(*id);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::schema::FieldCollation;

    fn drain(cursor: &mut Box<dyn IndexCursor>) -> Vec<IndexEntry> {
        let mut out = Vec::new();
        while let Some(e) = cursor.next().unwrap() {
            out.push(e);
        }
        out
    }

    #[test]
    fn test_insert_and_seek() {
        let index = MemoryIndexStorage::new(Collation::ascending(&[0]));
        index.insert(1, 10, &row![5, "e"]).unwrap();
        index.insert(1, 11, &row![1, "a"]).unwrap();
        index.insert(1, 12, &row![3, "c"]).unwrap();

        let mut cursor = index.seek(1, Some(&[Value::Int(2)])).unwrap();
        let entries = drain(&mut cursor);
        let keys: Vec<_> = entries.iter().map(|e| e.key[0].clone()).collect();
        assert_eq!(keys, vec![Value::Int(3), Value::Int(5)]);
        assert_eq!(entries[0].row_id, 12);
    }

    #[test]
    fn test_duplicates_ordered_by_row_id() {
        let index = MemoryIndexStorage::new(Collation::ascending(&[0]));
        index.insert(0, 30, &row![7]).unwrap();
        index.insert(0, 10, &row![7]).unwrap();
        index.insert(0, 20, &row![7]).unwrap();

        let mut cursor = index.seek(0, None).unwrap();
        let ids: Vec<_> = drain(&mut cursor).iter().map(|e| e.row_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_descending_index_order() {
        let index = MemoryIndexStorage::new(Collation::new(vec![FieldCollation::desc(0)]));
        for (id, v) in [1, 9, 4].iter().enumerate() {
            index.insert(0, id as u64, &row![*v]).unwrap();
        }
        let mut cursor = index.seek(0, Some(&[Value::Int(5)])).unwrap();
        let keys: Vec<_> = drain(&mut cursor).iter().map(|e| e.key[0].clone()).collect();
        assert_eq!(keys, vec![Value::Int(4), Value::Int(1)]);
    }

    #[test]
    fn test_cursor_reads_snapshot() {
        let index = MemoryIndexStorage::new(Collation::ascending(&[0]));
        index.insert(0, 1, &row![1]).unwrap();
        let mut cursor = index.seek(0, None).unwrap();

        index.clear().unwrap();
        index.insert(0, 2, &row![2]).unwrap();

        let keys: Vec<_> = drain(&mut cursor).iter().map(|e| e.row_id).collect();
        assert_eq!(keys, vec![1]);
        assert_eq!(index.entry_count(), 1);
    }

    #[test]
    fn test_table_write_during_open_cursor() {
        let table = MemoryTableStorage::new();
        table.insert(0, 1, row![1]).unwrap();
        table.insert(0, 2, row![2]).unwrap();
        let mut cursor = table.scan(0).unwrap();

        // copies the partition: the cursor keeps the old version
        table.insert(0, 2, row![20]).unwrap();
        table.insert(0, 3, row![3]).unwrap();

        let mut seen = Vec::new();
        while let Some((_, row)) = cursor.next().unwrap() {
            seen.push(row);
        }
        assert_eq!(seen, vec![row![1], row![2]]);
        drop(cursor);

        // no reader left: written in place
        table.remove(0, 1).unwrap();
        let mut cursor = table.scan(0).unwrap();
        assert_eq!(cursor.next().unwrap(), Some((2, row![20])));
        assert_eq!(cursor.next().unwrap(), Some((3, row![3])));
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn test_remove_and_missing_partition() {
        let index = MemoryIndexStorage::new(Collation::ascending(&[0]));
        index.insert(3, 1, &row![1]).unwrap();
        index.remove(3, 1, &row![1]).unwrap();
        assert_eq!(index.entry_count(), 0);

        let mut cursor = index.seek(42, None).unwrap();
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn test_table_storage_scan_in_row_id_order() {
        let table = MemoryTableStorage::new();
        table.insert(2, 5, row![5]).unwrap();
        table.insert(2, 1, row![1]).unwrap();
        table.insert(0, 9, row![9]).unwrap();

        assert_eq!(table.partitions(), vec![0, 2]);
        assert_eq!(table.row_count(), 3);

        let mut cursor = table.scan(2).unwrap();
        assert_eq!(cursor.next().unwrap().map(|(id, _)| id), Some(1));
        assert_eq!(cursor.next().unwrap().map(|(id, _)| id), Some(5));
        assert!(cursor.next().unwrap().is_none());

        assert_eq!(table.remove(0, 9).unwrap(), Some(row![9]));
        assert_eq!(table.partitions(), vec![2]);
    }
}
