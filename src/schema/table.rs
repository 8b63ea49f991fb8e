//! Tables
//!
//! A table owns its row type, its rebuild flag, its primary row storage and
//! the set of secondary indexes. Row writes are checked against the row type,
//! then go to storage first and then to every registered index.
//!
//! Writes hold the table's write gate shared; an index rebuild holds it
//! exclusively, so a rebuild never replays a row version that a concurrent
//! write has already replaced.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::index::{
    IndexResult, IndexStorage, MemoryIndexStorage, PartitionId, RebuildFlag, RowId,
    TableStorage,
};
use crate::observability::{log_event_with_fields, Event};

use super::collation::Collation;
use super::errors::{SchemaError, SchemaResult, WriteResult};
use super::index::{IndexDescriptor, TableId, TableIndex};
use super::types::{Row, RowType};

/// A cache-backed SQL table
pub struct Table {
    id: TableId,
    name: String,
    row_type: RowType,
    rebuild: RebuildFlag,
    indexes: RwLock<BTreeMap<String, TableIndex>>,
    storage: Arc<dyn TableStorage>,
    writes: RwLock<()>,
}

impl Table {
    pub fn new(
        id: TableId,
        name: impl Into<String>,
        row_type: RowType,
        storage: Arc<dyn TableStorage>,
    ) -> Self {
        Self {
            id,
            name: name.into().to_uppercase(),
            row_type,
            rebuild: RebuildFlag::new(),
            indexes: RwLock::new(BTreeMap::new()),
            storage,
            writes: RwLock::new(()),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_type(&self) -> &RowType {
        &self.row_type
    }

    pub fn storage(&self) -> &Arc<dyn TableStorage> {
        &self.storage
    }

    /// Rebuild flag shared by all indexes of this table
    pub fn rebuild_flag(&self) -> &RebuildFlag {
        &self.rebuild
    }

    pub fn is_index_rebuild_in_progress(&self) -> bool {
        self.rebuild.is_rebuilding()
    }

    pub fn mark_index_rebuild_in_progress(&self, rebuilding: bool) {
        self.rebuild.set_rebuilding(rebuilding);
    }

    /// Registers an in-memory index over the given column positions.
    ///
    /// The index starts empty; rows written afterwards are indexed, earlier
    /// rows need an index rebuild.
    pub fn add_index(&self, name: &str, collation: Collation) -> SchemaResult<IndexDescriptor> {
        let storage = Arc::new(MemoryIndexStorage::new(collation.clone()));
        self.add_index_with_storage(name, collation, storage)
    }

    /// Registers an index backed by the given storage
    pub fn add_index_with_storage(
        &self,
        name: &str,
        collation: Collation,
        storage: Arc<dyn IndexStorage>,
    ) -> SchemaResult<IndexDescriptor> {
        for fc in collation.fields() {
            if fc.column >= self.row_type.field_count() {
                return Err(SchemaError::unknown_column(&self.name, format!("${}", fc.column)));
            }
        }

        let descriptor = IndexDescriptor::new(name, self.id, collation);
        let mut indexes = self.indexes.write().unwrap_or_else(|e| e.into_inner());
        if indexes.contains_key(&descriptor.name) {
            return Err(SchemaError::duplicate_index(&self.name, &descriptor.name));
        }
        indexes.insert(
            descriptor.name.clone(),
            TableIndex::new(descriptor.clone(), storage),
        );
        Ok(descriptor)
    }

    /// Unregisters an index.
    ///
    /// Scans that already hold the storage handle finish normally; later
    /// lookups see the index as unavailable.
    pub fn drop_index(&self, name: &str) -> SchemaResult<()> {
        let key = name.to_uppercase();
        let removed = self
            .indexes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
        match removed {
            Some(_) => {
                log_event_with_fields(
                    Event::IndexDropped,
                    &[("index", key.as_str()), ("table", self.name.as_str())],
                );
                Ok(())
            }
            None => Err(SchemaError::unknown_index(&self.name, key)),
        }
    }

    /// Looks up an index by (case-insensitive) name
    pub fn index(&self, name: &str) -> Option<TableIndex> {
        self.indexes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name.to_uppercase())
            .cloned()
    }

    /// All indexes, ordered by name
    pub fn indexes(&self) -> Vec<TableIndex> {
        self.indexes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Blocks row writes until the guard is dropped
    pub(crate) fn block_writes(&self) -> RwLockWriteGuard<'_, ()> {
        self.writes.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes a row to storage and then to every index.
    ///
    /// Values are coerced to their column types; a row of the wrong width,
    /// an uncoercible value or a NULL in a NOT NULL column is rejected with
    /// `CINDER_TYPE_MISMATCH` before anything is written.
    pub fn insert(&self, partition: PartitionId, row_id: RowId, row: Row) -> WriteResult<()> {
        let row = self.conform(row)?;
        let _gate = self.writes.read().unwrap_or_else(|e| e.into_inner());
        let previous = self.storage.insert(partition, row_id, row.clone())?;
        for index in self.indexes() {
            if let Some(old) = &previous {
                index.storage().remove(partition, row_id, old)?;
            }
            index.storage().insert(partition, row_id, &row)?;
        }
        Ok(())
    }

    /// Removes a row from storage and every index
    pub fn remove(&self, partition: PartitionId, row_id: RowId) -> IndexResult<Option<Row>> {
        let _gate = self.writes.read().unwrap_or_else(|e| e.into_inner());
        let removed = self.storage.remove(partition, row_id)?;
        if let Some(old) = &removed {
            for index in self.indexes() {
                index.storage().remove(partition, row_id, old)?;
            }
        }
        Ok(removed)
    }

    fn conform(&self, row: Row) -> SchemaResult<Row> {
        let expected = self.row_type.field_count();
        if row.len() != expected {
            return Err(SchemaError::type_mismatch(
                &self.name,
                format!("row has {} values, expected {}", row.len(), expected),
            ));
        }

        let mut values = Vec::with_capacity(expected);
        for (value, field) in row.0.into_iter().zip(&self.row_type.fields) {
            if value.is_null() && !field.nullable {
                return Err(SchemaError::type_mismatch(
                    &self.name,
                    format!("column {} is NOT NULL", field.name),
                ));
            }
            match value.coerce_to(field.ty) {
                Some(v) => values.push(v),
                None => {
                    return Err(SchemaError::type_mismatch(
                        &self.name,
                        format!(
                            "value {} does not fit {} column {}",
                            value,
                            field.ty.type_name(),
                            field.name
                        ),
                    ))
                }
            }
        }
        Ok(Row::new(values))
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rebuilding", &self.rebuild.is_rebuilding())
            .field("indexes", &self.indexes())
            .finish()
    }
}
