//! Table catalog
//!
//! Registry of tables keyed by upper-cased name. Index descriptors resolve
//! their owning table through [`Catalog::table_by_id`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::index::{MemoryTableStorage, TableStorage};

use super::errors::{SchemaError, SchemaResult};
use super::index::{IndexDescriptor, TableId};
use super::table::Table;
use super::types::RowType;

/// Read-mostly registry of tables
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
    next_id: AtomicU64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table backed by in-memory storage
    pub fn create_table(&self, name: &str, row_type: RowType) -> SchemaResult<Arc<Table>> {
        self.create_table_with_storage(name, row_type, Arc::new(MemoryTableStorage::new()))
    }

    /// Creates a table backed by the given storage
    pub fn create_table_with_storage(
        &self,
        name: &str,
        row_type: RowType,
        storage: Arc<dyn TableStorage>,
    ) -> SchemaResult<Arc<Table>> {
        let key = name.to_uppercase();
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        if tables.contains_key(&key) {
            return Err(SchemaError::duplicate_table(key));
        }

        let id = TableId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let table = Arc::new(Table::new(id, &key, row_type, storage));
        tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Looks up a table by (case-insensitive) name
    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name.to_uppercase())
            .cloned()
    }

    /// Looks up a table by id
    pub fn table_by_id(&self, id: TableId) -> Option<Arc<Table>> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .find(|t| t.id() == id)
            .cloned()
    }

    /// Resolves the table owning an index descriptor
    pub fn owning_table(&self, descriptor: &IndexDescriptor) -> Option<Arc<Table>> {
        self.table_by_id(descriptor.table)
    }

    pub fn drop_table(&self, name: &str) -> SchemaResult<Arc<Table>> {
        let key = name.to_uppercase();
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key)
            .ok_or_else(|| SchemaError::unknown_table(key))
    }

    /// Table names, ascending
    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}
