//! Index descriptors
//!
//! Immutable metadata registered with a table. The owning table is referenced
//! by id and resolved through the catalog, so tables and descriptors never
//! own each other.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index::IndexStorage;

use super::collation::Collation;

/// Catalog-assigned table identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Immutable index metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Unique within the owning table (stored upper-cased)
    pub name: String,
    /// Owning table
    pub table: TableId,
    /// Sort order over table column positions
    pub collation: Collation,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, table: TableId, collation: Collation) -> Self {
        Self {
            name: name.into().to_uppercase(),
            table,
            collation,
        }
    }

    /// An index with an empty collation cannot serve range conditions
    pub fn supports_ranges(&self) -> bool {
        !self.collation.is_empty()
    }
}

/// A registered index: descriptor plus handle to its storage
#[derive(Clone)]
pub struct TableIndex {
    descriptor: Arc<IndexDescriptor>,
    storage: Arc<dyn IndexStorage>,
}

impl TableIndex {
    pub fn new(descriptor: IndexDescriptor, storage: Arc<dyn IndexStorage>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            storage,
        }
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn collation(&self) -> &Collation {
        &self.descriptor.collation
    }

    pub fn storage(&self) -> &Arc<dyn IndexStorage> {
        &self.storage
    }
}

impl fmt::Debug for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableIndex")
            .field("descriptor", &self.descriptor)
            .field("entries", &self.storage.entry_count())
            .finish()
    }
}
