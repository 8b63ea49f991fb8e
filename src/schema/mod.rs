//! Catalog subsystem for cinder
//!
//! Tables, their row layout, and the secondary index descriptors registered
//! against them.
//!
//! # Design Principles
//!
//! - Descriptors are immutable once registered
//! - Indexes reference their table by id, never by ownership
//! - Names are case-insensitive and stored upper-cased
//! - Index availability lives on the table and is read lock-free

mod catalog;
mod collation;
mod errors;
mod index;
mod table;
mod types;

pub use catalog::Catalog;
pub use collation::{Collation, Direction, FieldCollation, RequiredColumns};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, WriteError, WriteResult};
pub use index::{IndexDescriptor, TableId, TableIndex};
pub use table::Table;
pub use types::{ColumnType, Field, Row, RowType, Value};
