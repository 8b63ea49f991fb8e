//! cinder - index-aware scan planning and execution
//!
//! Chooses between an index scan and a table scan for a filtered read of a
//! partitioned table, and runs the chosen scan lazily on each node of a
//! colocation group. Index scans are never planned while the table's
//! indexes are being rebuilt.

pub mod config;
pub mod engine;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod schema;

pub use config::EngineConfig;
pub use engine::{QueryEngine, RowStream};
