//! Index rebuild
//!
//! Repopulates every index of a table from its primary row storage. The
//! table's rebuild flag is raised for the whole run so planners fall back to
//! table scans; it is lowered on completion, on error and on panic.
//!
//! Row writes to the table are blocked while the indexes are cleared and
//! repopulated, so every entry written comes from the current row version.
//!
//! Rebuild is fail-fast: the first storage error aborts the run and leaves
//! the indexes partially populated. Running it again is always safe.

use std::sync::Arc;
use std::time::Instant;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::schema::Table;

use super::errors::{IndexError, IndexResult};

/// Outcome of a successful rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RebuildStats {
    /// Indexes repopulated
    pub indexes: usize,
    /// Partitions read from table storage
    pub partitions: usize,
    /// Rows read from table storage
    pub rows: u64,
    /// Index entries written (rows times indexes)
    pub entries: u64,
}

/// Rebuilds all indexes of one table
pub struct IndexRebuildJob {
    table: Arc<Table>,
    metrics: Arc<MetricsRegistry>,
}

impl IndexRebuildJob {
    pub fn new(table: Arc<Table>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { table, metrics }
    }

    /// Runs the rebuild to completion
    pub fn run(&self) -> IndexResult<RebuildStats> {
        let _guard = self.table.rebuild_flag().begin();
        self.metrics.increment_rebuilds_started();

        let indexes = self.table.indexes();
        let index_count = indexes.len().to_string();
        log_event_with_fields(
            Event::IndexRebuildBegin,
            &[("indexes", index_count.as_str()), ("table", self.table.name())],
        );

        let start = Instant::now();
        match self.repopulate() {
            Ok(stats) => {
                self.metrics.increment_rebuilds_completed();
                let rows = stats.rows.to_string();
                let elapsed = start.elapsed().as_millis().to_string();
                log_event_with_fields(
                    Event::IndexRebuildComplete,
                    &[
                        ("duration_ms", elapsed.as_str()),
                        ("rows", rows.as_str()),
                        ("table", self.table.name()),
                    ],
                );
                Ok(stats)
            }
            Err(e) => {
                self.metrics.increment_rebuilds_failed();
                let reason = e.to_string();
                log_event_with_fields(
                    Event::IndexRebuildFailed,
                    &[("error", reason.as_str()), ("table", self.table.name())],
                );
                Err(IndexError::rebuild_failed(self.table.name(), e))
            }
        }
    }

    fn repopulate(&self) -> IndexResult<RebuildStats> {
        let _writes = self.table.block_writes();
        let indexes = self.table.indexes();
        for index in &indexes {
            index.storage().clear()?;
        }

        let mut stats = RebuildStats {
            indexes: indexes.len(),
            ..RebuildStats::default()
        };

        let storage = self.table.storage();
        for partition in storage.partitions() {
            stats.partitions += 1;
            let mut cursor = storage.scan(partition)?;
            while let Some((row_id, row)) = cursor.next()? {
                stats.rows += 1;
                for index in &indexes {
                    index.storage().insert(partition, row_id, &row)?;
                    stats.entries += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::schema::{Catalog, Collation, ColumnType, Field, RowType};

    fn make_table() -> Arc<Table> {
        let catalog = Catalog::new();
        catalog
            .create_table(
                "t",
                RowType::new(vec![
                    Field::new("a", ColumnType::Int),
                    Field::new("b", ColumnType::String),
                ]),
            )
            .unwrap()
    }

    #[test]
    fn test_rebuild_indexes_existing_rows() {
        let table = make_table();
        table.insert(0, 1, row![3, "x"]).unwrap();
        table.insert(1, 2, row![1, "y"]).unwrap();

        // added after the rows, so it starts empty
        table.add_index("idx_a", Collation::ascending(&[0])).unwrap();
        let index = table.index("idx_a").unwrap();
        assert_eq!(index.storage().entry_count(), 0);

        let metrics = Arc::new(MetricsRegistry::new());
        let stats = IndexRebuildJob::new(Arc::clone(&table), Arc::clone(&metrics))
            .run()
            .unwrap();

        assert_eq!(stats.rows, 2);
        assert_eq!(stats.partitions, 2);
        assert_eq!(stats.entries, 2);
        assert_eq!(index.storage().entry_count(), 2);
        assert!(!table.is_index_rebuild_in_progress());

        let snap = metrics.snapshot();
        assert_eq!(snap.rebuilds_started, 1);
        assert_eq!(snap.rebuilds_completed, 1);
    }

    #[test]
    fn test_rebuild_is_repeatable() {
        let table = make_table();
        table.add_index("idx_a", Collation::ascending(&[0])).unwrap();
        table.insert(0, 1, row![3, "x"]).unwrap();

        let metrics = Arc::new(MetricsRegistry::new());
        let job = IndexRebuildJob::new(Arc::clone(&table), metrics);
        job.run().unwrap();
        job.run().unwrap();

        assert_eq!(table.index("idx_a").unwrap().storage().entry_count(), 1);
    }
}
