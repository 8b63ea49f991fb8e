//! Row pipeline shared by index and table scans
//!
//! Every row read from storage goes through:
//!
//! 1. Projection to the required columns
//! 2. Residual filter (rows that are not TRUE are dropped)
//! 3. Row transform
//!
//! Filters, transforms and bound suppliers are plain shared closures so the
//! execution layer can supply its own.

use std::sync::Arc;

use crate::index::RangeBound;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::planner::{Expr, ExprError, IndexConditions};
use crate::schema::{RequiredColumns, Row};

use super::context::ExecutionContext;
use super::errors::{ScanError, ScanResult};

/// Residual predicate over a projected row
pub type RowFilter = Arc<dyn Fn(&Row) -> ScanResult<bool> + Send + Sync>;

/// Final row rewrite (e.g. projection expressions)
pub type RowTransform = Arc<dyn Fn(Row) -> ScanResult<Row> + Send + Sync>;

/// Lazily evaluated scan bound; invoked once per scan instance
pub type BoundSupplier = Arc<dyn Fn() -> Result<RangeBound, ExprError> + Send + Sync>;

/// Filter evaluating `expr` with the context's correlated variables
pub fn expr_filter(expr: Expr, ctx: &ExecutionContext) -> RowFilter {
    let ctx = ctx.clone();
    Arc::new(move |row: &Row| -> ScanResult<bool> { Ok(expr.is_satisfied(row, &ctx)?) })
}

/// Transform producing one output column per expression
pub fn project_transform(projects: Vec<Expr>, ctx: &ExecutionContext) -> RowTransform {
    let ctx = ctx.clone();
    Arc::new(move |row: Row| -> ScanResult<Row> {
        let values = projects
            .iter()
            .map(|p| p.eval(&row, &ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Row::new(values))
    })
}

/// Supplier of the lower bound of `conditions`
pub fn lower_bound_supplier(conditions: Arc<IndexConditions>, ctx: &ExecutionContext) -> BoundSupplier {
    let ctx = ctx.clone();
    Arc::new(move || conditions.lower_bound(&ctx))
}

/// Supplier of the upper bound of `conditions`
pub fn upper_bound_supplier(conditions: Arc<IndexConditions>, ctx: &ExecutionContext) -> BoundSupplier {
    let ctx = ctx.clone();
    Arc::new(move || conditions.upper_bound(&ctx))
}

/// Supplier of a constant bound
pub fn fixed_bound(bound: RangeBound) -> BoundSupplier {
    Arc::new(move || -> Result<RangeBound, ExprError> { Ok(bound.clone()) })
}

/// Projection, filter and transform for one scan
pub(crate) struct RowPipeline {
    required: Option<RequiredColumns>,
    filter: Option<RowFilter>,
    transform: Option<RowTransform>,
    metrics: Arc<MetricsRegistry>,
}

impl RowPipeline {
    pub(crate) fn new(
        required: Option<RequiredColumns>,
        filter: Option<RowFilter>,
        transform: Option<RowTransform>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            required,
            filter,
            transform,
            metrics,
        }
    }

    /// Runs one storage row through the pipeline; `None` if filtered out
    pub(crate) fn process(&self, row: Row) -> ScanResult<Option<Row>> {
        self.metrics.increment_rows_scanned();

        let row = match &self.required {
            Some(req) => row.project(req.columns()),
            None => row,
        };

        if let Some(filter) = &self.filter {
            if !filter(&row)? {
                self.metrics.increment_rows_filtered();
                return Ok(None);
            }
        }

        let row = match &self.transform {
            Some(transform) => transform(row)?,
            None => row,
        };

        self.metrics.increment_rows_returned();
        Ok(Some(row))
    }
}

/// Row-count based cancellation polling
pub(crate) struct CancelCheck {
    interval: usize,
    since_last: usize,
}

impl CancelCheck {
    pub(crate) fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            since_last: 0,
        }
    }

    /// Counts one row; true when a check is due and the query is cancelled
    pub(crate) fn tick(&mut self, ctx: &ExecutionContext) -> bool {
        self.since_last += 1;
        if self.since_last < self.interval {
            return false;
        }
        self.since_last = 0;
        ctx.is_cancelled()
    }
}

/// Logs and counts a scan that returns nothing without touching storage
pub(crate) fn report_skipped(ctx: &ExecutionContext, scan: &str, reason: &str) {
    ctx.metrics().increment_scans_skipped();
    let query = ctx.query_id().to_string();
    log_event_with_fields(
        Event::ScanSkipped,
        &[("query_id", query.as_str()), ("reason", reason), ("scan", scan)],
    );
}

/// Logs and counts a scan that ended on an error
pub(crate) fn report_failure(ctx: &ExecutionContext, scan: &str, err: &ScanError) {
    let query = ctx.query_id().to_string();
    if err.is_cancelled() {
        ctx.metrics().increment_scans_cancelled();
        log_event_with_fields(
            Event::ScanCancelled,
            &[("query_id", query.as_str()), ("scan", scan)],
        );
    } else {
        ctx.metrics().increment_scans_failed();
        let message = err.to_string();
        log_event_with_fields(
            Event::ScanFailed,
            &[
                ("code", err.code()),
                ("error", message.as_str()),
                ("query_id", query.as_str()),
                ("scan", scan),
            ],
        );
    }
}
