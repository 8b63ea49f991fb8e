//! Query engine facade
//!
//! Ties the catalog, plan selection and scan execution together for one
//! node. Plans are chosen per call and never cached: the rebuild flag read
//! at planning time decides the access path for that query only.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::executor::{
    expr_filter, index_scan, lower_bound_supplier, project_transform, table_scan,
    upper_bound_supplier, ColocationGroup, ExecutionContext, NodeId, ScanError, ScanResult,
};
use crate::index::{IndexError, IndexRebuildJob, IndexResult, RebuildStats};
use crate::observability::MetricsRegistry;
use crate::planner::{
    ExplainPlan, IndexScanPlan, LogicalScan, PhysicalPlan, PlanSelector, PlannerResult,
    TableScanPlan,
};
use crate::schema::{Catalog, Row, RowType, Table, TableId};

/// Lazily evaluated stream of scan rows
pub type RowStream = Box<dyn Iterator<Item = ScanResult<Row>> + Send>;

/// Planning and execution entry point for one node
pub struct QueryEngine {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
}

impl QueryEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    /// Engine with the given settings.
    ///
    /// The logger is process-wide and is left untouched here; it is
    /// configured when the configuration file is loaded, or explicitly
    /// through [`LoggingConfig::apply`](crate::config::LoggingConfig::apply).
    pub fn with_config(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self {
            catalog,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// New execution context for a query on `local_node`
    pub fn context(&self, local_node: NodeId, row_type: RowType) -> ExecutionContext {
        ExecutionContext::new(
            local_node,
            row_type,
            &self.config.executor,
            Arc::clone(&self.metrics),
        )
    }

    fn selector(&self) -> PlanSelector<'_> {
        PlanSelector::new(&self.catalog, &self.config.planner, &self.metrics)
    }

    /// Chooses the access path for `scan`
    pub fn plan(&self, scan: &LogicalScan) -> PlannerResult<PhysicalPlan> {
        self.selector().select(scan)
    }

    /// Every applicable access path, best first
    pub fn candidates(&self, scan: &LogicalScan) -> PlannerResult<Vec<PhysicalPlan>> {
        self.selector().candidates(scan)
    }

    /// Plans `scan` and describes the outcome, including rejections
    pub fn explain(&self, scan: &LogicalScan) -> ExplainPlan {
        match self.plan(scan) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        }
    }

    /// Runs `plan` on the context's node. Rows are produced on demand.
    pub fn execute(
        &self,
        plan: &PhysicalPlan,
        ctx: &ExecutionContext,
        group: &ColocationGroup,
    ) -> ScanResult<RowStream> {
        match plan {
            PhysicalPlan::IndexScan(plan) => Ok(self.execute_index_scan(plan, ctx, group)),
            PhysicalPlan::TableScan(plan) => self.execute_table_scan(plan, ctx, group),
        }
    }

    fn execute_index_scan(
        &self,
        plan: &IndexScanPlan,
        ctx: &ExecutionContext,
        group: &ColocationGroup,
    ) -> RowStream {
        // A dropped table or index yields an empty scan
        let index = self
            .resolve_table(&plan.table, plan.table_id)
            .and_then(|table| table.index(&plan.index));

        let filter = plan.filter.clone().map(|f| expr_filter(f, ctx));
        let transform = plan.projects.clone().map(|p| project_transform(p, ctx));
        Box::new(index_scan::scan(
            ctx,
            index.as_ref(),
            group,
            filter,
            lower_bound_supplier(Arc::clone(&plan.conditions), ctx),
            upper_bound_supplier(Arc::clone(&plan.conditions), ctx),
            transform,
            plan.required_columns.clone(),
        ))
    }

    fn execute_table_scan(
        &self,
        plan: &TableScanPlan,
        ctx: &ExecutionContext,
        group: &ColocationGroup,
    ) -> ScanResult<RowStream> {
        let table = self
            .resolve_table(&plan.table, plan.table_id)
            .ok_or_else(|| ScanError::UnknownTable(plan.table.clone()))?;

        let filter = plan.filter.clone().map(|f| expr_filter(f, ctx));
        let transform = plan.projects.clone().map(|p| project_transform(p, ctx));
        Ok(Box::new(table_scan::scan(
            ctx,
            Arc::clone(table.storage()),
            group,
            filter,
            transform,
            plan.required_columns.clone(),
        )))
    }

    /// The planned table, unless it was dropped (or replaced) since planning
    fn resolve_table(&self, name: &str, id: TableId) -> Option<Arc<Table>> {
        self.catalog.table(name).filter(|t| t.id() == id)
    }

    /// Rebuilds every index of `table`, keeping index scans off it meanwhile
    pub fn rebuild_indexes(&self, table: &str) -> IndexResult<RebuildStats> {
        let table = self
            .catalog
            .table(table)
            .ok_or_else(|| IndexError::rebuild_failed(table, "table not found"))?;
        IndexRebuildJob::new(table, Arc::clone(&self.metrics)).run()
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("tables", &self.catalog.table_names())
            .field("config", &self.config)
            .finish()
    }
}
