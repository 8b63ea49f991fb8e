//! Plan selection
//!
//! Chooses between an index scan and a full table scan for one logical
//! table scan. Each planning call reads the table's rebuild flag at most
//! once and commits to that value; nothing is remembered between calls.
//!
//! # Index preference (strict order)
//!
//! 1. Most bounded collation columns
//! 2. Longest equality prefix
//! 3. Index name, ascending

use std::fmt;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::schema::{Catalog, Collation, RequiredColumns, Table, TableId};

use super::conditions::{build_conditions, IndexConditions};
use super::errors::{PlannerError, PlannerResult};
use super::expr::Expr;

/// A filtered, projected scan of one table, as handed over by the optimizer.
///
/// `condition` and `projects` refer to positions in the projected row when
/// `required_columns` is set, otherwise to table positions.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalScan {
    pub table: String,
    pub condition: Option<Expr>,
    pub projects: Option<Vec<Expr>>,
    pub required_columns: Option<RequiredColumns>,
}

impl LogicalScan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            condition: None,
            projects: None,
            required_columns: None,
        }
    }

    pub fn with_condition(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_projects(mut self, projects: Vec<Expr>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn with_required_columns(mut self, required: RequiredColumns) -> Self {
        self.required_columns = Some(required);
        self
    }
}

/// Why a table scan was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The table's indexes are being rebuilt
    Rebuilding,
    /// No index yields bounds for the predicate
    NoUsableConditions,
    /// The table has no indexes
    NoIndexes,
    /// Index scans are switched off by configuration
    IndexScansDisabled,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Rebuilding => "REBUILD_IN_PROGRESS",
            FallbackReason::NoUsableConditions => "NO_USABLE_CONDITIONS",
            FallbackReason::NoIndexes => "NO_INDEXES",
            FallbackReason::IndexScansDisabled => "INDEX_SCANS_DISABLED",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index scan plan node
#[derive(Debug, Clone, PartialEq)]
pub struct IndexScanPlan {
    pub table: String,
    pub table_id: TableId,
    pub index: String,
    /// Index sort order, table positions
    pub collation: Collation,
    pub conditions: Arc<IndexConditions>,
    /// Residual predicate applied after the bound checks
    pub filter: Option<Expr>,
    pub projects: Option<Vec<Expr>>,
    pub required_columns: Option<RequiredColumns>,
}

/// Table scan plan node
#[derive(Debug, Clone, PartialEq)]
pub struct TableScanPlan {
    pub table: String,
    pub table_id: TableId,
    /// Full scan predicate
    pub filter: Option<Expr>,
    pub projects: Option<Vec<Expr>>,
    pub required_columns: Option<RequiredColumns>,
    /// Set when an index scan was ruled out; `None` for a plain alternative
    pub reason: Option<FallbackReason>,
}

/// Physical scan plan
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalPlan {
    IndexScan(IndexScanPlan),
    TableScan(TableScanPlan),
}

impl PhysicalPlan {
    pub fn table(&self) -> &str {
        match self {
            PhysicalPlan::IndexScan(p) => &p.table,
            PhysicalPlan::TableScan(p) => &p.table,
        }
    }

    /// Name of the scanned index, `None` for table scans
    pub fn index(&self) -> Option<&str> {
        match self {
            PhysicalPlan::IndexScan(p) => Some(&p.index),
            PhysicalPlan::TableScan(_) => None,
        }
    }

    pub fn is_index_scan(&self) -> bool {
        matches!(self, PhysicalPlan::IndexScan(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PhysicalPlan::IndexScan(_) => "INDEX_SCAN",
            PhysicalPlan::TableScan(_) => "TABLE_SCAN",
        }
    }
}

/// Planner entry point for scans
pub struct PlanSelector<'a> {
    catalog: &'a Catalog,
    config: &'a PlannerConfig,
    metrics: &'a MetricsRegistry,
}

impl<'a> PlanSelector<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a PlannerConfig, metrics: &'a MetricsRegistry) -> Self {
        Self {
            catalog,
            config,
            metrics,
        }
    }

    /// Picks the single best plan for the scan
    pub fn select(&self, scan: &LogicalScan) -> PlannerResult<PhysicalPlan> {
        let table = self.resolve(scan)?;
        let plan = match self.index_plans(&table, scan) {
            Ok(plans) => match plans.into_iter().next() {
                Some(best) => PhysicalPlan::IndexScan(best),
                None => self.table_scan(&table, scan, Some(FallbackReason::NoUsableConditions)),
            },
            Err(reason) => self.table_scan(&table, scan, Some(reason)),
        };
        self.record(&plan);
        Ok(plan)
    }

    /// Every plan the optimizer may cost: usable index scans in preference
    /// order, then the table scan.
    pub fn candidates(&self, scan: &LogicalScan) -> PlannerResult<Vec<PhysicalPlan>> {
        let table = self.resolve(scan)?;
        let mut out = Vec::new();
        let reason = match self.index_plans(&table, scan) {
            Ok(plans) => {
                out.extend(plans.into_iter().map(PhysicalPlan::IndexScan));
                None
            }
            Err(reason) => Some(reason),
        };
        out.push(self.table_scan(&table, scan, reason));
        Ok(out)
    }

    fn resolve(&self, scan: &LogicalScan) -> PlannerResult<Arc<Table>> {
        let table = self
            .catalog
            .table(&scan.table)
            .ok_or_else(|| PlannerError::unknown_table(scan.table.to_uppercase()))?;

        let field_count = table.row_type().field_count();
        let width = match &scan.required_columns {
            Some(req) => {
                if let Some(bad) = req.columns().iter().find(|c| **c >= field_count) {
                    return Err(PlannerError::query_invalid(
                        table.name(),
                        format!("Required column ${} is outside a row of {} columns", bad, field_count),
                    ));
                }
                req.len()
            }
            None => field_count,
        };

        let exprs = scan.condition.iter().chain(scan.projects.iter().flatten());
        for expr in exprs {
            if let Some(bad) = expr.columns().into_iter().find(|c| *c >= width) {
                return Err(PlannerError::query_invalid(
                    table.name(),
                    format!("Column ${} is outside a row of {} columns in '{}'", bad, width, expr),
                ));
            }
        }

        Ok(table)
    }

    fn index_plans(
        &self,
        table: &Table,
        scan: &LogicalScan,
    ) -> Result<Vec<IndexScanPlan>, FallbackReason> {
        if !self.config.index_scans_enabled {
            return Err(FallbackReason::IndexScansDisabled);
        }
        let indexes = table.indexes();
        if indexes.is_empty() {
            return Err(FallbackReason::NoIndexes);
        }
        // the only read of the flag for this planning call
        if table.is_index_rebuild_in_progress() {
            return Err(FallbackReason::Rebuilding);
        }

        let mut plans: Vec<IndexScanPlan> = indexes
            .iter()
            .filter_map(|index| {
                let conditions = build_conditions(
                    index.collation(),
                    scan.condition.as_ref(),
                    table.row_type(),
                    scan.required_columns.as_ref(),
                );
                if conditions.is_empty() {
                    return None;
                }
                Some(IndexScanPlan {
                    table: table.name().to_string(),
                    table_id: table.id(),
                    index: index.name().to_string(),
                    collation: index.collation().clone(),
                    filter: conditions.residual().cloned(),
                    conditions: Arc::new(conditions),
                    projects: scan.projects.clone(),
                    required_columns: scan.required_columns.clone(),
                })
            })
            .collect();

        if plans.is_empty() {
            return Err(FallbackReason::NoUsableConditions);
        }

        plans.sort_by(|a, b| {
            b.conditions
                .bounds()
                .len()
                .cmp(&a.conditions.bounds().len())
                .then(b.conditions.equality_prefix().cmp(&a.conditions.equality_prefix()))
                .then_with(|| a.index.cmp(&b.index))
        });
        Ok(plans)
    }

    fn table_scan(
        &self,
        table: &Table,
        scan: &LogicalScan,
        reason: Option<FallbackReason>,
    ) -> PhysicalPlan {
        PhysicalPlan::TableScan(TableScanPlan {
            table: table.name().to_string(),
            table_id: table.id(),
            filter: scan.condition.clone(),
            projects: scan.projects.clone(),
            required_columns: scan.required_columns.clone(),
            reason,
        })
    }

    fn record(&self, plan: &PhysicalPlan) {
        match plan {
            PhysicalPlan::IndexScan(p) => {
                self.metrics.increment_index_scan_plans();
                let bounded = p.conditions.bounds().len().to_string();
                log_event_with_fields(
                    Event::PlanIndexScan,
                    &[
                        ("bounded_columns", bounded.as_str()),
                        ("index", p.index.as_str()),
                        ("table", p.table.as_str()),
                    ],
                );
            }
            PhysicalPlan::TableScan(p) => {
                self.metrics.increment_table_scan_plans();
                if p.reason == Some(FallbackReason::Rebuilding) {
                    self.metrics.increment_rebuild_fallbacks();
                }
                let reason = p.reason.map(|r| r.as_str()).unwrap_or("NONE");
                log_event_with_fields(
                    Event::PlanTableScan,
                    &[("reason", reason), ("table", p.table.as_str())],
                );
            }
        }
    }
}
