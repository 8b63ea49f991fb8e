//! Scan planner for cinder
//!
//! Turns a filtered, projected table scan into either an index scan or a
//! full table scan.
//!
//! # Design Principles
//!
//! - Deterministic: same inputs and flag value give the same plan
//! - Availability-aware: a table whose indexes are being rebuilt always
//!   plans to a table scan
//! - Prefix-only: an index narrows a scan only through a prefix of its
//!   collation
//! - Lossless: clauses not turned into bounds stay in the residual filter

mod conditions;
mod errors;
mod explain;
pub mod expr;
mod selector;

pub use conditions::{build_conditions, BoundExpr, ColumnBounds, IndexConditions};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::ExplainPlan;
pub use expr::{CompareOp, CorrelationId, Correlations, Expr, ExprError, NoCorrelations};
pub use selector::{
    FallbackReason, IndexScanPlan, LogicalScan, PhysicalPlan, PlanSelector, TableScanPlan,
};
