//! Plan Selection Tests
//!
//! Tests for the rebuild-aware plan selector:
//! - A point predicate on an indexed column plans an index scan
//! - A raised rebuild flag forces a table scan, every time it is raised
//! - Concurrent flag toggling only ever produces the two valid plan shapes
//! - Unusable predicates and disabled index scans fall back

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cinder::config::EngineConfig;
use cinder::planner::expr::{col, eq, gt, lit, or};
use cinder::planner::{FallbackReason, LogicalScan, PhysicalPlan};
use cinder::schema::{Catalog, Collation, ColumnType, Field, RowType, Table};
use cinder::QueryEngine;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (QueryEngine, Arc<Table>) {
    let catalog = Arc::new(Catalog::new());
    let table = catalog
        .create_table(
            "orders",
            RowType::new(vec![
                Field::new("id", ColumnType::Int),
                Field::new("customer", ColumnType::String),
                Field::new("total", ColumnType::Float),
            ]),
        )
        .unwrap();
    table
        .add_index("orders_id", Collation::ascending(&[0]))
        .unwrap();
    (QueryEngine::new(catalog), table)
}

fn point_query() -> LogicalScan {
    LogicalScan::new("orders").with_condition(eq(col(0), lit(5)))
}

// =============================================================================
// Flag Tests
// =============================================================================

/// Flag clear: the point predicate uses the index.
#[test]
fn test_point_predicate_uses_index() {
    let (engine, _table) = setup();

    let plan = engine.plan(&point_query()).unwrap();
    match plan {
        PhysicalPlan::IndexScan(p) => {
            assert_eq!(p.index, "ORDERS_ID");
            assert_eq!(p.conditions.bounds().len(), 1);
            assert!(p.filter.is_none());
        }
        other => panic!("expected index scan, got {:?}", other),
    }
}

/// Flag raised: the same query falls back to a table scan.
#[test]
fn test_rebuild_forces_table_scan() {
    let (engine, table) = setup();
    table.mark_index_rebuild_in_progress(true);

    match engine.plan(&point_query()).unwrap() {
        PhysicalPlan::TableScan(p) => {
            assert_eq!(p.reason, Some(FallbackReason::Rebuilding));
            assert!(p.filter.is_some());
        }
        other => panic!("expected table scan, got {:?}", other),
    }
    assert_eq!(engine.metrics().snapshot().rebuild_fallbacks, 1);
}

/// Every re-plan reflects the flag value at that moment.
#[test]
fn test_toggle_is_never_stale() {
    let (engine, table) = setup();

    for i in 0..50 {
        let rebuilding = i % 3 == 0;
        table.mark_index_rebuild_in_progress(rebuilding);
        let plan = engine.plan(&point_query()).unwrap();
        assert_eq!(plan.is_index_scan(), !rebuilding, "iteration {}", i);
    }
}

/// Candidates drop every index scan while rebuilding.
#[test]
fn test_candidates_during_rebuild() {
    let (engine, table) = setup();

    let before = engine.candidates(&point_query()).unwrap();
    assert_eq!(before.len(), 2);
    assert!(before[0].is_index_scan());
    assert!(!before[1].is_index_scan());

    table.mark_index_rebuild_in_progress(true);
    let during = engine.candidates(&point_query()).unwrap();
    assert_eq!(during.len(), 1);
    assert!(!during[0].is_index_scan());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// One thread flips the flag in a tight loop while another plans
/// repeatedly. Every plan must be one of the two valid shapes.
#[test]
fn test_concurrent_toggle_and_plan() {
    const ITERATIONS: usize = 5_000;

    let (engine, table) = setup();
    let stop = Arc::new(AtomicBool::new(false));

    let toggler = {
        let table = Arc::clone(&table);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flips = 0u64;
            while !stop.load(Ordering::Relaxed) {
                table.mark_index_rebuild_in_progress(flips % 2 == 0);
                flips += 1;
            }
            table.mark_index_rebuild_in_progress(false);
            flips
        })
    };

    let mut index_plans = 0usize;
    let mut table_plans = 0usize;
    for _ in 0..ITERATIONS {
        match engine.plan(&point_query()).unwrap() {
            PhysicalPlan::IndexScan(p) => {
                assert_eq!(p.index, "ORDERS_ID");
                assert_eq!(p.conditions.bounds().len(), 1);
                index_plans += 1;
            }
            PhysicalPlan::TableScan(p) => {
                assert_eq!(p.reason, Some(FallbackReason::Rebuilding));
                table_plans += 1;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    let flips = toggler.join().unwrap();

    assert!(flips > 0);
    assert_eq!(index_plans + table_plans, ITERATIONS);
    let snap = engine.metrics().snapshot();
    assert_eq!(snap.index_scan_plans as usize, index_plans);
    assert_eq!(snap.table_scan_plans as usize, table_plans);
    assert_eq!(snap.rebuild_fallbacks as usize, table_plans);

    // flag is down again
    assert!(engine.plan(&point_query()).unwrap().is_index_scan());
}

/// Several planners against one toggler.
#[test]
fn test_many_planners() {
    let (engine, table) = setup();
    let engine = Arc::new(engine);
    let stop = Arc::new(AtomicBool::new(false));

    let toggler = {
        let table = Arc::clone(&table);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let now = table.is_index_rebuild_in_progress();
                table.mark_index_rebuild_in_progress(!now);
            }
        })
    };

    let planners: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let plan = engine.plan(&point_query()).unwrap();
                    assert!(matches!(
                        plan,
                        PhysicalPlan::IndexScan(_) | PhysicalPlan::TableScan(_)
                    ));
                }
            })
        })
        .collect();

    for p in planners {
        p.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    toggler.join().unwrap();

    let snap = engine.metrics().snapshot();
    assert_eq!(snap.index_scan_plans + snap.table_scan_plans, 4_000);
}

// =============================================================================
// Fallback Tests
// =============================================================================

/// A disjunction cannot bound the index.
#[test]
fn test_unusable_predicate_falls_back() {
    let (engine, _table) = setup();
    let scan = LogicalScan::new("orders").with_condition(or(vec![
        eq(col(0), lit(1)),
        eq(col(0), lit(2)),
    ]));

    match engine.plan(&scan).unwrap() {
        PhysicalPlan::TableScan(p) => {
            assert_eq!(p.reason, Some(FallbackReason::NoUsableConditions))
        }
        other => panic!("expected table scan, got {:?}", other),
    }
}

/// Predicate on a non-indexed column.
#[test]
fn test_non_leading_column_falls_back() {
    let (engine, _table) = setup();
    let scan = LogicalScan::new("orders").with_condition(gt(col(2), lit(10.0)));
    assert!(!engine.plan(&scan).unwrap().is_index_scan());
}

/// Index scans disabled by configuration.
#[test]
fn test_disabled_by_config() {
    let (engine, _table) = setup();
    let engine = QueryEngine::with_config(
        Arc::clone(engine.catalog()),
        EngineConfig::without_index_scans(),
    );

    match engine.plan(&point_query()).unwrap() {
        PhysicalPlan::TableScan(p) => {
            assert_eq!(p.reason, Some(FallbackReason::IndexScansDisabled))
        }
        other => panic!("expected table scan, got {:?}", other),
    }
}

/// Explain reports the fallback reason.
#[test]
fn test_explain_reports_rebuild() {
    let (engine, table) = setup();
    table.mark_index_rebuild_in_progress(true);

    let explain = engine.explain(&point_query());
    assert!(explain.accepted);
    assert_eq!(explain.scan_type.as_deref(), Some("TABLE_SCAN"));
    assert_eq!(explain.fallback_reason.as_deref(), Some("REBUILD_IN_PROGRESS"));
}

/// Unknown table is rejected, and explain says why.
#[test]
fn test_unknown_table() {
    let (engine, _table) = setup();
    let scan = LogicalScan::new("missing");

    let err = engine.plan(&scan).unwrap_err();
    assert_eq!(err.code().code(), "CINDER_UNKNOWN_TABLE");

    let explain = engine.explain(&scan);
    assert!(!explain.accepted);
    assert_eq!(explain.rejection_code.as_deref(), Some("CINDER_UNKNOWN_TABLE"));
}
