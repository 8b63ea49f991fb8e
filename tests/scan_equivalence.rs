//! Scan Equivalence Tests
//!
//! For randomized data and predicates, the index scan and the table scan
//! of the same query must return the same multiset of rows, spread over
//! any colocation split. The index scan must also return them in index
//! order. Float columns include signed zeros and NaN.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cinder::config::EngineConfig;
use cinder::executor::ColocationGroup;
use cinder::planner::expr::{and, col, eq, ge, gt, is_null, le, lit, lt, ne, not};
use cinder::planner::{Expr, LogicalScan, PhysicalPlan};
use cinder::schema::{
    Catalog, Collation, ColumnType, Field, FieldCollation, RequiredColumns, Row, RowType, Value,
};
use cinder::QueryEngine;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

const PARTITIONS: u32 = 6;

fn build(seed: u64) -> Arc<Catalog> {
    let mut rng = StdRng::seed_from_u64(seed);
    let catalog = Arc::new(Catalog::new());
    let table = catalog
        .create_table(
            "events",
            RowType::new(vec![
                Field::new("region", ColumnType::Int),
                Field::new("ts", ColumnType::Int),
                Field::new("kind", ColumnType::String),
            ]),
        )
        .unwrap();
    table
        .add_index(
            "events_region_ts",
            Collation::new(vec![FieldCollation::asc(0), FieldCollation::desc(1)]),
        )
        .unwrap();

    for id in 0..400u64 {
        let region = if rng.gen_bool(0.05) {
            Value::Null
        } else {
            Value::Int(rng.gen_range(0..8))
        };
        let ts = Value::Int(rng.gen_range(0..100));
        let kind = Value::from(["open", "close", "error"][rng.gen_range(0..3)]);
        let partition = rng.gen_range(0..PARTITIONS);
        table
            .insert(partition, id, Row::new(vec![region, ts, kind]))
            .unwrap();
    }
    catalog
}

fn random_predicate(rng: &mut StdRng) -> Expr {
    let region = rng.gen_range(0..8i64);
    let lo = rng.gen_range(0..60i64);
    let hi = lo + rng.gen_range(0..40i64);
    match rng.gen_range(0..6) {
        0 => eq(col(0), lit(region)),
        1 => and(vec![eq(col(0), lit(region)), ge(col(1), lit(lo))]),
        2 => and(vec![
            eq(col(0), lit(region)),
            gt(col(1), lit(lo)),
            le(col(1), lit(hi)),
        ]),
        3 => and(vec![lt(col(0), lit(region)), ne(col(2), lit("error"))]),
        4 => and(vec![ge(col(0), lit(region)), eq(col(1), lit(lo))]),
        _ => and(vec![is_null(col(0)), lt(col(1), lit(hi))]),
    }
}

/// Splits the partitions over three nodes and collects every node's output
fn run_everywhere(engine: &QueryEngine, plan: &PhysicalPlan) -> Vec<Vec<Row>> {
    let nodes = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let mut group = ColocationGroup::new();
    for (i, node) in nodes.iter().enumerate() {
        group.assign(*node, (0..PARTITIONS).filter(|p| *p as usize % nodes.len() == i));
    }

    nodes
        .iter()
        .map(|node| {
            let ctx = engine.context(*node, RowType::default());
            engine
                .execute(plan, &ctx, &group)
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        })
        .collect()
}

fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by(|a, b| a.values().cmp(b.values()));
    rows
}

/// (region asc, ts desc) ordering key
fn index_key(row: &Row) -> (Value, std::cmp::Reverse<Value>) {
    (
        row.get(0).cloned().unwrap_or(Value::Null),
        std::cmp::Reverse(row.get(1).cloned().unwrap_or(Value::Null)),
    )
}

// =============================================================================
// Equivalence Tests
// =============================================================================

#[test]
fn test_index_and_table_scans_agree() {
    let catalog = build(7);
    let indexed = QueryEngine::new(Arc::clone(&catalog));
    let fallback = QueryEngine::with_config(Arc::clone(&catalog), EngineConfig::without_index_scans());
    let mut rng = StdRng::seed_from_u64(99);

    let mut index_plans = 0;
    for round in 0..60 {
        let predicate = random_predicate(&mut rng);
        let scan = LogicalScan::new("events").with_condition(predicate.clone());

        let index_plan = indexed.plan(&scan).unwrap();
        let table_plan = fallback.plan(&scan).unwrap();
        assert!(!table_plan.is_index_scan());
        if index_plan.is_index_scan() {
            index_plans += 1;
        }

        let per_node = run_everywhere(&indexed, &index_plan);
        if index_plan.is_index_scan() {
            for rows in &per_node {
                let keys: Vec<_> = rows.iter().map(index_key).collect();
                let mut ordered = keys.clone();
                ordered.sort();
                assert_eq!(keys, ordered, "round {} predicate {}", round, predicate);
            }
        }

        let via_index = sorted(per_node.into_iter().flatten().collect());
        let via_table = sorted(run_everywhere(&fallback, &table_plan).into_iter().flatten().collect());
        assert_eq!(via_index, via_table, "round {} predicate {}", round, predicate);
    }
    assert!(index_plans > 0);
}

/// Projection and transform give the same result on both paths.
#[test]
fn test_projected_scans_agree() {
    let catalog = build(21);
    let indexed = QueryEngine::new(Arc::clone(&catalog));
    let fallback = QueryEngine::with_config(Arc::clone(&catalog), EngineConfig::without_index_scans());

    // read (region, kind); $1 is kind after projection
    let scan = LogicalScan::new("events")
        .with_required_columns(RequiredColumns::new([0, 2]))
        .with_condition(and(vec![eq(col(0), lit(3)), eq(col(1), lit("open"))]))
        .with_projects(vec![col(1)]);

    let index_plan = indexed.plan(&scan).unwrap();
    assert!(index_plan.is_index_scan());
    let table_plan = fallback.plan(&scan).unwrap();

    let via_index: Vec<Row> = run_everywhere(&indexed, &index_plan).into_iter().flatten().collect();
    let via_table: Vec<Row> = run_everywhere(&fallback, &table_plan).into_iter().flatten().collect();
    assert_eq!(via_index.len(), via_table.len());
    assert!(via_index.iter().all(|r| r.values() == [Value::from("open")]));
}

// =============================================================================
// Float Edge Values
// =============================================================================

fn build_floats(seed: u64) -> Arc<Catalog> {
    let mut rng = StdRng::seed_from_u64(seed);
    let catalog = Arc::new(Catalog::new());
    let table = catalog
        .create_table(
            "readings",
            RowType::new(vec![
                Field::new("f", ColumnType::Float),
                Field::new("id", ColumnType::Int),
            ]),
        )
        .unwrap();
    table.add_index("readings_f", Collation::ascending(&[0])).unwrap();
    table
        .add_index("readings_f_desc", Collation::new(vec![FieldCollation::desc(0)]))
        .unwrap();

    let pool = [
        Value::Float(-0.0),
        Value::Float(0.0),
        Value::Float(f64::NAN),
        Value::Float(-f64::NAN),
        Value::Float(1.0),
        Value::Float(5.0),
        Value::Float(-3.5),
        Value::Float(f64::INFINITY),
        Value::Float(f64::NEG_INFINITY),
        Value::Null,
    ];
    for id in 0..200i64 {
        let f = pool[rng.gen_range(0..pool.len())].clone();
        let partition = rng.gen_range(0..PARTITIONS);
        table
            .insert(partition, id as u64, Row::new(vec![f, Value::Int(id)]))
            .unwrap();
    }
    catalog
}

fn ids(rows: Vec<Vec<Row>>) -> Vec<Value> {
    let mut ids: Vec<Value> = rows
        .into_iter()
        .flatten()
        .map(|r| r.get(1).cloned().unwrap_or(Value::Null))
        .collect();
    ids.sort();
    ids
}

/// Signed zeros compare equal and NaN never satisfies a comparison, on
/// both access paths.
#[test]
fn test_float_edge_values_agree() {
    let catalog = build_floats(5);
    let indexed = QueryEngine::new(Arc::clone(&catalog));
    let fallback = QueryEngine::with_config(Arc::clone(&catalog), EngineConfig::without_index_scans());

    let predicates = vec![
        eq(col(0), lit(0.0)),
        eq(col(0), lit(-0.0)),
        gt(col(0), lit(1.0)),
        ge(col(0), lit(-0.0)),
        lt(col(0), lit(0.0)),
        le(col(0), lit(1.0)),
        lt(col(0), lit(f64::INFINITY)),
        gt(col(0), lit(f64::NEG_INFINITY)),
        eq(col(0), lit(f64::NAN)),
        gt(col(0), lit(f64::NAN)),
        and(vec![gt(col(0), lit(-1.0)), lt(col(0), lit(2.0))]),
        is_null(col(0)),
        not(lt(col(0), lit(1.0))),
    ];

    let mut index_plans = 0;
    for predicate in predicates {
        let scan = LogicalScan::new("readings").with_condition(predicate.clone());
        let index_plan = indexed.plan(&scan).unwrap();
        let table_plan = fallback.plan(&scan).unwrap();
        if index_plan.is_index_scan() {
            index_plans += 1;
        }

        let via_index = ids(run_everywhere(&indexed, &index_plan));
        let via_table = ids(run_everywhere(&fallback, &table_plan));
        assert_eq!(via_index, via_table, "predicate {}", predicate);
    }
    assert!(index_plans >= 10);

    // the zero point query sees both signs
    let zero = LogicalScan::new("readings").with_condition(eq(col(0), lit(0.0)));
    let rows: Vec<Row> = run_everywhere(&indexed, &indexed.plan(&zero).unwrap())
        .into_iter()
        .flatten()
        .collect();
    assert!(rows.iter().any(|r| matches!(r.get(0), Some(Value::Float(f)) if f.is_sign_negative())));
    assert!(rows.iter().any(|r| matches!(r.get(0), Some(Value::Float(f)) if f.is_sign_positive())));
}
