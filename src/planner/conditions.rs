//! Index condition builder
//!
//! Turns a conjunctive predicate into prefix range bounds over an index
//! collation, plus the residual predicate that still has to be evaluated
//! per row.
//!
//! # Extraction rules
//!
//! - Clauses are the flattened top-level conjuncts of the predicate
//! - A clause binds collation column `c` when it is `$c op X` or `X op $c`
//!   (`op` one of `= < <= > >=`, `X` reading no row column), or `$c IS NULL`
//! - Literal values are coerced to the column type; a failed coercion or a
//!   NULL literal leaves the clause residual
//! - Equality wins on a column; otherwise the first lower and first upper
//!   clause are used and any others stay residual
//! - The walk moves to the next collation column only after an equality
//!
//! Bounds are stored in index order: for a descending column the value
//! lower bound becomes the index upper bound and vice versa.

use std::fmt;

use crate::index::RangeBound;
use crate::schema::{Collation, ColumnType, Direction, RequiredColumns, Row, RowType, Value};

use super::expr::{conjunction, CompareOp, Correlations, Expr, ExprError};

/// One side of a column range
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    /// Value expression; reads no row column
    pub expr: Expr,
    /// Closed (`<=`, `>=`, `=`) or open (`<`, `>`)
    pub inclusive: bool,
    /// Only for `IS NULL`: a NULL value is a real bound, not an empty range
    pub accepts_null: bool,
}

impl BoundExpr {
    /// Evaluates the bound for one side of a column range.
    ///
    /// A value the column type cannot hold never fails the scan: equality
    /// against it matches nothing, and a range end is rounded into the
    /// column's domain.
    fn resolve(
        &self,
        column_type: ColumnType,
        equality: bool,
        value_side: Side,
        correlations: &dyn Correlations,
    ) -> Result<Resolved, ExprError> {
        let empty = Row::new(Vec::new());
        let value = self.expr.eval(&empty, correlations)?;
        if value.is_null() {
            return Ok(if self.accepts_null {
                Resolved::Bound(Value::Null, true)
            } else {
                Resolved::Empty
            });
        }
        // comparisons with NaN are unknown
        if value.is_nan() {
            return Ok(Resolved::Empty);
        }
        if let Some(coerced) = value.coerce_to(column_type) {
            return Ok(Resolved::Bound(coerced, self.inclusive));
        }
        if equality {
            return Ok(Resolved::Empty);
        }
        Ok(match (value, column_type) {
            (Value::Float(f), ColumnType::Int) => round_into_int(f, value_side),
            // incomparable types: every row compares unknown
            _ => Resolved::Empty,
        })
    }
}

/// A bound after evaluation
#[derive(Debug, Clone, PartialEq)]
enum Resolved {
    /// Value and whether it is included
    Bound(Value, bool),
    /// No restriction on this side
    Open,
    /// No row can satisfy the range
    Empty,
}

/// Turns `$int > f` style ends with a fractional or out-of-range `f` into
/// closed integer bounds. `side` is the value side (lower means `>`/`>=`).
fn round_into_int(f: f64, side: Side) -> Resolved {
    let (min, max) = (i64::MIN as f64, i64::MAX as f64);
    match side {
        Side::Lower if f > max => Resolved::Empty,
        Side::Lower if f < min => Resolved::Open,
        Side::Lower => Resolved::Bound(Value::Int(f.ceil() as i64), true),
        Side::Upper if f < min => Resolved::Empty,
        Side::Upper if f > max => Resolved::Open,
        Side::Upper => Resolved::Bound(Value::Int(f.floor() as i64), true),
    }
}

/// Bounds on one collation column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBounds {
    /// Column position in the (projected) row
    pub column: usize,
    pub direction: Direction,
    pub column_type: ColumnType,
    /// Lower bound in index order
    pub lower: Option<BoundExpr>,
    /// Upper bound in index order
    pub upper: Option<BoundExpr>,
    /// Both bounds are the same closed value
    pub equality: bool,
}

impl fmt::Display for ColumnBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {} ", self.column, self.direction.as_str())?;
        match &self.lower {
            Some(b) if b.inclusive => write!(f, "[{}", b.expr)?,
            Some(b) => write!(f, "({}", b.expr)?,
            None => write!(f, "(*")?,
        }
        write!(f, ", ")?;
        match &self.upper {
            Some(b) if b.inclusive => write!(f, "{}]", b.expr),
            Some(b) => write!(f, "{})", b.expr),
            None => write!(f, "*)"),
        }
    }
}

/// Result of condition building
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexConditions {
    bounds: Vec<ColumnBounds>,
    residual: Option<Expr>,
}

impl IndexConditions {
    /// No bounds: the index cannot narrow the scan
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Per-column bounds, leading collation columns first
    pub fn bounds(&self) -> &[ColumnBounds] {
        &self.bounds
    }

    /// Clauses not covered by the bounds
    pub fn residual(&self) -> Option<&Expr> {
        self.residual.as_ref()
    }

    /// Number of leading columns bound by equality
    pub fn equality_prefix(&self) -> usize {
        self.bounds.iter().take_while(|b| b.equality).count()
    }

    /// Evaluates the lower scan bound
    pub fn lower_bound(&self, correlations: &dyn Correlations) -> Result<RangeBound, ExprError> {
        self.evaluate(correlations, Side::Lower)
    }

    /// Evaluates the upper scan bound
    pub fn upper_bound(&self, correlations: &dyn Correlations) -> Result<RangeBound, ExprError> {
        self.evaluate(correlations, Side::Upper)
    }

    fn evaluate(
        &self,
        correlations: &dyn Correlations,
        side: Side,
    ) -> Result<RangeBound, ExprError> {
        let mut prefix = Vec::with_capacity(self.bounds.len());
        for cb in &self.bounds {
            let bound = match side {
                Side::Lower => &cb.lower,
                Side::Upper => &cb.upper,
            };
            // index order and value order agree only on ascending columns
            let value_side = match cb.direction {
                Direction::Asc => side,
                Direction::Desc => side.flip(),
            };
            let resolved = match bound {
                Some(b) => b.resolve(cb.column_type, cb.equality, value_side, correlations)?,
                None => Resolved::Open,
            };
            match resolved {
                Resolved::Empty => return Ok(RangeBound::Empty),
                Resolved::Bound(value, inclusive) => {
                    prefix.push(value);
                    if !cb.equality {
                        return Ok(if inclusive {
                            RangeBound::Inclusive(prefix)
                        } else {
                            RangeBound::Exclusive(prefix)
                        });
                    }
                }
                Resolved::Open => {
                    // open range end: NULLs sit at the low value end, NaN at the high one
                    if value_side == Side::Lower {
                        prefix.push(Value::Null);
                        return Ok(RangeBound::Exclusive(prefix));
                    }
                    if cb.column_type == ColumnType::Float {
                        prefix.push(Value::Float(f64::NAN));
                        return Ok(RangeBound::Exclusive(prefix));
                    }
                    break;
                }
            }
        }

        if prefix.is_empty() {
            Ok(RangeBound::Unbounded)
        } else {
            Ok(RangeBound::Inclusive(prefix))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

impl Side {
    fn flip(self) -> Side {
        match self {
            Side::Lower => Side::Upper,
            Side::Upper => Side::Lower,
        }
    }
}

/// A clause usable as a bound on one column
struct Candidate {
    clause: usize,
    op: CompareOp,
    value: Expr,
    accepts_null: bool,
}

/// Builds index conditions.
///
/// `collation` uses table column positions. When `required` is given, the
/// predicate refers to projected positions and the collation is remapped
/// accordingly. An empty (or fully projected-away) collation, or a predicate
/// that binds no leading column, yields [`IndexConditions::empty`].
pub fn build_conditions(
    collation: &Collation,
    predicate: Option<&Expr>,
    row_type: &RowType,
    required: Option<&RequiredColumns>,
) -> IndexConditions {
    if collation.is_empty() {
        return IndexConditions::empty();
    }
    let Some(predicate) = predicate else {
        return IndexConditions::empty();
    };

    let (collation, row_type) = match required {
        Some(req) => (collation.remap(req), row_type.project(req.columns())),
        None => (collation.clone(), row_type.clone()),
    };

    let clauses = predicate.conjuncts();
    let mut consumed = vec![false; clauses.len()];
    let mut bounds = Vec::new();

    for fc in collation.fields() {
        let Some(column_type) = row_type.column_type(fc.column) else {
            break;
        };

        let candidates: Vec<Candidate> = clauses
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed[*i])
            .filter_map(|(i, clause)| extract(i, clause, fc.column, column_type))
            .collect();

        let equality = candidates.iter().find(|c| c.op == CompareOp::Eq);
        if let Some(eq) = equality {
            consumed[eq.clause] = true;
            let bound = BoundExpr {
                expr: eq.value.clone(),
                inclusive: true,
                accepts_null: eq.accepts_null,
            };
            bounds.push(ColumnBounds {
                column: fc.column,
                direction: fc.direction,
                column_type,
                lower: Some(bound.clone()),
                upper: Some(bound),
                equality: true,
            });
            continue;
        }

        let low = candidates
            .iter()
            .find(|c| matches!(c.op, CompareOp::Gt | CompareOp::Ge));
        let high = candidates
            .iter()
            .find(|c| matches!(c.op, CompareOp::Lt | CompareOp::Le));
        if low.is_none() && high.is_none() {
            break;
        }

        let mut to_bound = |c: &Candidate| {
            consumed[c.clause] = true;
            BoundExpr {
                expr: c.value.clone(),
                inclusive: matches!(c.op, CompareOp::Ge | CompareOp::Le),
                accepts_null: false,
            }
        };
        let value_low = low.map(&mut to_bound);
        let value_high = high.map(&mut to_bound);

        let (lower, upper) = match fc.direction {
            Direction::Asc => (value_low, value_high),
            Direction::Desc => (value_high, value_low),
        };
        bounds.push(ColumnBounds {
            column: fc.column,
            direction: fc.direction,
            column_type,
            lower,
            upper,
            equality: false,
        });
        break;
    }

    if bounds.is_empty() {
        return IndexConditions::empty();
    }

    let residual = conjunction(
        clauses
            .iter()
            .zip(&consumed)
            .filter(|(_, used)| !**used)
            .map(|(c, _)| (*c).clone())
            .collect(),
    );

    IndexConditions { bounds, residual }
}

/// Matches a clause against one column
fn extract(clause_index: usize, clause: &Expr, column: usize, ty: ColumnType) -> Option<Candidate> {
    match clause {
        Expr::IsNull(inner) if **inner == Expr::Column(column) => Some(Candidate {
            clause: clause_index,
            op: CompareOp::Eq,
            value: Expr::Literal(Value::Null),
            accepts_null: true,
        }),
        Expr::Compare { op, left, right } => {
            if *op == CompareOp::Ne {
                return None;
            }
            let (op, other) = match (left.as_ref(), right.as_ref()) {
                (Expr::Column(c), other) if *c == column => (*op, other),
                (other, Expr::Column(c)) if *c == column => (op.mirror(), other),
                _ => return None,
            };
            if other.references_columns() {
                return None;
            }
            let value = match other {
                Expr::Literal(v) if v.is_null() => return None,
                Expr::Literal(v) => Expr::Literal(v.coerce_to(ty)?),
                e => e.clone(),
            };
            Some(Candidate {
                clause: clause_index,
                op,
                value,
                accepts_null: false,
            })
        }
        _ => None,
    }
}
