//! Predicate and projection expressions
//!
//! A small scalar expression tree over row columns, literals and correlated
//! variables. Evaluation follows SQL three-valued logic:
//!
//! - Comparisons with a NULL operand yield NULL
//! - Comparisons between incomparable types yield NULL
//! - AND / OR / NOT follow Kleene logic
//!
//! A filter accepts a row only when it evaluates to TRUE.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::schema::{Row, Value};

/// Identifier of a correlated variable (an outer row in a nested loop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(pub u32);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$cor{}", self.0)
    }
}

/// Source of correlated variable values during evaluation
pub trait Correlations {
    /// Value of `field` in the outer row bound to `id`
    fn correlated(&self, id: CorrelationId, field: usize) -> Option<Value>;
}

/// Evaluation without any outer rows
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCorrelations;

impl Correlations for NoCorrelations {
    fn correlated(&self, _id: CorrelationId, _field: usize) -> Option<Value> {
        None
    }
}

/// Expression evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Correlated variable {id}.{field} is not bound")]
    UnboundCorrelation { id: CorrelationId, field: usize },

    #[error("Column ${column} is out of range for a row of {width} columns")]
    ColumnOutOfRange { column: usize, width: usize },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Operator with the operands swapped (`a < b` is `b > a`)
    pub fn mirror(&self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

/// Scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column of the input row, by position
    Column(usize),
    /// Constant
    Literal(Value),
    /// Field of an outer row bound at execution time
    Correlated { id: CorrelationId, field: usize },
    /// Binary comparison
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

/// `$column`
pub fn col(column: usize) -> Expr {
    Expr::Column(column)
}

/// Literal value
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Correlated variable reference
pub fn cor(id: u32, field: usize) -> Expr {
    Expr::Correlated {
        id: CorrelationId(id),
        field,
    }
}

pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Expr {
    Expr::Compare {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    compare(CompareOp::Eq, left, right)
}

pub fn ne(left: Expr, right: Expr) -> Expr {
    compare(CompareOp::Ne, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    compare(CompareOp::Lt, left, right)
}

pub fn le(left: Expr, right: Expr) -> Expr {
    compare(CompareOp::Le, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    compare(CompareOp::Gt, left, right)
}

pub fn ge(left: Expr, right: Expr) -> Expr {
    compare(CompareOp::Ge, left, right)
}

pub fn and(exprs: Vec<Expr>) -> Expr {
    Expr::And(exprs)
}

pub fn or(exprs: Vec<Expr>) -> Expr {
    Expr::Or(exprs)
}

pub fn not(expr: Expr) -> Expr {
    Expr::Not(Box::new(expr))
}

pub fn is_null(expr: Expr) -> Expr {
    Expr::IsNull(Box::new(expr))
}

pub fn is_not_null(expr: Expr) -> Expr {
    Expr::IsNotNull(Box::new(expr))
}

/// Rebuilds a conjunction from its parts. `None` for no parts.
pub fn conjunction(mut parts: Vec<Expr>) -> Option<Expr> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Expr::And(parts)),
    }
}

impl Expr {
    /// Top-level conjuncts, with nested ANDs flattened
    pub fn conjuncts(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::And(parts) => {
                for p in parts {
                    p.collect_conjuncts(out);
                }
            }
            other => out.push(other),
        }
    }

    /// Input row columns this expression reads
    pub fn columns(&self) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<usize>) {
        match self {
            Expr::Column(c) => {
                out.insert(*c);
            }
            Expr::Literal(_) | Expr::Correlated { .. } => {}
            Expr::Compare { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::IsNull(e) | Expr::IsNotNull(e) | Expr::Not(e) => e.collect_columns(out),
            Expr::And(parts) | Expr::Or(parts) => {
                for p in parts {
                    p.collect_columns(out);
                }
            }
        }
    }

    /// True if any input row column is read
    pub fn references_columns(&self) -> bool {
        !self.columns().is_empty()
    }

    /// Evaluates against a row
    pub fn eval(&self, row: &Row, correlations: &dyn Correlations) -> Result<Value, ExprError> {
        match self {
            Expr::Column(c) => row.get(*c).cloned().ok_or(ExprError::ColumnOutOfRange {
                column: *c,
                width: row.len(),
            }),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Correlated { id, field } => correlations
                .correlated(*id, *field)
                .ok_or(ExprError::UnboundCorrelation {
                    id: *id,
                    field: *field,
                }),
            Expr::Compare { op, left, right } => {
                let l = left.eval(row, correlations)?;
                let r = right.eval(row, correlations)?;
                Ok(match l.sql_cmp(&r) {
                    Some(ord) => Value::Bool(op.holds(ord)),
                    None => Value::Null,
                })
            }
            Expr::IsNull(e) => Ok(Value::Bool(e.eval(row, correlations)?.is_null())),
            Expr::IsNotNull(e) => Ok(Value::Bool(!e.eval(row, correlations)?.is_null())),
            Expr::And(parts) => {
                let mut unknown = false;
                for p in parts {
                    match truth(p.eval(row, correlations)?)? {
                        Some(false) => return Ok(Value::Bool(false)),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                Ok(if unknown { Value::Null } else { Value::Bool(true) })
            }
            Expr::Or(parts) => {
                let mut unknown = false;
                for p in parts {
                    match truth(p.eval(row, correlations)?)? {
                        Some(true) => return Ok(Value::Bool(true)),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                Ok(if unknown { Value::Null } else { Value::Bool(false) })
            }
            Expr::Not(e) => Ok(match truth(e.eval(row, correlations)?)? {
                Some(b) => Value::Bool(!b),
                None => Value::Null,
            }),
        }
    }

    /// Evaluates as a filter: only TRUE passes
    pub fn is_satisfied(&self, row: &Row, correlations: &dyn Correlations) -> Result<bool, ExprError> {
        Ok(truth(self.eval(row, correlations)?)? == Some(true))
    }
}

fn truth(value: Value) -> Result<Option<bool>, ExprError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        other => Err(ExprError::TypeMismatch(format!(
            "expected a boolean, found {}",
            other
        ))),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[Expr], sep: &str| {
            write!(f, "(")?;
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ")")
        };
        match self {
            Expr::Column(c) => write!(f, "${}", c),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Correlated { id, field } => write!(f, "{}.${}", id, field),
            Expr::Compare { op, left, right } => write!(f, "{} {} {}", left, op.as_str(), right),
            Expr::IsNull(e) => write!(f, "{} IS NULL", e),
            Expr::IsNotNull(e) => write!(f, "{} IS NOT NULL", e),
            Expr::And(parts) => join(f, parts, "AND"),
            Expr::Or(parts) => join(f, parts, "OR"),
            Expr::Not(e) => write!(f, "NOT {}", e),
        }
    }
}
