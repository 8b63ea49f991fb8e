//! Index keys and range bounds
//!
//! An index key is the row's collation columns, each ordered by its
//! direction, followed by the row id so duplicate values stay distinct.
//! Keys compare component-wise; a shorter key sorts before any longer key
//! sharing its prefix, which makes a bare prefix usable as a seek position.

use std::cmp::Ordering;
use std::fmt;

use crate::schema::{Collation, Direction, Row, Value};

use super::storage::RowId;

/// One component of an index key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    value: Value,
    direction: Direction,
}

impl KeyPart {
    pub fn new(value: Value, direction: Direction) -> Self {
        Self { value, direction }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.value.cmp(&other.value);
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// Full index key: collation components then row id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexKey {
    parts: Vec<KeyPart>,
    row_id: RowId,
}

impl IndexKey {
    /// Extracts the key of a table row for the given collation
    pub fn from_row(row: &Row, collation: &Collation, row_id: RowId) -> Self {
        let parts = collation
            .fields()
            .iter()
            .map(|fc| {
                KeyPart::new(
                    row.get(fc.column).cloned().unwrap_or(Value::Null),
                    fc.direction,
                )
            })
            .collect();
        Self { parts, row_id }
    }

    /// Smallest key at or after every key starting with `prefix`
    pub fn seek_position(prefix: &[Value], collation: &Collation) -> Self {
        let parts = prefix
            .iter()
            .zip(collation.fields())
            .map(|(v, fc)| KeyPart::new(v.clone(), fc.direction))
            .collect();
        Self { parts, row_id: 0 }
    }

    pub fn row_id(&self) -> RowId {
        self.row_id
    }

    /// Key values in collation order
    pub fn values(&self) -> Vec<Value> {
        self.parts.iter().map(|p| p.value.clone()).collect()
    }
}

/// Compares the leading components of `key` against a bound prefix, in
/// index order.
pub fn compare_prefix(key: &[Value], prefix: &[Value], collation: &Collation) -> Ordering {
    for ((k, b), fc) in key.iter().zip(prefix).zip(collation.fields()) {
        let ord = match fc.direction {
            Direction::Asc => k.cmp(b),
            Direction::Desc => k.cmp(b).reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// One end of a scan range, in index order.
///
/// Values are a prefix of the collation columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBound {
    /// No limit on this side
    Unbounded,
    /// Keys whose prefix equals the values are inside the range
    Inclusive(Vec<Value>),
    /// Keys whose prefix equals the values are outside the range
    Exclusive(Vec<Value>),
    /// The range can never match (e.g. a bound evaluated to NULL)
    Empty,
}

impl RangeBound {
    /// Values to seek to for a lower bound
    pub fn seek_values(&self) -> Option<&[Value]> {
        match self {
            RangeBound::Inclusive(v) | RangeBound::Exclusive(v) => Some(v),
            RangeBound::Unbounded | RangeBound::Empty => None,
        }
    }

    pub fn is_empty_range(&self) -> bool {
        matches!(self, RangeBound::Empty)
    }

    /// True if `key` lies before this lower bound
    pub fn below_lower(&self, key: &[Value], collation: &Collation) -> bool {
        match self {
            RangeBound::Unbounded => false,
            RangeBound::Inclusive(b) => compare_prefix(key, b, collation) == Ordering::Less,
            RangeBound::Exclusive(b) => compare_prefix(key, b, collation) != Ordering::Greater,
            RangeBound::Empty => true,
        }
    }

    /// True if `key` lies past this upper bound
    pub fn above_upper(&self, key: &[Value], collation: &Collation) -> bool {
        match self {
            RangeBound::Unbounded => false,
            RangeBound::Inclusive(b) => compare_prefix(key, b, collation) == Ordering::Greater,
            RangeBound::Exclusive(b) => compare_prefix(key, b, collation) != Ordering::Less,
            RangeBound::Empty => true,
        }
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |v: &[Value]| {
            v.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            RangeBound::Unbounded => write!(f, "*"),
            RangeBound::Inclusive(v) => write!(f, "[{}]", join(v)),
            RangeBound::Exclusive(v) => write!(f, "({})", join(v)),
            RangeBound::Empty => write!(f, "<empty>"),
        }
    }
}
