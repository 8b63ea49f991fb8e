//! Column types, values and rows
//!
//! Supported column types:
//! - bool: Boolean
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - string: UTF-8 string
//!
//! Every column is nullable unless declared otherwise. Values carry a total
//! order so they can be used directly as index key components.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// UTF-8 string
    String,
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
        }
    }
}

/// A single SQL value.
///
/// Ordering is total and deterministic: Null < Bool < Int < Float < String.
/// Floats order numerically with `-0.0 == 0.0`; NaN equals NaN and sorts
/// after every other float, so index order agrees with [`Value::sql_cmp`]
/// wherever the latter is defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Returns true for SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for a float NaN
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan())
    }

    /// Returns the boolean payload, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
        }
    }

    /// Coerces this value to the given column type.
    ///
    /// Returns `None` when the value cannot represent a value of that type.
    /// NULL coerces to every type.
    pub fn coerce_to(&self, ty: ColumnType) -> Option<Value> {
        match (self, ty) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Bool(b), ColumnType::Bool) => Some(Value::Bool(*b)),
            (Value::Int(i), ColumnType::Int) => Some(Value::Int(*i)),
            (Value::Int(i), ColumnType::Float) => Some(Value::Float(*i as f64)),
            (Value::Float(f), ColumnType::Float) => Some(Value::Float(*f)),
            (Value::Float(f), ColumnType::Int) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(Value::Int(*f as i64))
                } else {
                    None
                }
            }
            (Value::String(s), ColumnType::String) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    /// SQL comparison.
    ///
    /// Returns `None` if either side is NULL or the types are not comparable.
    /// Int and Float compare numerically.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => float_cmp(*a, *b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// A positional row of values
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row(values)
    }

    /// Returns the value at a column position
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Keeps only the given column positions, in the given order.
    ///
    /// Missing positions become NULL.
    pub fn project(&self, columns: &[usize]) -> Row {
        Row(columns
            .iter()
            .map(|&c| self.0.get(c).cloned().unwrap_or(Value::Null))
            .collect())
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row(values)
    }
}

/// Builds a row from a list of values convertible into [`Value`].
#[macro_export]
macro_rules! row {
    ($($v:expr),* $(,)?) => {
        $crate::schema::Row::new(vec![$($crate::schema::Value::from($v)),*])
    };
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name (stored upper-cased)
    pub name: String,
    /// Column data type
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Whether NULL is allowed
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into().to_uppercase(),
            ty,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Ordered list of column definitions describing a row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowType {
    pub fields: Vec<Field>,
}

impl RowType {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Returns the column type at a position
    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.fields.get(index).map(|f| f.ty)
    }

    /// Finds a column position by (case-insensitive) name
    pub fn position(&self, name: &str) -> Option<usize> {
        let upper = name.to_uppercase();
        self.fields.iter().position(|f| f.name == upper)
    }

    /// Returns the row type restricted to the given column positions
    pub fn project(&self, columns: &[usize]) -> RowType {
        RowType {
            fields: columns
                .iter()
                .filter_map(|&c| self.fields.get(c).cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ordering_across_types() {
        let values = vec![
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::Int(-3),
            Value::Int(7),
            Value::Float(-1.5),
            Value::String("a".into()),
        ];

        for i in 1..values.len() {
            assert!(values[i - 1] < values[i], "{} < {}", values[i - 1], values[i]);
        }
    }

    #[test]
    fn test_float_ordering_matches_sql() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_eq!(Value::Float(-0.0).sql_cmp(&Value::Float(0.0)), Some(Ordering::Equal));
        assert!(Value::Float(f64::NAN) > Value::Float(f64::INFINITY));
        assert!(Value::Float(-f64::NAN) > Value::Float(f64::INFINITY));
        assert_eq!(Value::Float(f64::NAN), Value::Float(-f64::NAN));
        assert!(Value::Float(f64::NEG_INFINITY) < Value::Float(-1.0));
        assert_eq!(Value::Float(f64::NAN).sql_cmp(&Value::Float(1.0)), None);
    }

    #[test]
    fn test_coercion() {
        assert_eq!(Value::Int(5).coerce_to(ColumnType::Float), Some(Value::Float(5.0)));
        assert_eq!(Value::Float(5.0).coerce_to(ColumnType::Int), Some(Value::Int(5)));
        assert_eq!(Value::Float(5.5).coerce_to(ColumnType::Int), None);
        assert_eq!(Value::from("x").coerce_to(ColumnType::Int), None);
        assert_eq!(Value::Null.coerce_to(ColumnType::String), Some(Value::Null));
    }

    #[test]
    fn test_sql_cmp_null_is_unknown() {
        assert_eq!(Value::Null.sql_cmp(&Value::Int(1)), None);
        assert_eq!(Value::Int(1).sql_cmp(&Value::from("1")), None);
        assert_eq!(Value::Int(2).sql_cmp(&Value::Float(1.5)), Some(Ordering::Greater));
    }

    #[test]
    fn test_row_projection() {
        let row = crate::row![1i64, "a", true];
        assert_eq!(row.project(&[2, 0]), crate::row![true, 1i64]);
    }

    #[test]
    fn test_row_type_lookup() {
        let rt = RowType::new(vec![
            Field::new("id", ColumnType::Int).not_null(),
            Field::new("val", ColumnType::String),
        ]);
        assert_eq!(rt.position("VAL"), Some(1));
        assert_eq!(rt.position("val"), Some(1));
        assert_eq!(rt.column_type(0), Some(ColumnType::Int));
        assert_eq!(rt.project(&[1]).field_count(), 1);
    }
}
