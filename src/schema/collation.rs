//! Index sort order and column projection
//!
//! A collation is an ordered list of (column, direction) pairs. Column
//! positions always refer to a concrete row layout: the table row for an
//! index descriptor, or the projected row once remapped through
//! [`RequiredColumns`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction of a collation column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, Direction::Desc)
    }
}

/// One collation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldCollation {
    /// Column position
    pub column: usize,
    /// Sort direction
    pub direction: Direction,
}

impl FieldCollation {
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: usize) -> Self {
        Self {
            column,
            direction: Direction::Desc,
        }
    }
}

/// Ordered sort specification of an index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Collation {
    fields: Vec<FieldCollation>,
}

impl Collation {
    pub fn new(fields: Vec<FieldCollation>) -> Self {
        Self { fields }
    }

    /// The empty collation; an index with it cannot support range conditions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ascending collation over the given columns
    pub fn ascending(columns: &[usize]) -> Self {
        Self::new(columns.iter().map(|&c| FieldCollation::asc(c)).collect())
    }

    pub fn fields(&self) -> &[FieldCollation] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Column positions in collation order
    pub fn keys(&self) -> Vec<usize> {
        self.fields.iter().map(|f| f.column).collect()
    }

    /// Remaps the collation from table positions to projected positions.
    ///
    /// The result is truncated at the first column that the projection does
    /// not retain, since later columns no longer form a prefix of the sort
    /// order.
    pub fn remap(&self, required: &RequiredColumns) -> Collation {
        let mut fields = Vec::with_capacity(self.fields.len());
        for fc in &self.fields {
            match required.target(fc.column) {
                Some(target) => fields.push(FieldCollation {
                    column: target,
                    direction: fc.direction,
                }),
                None => break,
            }
        }
        Collation { fields }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, fc) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "${} {}", fc.column, fc.direction.as_str())?;
        }
        write!(f, "]")
    }
}

/// The set of table columns a query actually reads.
///
/// Positions are kept sorted and unique; the projected row lays the columns
/// out in ascending table order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredColumns {
    columns: Vec<usize>,
}

impl RequiredColumns {
    pub fn new(columns: impl IntoIterator<Item = usize>) -> Self {
        let mut columns: Vec<usize> = columns.into_iter().collect();
        columns.sort_unstable();
        columns.dedup();
        Self { columns }
    }

    /// Table positions in projected order
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: usize) -> bool {
        self.columns.binary_search(&column).is_ok()
    }

    /// Projected position of a table column, if retained
    pub fn target(&self, column: usize) -> Option<usize> {
        self.columns.binary_search(&column).ok()
    }

    /// Table column of a projected position
    pub fn source(&self, target: usize) -> Option<usize> {
        self.columns.get(target).copied()
    }
}
