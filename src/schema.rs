//! Column type system for stripe files.
//!
//! A table schema is a flat, ordered list of typed columns. Columns may carry a
//! default used when reading stripes written before the column was added.

use std::cmp::Ordering;

/// The kind of values a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit IEEE 754 floating-point.
    Float64,
    /// UTF-8 string, length-prefixed on disk.
    Text,
    /// Arbitrary bytes, length-prefixed on disk. Has no ordering, so blocks of
    /// this kind are never pruned.
    Binary,
}

impl ColumnKind {
    /// Byte alignment of this kind inside a serialized value array.
    pub fn alignment(&self) -> usize {
        match self {
            ColumnKind::Bool => 1,
            ColumnKind::Int32 => 4,
            ColumnKind::Int64 => 8,
            ColumnKind::Float64 => 8,
            ColumnKind::Text => 4,
            ColumnKind::Binary => 4,
        }
    }

    /// Serialized width for fixed-width kinds, `None` for length-prefixed ones.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnKind::Bool => Some(1),
            ColumnKind::Int32 => Some(4),
            ColumnKind::Int64 => Some(8),
            ColumnKind::Float64 => Some(8),
            ColumnKind::Text | ColumnKind::Binary => None,
        }
    }

    /// Whether values of this kind have a total order usable for pruning.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, ColumnKind::Binary)
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer value.
    Int32(i32),
    /// 64-bit integer value.
    Int64(i64),
    /// 64-bit float value.
    Float64(f64),
    /// String value.
    Text(String),
    /// Byte-array value.
    Binary(Vec<u8>),
}

impl Value {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Bool(_) => ColumnKind::Bool,
            Value::Int32(_) => ColumnKind::Int32,
            Value::Int64(_) => ColumnKind::Int64,
            Value::Float64(_) => ColumnKind::Float64,
            Value::Text(_) => ColumnKind::Text,
            Value::Binary(_) => ColumnKind::Binary,
        }
    }

    /// Compare two values of the same ordered kind.
    ///
    /// Returns `None` for mismatched kinds and for kinds without a total order.
    /// Floats compare via IEEE 754 total ordering.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => Some(a.total_cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Default applied to a column for stripes written before the column existed.
///
/// Defaults are resolved by the caller; the reader only consumes constants. A
/// default that could not be reduced to a constant is kept as its source text
/// and fails materialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColumnDefault {
    /// No default: the column reads back as null in older stripes.
    #[default]
    None,
    /// A resolved constant: every row of an older stripe gets this value.
    Constant(Value),
    /// An expression the caller could not reduce to a constant.
    Expression(String),
}

/// A named, typed table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name, unique within the table.
    pub name: String,
    /// Value kind.
    pub kind: ColumnKind,
    /// Default for stripes that predate this column.
    pub default: ColumnDefault,
}

impl Column {
    /// Create a column with no default.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: ColumnDefault::None,
        }
    }

    /// Set a constant default.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = ColumnDefault::Constant(value);
        self
    }

    /// Set an unresolved default expression.
    pub fn with_default_expression(mut self, expression: impl Into<String>) -> Self {
        self.default = ColumnDefault::Expression(expression.into());
        self
    }
}

/// An ordered list of columns describing a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Columns in declared order. The on-disk column order matches this order.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Create a schema from a column list.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Find a column's index by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The kind of the column at `index`.
    pub fn column_kind(&self, index: usize) -> ColumnKind {
        self.columns[index].kind
    }
}
