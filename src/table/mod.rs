pub mod frame;
pub mod infer;
pub mod panel;

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use chrono::NaiveDateTime;
use thiserror::Error;

pub use frame::Frame;
pub use panel::Panel;

/// Name of the column that marks a flattened 3-D table.
pub const MINOR: &str = "minor";
/// Name of the level the row index moves into when a table is unstacked.
pub const MAJOR: &str = "major";

/// A single cell or axis label.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

// Floats compare bitwise so that values can label axes and key hash maps.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Timestamp(t) => t.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NaN"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Shape violations found while building or reshaping a table.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column `{column}` has {actual} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),

    #[error("no `{0}` column to unstack")]
    MissingColumn(String),

    #[error("duplicate entry for major `{major}`, minor `{minor}`")]
    DuplicateEntry { major: String, minor: String },
}

/// A result table: 2-D, or 3-D once a `minor` axis has been folded in.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    Frame(Frame),
    Panel(Panel),
}

impl Table {
    /// Number of axes: 2 for a frame, 3 for a panel.
    pub fn ndim(&self) -> usize {
        match self {
            Table::Frame(_) => 2,
            Table::Panel(_) => 3,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Table::Frame(f) => Some(f),
            Table::Panel(_) => None,
        }
    }

    pub fn as_panel(&self) -> Option<&Panel> {
        match self {
            Table::Panel(p) => Some(p),
            Table::Frame(_) => None,
        }
    }

    /// Folds a flattened 3-D frame into a panel when it carries a `minor`
    /// column, otherwise keeps it as a frame.
    pub fn from_frame(frame: Frame) -> Result<Self, TableError> {
        if frame.has_column(MINOR) {
            Ok(Table::Panel(Panel::unstack_minor(frame)?))
        } else {
            Ok(Table::Frame(frame))
        }
    }
}
