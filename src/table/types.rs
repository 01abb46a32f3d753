//! Scalar kinds for table columns
//!
//! Every column holds values of a single kind drawn from the closed set the
//! relational engine can report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// Column with no values other than NULL
    Null,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Real,
    /// UTF-8 text
    Text,
    /// Binary data
    Blob,
}

impl ScalarKind {
    /// Declared SQL type used when the column is written to the engine.
    ///
    /// Null columns are declared without a type.
    pub fn declared_type(&self) -> Option<&'static str> {
        match self {
            ScalarKind::Null => None,
            ScalarKind::Integer => Some("INTEGER"),
            ScalarKind::Real => Some("REAL"),
            ScalarKind::Text => Some("TEXT"),
            ScalarKind::Blob => Some("BLOB"),
        }
    }

    /// Map a declared SQL type onto a kind using SQLite's affinity rules.
    ///
    /// Returns `None` for declarations without a usable affinity (empty or
    /// NUMERIC-like), in which case the kind is inferred from the values.
    pub fn from_declared(declared: &str) -> Option<ScalarKind> {
        let upper = declared.to_uppercase();
        if upper.is_empty() {
            None
        } else if upper.contains("INT") {
            Some(ScalarKind::Integer)
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Some(ScalarKind::Text)
        } else if upper.contains("BLOB") {
            Some(ScalarKind::Blob)
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Some(ScalarKind::Real)
        } else {
            None
        }
    }

    /// Check if this kind is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::Real)
    }

    /// Smallest kind able to hold values of both `self` and `other`
    pub fn unify(self, other: ScalarKind) -> ScalarKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ScalarKind::Null, k) | (k, ScalarKind::Null) => k,
            (ScalarKind::Integer, ScalarKind::Real) | (ScalarKind::Real, ScalarKind::Integer) => {
                ScalarKind::Real
            }
            _ => ScalarKind::Text,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Null => write!(f, "null"),
            ScalarKind::Integer => write!(f, "int"),
            ScalarKind::Real => write!(f, "float"),
            ScalarKind::Text => write!(f, "str"),
            ScalarKind::Blob => write!(f, "blob"),
        }
    }
}
