//! Cell values
//!
//! This module defines how a single table cell is represented in memory and
//! how it converts to and from the engine's own value type.

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::types::ScalarKind;

/// A single cell value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Integer(i64),
    /// Float value (64-bit)
    Real(f64),
    /// String value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

// Floats compare bitwise so that tables can be compared for equality
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of this value
    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::Null => ScalarKind::Null,
            Value::Integer(_) => ScalarKind::Integer,
            Value::Real(_) => ScalarKind::Real,
            Value::Text(_) => ScalarKind::Text,
            Value::Blob(_) => ScalarKind::Blob,
        }
    }

    /// Truthiness: NULL, zero and empty text/blob are false
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Integer(i) => *i != 0,
            Value::Real(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Blob(b) => !b.is_empty(),
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "int",
            Value::Real(_) => "float",
            Value::Text(_) => "str",
            Value::Blob(_) => "blob",
        }
    }

    /// Convert this value so that it fits a column of `kind`.
    ///
    /// Callers only ask for kinds produced by [`ScalarKind::unify`], so the
    /// only real conversions are Integer to Real and anything to Text.
    pub fn coerce(self, kind: ScalarKind) -> Value {
        match (kind, self) {
            (_, Value::Null) => Value::Null,
            (ScalarKind::Real, Value::Integer(i)) => Value::Real(i as f64),
            (ScalarKind::Text, Value::Text(s)) => Value::Text(s),
            (ScalarKind::Text, other) => Value::Text(other.to_string()),
            (_, other) => other,
        }
    }

    /// Compare two values (for comparisons, min/max and masks)
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less), // NULL is less than everything
            (_, Value::Null) => Some(Ordering::Greater),

            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),

            _ => None, // Incompatible types
        }
    }

    /// Add two values; integer overflow promotes to float
    pub fn add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(
                a.checked_add(*b)
                    .map(Value::Integer)
                    .unwrap_or(Value::Real(*a as f64 + *b as f64)),
            ),
            (Value::Text(a), Value::Text(b)) => Some(Value::Text(format!("{}{}", a, b))),
            (a, b) => Some(Value::Real(a.numeric()? + b.numeric()?)),
        }
    }

    /// Subtract two values
    pub fn sub(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(
                a.checked_sub(*b)
                    .map(Value::Integer)
                    .unwrap_or(Value::Real(*a as f64 - *b as f64)),
            ),
            (a, b) => Some(Value::Real(a.numeric()? - b.numeric()?)),
        }
    }

    /// Multiply two values
    pub fn mul(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(
                a.checked_mul(*b)
                    .map(Value::Integer)
                    .unwrap_or(Value::Real(*a as f64 * *b as f64)),
            ),
            (a, b) => Some(Value::Real(a.numeric()? * b.numeric()?)),
        }
    }

    /// Divide two values (always a float result)
    pub fn div(&self, other: &Value) -> Option<Value> {
        let divisor = other.numeric()?;
        if divisor == 0.0 {
            return None;
        }
        Some(Value::Real(self.numeric()? / divisor))
    }

    /// Remainder of two values
    pub fn rem(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => None,
            (Value::Integer(a), Value::Integer(b)) => a.checked_rem(*b).map(Value::Integer),
            (a, b) => {
                let divisor = b.numeric()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(Value::Real(a.numeric()? % divisor))
            }
        }
    }

    /// Numeric view used by the float arithmetic paths
    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Lowercase hex rendering of a blob, used by exports
    pub fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(n) => write!(f, "{:?}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "x'{}'", Value::hex(b)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(f) => Value::Real(f),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<&Value> for SqlValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Real(f) => SqlValue::Real(*f),
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Blob(b) => SqlValue::Blob(b.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(Value::Integer(2).add(&Value::Integer(3)), Some(Value::Integer(5)));
        assert_eq!(Value::Integer(2).mul(&Value::Real(1.5)), Some(Value::Real(3.0)));
        assert_eq!(Value::Integer(7).div(&Value::Integer(2)), Some(Value::Real(3.5)));
        assert_eq!(Value::Integer(7).rem(&Value::Integer(2)), Some(Value::Integer(1)));
        assert_eq!(Value::Integer(1).div(&Value::Integer(0)), None);
        assert_eq!(
            Value::from("ab").add(&Value::from("cd")),
            Some(Value::from("abcd"))
        );
        assert_eq!(Value::from("ab").sub(&Value::Integer(1)), None);
    }

    #[test]
    fn test_integer_overflow_promotes() {
        let sum = Value::Integer(i64::MAX).add(&Value::Integer(1)).unwrap();
        assert_eq!(sum.kind(), ScalarKind::Real);
    }

    #[test]
    fn test_compare() {
        assert_eq!(
            Value::Integer(1).compare(&Value::Real(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Null.compare(&Value::Integer(0)), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_coerce_and_display() {
        assert_eq!(Value::Integer(3).coerce(ScalarKind::Real), Value::Real(3.0));
        assert_eq!(
            Value::Real(2.5).coerce(ScalarKind::Text),
            Value::Text("2.5".to_string())
        );
        assert_eq!(Value::Null.coerce(ScalarKind::Integer), Value::Null);
        assert_eq!(Value::Real(3.0).to_string(), "3.0");
        assert_eq!(Value::Blob(vec![0x0a, 0xff]).to_string(), "x'0aff'");
    }

    #[test]
    fn test_engine_value_conversion() {
        let value: Value = SqlValue::Text("hi".to_string()).into();
        assert_eq!(value, Value::from("hi"));
        let back: SqlValue = (&Value::Real(0.5)).into();
        assert_eq!(back, SqlValue::Real(0.5));
    }
}
