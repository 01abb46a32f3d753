//! Builtin functions
//!
//! The fixed library bindings every script sees. They cannot be rebound or
//! deleted, and their names are reserved as table names.

use std::cmp::Ordering;
use std::fmt;

use super::interp::Object;
use super::{Fault, FaultKind, ScriptResult};
use crate::table::{Column, Table, Value};

/// Most values `range` may produce
pub const MAX_RANGE_LEN: usize = 10_000_000;

/// Builtin function
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Builtin {
    Print,
    Len,
    Sum,
    Min,
    Max,
    Mean,
    Count,
    Range,
    Columns,
    Head,
    Table,
    Round,
    Abs,
    Upper,
    Lower,
    Str,
    Int,
    Float,
    IsNull,
}

impl Builtin {
    /// Every builtin, in the order they are listed to users
    pub const ALL: [Builtin; 19] = [
        Builtin::Print,
        Builtin::Len,
        Builtin::Sum,
        Builtin::Min,
        Builtin::Max,
        Builtin::Mean,
        Builtin::Count,
        Builtin::Range,
        Builtin::Columns,
        Builtin::Head,
        Builtin::Table,
        Builtin::Round,
        Builtin::Abs,
        Builtin::Upper,
        Builtin::Lower,
        Builtin::Str,
        Builtin::Int,
        Builtin::Float,
        Builtin::IsNull,
    ];

    /// Name the builtin is bound to
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Sum => "sum",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Mean => "mean",
            Builtin::Count => "count",
            Builtin::Range => "range",
            Builtin::Columns => "columns",
            Builtin::Head => "head",
            Builtin::Table => "table",
            Builtin::Round => "round",
            Builtin::Abs => "abs",
            Builtin::Upper => "upper",
            Builtin::Lower => "lower",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::IsNull => "isnull",
        }
    }

    /// Look up a builtin by name
    pub fn from_name(name: &str) -> Option<Builtin> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// Accepted argument count range (min, max)
    fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Builtin::Print => (0, None),
            Builtin::Min | Builtin::Max => (1, None),
            Builtin::Range => (1, Some(3)),
            Builtin::Table => (0, Some(1)),
            Builtin::Head | Builtin::Round => (1, Some(2)),
            _ => (1, Some(1)),
        }
    }

    /// Call the builtin. Text written by `print` is appended to `out`.
    pub fn call(&self, args: Vec<Object>, out: &mut Vec<String>) -> ScriptResult<Object> {
        let (min, max) = self.arity();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            let expected = match max {
                Some(m) if m == min => format!("{}", min),
                Some(m) => format!("{} to {}", min, m),
                None => format!("at least {}", min),
            };
            return Err(Fault::type_error(format!(
                "{}() takes {} argument(s), got {}",
                self.name(),
                expected,
                args.len()
            )));
        }

        match self {
            Builtin::Print => {
                let line = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push(line);
                Ok(Object::Scalar(Value::Null))
            }
            Builtin::Len => {
                let n = match &args[0] {
                    Object::Table(t) => t.row_count(),
                    Object::Column(c) => c.len(),
                    Object::Scalar(Value::Text(s)) => s.chars().count(),
                    other => return Err(self.bad_argument(other)),
                };
                Ok(Object::Scalar(Value::Integer(n as i64)))
            }
            Builtin::Sum => {
                let values = self.column_values(&args[0])?;
                let mut total = Value::Integer(0);
                for v in values.iter().filter(|v| !v.is_null()) {
                    total = total.add(v).filter(|t| t.kind().is_numeric()).ok_or_else(|| {
                        Fault::type_error(format!("sum() cannot add a {}", v.type_name()))
                    })?;
                }
                Ok(Object::Scalar(total))
            }
            Builtin::Min => self.extreme(args, Ordering::Less),
            Builtin::Max => self.extreme(args, Ordering::Greater),
            Builtin::Mean => {
                let values = self.column_values(&args[0])?;
                let mut total = 0.0;
                let mut n = 0usize;
                for v in values.iter().filter(|v| !v.is_null()) {
                    total += v.as_f64().ok_or_else(|| {
                        Fault::type_error(format!("mean() of a {} value", v.type_name()))
                    })?;
                    n += 1;
                }
                if n == 0 {
                    return Ok(Object::Scalar(Value::Null));
                }
                Ok(Object::Scalar(Value::Real(total / n as f64)))
            }
            Builtin::Count => {
                let n = match &args[0] {
                    Object::Table(t) => t.row_count(),
                    Object::Column(c) => c.values().iter().filter(|v| !v.is_null()).count(),
                    other => return Err(self.bad_argument(other)),
                };
                Ok(Object::Scalar(Value::Integer(n as i64)))
            }
            Builtin::Range => {
                let ints = args
                    .iter()
                    .map(|a| match a {
                        Object::Scalar(Value::Integer(i)) => Ok(*i),
                        other => Err(self.bad_argument(other)),
                    })
                    .collect::<ScriptResult<Vec<i64>>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => return Err(Fault::type_error("range() takes 1 to 3 arguments")),
                };
                if step == 0 {
                    return Err(Fault::value("range() step must not be zero"));
                }
                let span = i128::from(stop) - i128::from(start);
                let step_wide = i128::from(step);
                let len = if span.signum() == step_wide.signum() {
                    (span + step_wide - step_wide.signum()) / step_wide
                } else {
                    0
                };
                if len > MAX_RANGE_LEN as i128 {
                    return Err(Fault::value(format!(
                        "range() would produce {} values, the limit is {}",
                        len, MAX_RANGE_LEN
                    )));
                }
                let mut values = Vec::with_capacity(len as usize);
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    values.push(Value::Integer(i));
                    i = match i.checked_add(step) {
                        Some(next) => next,
                        None => break,
                    };
                }
                Ok(Object::Column(Column::new(values)))
            }
            Builtin::Columns => match &args[0] {
                Object::Table(t) => Ok(Object::Column(Column::new(
                    t.column_names().into_iter().map(Value::from).collect(),
                ))),
                other => Err(self.bad_argument(other)),
            },
            Builtin::Head => {
                let n = match args.get(1) {
                    None => 5,
                    Some(Object::Scalar(Value::Integer(n))) if *n >= 0 => *n as usize,
                    Some(other) => {
                        return Err(Fault::value(format!(
                            "head() count must be a non-negative int, got {}",
                            other
                        )))
                    }
                };
                match &args[0] {
                    Object::Table(t) => Ok(Object::Table(t.head(n))),
                    Object::Column(c) => Ok(Object::Column(c.head(n))),
                    other => Err(self.bad_argument(other)),
                }
            }
            Builtin::Table => match args.into_iter().next() {
                None => Ok(Object::Table(Table::new())),
                Some(Object::Table(t)) => Ok(Object::Table(t)),
                Some(other) => Err(self.bad_argument(&other)),
            },
            Builtin::Round => {
                let digits = match args.get(1) {
                    None => None,
                    Some(Object::Scalar(Value::Integer(d))) => Some(*d),
                    Some(other) => return Err(self.bad_argument(other)),
                };
                self.elementwise(&args[0], |v| round(v, digits))
            }
            Builtin::Abs => self.elementwise(&args[0], |v| match v {
                Value::Integer(i) => Ok(i
                    .checked_abs()
                    .map(Value::Integer)
                    .unwrap_or(Value::Real((*i as f64).abs()))),
                Value::Real(f) => Ok(Value::Real(f.abs())),
                other => Err(unsupported("abs", other)),
            }),
            Builtin::Upper => self.elementwise(&args[0], |v| match v {
                Value::Text(s) => Ok(Value::Text(s.to_uppercase())),
                other => Err(unsupported("upper", other)),
            }),
            Builtin::Lower => self.elementwise(&args[0], |v| match v {
                Value::Text(s) => Ok(Value::Text(s.to_lowercase())),
                other => Err(unsupported("lower", other)),
            }),
            Builtin::Str => self.elementwise(&args[0], |v| Ok(Value::Text(v.to_string()))),
            Builtin::Int => self.elementwise(&args[0], |v| match v {
                Value::Integer(i) => Ok(Value::Integer(*i)),
                Value::Real(f) if f.is_finite() => Ok(Value::Integer(f.trunc() as i64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| Fault::value(format!("invalid int: '{}'", s))),
                other => Err(unsupported("int", other)),
            }),
            Builtin::Float => self.elementwise(&args[0], |v| match v {
                Value::Integer(i) => Ok(Value::Real(*i as f64)),
                Value::Real(f) => Ok(Value::Real(*f)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Real)
                    .map_err(|_| Fault::value(format!("invalid float: '{}'", s))),
                other => Err(unsupported("float", other)),
            }),
            Builtin::IsNull => match &args[0] {
                Object::Scalar(v) => Ok(Object::Scalar(Value::from(v.is_null()))),
                Object::Column(c) => Ok(Object::Column(Column::new(
                    c.values().iter().map(|v| Value::from(v.is_null())).collect(),
                ))),
                other => Err(self.bad_argument(other)),
            },
        }
    }

    /// Values of a column argument
    fn column_values<'o>(&self, arg: &'o Object) -> ScriptResult<&'o [Value]> {
        match arg {
            Object::Column(c) => Ok(c.values()),
            other => Err(self.bad_argument(other)),
        }
    }

    /// min/max over one column or over several scalars, skipping NULL
    fn extreme(&self, args: Vec<Object>, wanted: Ordering) -> ScriptResult<Object> {
        let values: Vec<Value> = match args.as_slice() {
            [Object::Column(c)] => c.values().to_vec(),
            [_] => return Err(self.bad_argument(&args[0])),
            _ => args
                .iter()
                .map(|a| match a {
                    Object::Scalar(v) => Ok(v.clone()),
                    other => Err(self.bad_argument(other)),
                })
                .collect::<ScriptResult<_>>()?,
        };

        let mut best: Option<Value> = None;
        for v in values.into_iter().filter(|v| !v.is_null()) {
            best = match best {
                None => Some(v),
                Some(b) => match v.compare(&b) {
                    Some(ord) if ord == wanted => Some(v),
                    Some(_) => Some(b),
                    None => {
                        return Err(Fault::type_error(format!(
                            "{}() cannot compare {} with {}",
                            self.name(),
                            v.type_name(),
                            b.type_name()
                        )))
                    }
                },
            };
        }
        Ok(Object::Scalar(best.unwrap_or(Value::Null)))
    }

    /// Apply `f` to a scalar or to each value of a column; NULL stays NULL
    fn elementwise<F>(&self, arg: &Object, f: F) -> ScriptResult<Object>
    where
        F: Fn(&Value) -> ScriptResult<Value>,
    {
        let apply = |v: &Value| if v.is_null() { Ok(Value::Null) } else { f(v) };
        match arg {
            Object::Scalar(v) => apply(v).map(Object::Scalar),
            Object::Column(c) => Ok(Object::Column(Column::new(
                c.values().iter().map(apply).collect::<ScriptResult<_>>()?,
            ))),
            other => Err(self.bad_argument(other)),
        }
    }

    fn bad_argument(&self, arg: &Object) -> Fault {
        Fault::type_error(format!(
            "{}() does not accept a {} argument",
            self.name(),
            arg.type_name()
        ))
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name())
    }
}

fn unsupported(function: &str, value: &Value) -> Fault {
    Fault::new(
        FaultKind::Type,
        format!("{}() does not accept a {} value", function, value.type_name()),
    )
}

fn round(value: &Value, digits: Option<i64>) -> ScriptResult<Value> {
    match (value, digits) {
        (Value::Integer(i), _) => Ok(Value::Integer(*i)),
        (Value::Real(f), None) => Ok(Value::Integer(f.round() as i64)),
        (Value::Real(f), Some(d)) => {
            let scale = 10f64.powi(d.clamp(-308, 308) as i32);
            Ok(Value::Real((f * scale).round() / scale))
        }
        (other, _) => Err(unsupported("round", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: Vec<Value>) -> Object {
        Object::Column(Column::new(values))
    }

    fn call(b: Builtin, args: Vec<Object>) -> ScriptResult<Object> {
        b.call(args, &mut Vec::new())
    }

    fn scalar(obj: Object) -> Value {
        match obj {
            Object::Scalar(v) => v,
            other => panic!("expected scalar, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_names_round_trip() {
        for b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
        assert_eq!(Builtin::from_name("summary"), None);
    }

    #[test]
    fn test_aggregates_skip_nulls() {
        let c = || col(vec![Value::Integer(4), Value::Null, Value::Integer(2)]);
        assert_eq!(scalar(call(Builtin::Sum, vec![c()]).unwrap()), Value::Integer(6));
        assert_eq!(scalar(call(Builtin::Min, vec![c()]).unwrap()), Value::Integer(2));
        assert_eq!(scalar(call(Builtin::Max, vec![c()]).unwrap()), Value::Integer(4));
        assert_eq!(scalar(call(Builtin::Mean, vec![c()]).unwrap()), Value::Real(3.0));
        assert_eq!(scalar(call(Builtin::Count, vec![c()]).unwrap()), Value::Integer(2));
        assert_eq!(scalar(call(Builtin::Len, vec![c()]).unwrap()), Value::Integer(3));
    }

    #[test]
    fn test_sum_of_text_is_type_error() {
        let err = call(Builtin::Sum, vec![col(vec![Value::from("a")])]).unwrap_err();
        assert_eq!(err.kind, FaultKind::Type);
    }

    #[test]
    fn test_range() {
        match call(
            Builtin::Range,
            vec![
                Object::Scalar(Value::Integer(5)),
                Object::Scalar(Value::Integer(0)),
                Object::Scalar(Value::Integer(-2)),
            ],
        )
        .unwrap()
        {
            Object::Column(c) => assert_eq!(
                c.values(),
                &[Value::Integer(5), Value::Integer(3), Value::Integer(1)]
            ),
            other => panic!("unexpected {}", other.type_name()),
        }

        let err = call(
            Builtin::Range,
            vec![
                Object::Scalar(Value::Integer(0)),
                Object::Scalar(Value::Integer(3)),
                Object::Scalar(Value::Integer(0)),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind, FaultKind::Value);
    }

    #[test]
    fn test_range_length_is_capped() {
        let err = call(
            Builtin::Range,
            vec![Object::Scalar(Value::Integer(i64::MAX))],
        )
        .unwrap_err();
        assert_eq!(err.kind, FaultKind::Value);

        let err = call(
            Builtin::Range,
            vec![
                Object::Scalar(Value::Integer(i64::MAX)),
                Object::Scalar(Value::Integer(i64::MIN)),
                Object::Scalar(Value::Integer(-1)),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind, FaultKind::Value);

        match call(
            Builtin::Range,
            vec![
                Object::Scalar(Value::Integer(i64::MAX - 2)),
                Object::Scalar(Value::Integer(i64::MAX)),
            ],
        )
        .unwrap()
        {
            Object::Column(c) => assert_eq!(c.len(), 2),
            other => panic!("unexpected {}", other.type_name()),
        }
    }

    #[test]
    fn test_elementwise_conversions() {
        let out = call(Builtin::Int, vec![col(vec![Value::from("7"), Value::Null])]).unwrap();
        match out {
            Object::Column(c) => assert_eq!(c.values(), &[Value::Integer(7), Value::Null]),
            other => panic!("unexpected {}", other.type_name()),
        }
        let err = call(Builtin::Float, vec![Object::Scalar(Value::from("x"))]).unwrap_err();
        assert_eq!(err.kind, FaultKind::Value);
        assert_eq!(
            scalar(call(Builtin::Round, vec![Object::Scalar(Value::Real(2.567)), Object::Scalar(Value::Integer(1))]).unwrap()),
            Value::Real(2.6)
        );
        assert_eq!(
            scalar(call(Builtin::Upper, vec![Object::Scalar(Value::from("ab"))]).unwrap()),
            Value::from("AB")
        );
    }

    #[test]
    fn test_print_writes_output() {
        let mut out = Vec::new();
        Builtin::Print
            .call(
                vec![Object::Scalar(Value::from("total")), Object::Scalar(Value::Integer(3))],
                &mut out,
            )
            .unwrap();
        assert_eq!(out, vec!["total 3".to_string()]);
    }

    #[test]
    fn test_arity_is_checked() {
        let err = call(Builtin::Len, vec![]).unwrap_err();
        assert_eq!(err.kind, FaultKind::Type);
        assert!(err.message.contains("len()"));
    }
}
