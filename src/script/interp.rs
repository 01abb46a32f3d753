//! Script interpreter
//!
//! Evaluates parsed statements against the memory store and the session
//! environment. Operators work element-wise on columns, broadcasting scalars,
//! and NULL operands yield NULL.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use super::ast::*;
use super::builtins::Builtin;
use super::env::{Binding, Environment};
use super::parser::Parser;
use super::{Fault, FaultKind, ScriptResult};
use crate::error::{Error, Result};
use crate::store::TableStore;
use crate::table::{Column, Table, Value};

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Scalar(Value),
    Column(Column),
    Table(Table),
    Builtin(Builtin),
}

impl Object {
    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Scalar(v) => v.type_name(),
            Object::Column(_) => "column",
            Object::Table(_) => "table",
            Object::Builtin(_) => "builtin",
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Object::Scalar(Value::Null))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Scalar(v) => write!(f, "{}", v),
            Object::Column(c) => {
                let items: Vec<String> = c
                    .values()
                    .iter()
                    .map(|v| match v {
                        Value::Text(s) => format!("{:?}", s),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "[{}]", items.join(", "))
            }
            Object::Table(t) => write!(
                f,
                "<table {} row(s) x {} column(s)>",
                t.row_count(),
                t.column_count()
            ),
            Object::Builtin(b) => write!(f, "{}", b),
        }
    }
}

/// Executes script code for one session
pub struct Interpreter<'a> {
    store: &'a mut TableStore,
    env: &'a mut Environment,
    output: Vec<String>,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter over the session's store and environment
    pub fn new(store: &'a mut TableStore, env: &'a mut Environment) -> Self {
        Self {
            store,
            env,
            output: Vec::new(),
        }
    }

    /// Run `code`, returning the value of a trailing expression statement.
    ///
    /// Statements before a failing one stay applied.
    pub fn run(&mut self, code: &str) -> Result<Option<Object>> {
        let statements = Parser::new(code)
            .and_then(|mut p| p.parse_all())
            .map_err(|fault| script_error(code, fault))?;

        let mut last = None;
        for statement in &statements {
            last = self
                .exec(&statement.stmt)
                .map_err(|fault| script_error(code, fault.at(statement.line)))?;
        }
        debug!(statements = statements.len(), "ran script");
        Ok(last.filter(|obj| !obj.is_null()))
    }

    /// Lines written by `print` so far
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn exec(&mut self, stmt: &Stmt) -> ScriptResult<Option<Object>> {
        match stmt {
            Stmt::Expr(expr) => self.eval(expr).map(Some),
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
                Ok(None)
            }
            Stmt::Delete(target) => {
                self.delete(target)?;
                Ok(None)
            }
        }
    }

    fn assign(&mut self, target: &Target, value: Object) -> ScriptResult<()> {
        match target {
            Target::Name(name) => {
                if !matches!(self.env.get(name), Some(Binding::Table)) {
                    return self.env.set_variable(name, value);
                }
                match value {
                    Object::Table(table) => self
                        .store
                        .replace(name, table)
                        .map_err(|e| Fault::value(e.to_string())),
                    other => Err(Fault::type_error(format!(
                        "cannot assign a {} to table '{}'",
                        other.type_name(),
                        name
                    ))),
                }
            }
            Target::Column { table, column } => {
                let target = self.table_mut(table)?;
                let column_value = match value {
                    Object::Scalar(v) => Column::repeat(v, target.row_count()),
                    Object::Column(c) => c,
                    other => {
                        return Err(Fault::type_error(format!(
                            "cannot store a {} in column '{}'",
                            other.type_name(),
                            column
                        )))
                    }
                };
                target
                    .set_column(column.as_str(), column_value)
                    .map_err(|e| Fault::value(e.to_string()))
            }
        }
    }

    fn delete(&mut self, target: &Target) -> ScriptResult<()> {
        match target {
            Target::Name(name) => self.env.remove_variable(name).map(|_| ()),
            Target::Column { table, column } => {
                let target = self.table_mut(table)?;
                target
                    .remove_column(column)
                    .map(|_| ())
                    .ok_or_else(|| missing_column(table, column))
            }
        }
    }

    /// The table a column target refers to: a store table or a variable
    /// holding a table
    fn table_mut(&mut self, name: &str) -> ScriptResult<&mut Table> {
        let in_store = match self.env.get(name) {
            Some(Binding::Table) => true,
            Some(Binding::Value(_)) => false,
            Some(Binding::Builtin(_)) => {
                return Err(Fault::type_error(format!(
                    "'{}' is a builtin, not a table",
                    name
                )))
            }
            None => return Err(unknown_name(name)),
        };

        if in_store {
            return self.store.get_mut(name).ok_or_else(|| unknown_name(name));
        }
        match self.env.variable_mut(name) {
            Some(Object::Table(t)) => Ok(t),
            Some(other) => Err(Fault::type_error(format!(
                "'{}' is a {}, not a table",
                name,
                other.type_name()
            ))),
            None => Err(unknown_name(name)),
        }
    }

    // ========== Expression Evaluation ==========

    fn eval(&mut self, expr: &Expr) -> ScriptResult<Object> {
        match expr {
            Expr::Literal(lit) => Ok(Object::Scalar(match lit {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::from(*b),
                Literal::Integer(i) => Value::Integer(*i),
                Literal::Float(f) => Value::Real(*f),
                Literal::String(s) => Value::Text(s.clone()),
            })),

            Expr::Name(name) => self.lookup(name),

            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match self.eval(item)? {
                        Object::Scalar(v) => values.push(v),
                        other => {
                            return Err(Fault::type_error(format!(
                                "list items must be scalars, got a {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(Object::Column(Column::new(values)))
            }

            Expr::Attribute { object, name } => match self.eval(object)? {
                Object::Table(t) => t
                    .column(name)
                    .cloned()
                    .map(Object::Column)
                    .ok_or_else(|| missing_column(&describe(object), name)),
                other => Err(Fault::type_error(format!(
                    "a {} has no attribute '{}'",
                    other.type_name(),
                    name
                ))),
            },

            Expr::Index { object, index } => {
                let target = self.eval(object)?;
                let index = self.eval(index)?;
                self.index(target, index, object)
            }

            Expr::Call { callee, args } => {
                let builtin = match self.eval(callee)? {
                    Object::Builtin(b) => b,
                    other => {
                        return Err(Fault::type_error(format!(
                            "a {} is not callable",
                            other.type_name()
                        )))
                    }
                };
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<ScriptResult<Vec<_>>>()?;
                builtin.call(args, &mut self.output)
            }

            Expr::BinaryOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                broadcast(left, right, |l, r| binary_op(l, *op, r))
            }

            Expr::UnaryOp { op, expr } => {
                let operand = self.eval(expr)?;
                map_values(operand, |v| unary_op(*op, v))
            }
        }
    }

    fn lookup(&self, name: &str) -> ScriptResult<Object> {
        match self.env.get(name) {
            Some(Binding::Table) => self
                .store
                .get(name)
                .cloned()
                .map(Object::Table)
                .ok_or_else(|| unknown_name(name)),
            Some(Binding::Builtin(b)) => Ok(Object::Builtin(*b)),
            Some(Binding::Value(obj)) => Ok(obj.clone()),
            None => Err(unknown_name(name)),
        }
    }

    fn index(&self, target: Object, index: Object, source: &Expr) -> ScriptResult<Object> {
        match (target, index) {
            (Object::Table(t), Object::Scalar(Value::Text(column))) => t
                .column(&column)
                .cloned()
                .map(Object::Column)
                .ok_or_else(|| missing_column(&describe(source), &column)),
            (Object::Table(t), Object::Column(mask)) => {
                let mask = to_mask(&mask, t.row_count())?;
                t.filter(&mask)
                    .map(Object::Table)
                    .map_err(|e| Fault::new(FaultKind::Index, e.to_string()))
            }
            (Object::Column(c), Object::Scalar(Value::Integer(i))) => {
                let len = c.len() as i64;
                let pos = if i < 0 { i + len } else { i };
                if pos < 0 || pos >= len {
                    return Err(Fault::new(
                        FaultKind::Index,
                        format!("index {} out of range for column of length {}", i, len),
                    ));
                }
                Ok(Object::Scalar(c.values()[pos as usize].clone()))
            }
            (Object::Column(c), Object::Column(mask)) => {
                let mask = to_mask(&mask, c.len())?;
                Ok(Object::Column(c.filter(&mask)))
            }
            (target, index) => Err(Fault::type_error(format!(
                "cannot index a {} with a {}",
                target.type_name(),
                index.type_name()
            ))),
        }
    }
}

/// Apply a binary function element-wise, broadcasting scalars over columns
fn broadcast<F>(left: Object, right: Object, f: F) -> ScriptResult<Object>
where
    F: Fn(&Value, &Value) -> ScriptResult<Value>,
{
    match (left, right) {
        (Object::Scalar(l), Object::Scalar(r)) => f(&l, &r).map(Object::Scalar),
        (Object::Column(l), Object::Scalar(r)) => Ok(Object::Column(Column::new(
            l.values()
                .iter()
                .map(|v| f(v, &r))
                .collect::<ScriptResult<_>>()?,
        ))),
        (Object::Scalar(l), Object::Column(r)) => Ok(Object::Column(Column::new(
            r.values()
                .iter()
                .map(|v| f(&l, v))
                .collect::<ScriptResult<_>>()?,
        ))),
        (Object::Column(l), Object::Column(r)) => {
            if l.len() != r.len() {
                return Err(Fault::value(format!(
                    "columns have different lengths ({} and {})",
                    l.len(),
                    r.len()
                )));
            }
            Ok(Object::Column(Column::new(
                l.values()
                    .iter()
                    .zip(r.values())
                    .map(|(a, b)| f(a, b))
                    .collect::<ScriptResult<_>>()?,
            )))
        }
        (l, r) => Err(Fault::type_error(format!(
            "unsupported operands: {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

/// Apply a unary function to a scalar or to every value of a column
fn map_values<F>(operand: Object, f: F) -> ScriptResult<Object>
where
    F: Fn(&Value) -> ScriptResult<Value>,
{
    match operand {
        Object::Scalar(v) => f(&v).map(Object::Scalar),
        Object::Column(c) => Ok(Object::Column(Column::new(
            c.values().iter().map(f).collect::<ScriptResult<_>>()?,
        ))),
        other => Err(Fault::type_error(format!(
            "unsupported operand: {}",
            other.type_name()
        ))),
    }
}

fn binary_op(left: &Value, op: BinaryOperator, right: &Value) -> ScriptResult<Value> {
    match op {
        BinaryOperator::And => return Ok(Value::from(left.as_bool() && right.as_bool())),
        BinaryOperator::Or => return Ok(Value::from(left.as_bool() || right.as_bool())),
        _ => {}
    }

    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let unsupported = || {
        Fault::type_error(format!(
            "unsupported operand types for {}: {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))
    };

    match op {
        BinaryOperator::Add => left.add(right).ok_or_else(unsupported),
        BinaryOperator::Sub => left.sub(right).ok_or_else(unsupported),
        BinaryOperator::Mul => left.mul(right).ok_or_else(unsupported),
        BinaryOperator::Div | BinaryOperator::Mod => {
            if !left.kind().is_numeric() || !right.kind().is_numeric() {
                return Err(unsupported());
            }
            let result = if op == BinaryOperator::Div {
                left.div(right)
            } else {
                left.rem(right)
            };
            result.ok_or_else(|| Fault::new(FaultKind::DivisionByZero, "division by zero"))
        }
        BinaryOperator::Eq => Ok(Value::from(left.compare(right) == Some(Ordering::Equal))),
        BinaryOperator::Neq => Ok(Value::from(left.compare(right) != Some(Ordering::Equal))),
        BinaryOperator::Lt
        | BinaryOperator::Gt
        | BinaryOperator::Lte
        | BinaryOperator::Gte => {
            let ord = left.compare(right).ok_or_else(unsupported)?;
            let result = match op {
                BinaryOperator::Lt => ord == Ordering::Less,
                BinaryOperator::Gt => ord == Ordering::Greater,
                BinaryOperator::Lte => ord != Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Value::from(result))
        }
        BinaryOperator::And | BinaryOperator::Or => Err(unsupported()),
    }
}

fn unary_op(op: UnaryOperator, value: &Value) -> ScriptResult<Value> {
    match (op, value) {
        (UnaryOperator::Not, v) => Ok(Value::from(!v.as_bool())),
        (UnaryOperator::Minus, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Minus, Value::Integer(i)) => Ok(i
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or(Value::Real(-(*i as f64)))),
        (UnaryOperator::Minus, Value::Real(f)) => Ok(Value::Real(-f)),
        (UnaryOperator::Minus, other) => Err(Fault::type_error(format!(
            "bad operand type for unary -: {}",
            other.type_name()
        ))),
    }
}

/// Turn a column into a boolean row mask of the expected length
fn to_mask(column: &Column, expected: usize) -> ScriptResult<Vec<bool>> {
    if column.len() != expected {
        return Err(Fault::new(
            FaultKind::Index,
            format!(
                "mask has {} value(s), expected {}",
                column.len(),
                expected
            ),
        ));
    }
    Ok(column.values().iter().map(Value::as_bool).collect())
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Name(name) => name.clone(),
        _ => "table".to_string(),
    }
}

fn unknown_name(name: &str) -> Fault {
    Fault::new(
        FaultKind::UnknownName,
        format!("name '{}' is not defined", name),
    )
}

fn missing_column(table: &str, column: &str) -> Fault {
    Fault::new(
        FaultKind::MissingColumn,
        format!("'{}' has no column '{}'", table, column),
    )
}

/// Attach the failing source line to a fault
fn script_error(code: &str, fault: Fault) -> Error {
    let line = fault.line.unwrap_or(1);
    let source = code.lines().nth(line.saturating_sub(1)).unwrap_or("").trim();
    Error::Script {
        kind: fault.kind,
        message: fault.message,
        trace: format!("line {}: {}", line, source),
    }
}
