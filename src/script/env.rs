//! Script environment
//!
//! The top-level namespace scripts run in: one binding per table in the
//! memory store, one per builtin, plus user variables. Table bindings are
//! rebuilt from the store's key set after every operation that can change it.

use std::collections::BTreeMap;

use tracing::debug;

use super::builtins::Builtin;
use super::interp::Object;
use super::{Fault, FaultKind, ScriptResult};

/// What a top-level name is bound to
#[derive(Debug, Clone)]
pub enum Binding {
    /// A table in the memory store, resolved live on every reference
    Table,
    /// A builtin function
    Builtin(Builtin),
    /// A session variable
    Value(Object),
}

/// Top-level script namespace
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: BTreeMap<String, Binding>,
}

impl Environment {
    /// Create an environment holding only the builtins
    pub fn new() -> Self {
        let bindings = Builtin::ALL
            .iter()
            .map(|b| (b.name().to_string(), Binding::Builtin(*b)))
            .collect();
        Self { bindings }
    }

    /// Make the table bindings exactly `tables`.
    ///
    /// A variable whose name is now a table is replaced by the table.
    pub fn rebuild<'n>(&mut self, tables: impl IntoIterator<Item = &'n str>) {
        self.bindings
            .retain(|_, binding| !matches!(binding, Binding::Table));
        for name in tables {
            if Builtin::from_name(name).is_some() {
                continue;
            }
            if let Some(Binding::Value(_)) = self.bindings.insert(name.to_string(), Binding::Table)
            {
                debug!(table = %name, "table binding replaced a variable");
            }
        }
    }

    /// Look up a name
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Mutable access to a variable's value
    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Object> {
        match self.bindings.get_mut(name) {
            Some(Binding::Value(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Bind a session variable. Builtins and tables cannot be rebound this way.
    pub fn set_variable(&mut self, name: &str, value: Object) -> ScriptResult<()> {
        match self.bindings.get(name) {
            Some(Binding::Builtin(_)) => Err(Fault::type_error(format!(
                "cannot assign to builtin '{}'",
                name
            ))),
            Some(Binding::Table) => Err(Fault::type_error(format!(
                "'{}' is a table; only a table value can be assigned to it",
                name
            ))),
            _ => {
                self.bindings
                    .insert(name.to_string(), Binding::Value(value));
                Ok(())
            }
        }
    }

    /// Remove a session variable
    pub fn remove_variable(&mut self, name: &str) -> ScriptResult<Object> {
        match self.bindings.get(name) {
            Some(Binding::Value(_)) => match self.bindings.remove(name) {
                Some(Binding::Value(obj)) => Ok(obj),
                _ => Err(Fault::new(FaultKind::UnknownName, name)),
            },
            Some(Binding::Builtin(_)) => Err(Fault::type_error(format!(
                "cannot delete builtin '{}'",
                name
            ))),
            Some(Binding::Table) => Err(Fault::type_error(format!(
                "cannot delete table '{}' from a script; use /clear {}",
                name, name
            ))),
            None => Err(Fault::new(
                FaultKind::UnknownName,
                format!("name '{}' is not defined", name),
            )),
        }
    }

    /// Names bound to tables, sorted
    pub fn table_names(&self) -> Vec<&str> {
        self.names_where(|b| matches!(b, Binding::Table))
    }

    /// Names bound to variables, sorted
    pub fn variable_names(&self) -> Vec<&str> {
        self.names_where(|b| matches!(b, Binding::Value(_)))
    }

    /// Every bound name, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|k| k.as_str())
    }

    fn names_where(&self, pred: impl Fn(&Binding) -> bool) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|(_, b)| pred(b))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_builtins_always_bound() {
        let mut env = Environment::new();
        env.rebuild(["orders"]);
        env.rebuild(Vec::<&str>::new());
        assert!(matches!(env.get("sum"), Some(Binding::Builtin(Builtin::Sum))));
        assert!(env.get("orders").is_none());
    }

    #[test]
    fn test_rebuild_tracks_table_set() {
        let mut env = Environment::new();
        env.set_variable("x", Object::Scalar(Value::Integer(1))).unwrap();
        env.rebuild(["a", "b"]);
        assert_eq!(env.table_names(), vec!["a", "b"]);

        env.rebuild(["b", "x"]);
        assert_eq!(env.table_names(), vec!["b", "x"]);
        assert!(env.variable_names().is_empty());
    }

    #[test]
    fn test_rebinding_rules() {
        let mut env = Environment::new();
        env.rebuild(["orders"]);

        let err = env
            .set_variable("len", Object::Scalar(Value::Null))
            .unwrap_err();
        assert_eq!(err.kind, FaultKind::Type);
        assert!(env
            .set_variable("orders", Object::Scalar(Value::Integer(1)))
            .is_err());
        assert!(env.remove_variable("orders").is_err());
        assert!(env.remove_variable("print").is_err());
        assert_eq!(
            env.remove_variable("nope").unwrap_err().kind,
            FaultKind::UnknownName
        );

        env.set_variable("x", Object::Scalar(Value::Integer(1))).unwrap();
        assert!(env.remove_variable("x").is_ok());
        assert!(env.get("x").is_none());
    }
}
