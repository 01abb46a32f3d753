//! Table script module
//!
//! A small column-oriented language for manipulating in-memory tables between
//! SQL statements. Its top-level bindings are the session's tables, a fixed
//! set of builtins and any variables the user assigns.

pub mod ast;
pub mod builtins;
pub mod env;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod token;

use std::fmt;

pub use builtins::Builtin;
pub use env::{Binding, Environment};
pub use interp::{Interpreter, Object};
pub use parser::Parser;

/// Category of a script failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Syntax,
    UnknownName,
    Type,
    Value,
    Index,
    MissingColumn,
    DivisionByZero,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::Syntax => "syntax error",
            FaultKind::UnknownName => "unknown name",
            FaultKind::Type => "type error",
            FaultKind::Value => "value error",
            FaultKind::Index => "index error",
            FaultKind::MissingColumn => "missing column",
            FaultKind::DivisionByZero => "division by zero",
        };
        write!(f, "{}", name)
    }
}

/// A script failure, tied to a source line once one is known
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    pub line: Option<usize>,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    /// Attach a source line unless one is already set
    pub fn at(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Syntax, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Type, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Value, message)
    }
}

/// Result type inside the script engine
pub type ScriptResult<T> = std::result::Result<T, Fault>;

/// Name reserved for the last SQL query result
pub const LAST_RESULT: &str = "_";

/// Check the lexical identifier grammar: a letter or underscore followed by
/// letters, digits or underscores
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Check if a name is a keyword, a builtin or otherwise reserved
pub fn is_reserved(name: &str) -> bool {
    name == LAST_RESULT
        || token::Token::from_keyword(name).is_some()
        || Builtin::from_name(name).is_some()
}

/// Check if `name` can be bound as a table at the top level
pub fn is_valid_table_name(name: &str) -> bool {
    is_identifier(name) && !is_reserved(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_grammar() {
        assert!(is_valid_table_name("orders"));
        assert!(is_valid_table_name("_staging2"));
        assert!(is_valid_table_name("données"));
        assert!(!is_valid_table_name("1bad"));
        assert!(!is_valid_table_name("has space"));
        assert!(!is_valid_table_name("dash-ed"));
        assert!(!is_valid_table_name(""));
    }

    #[test]
    fn test_reserved_names() {
        assert!(!is_valid_table_name("null"));
        assert!(!is_valid_table_name("and"));
        assert!(!is_valid_table_name("sum"));
        assert!(!is_valid_table_name("_"));
        assert!(is_valid_table_name("summary"));
    }

    #[test]
    fn test_fault_kind_display() {
        assert_eq!(FaultKind::UnknownName.to_string(), "unknown name");
        assert_eq!(FaultKind::DivisionByZero.to_string(), "division by zero");
    }
}
