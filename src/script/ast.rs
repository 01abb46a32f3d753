//! Script Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for table scripts.

/// A statement together with the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub stmt: Stmt,
    pub line: usize,
}

/// A script statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// target = value
    Assign { target: Target, value: Expr },
    /// del target
    Delete(Target),
    /// A bare expression; its value is echoed when not null
    Expr(Expr),
}

/// Left-hand side of an assignment or `del`
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A top-level name
    Name(String),
    /// A column of a table: `t.col` or `t["col"]`
    Column { table: String, column: String },
}

/// A script expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Name reference
    Name(String),
    /// List literal `[a, b, c]`
    List(Vec<Expr>),
    /// Attribute access `expr.name`
    Attribute { object: Box<Expr>, name: String },
    /// Indexing `expr[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// Call `callee(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    /// Operator symbol as written in source
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gte => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// not
    Not,
    /// - (negation)
    Minus,
}
