//! Script Parser
//!
//! This module parses script tokens into an AST.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Lexeme, Token};
use super::{Fault, ScriptResult};

/// Deepest expression nesting accepted
pub const MAX_DEPTH: usize = 200;

/// Script Parser
pub struct Parser {
    tokens: Vec<Lexeme>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser from script source
    pub fn new(code: &str) -> ScriptResult<Self> {
        let mut lexer = Lexer::new(code);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    /// Parse every statement in the source
    pub fn parse_all(&mut self) -> ScriptResult<Vec<Statement>> {
        let mut statements = Vec::new();

        loop {
            while self.check(&Token::Separator) {
                self.advance();
            }
            if self.is_at_end() {
                break;
            }

            let line = self.line();
            let stmt = self.parse_statement().map_err(|f| f.at(line))?;
            statements.push(Statement { stmt, line });

            if !self.check(&Token::Separator) && !self.is_at_end() {
                return Err(self.unexpected("end of statement").at(self.line()));
            }
        }

        Ok(statements)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> ScriptResult<Stmt> {
        if self.check(&Token::Del) {
            self.advance();
            let expr = self.parse_postfix_expr()?;
            return Ok(Stmt::Delete(Self::into_target(expr)?));
        }

        let expr = self.parse_expr()?;
        if self.check(&Token::Assign) {
            self.advance();
            let target = Self::into_target(expr)?;
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { target, value });
        }

        Ok(Stmt::Expr(expr))
    }

    /// Reinterpret a parsed expression as an assignment target
    fn into_target(expr: Expr) -> ScriptResult<Target> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Attribute { object, name } => match *object {
                Expr::Name(table) => Ok(Target::Column {
                    table,
                    column: name,
                }),
                _ => Err(Fault::syntax("can only assign to columns of a named table")),
            },
            Expr::Index { object, index } => match (*object, *index) {
                (Expr::Name(table), Expr::Literal(Literal::String(column))) => {
                    Ok(Target::Column { table, column })
                }
                _ => Err(Fault::syntax(
                    "indexed assignment needs a table name and a column string",
                )),
            },
            _ => Err(Fault::syntax("cannot assign to expression")),
        }
    }

    // ========== Expression Parsing ==========

    fn parse_expr(&mut self) -> ScriptResult<Expr> {
        let saved = self.depth;
        self.descend()?;
        let expr = self.parse_or_expr()?;
        self.depth = saved;
        Ok(expr)
    }

    /// Count one more level of expression nesting. Operator chains count
    /// one level per operator, so evaluation depth stays bounded too.
    fn descend(&mut self) -> ScriptResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Fault::syntax("expression nested too deeply"));
        }
        Ok(())
    }

    fn parse_or_expr(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            self.descend()?;
            let right = self.parse_and_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&Token::And) {
            self.advance();
            self.descend()?;
            let right = self.parse_not_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> ScriptResult<Expr> {
        if self.check(&Token::Not) {
            self.advance();
            self.descend()?;
            let expr = self.parse_not_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            })
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> ScriptResult<Expr> {
        let left = self.parse_additive_expr()?;

        let op = match self.current() {
            Token::Eq => Some(BinaryOperator::Eq),
            Token::Neq => Some(BinaryOperator::Neq),
            Token::Lt => Some(BinaryOperator::Lt),
            Token::Gt => Some(BinaryOperator::Gt),
            Token::Lte => Some(BinaryOperator::Lte),
            Token::Gte => Some(BinaryOperator::Gte),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive_expr()?;
            Ok(Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_additive_expr(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_unary_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> ScriptResult<Expr> {
        match self.current() {
            Token::Minus => {
                self.advance();
                self.descend()?;
                let expr = self.parse_unary_expr()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: Box::new(expr),
                })
            }
            Token::Plus => {
                self.advance();
                self.descend()?;
                self.parse_unary_expr()
            }
            _ => self.parse_postfix_expr(),
        }
    }

    /// Attribute access, indexing and calls, left to right
    fn parse_postfix_expr(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.parse_primary_expr()?;

        loop {
            if matches!(
                self.current(),
                Token::Dot | Token::LBracket | Token::LParen
            ) {
                self.descend()?;
            }
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Token::LParen => {
                    self.advance();
                    let args = self.parse_expr_list(&Token::RParen)?;
                    self.expect(&Token::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> ScriptResult<Expr> {
        let expr = match self.current().clone() {
            // Literals
            Token::IntegerLiteral(n) => Expr::Literal(Literal::Integer(n)),
            Token::FloatLiteral(n) => Expr::Literal(Literal::Float(n)),
            Token::StringLiteral(s) => Expr::Literal(Literal::String(s)),
            Token::True => Expr::Literal(Literal::Boolean(true)),
            Token::False => Expr::Literal(Literal::Boolean(false)),
            Token::Null => Expr::Literal(Literal::Null),

            Token::Identifier(name) => Expr::Name(name),

            // Parenthesized expression
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(expr);
            }

            // List literal
            Token::LBracket => {
                self.advance();
                let items = self.parse_expr_list(&Token::RBracket)?;
                self.expect(&Token::RBracket)?;
                return Ok(Expr::List(items));
            }

            _ => return Err(self.unexpected("expression")),
        };

        self.advance();
        Ok(expr)
    }

    /// Comma-separated expressions up to (not including) `close`; a trailing
    /// comma is allowed
    fn parse_expr_list(&mut self, close: &Token) -> ScriptResult<Vec<Expr>> {
        let mut items = Vec::new();

        while !self.check(close) {
            items.push(self.parse_expr()?);
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(items)
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|l| &l.token)
            .unwrap_or(&Token::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map_or(1, |l| l.line)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> ScriptResult<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    fn expect_identifier(&mut self) -> ScriptResult<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> Fault {
        Fault::syntax(format!("expected {}, found {}", expected, self.current()))
    }
}
