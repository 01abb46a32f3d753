//! Script token definitions
//!
//! This module defines all tokens that can appear in table scripts.

use std::fmt;

/// Script token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Del,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single- or double-quoted)
    StringLiteral(String),
    /// Identifier (table, column, variable or builtin name)
    Identifier(String),

    // ========== Operators ==========
    /// =
    Assign,
    /// ==
    Eq,
    /// !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ,
    Comma,
    /// .
    Dot,
    /// Statement separator: a newline outside brackets, or ;
    Separator,

    // ========== Special ==========
    /// End of input
    Eof,
}

impl Token {
    /// Try to parse a keyword from a string (keywords are lowercase)
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s {
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            "null" => Some(Token::Null),
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            "del" => Some(Token::Del),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Del => write!(f, "del"),
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Assign => write!(f, "="),
            Token::Eq => write!(f, "=="),
            Token::Neq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Separator => write!(f, "end of statement"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token together with the 1-based source line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub line: usize,
}
