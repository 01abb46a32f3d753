//! Script Lexer (Tokenizer)
//!
//! This module converts script text into a stream of tokens. Newlines end a
//! statement unless they appear inside brackets or parentheses.

use super::token::{Lexeme, Token};
use super::{Fault, ScriptResult};

/// Script Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
    /// Current 1-based line
    line: usize,
    /// Open ( and [ count; newlines inside are not separators
    depth: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            depth: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> ScriptResult<Vec<Lexeme>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_blank();
            let line = self.line;
            let token = self.next_token().map_err(|f| f.at(self.line))?;
            let done = token == Token::Eof;
            tokens.push(Lexeme { token, line });
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ScriptResult<Token> {
        self.skip_blank();

        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        let token = match ch {
            '\n' => {
                self.advance();
                Token::Separator
            }
            ';' => {
                self.advance();
                Token::Separator
            }
            '(' => {
                self.advance();
                self.depth += 1;
                Token::LParen
            }
            ')' => {
                self.advance();
                self.depth = self.depth.saturating_sub(1);
                Token::RParen
            }
            '[' => {
                self.advance();
                self.depth += 1;
                Token::LBracket
            }
            ']' => {
                self.advance();
                self.depth = self.depth.saturating_sub(1);
                Token::RBracket
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '.' if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                Token::Dot
            }
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                Token::Minus
            }
            '*' => {
                self.advance();
                Token::Asterisk
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '%' => {
                self.advance();
                Token::Percent
            }
            '=' => {
                self.advance();
                if self.match_char('=') {
                    Token::Eq
                } else {
                    Token::Assign
                }
            }
            '<' => {
                self.advance();
                if self.match_char('=') {
                    Token::Lte
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance();
                if self.match_char('=') {
                    Token::Gte
                } else {
                    Token::Gt
                }
            }
            '!' => {
                self.advance();
                if self.match_char('=') {
                    Token::Neq
                } else {
                    return Err(Fault::syntax("unexpected character '!'"));
                }
            }
            '\'' | '"' => return self.read_string(ch),
            c if c.is_ascii_digit() || c == '.' => return self.read_number(),
            c if c.is_alphabetic() || c == '_' => return Ok(self.read_identifier()),
            other => {
                return Err(Fault::syntax(format!("unexpected character '{}'", other)));
            }
        };

        Ok(token)
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if !self.is_at_end() && self.current_char() == '\n' {
            self.line += 1;
        }
        self.position += 1;
    }

    /// Consume `expected` if it is the current character
    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.current_char() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip spaces, tabs, comments and newlines inside brackets
    fn skip_blank(&mut self) {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch == '#' {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else if ch == '\n' && self.depth == 0 {
                break;
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a quoted string literal with backslash escapes
    fn read_string(&mut self, quote: char) -> ScriptResult<Token> {
        let start_line = self.line;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == quote {
                self.advance(); // skip closing quote
                return Ok(Token::StringLiteral(value));
            }

            if ch == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                let escaped = match self.current_char() {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                };
                value.push(escaped);
                self.advance();
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Fault::syntax("unterminated string literal").at(start_line))
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> ScriptResult<Token> {
        let mut value = String::new();
        let mut is_float = false;

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else if ch == '.' && !is_float {
                if self.peek_char().is_some_and(|c| c.is_ascii_digit()) || value.is_empty() {
                    is_float = true;
                    value.push(ch);
                    self.advance();
                } else {
                    // `1.` followed by a name is attribute access on a literal
                    break;
                }
            } else if (ch == 'e' || ch == 'E') && !value.is_empty() {
                // Scientific notation
                is_float = true;
                value.push(ch);
                self.advance();

                if !self.is_at_end() && (self.current_char() == '+' || self.current_char() == '-')
                {
                    value.push(self.current_char());
                    self.advance();
                }
            } else {
                break;
            }
        }

        let invalid = || Fault::syntax(format!("invalid number '{}'", value));
        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| invalid())
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| invalid())
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}
