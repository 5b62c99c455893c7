// src/parser/lexer.rs
//! Lexical analyzer (scanner) for the rule DSL

use super::token::{Position, Token, TokenKind};
use std::fmt;

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lexer error at {}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scan the next token. Once the input is exhausted every call returns `Eof`.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.current_position();

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::Eof, "", start));
        };

        let kind = match ch {
            '#' => return Ok(self.read_comment(start)),
            '"' => return self.read_string(start),
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                self.advance();
                // `=` and `==` both spell equality; there is no assignment
                self.lookahead('=');
                return Ok(Token::new(TokenKind::EqEq, "", start));
            }
            '!' => return Ok(self.two_char(start, TokenKind::NotEq, TokenKind::Not)),
            '>' => return Ok(self.two_char(start, TokenKind::Gte, TokenKind::Gt)),
            '<' => return Ok(self.two_char(start, TokenKind::Lte, TokenKind::Lt)),
            c if c.is_ascii_digit() => return self.read_number(start),
            c if c.is_alphabetic() || c == '_' => return Ok(self.read_identifier(start)),
            c => return Err(self.error(start, &format!("Unexpected character: '{}'", c))),
        };

        self.advance();
        Ok(Token::new(kind, "", start))
    }

    /// Resolve `<op>=` against its single-character form
    fn two_char(&mut self, start: Position, extended: TokenKind, single: TokenKind) -> Token {
        self.advance();
        let kind = if self.lookahead('=') { extended } else { single };
        Token::new(kind, "", start)
    }

    /// Consume `expected` if it is the current character
    fn lookahead(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn read_comment(&mut self, start: Position) -> Token {
        let from = self.position;
        while let Some(ch) = self.current_char() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
        let literal: String = self.input[from..self.position].iter().collect();
        Token::new(TokenKind::Comment, literal, start)
    }

    fn read_identifier(&mut self, start: Position) -> Token {
        let from = self.position;

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let identifier: String = self.input[from..self.position].iter().collect();
        Token::new(TokenKind::lookup_keyword(&identifier), identifier, start)
    }

    fn read_number(&mut self, start: Position) -> Result<Token, LexError> {
        let from = self.position;
        self.skip_digits();

        // `3.5` is a float, `s.age` and `3.` leave the dot for the parser
        let mut kind = TokenKind::Int;
        if self.current_char() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::Float;
            self.advance();
            self.skip_digits();
        }

        let literal: String = self.input[from..self.position].iter().collect();
        let valid = match kind {
            TokenKind::Float => literal.parse::<f64>().is_ok(),
            _ => literal.parse::<i64>().is_ok(),
        };
        if !valid {
            return Err(self.error(start, &format!("Invalid {}: {}", kind, literal)));
        }

        Ok(Token::new(kind, literal, start))
    }

    fn read_string(&mut self, start: Position) -> Result<Token, LexError> {
        self.advance(); // consume opening "

        let from = self.position;
        while let Some(ch) = self.current_char() {
            if ch == '"' {
                let literal: String = self.input[from..self.position].iter().collect();
                self.advance(); // consume closing "
                return Ok(Token::new(TokenKind::String, literal, start));
            }
            self.advance();
        }

        Err(self.error(start, "Unterminated string"))
    }

    fn skip_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn current_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, at: Position, message: &str) -> LexError {
        LexError {
            message: message.to_string(),
            line: at.line,
            column: at.column,
        }
    }
}
