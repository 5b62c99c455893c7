// src/parser/token.rs
//! Token catalog for the rule DSL

use std::fmt;

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,
    Comment,

    // Literals
    Identifier,
    Int,
    Float,
    String,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    EqEq,
    Lt,
    Gt,
    Not,
    NotEq,
    Lte,
    Gte,

    Dot,

    // Delimiters
    LeftParen,
    LeftBracket,
    LeftBrace,
    Comma,

    RightParen,
    RightBracket,
    RightBrace,
    Semicolon,
    Colon,

    // Keywords
    Object,
    Rule,
    Test,
    Facts,
    Rules,
    Input,
    Relation,
}

const KEYWORDS: [TokenKind; 7] = [
    TokenKind::Object,
    TokenKind::Rule,
    TokenKind::Test,
    TokenKind::Facts,
    TokenKind::Rules,
    TokenKind::Input,
    TokenKind::Relation,
];

const OPERATORS: [TokenKind; 13] = [
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Star,
    TokenKind::Slash,
    TokenKind::Percent,
    TokenKind::EqEq,
    TokenKind::Lt,
    TokenKind::Gt,
    TokenKind::Not,
    TokenKind::NotEq,
    TokenKind::Lte,
    TokenKind::Gte,
    TokenKind::Dot,
];

/// Precedence of comparison operators, the loosest binary level
pub const COMPARISON_PRECEDENCE: u8 = 3;

/// Precedence of field access, the tightest binary level
pub const FIELD_ACCESS_PRECEDENCE: u8 = 6;

impl TokenKind {
    /// Spelling of the token in source text
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Eof => "EOF",
            TokenKind::Comment => "COMMENT",
            TokenKind::Identifier => "ident",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Not => "!",
            TokenKind::NotEq => "!=",
            TokenKind::Lte => "<=",
            TokenKind::Gte => ">=",
            TokenKind::Dot => ".",
            TokenKind::LeftParen => "(",
            TokenKind::LeftBracket => "[",
            TokenKind::LeftBrace => "{",
            TokenKind::Comma => ",",
            TokenKind::RightParen => ")",
            TokenKind::RightBracket => "]",
            TokenKind::RightBrace => "}",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Object => "object",
            TokenKind::Rule => "rule",
            TokenKind::Test => "test",
            TokenKind::Facts => "facts",
            TokenKind::Rules => "rules",
            TokenKind::Input => "input",
            TokenKind::Relation => "relation",
        }
    }

    /// Binary precedence, or `None` for tokens that cannot join two operands
    pub fn precedence(self) -> Option<u8> {
        match self {
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Lte
            | TokenKind::Gt
            | TokenKind::Gte => Some(COMPARISON_PRECEDENCE),
            TokenKind::Plus | TokenKind::Minus => Some(4),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(5),
            TokenKind::Dot => Some(FIELD_ACCESS_PRECEDENCE),
            _ => None,
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier | TokenKind::Int | TokenKind::Float | TokenKind::String
        )
    }

    pub fn is_operator(self) -> bool {
        OPERATORS.contains(&self)
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.contains(&self)
    }

    /// Classify an identifier spelling; anything that is not a keyword is an identifier
    pub fn lookup_keyword(ident: &str) -> TokenKind {
        KEYWORDS
            .iter()
            .copied()
            .find(|kind| kind.as_str() == ident)
            .unwrap_or(TokenKind::Identifier)
    }

    /// Reverse lookup of an operator from its spelling
    pub fn lookup_operator(op: &str) -> Option<TokenKind> {
        OPERATORS.iter().copied().find(|kind| kind.as_str() == op)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line and column of a token, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A scanned token with its literal text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            literal: literal.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier => write!(f, "identifier '{}'", self.literal),
            TokenKind::Int | TokenKind::Float => write!(f, "number {}", self.literal),
            TokenKind::String => write!(f, "string \"{}\"", self.literal),
            TokenKind::Eof => f.write_str("end of input"),
            kind if kind.is_keyword() => write!(f, "keyword '{}'", kind),
            kind => write!(f, "'{}'", kind),
        }
    }
}
