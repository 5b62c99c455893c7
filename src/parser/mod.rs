// src/parser/mod.rs
//! Parser for the rule DSL
//!
//! Converts DSL source code into the intermediate representation (IR)

pub mod ir;
pub mod lexer;
pub mod parser;
pub mod token;

use crate::CompilationError;
pub use ir::{Expression, InternalRepresentation, Node, Term};

/// Parse DSL source code into the IR
pub fn parse(source: &str) -> Result<InternalRepresentation, CompilationError> {
    let mut parser = parser::Parser::new(source)?;
    Ok(parser.parse()?)
}

/// Parse a single rule-body expression; the whole input must be consumed
pub fn parse_expression(source: &str) -> Result<Expression, CompilationError> {
    let mut parser = parser::Parser::new(source)?;
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}
