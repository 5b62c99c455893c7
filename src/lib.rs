// src/lib.rs
//! # rulelog
//!
//! Compiles a small declarative rule language (objects, relations, rules
//! and tests) into Prolog clauses, and drives a resolution engine to run
//! the declared tests.
//!
//! ## Example
//!
//! ```rust
//! use rulelog::Compiler;
//!
//! let dsl = r#"
//!     object prisoner { age : int, name : string }
//!     rule adult {
//!         input { p : prisoner }
//!         rules { p.age >= 18 }
//!     }
//!     test "adults" {
//!         facts { p1 : prisoner { age : 23, name : john } }
//!         rules { adult(p1) }
//!     }
//! "#;
//!
//! let program = Compiler::new().compile(dsl).unwrap();
//!
//! assert_eq!(
//!     program.rule_clause("adult"),
//!     Some("adult(P) :- o_1_age(V_2, P), @>=(V_2,18).")
//! );
//! assert_eq!(program.test_names(), ["adults"]);
//! ```

pub mod compiler;
pub mod parser;
pub mod runtime;

use parser::lexer::LexError;
use parser::parser::ParseError;
use thiserror::Error;
use tracing::info;

pub use compiler::options::{ComparisonMode, GeneratorOptions};
pub use compiler::program::{Clause, ClauseKind, GeneratedProgram};
pub use parser::ir::InternalRepresentation;
pub use runtime::{EngineError, ResolutionEngine, TestReport, TestRunner};

/// Errors that can occur during compilation. Every error aborts the whole pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilationError {
    #[error("Lexical error at {line}:{column}: {message}")]
    Lexical {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Operator error at {line}:{column}: '{operator}' has no binary precedence")]
    Operator {
        operator: String,
        line: usize,
        column: usize,
    },

    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// References that are well-formed syntactically but do not resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("{kind} '{name}' declared twice")]
    DuplicateDeclaration { kind: &'static str, name: String },

    #[error("undeclared object type '{name}' in {context}")]
    UndeclaredObject { name: String, context: String },

    #[error("undeclared relation '{name}' in {context}")]
    UndeclaredRelation { name: String, context: String },

    #[error("undeclared rule '{name}' in {context}")]
    UndeclaredRule { name: String, context: String },

    #[error("undeclared variable '{name}' in {context}")]
    UndeclaredVariable { name: String, context: String },

    #[error("'{name}' is not an object in {context}")]
    NotAnObject { name: String, context: String },

    #[error("object '{object}' has no field '{field}' in {context}")]
    UnknownField {
        object: String,
        field: String,
        context: String,
    },

    #[error("'{name}' takes {expected} arguments, got {actual} in {context}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("field '{object}.{field}' is declared {expected}, got {actual} in {context}")]
    TypeMismatch {
        object: String,
        field: String,
        expected: String,
        actual: String,
        context: String,
    },

    /// A user name that would collide with a generated or driver name
    #[error("'{name}' clashes with a generated name in {context}")]
    ReservedName { name: String, context: String },

    #[error("malformed '{functor}' expression in {context}")]
    MalformedExpression { functor: String, context: String },
}

impl From<LexError> for CompilationError {
    fn from(err: LexError) -> Self {
        CompilationError::Lexical {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

impl From<ParseError> for CompilationError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Lex(err) => err.into(),
            ParseError::Syntax { message, position } => CompilationError::Syntax {
                message,
                line: position.line,
                column: position.column,
            },
            ParseError::Operator { operator, position } => CompilationError::Operator {
                operator,
                line: position.line,
                column: position.column,
            },
            ParseError::Duplicate { kind, name, .. } => {
                SemanticError::DuplicateDeclaration { kind, name }.into()
            }
        }
    }
}

/// Compilation pipeline: source text to generated clauses
///
/// Holds only options, so one `Compiler` can be shared across threads;
/// each call runs an independent pass.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: GeneratorOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GeneratorOptions) -> Result<Self, CompilationError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Parse DSL source into the IR without generating code
    pub fn parse(&self, dsl_source: &str) -> Result<InternalRepresentation, CompilationError> {
        parser::parse(dsl_source)
    }

    /// Parse and lower DSL source into clauses
    ///
    /// # Example
    ///
    /// ```rust
    /// use rulelog::Compiler;
    ///
    /// let program = Compiler::new()
    ///     .compile("object point { x : int, y : int }")
    ///     .unwrap();
    ///
    /// assert_eq!(program.symbol("point"), Some("o_1"));
    /// ```
    pub fn compile(&self, dsl_source: &str) -> Result<GeneratedProgram, CompilationError> {
        let ir = self.parse(dsl_source)?;
        let program = compiler::generate(&ir, &self.options)?;

        info!(
            objects = ir.objects.len(),
            rules = ir.rules.len(),
            tests = ir.tests.len(),
            clauses = program.clauses().len(),
            "compiled rule source"
        );

        Ok(program)
    }

    /// Validate DSL syntax without generating code
    pub fn validate_dsl(dsl_source: &str) -> Result<(), CompilationError> {
        parser::parse(dsl_source)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_pipeline() {
        let dsl = r#"
            object prisoner { age : int, name : string }
            rule adult {
                input { p : prisoner }
                rules { p.age >= 18 }
            }
        "#;

        let program = Compiler::new().compile(dsl).unwrap();

        assert_eq!(program.symbol("prisoner"), Some("o_1"));
        assert_eq!(
            program.rule_clause("adult"),
            Some("adult(P) :- o_1_age(V_2, P), @>=(V_2,18).")
        );
    }

    #[test]
    fn test_error_positions() {
        let err = Compiler::new().compile("object p {\n  age int\n}").unwrap_err();
        assert_eq!(
            err,
            CompilationError::Syntax {
                message: "Expected ':', got identifier 'int'".to_string(),
                line: 2,
                column: 7,
            }
        );
    }

    #[test]
    fn test_lexical_error() {
        let err = Compiler::validate_dsl("object p { age : int } $").unwrap_err();
        assert!(matches!(err, CompilationError::Lexical { column: 24, .. }));
    }

    #[test]
    fn test_duplicate_is_semantic() {
        let err = Compiler::validate_dsl("rule r { input {} rules {} } rule r { input {} rules {} }")
            .unwrap_err();
        assert_eq!(
            err,
            CompilationError::Semantic(SemanticError::DuplicateDeclaration {
                kind: "rule",
                name: "r".to_string(),
            })
        );
    }

    #[test]
    fn test_compiler_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compiler>();
        assert_send_sync::<GeneratedProgram>();
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = GeneratorOptions {
            object_prefix: "Obj".to_string(),
            ..GeneratorOptions::default()
        };
        assert!(matches!(
            Compiler::with_options(options),
            Err(CompilationError::Config(_))
        ));
    }
}
