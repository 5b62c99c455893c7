// src/compiler/program.rs
//! Generated clauses, ready to be consulted by a resolution engine

use crate::CompilationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a generated clause was lowered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClauseKind {
    /// Projection of one object field
    Accessor { object: String, field: String },
    /// `dynamic` declaration of a relation
    Directive { relation: String },
    Rule { name: String },
    Test { name: String },
    /// The list of test names queried by the driver
    TestCases,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub kind: ClauseKind,
    pub text: String,
}

/// Output of one generation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProgram {
    clauses: Vec<Clause>,
    /// Object name -> generated symbol, in declaration order
    symbols: IndexMap<String, String>,
    test_names: Vec<String>,
}

impl GeneratedProgram {
    pub(crate) fn new(
        clauses: Vec<Clause>,
        symbols: IndexMap<String, String>,
        test_names: Vec<String>,
    ) -> Self {
        Self {
            clauses,
            symbols,
            test_names,
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Clause texts in consult order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|c| c.text.as_str())
    }

    pub fn symbols(&self) -> &IndexMap<String, String> {
        &self.symbols
    }

    /// Generated symbol of an object
    pub fn symbol(&self, object: &str) -> Option<&str> {
        self.symbols.get(object).map(String::as_str)
    }

    /// Test names in declaration order
    pub fn test_names(&self) -> &[String] {
        &self.test_names
    }

    pub fn rule_clause(&self, name: &str) -> Option<&str> {
        self.find(|kind| matches!(kind, ClauseKind::Rule { name: n } if n == name))
    }

    pub fn test_clause(&self, name: &str) -> Option<&str> {
        self.find(|kind| matches!(kind, ClauseKind::Test { name: n } if n == name))
    }

    /// Accessor clauses of one object, in field order
    pub fn accessors<'a>(&'a self, object: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.clauses.iter().filter_map(move |c| match &c.kind {
            ClauseKind::Accessor { object: o, .. } if o == object => Some(c.text.as_str()),
            _ => None,
        })
    }

    fn find(&self, pred: impl Fn(&ClauseKind) -> bool) -> Option<&str> {
        self.clauses
            .iter()
            .find(|c| pred(&c.kind))
            .map(|c| c.text.as_str())
    }

    /// Serialize for caching compiled rule sets
    pub fn to_bytes(&self) -> Result<Vec<u8>, CompilationError> {
        bincode::serialize(self).map_err(|e| CompilationError::Serialization(e.to_string()))
    }

    /// Load a program produced by [`GeneratedProgram::to_bytes`]
    pub fn from_bytes(data: &[u8]) -> Result<Self, CompilationError> {
        bincode::deserialize(data).map_err(|e| CompilationError::Serialization(e.to_string()))
    }
}

/// One clause per line, in consult order
impl fmt::Display for GeneratedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for clause in &self.clauses {
            writeln!(f, "{}", clause.text)?;
        }
        Ok(())
    }
}
