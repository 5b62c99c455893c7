// src/runtime/engine.rs
//! Boundary to the external resolution engine

use thiserror::Error;

/// Errors reported by a resolution engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to consult clause: {0}")]
    Consult(String),

    #[error("Query error: {0}")]
    Query(String),
}

/// A logic engine that loads clause text and proves goals against it
///
/// Implementations wrap an actual Prolog system; the crate only produces
/// the text and issues the queries.
pub trait ResolutionEngine {
    /// Load one or more clauses
    fn consult(&mut self, text: &str) -> Result<(), EngineError>;

    /// Whether `goal` can be proven from everything consulted so far
    fn prove(&mut self, goal: &str) -> Result<bool, EngineError>;
}

impl<E: ResolutionEngine + ?Sized> ResolutionEngine for &mut E {
    fn consult(&mut self, text: &str) -> Result<(), EngineError> {
        (**self).consult(text)
    }

    fn prove(&mut self, goal: &str) -> Result<bool, EngineError> {
        (**self).prove(goal)
    }
}
