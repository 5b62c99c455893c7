// src/runtime/mod.rs
//! Runtime components for running generated tests on a resolution engine

pub mod driver;
pub mod engine;

pub use driver::{TestReport, TestRunner, BOOTSTRAP, DRIVER_QUERY};
pub use engine::{EngineError, ResolutionEngine};
