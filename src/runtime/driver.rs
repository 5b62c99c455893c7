// src/runtime/driver.rs
//! Loads a generated program into an engine and runs its tests

use crate::compiler::codegen::quoted;
use crate::compiler::program::GeneratedProgram;
use crate::runtime::engine::{EngineError, ResolutionEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Walks `test_cases/1` and fails at the first test that cannot be proven
pub const BOOTSTRAP: &str = "\
run_tests :- test_cases(Cases), run_test_cases(Cases).
run_test_cases([]).
run_test_cases([Case|Rest]) :- test(Case), !, run_test_cases(Rest).
";

/// Succeeds iff every declared test succeeds
pub const DRIVER_QUERY: &str = "run_tests";

/// Outcome of running every test of a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestReport {
    Passed {
        count: usize,
    },
    /// Evaluation stops at the first failing test
    Failed {
        test: String,
        passed: usize,
    },
}

impl TestReport {
    pub fn is_success(&self) -> bool {
        matches!(self, TestReport::Passed { .. })
    }
}

pub struct TestRunner<E> {
    engine: E,
}

impl<E: ResolutionEngine> TestRunner<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Consult every clause, then the bootstrap program
    pub fn load(&mut self, program: &GeneratedProgram) -> Result<(), EngineError> {
        for text in program.texts() {
            self.engine.consult(text)?;
        }
        self.engine.consult(BOOTSTRAP)?;

        debug!(clauses = program.clauses().len(), "program consulted");
        Ok(())
    }

    /// Load `program` and prove the driver query.
    ///
    /// When the query fails, the tests are proven one by one in declaration
    /// order to name the first failure.
    pub fn run(&mut self, program: &GeneratedProgram) -> Result<TestReport, EngineError> {
        self.load(program)?;

        let names = program.test_names();
        if self.engine.prove(DRIVER_QUERY)? {
            info!(tests = names.len(), "all tests passed");
            return Ok(TestReport::Passed { count: names.len() });
        }

        for (passed, name) in names.iter().enumerate() {
            let goal = format!("test({})", quoted(name));
            if !self.engine.prove(&goal)? {
                warn!(test = %name, passed, "test case failed");
                return Ok(TestReport::Failed {
                    test: name.clone(),
                    passed,
                });
            }
        }

        Err(EngineError::Query(format!(
            "'{}' failed but every test case succeeded on its own",
            DRIVER_QUERY
        )))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}
