// src/compiler/mod.rs
//! Code generator that lowers the IR into Prolog clauses

pub mod codegen;
pub mod options;
pub mod program;

use crate::parser::InternalRepresentation;
use crate::CompilationError;
use options::GeneratorOptions;
use program::GeneratedProgram;

/// Lower a parsed document into clauses
pub fn generate(
    ir: &InternalRepresentation,
    options: &GeneratorOptions,
) -> Result<GeneratedProgram, CompilationError> {
    let program = codegen::Generator::new(ir, options).generate()?;
    Ok(program)
}
