// demos/basic_usage.rs
//! Basic usage of the rule compiler
//!
//! Run with: RUST_LOG=rulelog=debug cargo run --example basic_usage

use rulelog::{
    ComparisonMode, Compiler, EngineError, GeneratorOptions, ResolutionEngine, TestRunner,
};
use tracing_subscriber::EnvFilter;

/// Prints everything it is asked to do and proves every goal
struct DryRun;

impl ResolutionEngine for DryRun {
    fn consult(&mut self, text: &str) -> Result<(), EngineError> {
        println!("  consult  {}", text.trim_end());
        Ok(())
    }

    fn prove(&mut self, goal: &str) -> Result<bool, EngineError> {
        println!("  ?- {}.", goal);
        Ok(true)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Rule Compiler - Basic Usage ===\n");

    let dsl = r#"
        # Inmates and where they sleep
        object prisoner { age : int, name : string }
        relation cellmates { p : prisoner, cellmate : prisoner }

        rule adult {
            input { p : prisoner }
            rules { p.age >= 18 }
        }

        rule hasRightToPhonecall {
            input { p : prisoner, other : prisoner }
            rules { adult(p), cellmates(p, other) }
        }

        test "Right to phonecall" {
            facts {
                p1 : prisoner { age : 23, name : john },
                p2 : prisoner { age : 40 },
                cellmates(p1, p2)
            }
            rules { hasRightToPhonecall(p1, p2) }
        }
    "#;

    println!("Compiling rules...");
    let program = match Compiler::new().compile(dsl) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Compilation failed: {}", e);
            return;
        }
    };
    println!("Generated program:\n{}", program);

    println!("Object symbols:");
    for (object, symbol) in program.symbols() {
        println!("  {} -> {}", object, symbol);
    }
    println!();

    // Same rules, ordering evaluated arithmetically
    let options = GeneratorOptions {
        comparison: ComparisonMode::Arithmetic,
        ..GeneratorOptions::default()
    };
    if let Ok(compiler) = Compiler::with_options(options) {
        if let Ok(arithmetic) = compiler.compile(dsl) {
            println!("Arithmetic mode: {}", arithmetic.rule_clause("adult").unwrap_or(""));
            println!();
        }
    }

    // Errors carry their location
    if let Err(e) = Compiler::validate_dsl("object prisoner { age int }") {
        println!("Invalid source rejected: {}\n", e);
    }

    println!("Dry run:");
    match TestRunner::new(DryRun).run(&program) {
        Ok(report) => println!("\nReport: {:?}", report),
        Err(e) => eprintln!("\nEngine error: {}", e),
    }
}
