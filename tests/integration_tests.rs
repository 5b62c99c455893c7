// tests/integration_tests.rs
//! Integration tests for the rule compiler

use rulelog::parser::ir::{Field, FieldType, Object};
use rulelog::parser::{parse, parse_expression, Expression, Node, Term};
use rulelog::{
    CompilationError, Compiler, EngineError, GeneratedProgram, GeneratorOptions,
    ResolutionEngine, SemanticError, TestReport, TestRunner,
};

const PRISON: &str = r#"
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

    test minors {
        facts { p1 : prisoner { name : jack, age : 12 } }
        rules { adult(p1) }
    }
"#;

fn int(n: i64) -> Node {
    Node::Term(Term::Int(n))
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(
        parse_expression("15 + 8 * 4").unwrap(),
        Expression::binary("+", int(15), Expression::binary("*", int(8), int(4)))
    );
    assert_eq!(
        parse_expression("15 * 8 + 4").unwrap(),
        Expression::binary("+", Expression::binary("*", int(15), int(8)), int(4))
    );
    assert_eq!(
        parse_expression("(15 + 8) * 4").unwrap(),
        Expression::binary("*", Expression::binary("+", int(15), int(8)), int(4))
    );
}

#[test]
fn test_expression_display() {
    let expr = parse_expression("15 + 8 * 4").unwrap();
    assert_eq!(expr.to_string(), "+(15, *(8, 4))");
}

#[test]
fn test_trailing_input_rejected() {
    let err = parse_expression("1 + 2 )").unwrap_err();
    assert!(matches!(err, CompilationError::Syntax { column: 7, .. }));
}

#[test]
fn test_object_declaration() {
    let ir = parse("object prisoner { age: int, name: string }").unwrap();

    assert_eq!(ir.objects.len(), 1);
    assert_eq!(
        ir.objects["prisoner"],
        Object::new(
            "prisoner",
            vec![
                Field::new("age", FieldType::Int),
                Field::new("name", FieldType::String),
            ]
        )
    );
}

#[test]
fn test_rule_with_field_access() {
    let program = Compiler::new().compile(PRISON).unwrap();

    assert_eq!(
        program.rule_clause("adult"),
        Some("adult(P) :- o_1_age(V_2, P), @>=(V_2,18).")
    );
    assert_eq!(
        program.rule_clause("hasRightToPhonecall"),
        Some("hasRightToPhonecall(P,Other) :- adult(P), cellmates(P,Other).")
    );
}

#[test]
fn test_test_lowering() {
    let program = Compiler::new().compile(PRISON).unwrap();

    assert_eq!(
        program.test_clause("Right to phonecall"),
        Some(
            "test('Right to phonecall') :- P1 = o_1(23,'john'), P2 = o_1(40,_), \
             assertz(cellmates(P1,P2)), (hasRightToPhonecall(P1,P2) -> \
             retract(cellmates(P1,P2)) ; retract(cellmates(P1,P2)), fail)."
        )
    );
    // assignment order does not matter, declared field order does
    assert_eq!(
        program.test_clause("minors"),
        Some("test('minors') :- P1 = o_1(12,'jack'), adult(P1).")
    );
    assert_eq!(program.test_names(), ["Right to phonecall", "minors"]);
}

#[test]
fn test_full_program_layout() {
    let program = Compiler::new().compile(PRISON).unwrap();
    let texts: Vec<&str> = program.texts().collect();

    assert_eq!(
        texts,
        vec![
            "o_1_age(Value, Object) :- Object = o_1(Value,_).",
            "o_1_name(Value, Object) :- Object = o_1(_,Value).",
            ":- dynamic(cellmates/2).",
            "adult(P) :- o_1_age(V_2, P), @>=(V_2,18).",
            "hasRightToPhonecall(P,Other) :- adult(P), cellmates(P,Other).",
            "test('Right to phonecall') :- P1 = o_1(23,'john'), P2 = o_1(40,_), \
             assertz(cellmates(P1,P2)), (hasRightToPhonecall(P1,P2) -> \
             retract(cellmates(P1,P2)) ; retract(cellmates(P1,P2)), fail).",
            "test('minors') :- P1 = o_1(12,'jack'), adult(P1).",
            "test_cases(['Right to phonecall','minors']).",
        ]
    );
}

#[test]
fn test_undeclared_type_is_an_error() {
    let dsl = r#"
        rule guarded {
            input { g : guard }
            rules { g.rank > 2 }
        }
    "#;

    let err = Compiler::new().compile(dsl).unwrap_err();
    assert_eq!(
        err,
        CompilationError::Semantic(SemanticError::UndeclaredObject {
            name: "guard".to_string(),
            context: "rule 'guarded'".to_string(),
        })
    );
}

#[test]
fn test_comment_and_whitespace_insensitive() {
    let compact = "object prisoner{age:int,name:string} rule adult{input{p:prisoner}rules{p.age>=18}}";
    let spaced = r#"
        # inmates
        object prisoner {
            age : int,   # years
            name : string
        }

        # at least eighteen
        rule adult {
            input { p : prisoner }
            rules {
                p.age
                    >= 18
            }
        }
    "#;

    assert_eq!(parse(compact).unwrap(), parse(spaced).unwrap());
}

/// Replace generated object symbols with object names so that two programs
/// can be compared independently of symbol assignment order
fn normalized_accessors(program: &GeneratedProgram, object: &str) -> Vec<String> {
    let symbol = program.symbol(object).unwrap();
    program
        .accessors(object)
        .map(|text| text.replace(symbol, object))
        .collect()
}

#[test]
fn test_declaration_order_does_not_change_field_semantics() {
    let a = "object cell { number : int, block : string } object prisoner { age : int, name : string }";
    let b = "object prisoner { age : int, name : string } object cell { number : int, block : string }";

    let first = Compiler::new().compile(a).unwrap();
    let second = Compiler::new().compile(b).unwrap();

    assert_ne!(first.symbol("prisoner"), second.symbol("prisoner"));
    for object in ["cell", "prisoner"] {
        assert_eq!(
            normalized_accessors(&first, object),
            normalized_accessors(&second, object)
        );
    }
}

#[test]
fn test_custom_prefixes() {
    let options = GeneratorOptions::from_json(r#"{ "object_prefix": "obj", "variable_prefix": "Tmp" }"#)
        .unwrap();
    let compiler = Compiler::with_options(options).unwrap();
    let program = compiler.compile(PRISON).unwrap();

    assert_eq!(program.symbol("prisoner"), Some("obj1"));
    assert_eq!(
        program.rule_clause("adult"),
        Some("adult(P) :- obj1_age(Tmp2, P), @>=(Tmp2,18).")
    );
}

#[test]
fn test_driver_predicates_cannot_be_redefined() {
    for name in ["run_tests", "run_test_cases", "test_cases"] {
        let dsl = format!("rule {} {{ input {{ }} rules {{ }} }}", name);
        let err = Compiler::new().compile(&dsl).unwrap_err();
        assert!(
            matches!(err, CompilationError::Semantic(SemanticError::ReservedName { .. })),
            "{} was accepted",
            name
        );
    }
}

#[test]
fn test_reserved_names_follow_options() {
    let options = GeneratorOptions::from_json(r#"{ "object_prefix": "obj", "variable_prefix": "Tmp" }"#)
        .unwrap();
    let compiler = Compiler::with_options(options).unwrap();

    // default-prefixed names are free once the prefixes change
    let dsl = "object p { x : int } rule o_1_x { input { v_2 : p } rules { v_2.x > 0 } }";
    let program = compiler.compile(dsl).unwrap();
    assert_eq!(
        program.rule_clause("o_1_x"),
        Some("o_1_x(V_2) :- obj1_x(Tmp2, V_2), @>(Tmp2,0).")
    );

    let err = compiler
        .compile("object p { x : int } rule r { input { tmp2 : p } rules { tmp2.x > 0 } }")
        .unwrap_err();
    assert!(matches!(
        err,
        CompilationError::Semantic(SemanticError::ReservedName { ref name, .. }) if name == "tmp2"
    ));
}

#[test]
fn test_duplicate_field_rejected() {
    let err = Compiler::validate_dsl("object prisoner { age : int, age : int }").unwrap_err();
    assert_eq!(
        err,
        CompilationError::Semantic(SemanticError::DuplicateDeclaration {
            kind: "field",
            name: "prisoner.age".to_string(),
        })
    );
}

#[test]
fn test_program_cache_roundtrip() {
    let program = Compiler::new().compile(PRISON).unwrap();
    let restored = GeneratedProgram::from_bytes(&program.to_bytes().unwrap()).unwrap();
    assert_eq!(program, restored);
}

#[test]
fn test_error_aborts_whole_pass() {
    let dsl = format!("{}\ntest \"broken\" {{ facts {{ }} rules {{ escape(p1) }} }}", PRISON);
    let err = Compiler::new().compile(&dsl).unwrap_err();
    assert!(matches!(
        err,
        CompilationError::Semantic(SemanticError::UndeclaredRule { ref name, .. }) if name == "escape"
    ));
}

/// Engine that records consulted text and fails the goals it is told to
#[derive(Default)]
struct RecordingEngine {
    consulted: Vec<String>,
    failing: Vec<&'static str>,
}

impl ResolutionEngine for RecordingEngine {
    fn consult(&mut self, text: &str) -> Result<(), EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::Consult("empty clause".to_string()));
        }
        self.consulted.push(text.to_string());
        Ok(())
    }

    fn prove(&mut self, goal: &str) -> Result<bool, EngineError> {
        if goal == rulelog::runtime::DRIVER_QUERY {
            return Ok(self.failing.is_empty());
        }
        Ok(!self.failing.iter().any(|f| *f == goal))
    }
}

#[test]
fn test_runner_reports_first_failure() {
    let program = Compiler::new().compile(PRISON).unwrap();
    let mut engine = RecordingEngine {
        failing: vec!["test('minors')"],
        ..RecordingEngine::default()
    };

    let report = TestRunner::new(&mut engine).run(&program).unwrap();

    assert_eq!(
        report,
        TestReport::Failed {
            test: "minors".to_string(),
            passed: 1,
        }
    );
    assert_eq!(engine.consulted.len(), program.clauses().len() + 1);
    assert_eq!(engine.consulted[0], program.clauses()[0].text);
}

#[test]
fn test_runner_all_passed() {
    let program = Compiler::new().compile(PRISON).unwrap();
    let report = TestRunner::new(RecordingEngine::default()).run(&program).unwrap();

    assert!(report.is_success());
    assert_eq!(report, TestReport::Passed { count: 2 });
}
