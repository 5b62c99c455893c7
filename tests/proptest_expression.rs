// tests/proptest_expression.rs
//! Property tests for operator-chain parsing

use proptest::prelude::*;
use rulelog::parser::{parse_expression, Expression, Node, Term};
use rulelog::Compiler;

const OPERATORS: &[&str] = &["+", "-", "*", "/", "%", "==", "!=", "<", "<=", ">", ">="];

fn precedence(op: &str) -> u8 {
    match op {
        "*" | "/" | "%" => 5,
        "+" | "-" => 4,
        _ => 3,
    }
}

/// Operands and the operators between them; `ops.len() == operands.len() - 1`.
fn arb_chain() -> impl Strategy<Value = (Vec<i64>, Vec<&'static str>)> {
    (1usize..8).prop_flat_map(|len| {
        (
            prop::collection::vec(0i64..1000, len + 1),
            prop::collection::vec(prop::sample::select(OPERATORS), len),
        )
    })
}

fn render(operands: &[i64], ops: &[&str]) -> String {
    let mut source = operands[0].to_string();
    for (op, operand) in ops.iter().zip(&operands[1..]) {
        source.push_str(&format!(" {} {}", op, operand));
    }
    source
}

/// Textbook precedence climbing with left associativity
fn climb(operands: &[i64], ops: &[&str], next: &mut usize, min: u8) -> Node {
    let mut left = Node::Term(Term::Int(operands[*next]));
    while *next < ops.len() && precedence(ops[*next]) >= min {
        let op = ops[*next];
        *next += 1;
        let right = climb(operands, ops, next, precedence(op) + 1);
        left = Expression::binary(op, left, right).into();
    }
    left
}

fn reference(operands: &[i64], ops: &[&str]) -> Node {
    climb(operands, ops, &mut 0, 0)
}

/// Leaves and operators of a tree, read left to right
fn flatten(node: &Node, leaves: &mut Vec<i64>, ops: &mut Vec<String>) {
    match node {
        Node::Term(Term::Int(n)) => leaves.push(*n),
        Node::Term(other) => panic!("unexpected leaf {:?}", other),
        Node::Expression(expr) => {
            flatten(&expr.args[0], leaves, ops);
            ops.push(expr.functor.clone());
            flatten(&expr.args[1], leaves, ops);
        }
    }
}

proptest! {
    /// Operator chains parse to the same tree as precedence climbing
    #[test]
    fn chain_matches_precedence_climbing((operands, ops) in arb_chain()) {
        let parsed = parse_expression(&render(&operands, &ops)).unwrap();
        prop_assert_eq!(Node::Expression(parsed), reference(&operands, &ops));
    }

    /// Reading the tree in order gives back the source sequence
    #[test]
    fn in_order_reading_preserves_source((operands, ops) in arb_chain()) {
        let parsed = parse_expression(&render(&operands, &ops)).unwrap();

        let mut leaves = Vec::new();
        let mut functors = Vec::new();
        flatten(&Node::Expression(parsed), &mut leaves, &mut functors);

        prop_assert_eq!(leaves, operands);
        prop_assert_eq!(functors, ops.iter().map(|op| op.to_string()).collect::<Vec<_>>());
    }

    /// A parenthesised chain is a single operand of the operator that follows it
    #[test]
    fn group_is_sealed((operands, ops) in arb_chain(), tail in 0i64..1000) {
        let source = format!("({}) * {}", render(&operands, &ops), tail);
        let parsed = parse_expression(&source).unwrap();

        prop_assert_eq!(parsed.functor.as_str(), "*");
        prop_assert_eq!(&parsed.args[0], &reference(&operands, &ops));
        prop_assert_eq!(&parsed.args[1], &Node::Term(Term::Int(tail)));
    }

    /// Arbitrary input yields a value or an error, never a panic
    #[test]
    fn compile_never_panics(source in "\\PC{0,80}") {
        let _ = Compiler::new().compile(&source);
    }
}
