// src/parser/ir.rs
//! Intermediate representation produced by the parser
//!
//! Declarations are built once during a single parse pass and are not
//! mutated afterwards. Expression trees keep a uniform `functor(args)`
//! shape: rule and relation invocations, binary operators (field access
//! uses the `.` functor) and object instantiation (`new`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Functor of an object instantiation inside test facts
pub const NEW_FUNCTOR: &str = "new";

/// Functor of a dotted field access
pub const FIELD_ACCESS_FUNCTOR: &str = ".";

/// Declared type of a field or rule parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Float,
    String,
    /// Reference to a declared object by name
    Object(String),
}

impl FieldType {
    /// Resolve a type spelling. Anything that is not a built-in type names an object.
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" => FieldType::Int,
            "float" => FieldType::Float,
            "string" => FieldType::String,
            other => FieldType::Object(other.to_string()),
        }
    }

    pub fn object_name(&self) -> Option<&str> {
        match self {
            FieldType::Object(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => f.write_str("int"),
            FieldType::Float => f.write_str("float"),
            FieldType::String => f.write_str("string"),
            FieldType::Object(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Named schema with positional fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Object {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Position and declaration of a field
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

/// Fact predicate schema; arity is the field count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Relation {
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// Parameters, each a `Term::Variable` carrying its declared type
    pub params: Vec<Term>,
    pub body: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub name: String,
    /// Relation assertions and `new` instantiations
    pub facts: Vec<Expression>,
    /// Rule invocations to prove
    pub body: Vec<Expression>,
}

/// Leaf of an expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Int(i64),
    /// Float literal as written, always `digits.digits`
    Float(String),
    String(String),
    /// Bare identifier with no binding in scope
    Ident(String),
    /// Identifier bound in scope to a declared type
    Variable { name: String, ty: FieldType },
    /// Field assignment inside an instantiation
    Field { name: String, value: Box<Term> },
}

impl Term {
    pub fn ident(name: impl Into<String>) -> Self {
        Term::Ident(name.into())
    }

    /// Variable bound to an object type
    pub fn object(name: impl Into<String>, object: impl Into<String>) -> Self {
        Term::Variable {
            name: name.into(),
            ty: FieldType::Object(object.into()),
        }
    }

    pub fn field(name: impl Into<String>, value: Term) -> Self {
        Term::Field {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// Object type of an object-typed variable
    pub fn object_name(&self) -> Option<&str> {
        match self {
            Term::Variable { ty, .. } => ty.object_name(),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Int(n) => write!(f, "{}", n),
            Term::Float(n) => write!(f, "{}", n),
            Term::String(s) => write!(f, "\"{}\"", s),
            Term::Ident(name) | Term::Variable { name, .. } => f.write_str(name),
            Term::Field { name, value } => write!(f, "{}: {}", name, value),
        }
    }
}

/// A node of an expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Term(Term),
    Expression(Expression),
}

impl From<Term> for Node {
    fn from(term: Term) -> Self {
        Node::Term(term)
    }
}

impl From<Expression> for Node {
    fn from(expr: Expression) -> Self {
        Node::Expression(expr)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Term(term) => term.fmt(f),
            Node::Expression(expr) => expr.fmt(f),
        }
    }
}

/// Internal node: a functor applied to ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub functor: String,
    pub args: Vec<Node>,
}

impl Expression {
    pub fn new(functor: impl Into<String>, args: Vec<Node>) -> Self {
        Self {
            functor: functor.into(),
            args,
        }
    }

    pub fn binary(functor: impl Into<String>, left: impl Into<Node>, right: impl Into<Node>) -> Self {
        Self::new(functor, vec![left.into(), right.into()])
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.functor)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            arg.fmt(f)?;
        }
        f.write_str(")")
    }
}

/// Result of parsing a whole document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalRepresentation {
    pub objects: IndexMap<String, Object>,
    pub relations: IndexMap<String, Relation>,
    pub rules: IndexMap<String, Rule>,
    pub tests: Vec<Test>,
}

impl InternalRepresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test names in declaration order
    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|t| t.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_from_name() {
        assert_eq!(FieldType::from_name("int"), FieldType::Int);
        assert_eq!(FieldType::from_name("float"), FieldType::Float);
        assert_eq!(FieldType::from_name("string"), FieldType::String);
        assert_eq!(
            FieldType::from_name("prisoner"),
            FieldType::Object("prisoner".to_string())
        );
    }

    #[test]
    fn test_object_field_lookup() {
        let object = Object::new(
            "prisoner",
            vec![
                Field::new("age", FieldType::Int),
                Field::new("name", FieldType::String),
            ],
        );

        let (position, field) = object.field("name").unwrap();
        assert_eq!(position, 1);
        assert_eq!(field.ty, FieldType::String);
        assert!(object.field("height").is_none());
    }

    #[test]
    fn test_expression_display() {
        let expr = Expression::binary(
            "+",
            Term::Int(15),
            Expression::binary("*", Term::Int(8), Term::Int(4)),
        );
        assert_eq!(expr.to_string(), "+(15, *(8, 4))");
    }

    #[test]
    fn test_ir_json_roundtrip() {
        let mut ir = InternalRepresentation::new();
        ir.objects.insert(
            "prisoner".to_string(),
            Object::new("prisoner", vec![Field::new("age", FieldType::Int)]),
        );
        let json = serde_json::to_string(&ir).unwrap();
        let back: InternalRepresentation = serde_json::from_str(&json).unwrap();
        assert_eq!(ir, back);
    }
}
