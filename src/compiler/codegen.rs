// src/compiler/codegen.rs
//! Lowers the IR into Prolog clauses
//!
//! Objects become positional terms `o_N(f1, ..., fN)` under a generated
//! symbol, with one accessor predicate per field. Field access inside an
//! expression cannot be inlined as a value: it lowers to a fresh variable
//! plus an accessor goal that has to run before the variable is used.
//! Those goals travel up through every enclosing expression as
//! [`Lowered::prerequisites`] and are flattened into the clause body ahead
//! of the goal that needs them.

use crate::compiler::options::GeneratorOptions;
use crate::compiler::program::{Clause, ClauseKind, GeneratedProgram};
use crate::parser::ir::*;
use crate::parser::token::TokenKind;
use crate::SemanticError;
use ahash::HashMap;
use indexmap::IndexMap;
use tracing::debug;

/// Predicates defined by generated tests and the driver's bootstrap program
pub const RESERVED_PREDICATES: [&str; 4] = ["test", "test_cases", "run_tests", "run_test_cases"];

/// A lowered expression: its value and the goals that must precede it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    pub value: String,
    pub prerequisites: Vec<String>,
}

impl Lowered {
    fn value(value: String) -> Self {
        Self {
            value,
            prerequisites: Vec::new(),
        }
    }

    /// Prerequisites first, then the value itself as a goal
    pub fn into_goals(mut self) -> Vec<String> {
        self.prerequisites.push(self.value);
        self.prerequisites
    }
}

pub struct Generator<'a> {
    ir: &'a InternalRepresentation,
    options: &'a GeneratorOptions,

    /// Shared by object symbols and fresh variables
    counter: usize,

    /// Object name -> generated symbol
    symbols: HashMap<String, String>,

    clauses: Vec<Clause>,
}

impl<'a> Generator<'a> {
    pub fn new(ir: &'a InternalRepresentation, options: &'a GeneratorOptions) -> Self {
        Self {
            ir,
            options,
            counter: 0,
            symbols: HashMap::default(),
            clauses: Vec::new(),
        }
    }

    pub fn generate(mut self) -> Result<GeneratedProgram, SemanticError> {
        let ir = self.ir;
        self.check_declared_types()?;
        self.check_predicate_names()?;

        for object in ir.objects.values() {
            self.lower_object(object);
        }

        for relation in ir.relations.values() {
            self.emit(
                ClauseKind::Directive {
                    relation: relation.name.clone(),
                },
                format!(":- dynamic({}/{}).", atom(&relation.name), relation.arity()),
            );
        }

        for rule in ir.rules.values() {
            let text = self.lower_rule(rule)?;
            self.emit(ClauseKind::Rule { name: rule.name.clone() }, text);
        }

        for test in &ir.tests {
            let text = self.lower_test(test)?;
            self.emit(ClauseKind::Test { name: test.name.clone() }, text);
        }

        let names: Vec<String> = ir.test_names().map(quoted).collect();
        self.emit(ClauseKind::TestCases, format!("test_cases([{}]).", names.join(",")));

        let symbols: IndexMap<String, String> = ir
            .objects
            .keys()
            .filter_map(|name| Some((name.clone(), self.symbols.get(name)?.clone())))
            .collect();

        Ok(GeneratedProgram::new(
            self.clauses,
            symbols,
            ir.test_names().map(str::to_string).collect(),
        ))
    }

    /// Every object type named by a field or parameter must be declared
    fn check_declared_types(&self) -> Result<(), SemanticError> {
        let fields = self
            .ir
            .objects
            .values()
            .flat_map(|o| o.fields.iter().map(move |f| (&f.ty, format!("object '{}'", o.name))))
            .chain(self.ir.relations.values().flat_map(|r| {
                r.fields
                    .iter()
                    .map(move |f| (&f.ty, format!("relation '{}'", r.name)))
            }));

        let params = self.ir.rules.values().flat_map(|r| {
            r.params.iter().filter_map(move |p| match p {
                Term::Variable { ty, .. } => Some((ty, rule_context(r))),
                _ => None,
            })
        });

        for (ty, context) in fields.chain(params) {
            if let Some(name) = ty.object_name() {
                if !self.ir.objects.contains_key(name) {
                    return Err(SemanticError::UndeclaredObject {
                        name: name.to_string(),
                        context,
                    });
                }
            }
        }

        Ok(())
    }

    /// Rule and relation names must stay clear of generated predicates and of each other
    fn check_predicate_names(&self) -> Result<(), SemanticError> {
        let rules = self.ir.rules.keys().map(|name| (name, format!("rule '{}'", name)));
        let relations = self
            .ir
            .relations
            .keys()
            .map(|name| (name, format!("relation '{}'", name)));

        for (name, context) in rules.chain(relations) {
            let reserved = RESERVED_PREDICATES.iter().any(|r| *r == name.as_str());
            if reserved || self.is_object_symbol(name) {
                return Err(SemanticError::ReservedName {
                    name: name.clone(),
                    context,
                });
            }
        }

        if let Some(name) = self.ir.rules.keys().find(|n| self.ir.relations.contains_key(*n)) {
            return Err(SemanticError::DuplicateDeclaration {
                kind: "predicate",
                name: name.clone(),
            });
        }

        Ok(())
    }

    /// `o_3`, `o_3_age` and friends
    fn is_object_symbol(&self, name: &str) -> bool {
        let Some(rest) = name.strip_prefix(self.options.object_prefix.as_str()) else {
            return false;
        };
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        digits > 0 && (rest.len() == digits || rest[digits..].starts_with('_'))
    }

    /// `V_3` and friends
    fn is_fresh_variable(&self, name: &str) -> bool {
        name.strip_prefix(self.options.variable_prefix.as_str())
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    fn lower_object(&mut self, object: &Object) {
        let symbol = format!("{}{}", self.options.object_prefix, self.next_id());
        debug!(object = %object.name, %symbol, "assigned object symbol");

        let arity = object.fields.len();
        for (position, field) in object.fields.iter().enumerate() {
            let args: Vec<&str> = (0..arity)
                .map(|i| if i == position { "Value" } else { "_" })
                .collect();
            self.emit(
                ClauseKind::Accessor {
                    object: object.name.clone(),
                    field: field.name.clone(),
                },
                format!(
                    "{}_{}(Value, Object) :- Object = {}({}).",
                    symbol,
                    field.name,
                    symbol,
                    args.join(",")
                ),
            );
        }

        self.symbols.insert(object.name.clone(), symbol);
    }

    fn lower_rule(&mut self, rule: &Rule) -> Result<String, SemanticError> {
        let context = rule_context(rule);
        let params = rule
            .params
            .iter()
            .map(|p| self.print(p, &context))
            .collect::<Result<Vec<_>, _>>()?;
        let head = predicate(&atom(&rule.name), &params);

        let mut goals = Vec::new();
        for expr in &rule.body {
            goals.extend(self.lower_expression(expr, &context)?.into_goals());
        }

        debug!(rule = %rule.name, goals = goals.len(), "lowered rule");
        Ok(clause(head, &goals))
    }

    fn lower_test(&mut self, test: &Test) -> Result<String, SemanticError> {
        let ir = self.ir;
        let context = format!("test '{}'", test.name);
        let mut goals = Vec::new();
        let mut asserted = Vec::new();

        for fact in &test.facts {
            if fact.functor == NEW_FUNCTOR {
                goals.extend(self.lower_expression(fact, &context)?.into_goals());
                continue;
            }

            let relation = ir.relations.get(&fact.functor).ok_or_else(|| {
                SemanticError::UndeclaredRelation {
                    name: fact.functor.clone(),
                    context: context.clone(),
                }
            })?;
            check_arity(&relation.name, relation.arity(), fact, &context)?;

            let lowered = self.lower_invocation(fact, &context)?;
            goals.extend(lowered.prerequisites);
            goals.push(format!("assertz({})", lowered.value));
            asserted.push(lowered.value);
        }

        let mut checks = Vec::new();
        for invocation in &test.body {
            if !ir.rules.contains_key(&invocation.functor) {
                return Err(SemanticError::UndeclaredRule {
                    name: invocation.functor.clone(),
                    context,
                });
            }
            checks.extend(self.lower_expression(invocation, &context)?.into_goals());
        }

        if asserted.is_empty() {
            goals.extend(checks);
        } else {
            goals.push(retracting(&checks, &asserted));
        }

        Ok(clause(format!("test({})", quoted(&test.name)), &goals))
    }

    /// Lower one expression, dispatching on its functor
    pub fn lower_expression(
        &mut self,
        expr: &Expression,
        context: &str,
    ) -> Result<Lowered, SemanticError> {
        match expr.functor.as_str() {
            NEW_FUNCTOR => self.lower_new(expr, context),
            FIELD_ACCESS_FUNCTOR => Ok(self.lower_field_access(expr, context)?.0),
            op if TokenKind::lookup_operator(op).is_some() => {
                let functor = match self.options.comparison.map(op) {
                    Some(mapped) => mapped,
                    None if op == "%" => "mod",
                    None => op,
                };
                self.lower_application(functor, &expr.args, context)
            }
            name => {
                let expected = match (self.ir.rules.get(name), self.ir.relations.get(name)) {
                    (Some(rule), _) => rule.params.len(),
                    (None, Some(relation)) => relation.arity(),
                    (None, None) => {
                        return Err(SemanticError::UndeclaredRule {
                            name: name.to_string(),
                            context: context.to_string(),
                        });
                    }
                };
                check_arity(name, expected, expr, context)?;
                self.lower_invocation(expr, context)
            }
        }
    }

    fn lower_invocation(
        &mut self,
        expr: &Expression,
        context: &str,
    ) -> Result<Lowered, SemanticError> {
        self.lower_application(&atom(&expr.functor), &expr.args, context)
    }

    /// `functor(arg, ...)` with argument prerequisites gathered left to right
    fn lower_application(
        &mut self,
        functor: &str,
        args: &[Node],
        context: &str,
    ) -> Result<Lowered, SemanticError> {
        let mut prerequisites = Vec::new();
        let mut values = Vec::with_capacity(args.len());

        for arg in args {
            let lowered = self.lower_node(arg, context)?;
            prerequisites.extend(lowered.prerequisites);
            values.push(lowered.value);
        }

        Ok(Lowered {
            value: predicate(functor, &values),
            prerequisites,
        })
    }

    fn lower_node(&mut self, node: &Node, context: &str) -> Result<Lowered, SemanticError> {
        match node {
            Node::Term(term) => Ok(Lowered::value(self.print(term, context)?)),
            Node::Expression(expr) => self.lower_expression(expr, context),
        }
    }

    /// `Var = o_N(v1, ..., vN)`, unassigned fields left as `_`
    fn lower_new(&mut self, expr: &Expression, context: &str) -> Result<Lowered, SemanticError> {
        let malformed = || SemanticError::MalformedExpression {
            functor: NEW_FUNCTOR.to_string(),
            context: context.to_string(),
        };

        let (var, object_name) = match expr.args.first() {
            Some(Node::Term(Term::Variable {
                name,
                ty: FieldType::Object(object),
            })) => (name, object),
            _ => return Err(malformed()),
        };
        let object = self.object(object_name, context)?;
        let symbol = self.symbol(object_name, context)?;

        let mut assignments = Vec::new();
        for arg in &expr.args[1..] {
            let Node::Term(Term::Field { name, value }) = arg else {
                return Err(malformed());
            };
            if object.field(name).is_none() {
                return Err(SemanticError::UnknownField {
                    object: object.name.clone(),
                    field: name.clone(),
                    context: context.to_string(),
                });
            }
            assignments.push((name, value.as_ref()));
        }

        let mut values = Vec::with_capacity(object.fields.len());
        for field in &object.fields {
            let value = match assignments.iter().find(|(name, _)| **name == field.name) {
                Some((_, value)) => self.field_value(object, field, value, context)?,
                None => "_".to_string(),
            };
            values.push(value);
        }

        Ok(Lowered::value(format!(
            "{} = {}",
            self.user_variable(var, context)?,
            predicate(&symbol, &values)
        )))
    }

    /// Returns the fresh variable bound to the field, and the field's declared type
    fn lower_field_access(
        &mut self,
        expr: &Expression,
        context: &str,
    ) -> Result<(Lowered, FieldType), SemanticError> {
        let field_name = match expr.args.get(1) {
            Some(Node::Term(Term::Ident(name) | Term::Variable { name, .. }))
                if expr.args.len() == 2 =>
            {
                name
            }
            _ => {
                return Err(SemanticError::MalformedExpression {
                    functor: FIELD_ACCESS_FUNCTOR.to_string(),
                    context: context.to_string(),
                });
            }
        };

        let (target, object_name, mut prerequisites) =
            self.resolve_object(&expr.args[0], context)?;
        let object = self.object(&object_name, context)?;
        let symbol = self.symbol(&object_name, context)?;

        let (_, field) = object
            .field(field_name)
            .ok_or_else(|| SemanticError::UnknownField {
                object: object.name.clone(),
                field: field_name.clone(),
                context: context.to_string(),
            })?;

        let fresh = format!("{}{}", self.options.variable_prefix, self.next_id());
        prerequisites.push(format!("{}_{}({}, {})", symbol, field.name, fresh, target));

        Ok((
            Lowered {
                value: fresh,
                prerequisites,
            },
            field.ty.clone(),
        ))
    }

    /// The printed object value, its object type, and goals needed to reach it
    fn resolve_object(
        &mut self,
        node: &Node,
        context: &str,
    ) -> Result<(String, String, Vec<String>), SemanticError> {
        let not_an_object = |name: String| SemanticError::NotAnObject {
            name,
            context: context.to_string(),
        };

        match node {
            Node::Term(Term::Variable { name, ty }) => match ty.object_name() {
                Some(object) => Ok((
                    self.user_variable(name, context)?,
                    object.to_string(),
                    Vec::new(),
                )),
                None => Err(not_an_object(name.clone())),
            },
            Node::Term(Term::Ident(name)) => Err(SemanticError::UndeclaredVariable {
                name: name.clone(),
                context: context.to_string(),
            }),
            Node::Expression(inner) if inner.functor == FIELD_ACCESS_FUNCTOR => {
                let (lowered, ty) = self.lower_field_access(inner, context)?;
                match ty {
                    FieldType::Object(object) => Ok((lowered.value, object, lowered.prerequisites)),
                    _ => Err(not_an_object(inner.to_string())),
                }
            }
            other => Err(not_an_object(other.to_string())),
        }
    }

    fn object(&self, name: &str, context: &str) -> Result<&'a Object, SemanticError> {
        self.ir
            .objects
            .get(name)
            .ok_or_else(|| SemanticError::UndeclaredObject {
                name: name.to_string(),
                context: context.to_string(),
            })
    }

    fn symbol(&self, object: &str, context: &str) -> Result<String, SemanticError> {
        self.symbols
            .get(object)
            .cloned()
            .ok_or_else(|| SemanticError::UndeclaredObject {
                name: object.to_string(),
                context: context.to_string(),
            })
    }

    /// Print an assigned field value according to the field's declared type
    fn field_value(
        &self,
        object: &Object,
        field: &Field,
        value: &Term,
        context: &str,
    ) -> Result<String, SemanticError> {
        match (&field.ty, value) {
            (FieldType::String, Term::String(s) | Term::Ident(s)) => Ok(quoted(s)),
            (FieldType::Int | FieldType::Float, Term::Int(_))
            | (FieldType::Float, Term::Float(_)) => Ok(print_term(value)),
            (FieldType::Object(_), Term::Ident(name)) => self.user_variable(name, context),
            (
                FieldType::Object(expected),
                Term::Variable {
                    name,
                    ty: FieldType::Object(actual),
                },
            ) if expected == actual => self.user_variable(name, context),
            _ => Err(SemanticError::TypeMismatch {
                object: object.name.clone(),
                field: field.name.clone(),
                expected: field.ty.to_string(),
                actual: describe(value),
                context: context.to_string(),
            }),
        }
    }

    /// [`print_term`], refusing user variables that would read as fresh ones
    fn print(&self, term: &Term, context: &str) -> Result<String, SemanticError> {
        match term {
            Term::Ident(name) | Term::Variable { name, .. } => self.user_variable(name, context),
            Term::Field { value, .. } => self.print(value, context),
            other => Ok(print_term(other)),
        }
    }

    fn user_variable(&self, name: &str, context: &str) -> Result<String, SemanticError> {
        let printed = variable(name);
        if self.is_fresh_variable(&printed) {
            return Err(SemanticError::ReservedName {
                name: name.to_string(),
                context: context.to_string(),
            });
        }
        Ok(printed)
    }

    fn next_id(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    fn emit(&mut self, kind: ClauseKind, text: String) {
        self.clauses.push(Clause { kind, text });
    }
}

fn rule_context(rule: &Rule) -> String {
    format!("rule '{}'", rule.name)
}

fn check_arity(
    name: &str,
    expected: usize,
    expr: &Expression,
    context: &str,
) -> Result<(), SemanticError> {
    if expr.args.len() == expected {
        return Ok(());
    }
    Err(SemanticError::ArityMismatch {
        name: name.to_string(),
        expected,
        actual: expr.args.len(),
        context: context.to_string(),
    })
}

fn describe(term: &Term) -> String {
    match term {
        Term::Int(_) => "int".to_string(),
        Term::Float(_) => "float".to_string(),
        Term::String(_) => "string".to_string(),
        Term::Ident(name) => format!("identifier '{}'", name),
        Term::Variable { name, ty } => format!("{} '{}'", ty, name),
        Term::Field { name, .. } => format!("field '{}'", name),
    }
}

/// Print a term in target syntax: identifiers become variables, strings are quoted
pub fn print_term(term: &Term) -> String {
    match term {
        Term::Int(n) => n.to_string(),
        Term::Float(literal) => literal.clone(),
        Term::String(s) => quoted(s),
        Term::Ident(name) | Term::Variable { name, .. } => variable(name),
        Term::Field { value, .. } => print_term(value),
    }
}

/// Map an identifier onto a variable name.
///
/// Plain lowercase identifiers are capitalised and other ASCII identifiers
/// get a leading `_`. Anything else is spelled as `_u` and its code points
/// in hex. Distinct identifiers always map to distinct variables.
pub fn variable(name: &str) -> String {
    let ascii_word = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() && ascii_word(chars.as_str()) => {
            format!("{}{}", first.to_ascii_uppercase(), chars.as_str())
        }
        Some(_) if ascii_word(name) => format!("_{}", name),
        _ => {
            let codes: Vec<String> = name.chars().map(|c| format!("{:x}", c as u32)).collect();
            format!("_u{}", codes.join("_"))
        }
    }
}

/// Single-quoted atom
pub fn quoted(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Atom that is quoted only when it would not read as a plain atom
pub fn atom(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        quoted(name)
    }
}

/// `functor(a,b)`, or the bare functor without arguments
fn predicate(functor: &str, args: &[String]) -> String {
    if args.is_empty() {
        functor.to_string()
    } else {
        format!("{}({})", functor, args.join(","))
    }
}

/// `(Goals -> Cleanup ; Cleanup, fail)`, retracting `facts` whether or not the goals hold
fn retracting(goals: &[String], facts: &[String]) -> String {
    let cleanup: Vec<String> = facts.iter().map(|f| format!("retract({})", f)).collect();
    let cleanup = cleanup.join(", ");
    let goals = if goals.is_empty() {
        "true".to_string()
    } else {
        goals.join(", ")
    };
    format!("({} -> {} ; {}, fail)", goals, cleanup, cleanup)
}

fn clause(head: String, goals: &[String]) -> String {
    if goals.is_empty() {
        format!("{}.", head)
    } else {
        format!("{} :- {}.", head, goals.join(", "))
    }
}
