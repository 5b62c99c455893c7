// src/parser/parser.rs
//! Parser that converts tokens into the intermediate representation

use super::ir::*;
use super::lexer::{LexError, Lexer};
use super::token::{Position, Token, TokenKind};
use ahash::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    Syntax {
        message: String,
        position: Position,
    },
    /// Operator token with no binary precedence inside an operator chain
    Operator {
        operator: String,
        position: Position,
    },
    Duplicate {
        kind: &'static str,
        name: String,
        position: Position,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Syntax { message, position } => {
                write!(f, "Parse error at {}: {}", position, message)
            }
            ParseError::Operator { operator, position } => {
                write!(f, "Parse error at {}: '{}' is not a binary operator", position, operator)
            }
            ParseError::Duplicate {
                kind,
                name,
                position,
            } => write!(f, "Parse error at {}: {} '{}' declared twice", position, kind, name),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lex(err)
    }
}

/// Operator tree under construction. Leaves are sealed: a parenthesised
/// group becomes a single leaf and is never rotated into.
#[derive(Debug)]
enum Tree {
    Leaf(Node),
    Op {
        op: TokenKind,
        precedence: u8,
        left: Box<Tree>,
        right: Box<Tree>,
    },
}

impl Tree {
    /// Attach `op operand` to the tree.
    ///
    /// A root binding at least as tightly as `op` becomes the left child of
    /// the new operator. Otherwise the new operator claims the most recent
    /// operand, descending the right spine until it meets an operator that
    /// binds at least as tightly or a leaf.
    fn merge(self, op: TokenKind, precedence: u8, operand: Node) -> Tree {
        match self {
            Tree::Op {
                op: root,
                precedence: root_precedence,
                left,
                right,
            } if root_precedence < precedence => Tree::Op {
                op: root,
                precedence: root_precedence,
                left,
                right: Box::new(right.merge(op, precedence, operand)),
            },
            tree => Tree::Op {
                op,
                precedence,
                left: Box::new(tree),
                right: Box::new(Tree::Leaf(operand)),
            },
        }
    }

    fn into_node(self) -> Node {
        match self {
            Tree::Leaf(node) => node,
            Tree::Op { op, left, right, .. } => {
                Expression::binary(op.as_str(), left.into_node(), right.into_node()).into()
            }
        }
    }
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peeked: Option<Token>,

    /// Variables of the declaration being parsed, name -> declared type
    scope: HashMap<String, FieldType>,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current_token = Self::next_significant(&mut lexer)?;

        Ok(Self {
            lexer,
            current_token,
            peeked: None,
            scope: HashMap::default(),
        })
    }

    pub fn parse(&mut self) -> Result<InternalRepresentation, ParseError> {
        let mut ir = InternalRepresentation::new();

        loop {
            let position = self.current_token.position;
            match self.current_token.kind {
                TokenKind::Eof => break,
                TokenKind::Object => {
                    self.advance()?;
                    let object = self.parse_object()?;
                    debug!(object = %object.name, fields = object.fields.len(), "parsed object");
                    if ir.objects.contains_key(&object.name) {
                        return Err(duplicate("object", object.name, position));
                    }
                    ir.objects.insert(object.name.clone(), object);
                }
                TokenKind::Relation => {
                    self.advance()?;
                    let relation = self.parse_relation()?;
                    debug!(relation = %relation.name, arity = relation.arity(), "parsed relation");
                    if ir.relations.contains_key(&relation.name) {
                        return Err(duplicate("relation", relation.name, position));
                    }
                    ir.relations.insert(relation.name.clone(), relation);
                }
                TokenKind::Rule => {
                    self.advance()?;
                    let rule = self.parse_rule()?;
                    debug!(rule = %rule.name, params = rule.params.len(), body = rule.body.len(), "parsed rule");
                    if ir.rules.contains_key(&rule.name) {
                        return Err(duplicate("rule", rule.name, position));
                    }
                    ir.rules.insert(rule.name.clone(), rule);
                }
                TokenKind::Test => {
                    self.advance()?;
                    let test = self.parse_test()?;
                    debug!(test = %test.name, facts = test.facts.len(), "parsed test");
                    if ir.tests.iter().any(|t| t.name == test.name) {
                        return Err(duplicate("test", test.name, position));
                    }
                    ir.tests.push(test);
                }
                _ => {
                    return Err(self.error(format!(
                        "Expected 'object', 'relation', 'rule' or 'test', got {}",
                        self.current_token
                    )));
                }
            }
        }

        Ok(ir)
    }

    fn parse_object(&mut self) -> Result<Object, ParseError> {
        let name = self.expect_identifier()?;
        let fields = self.parse_fields(&name)?;
        Ok(Object { name, fields })
    }

    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        let name = self.expect_identifier()?;
        let fields = self.parse_fields(&name)?;
        Ok(Relation { name, fields })
    }

    /// `{ field : type, ... }` with unique field names
    fn parse_fields(&mut self, owner: &str) -> Result<Vec<Field>, ParseError> {
        let mut seen = HashSet::default();
        self.parse_list(false, |p| {
            let position = p.current_token.position;
            let field = p.parse_field()?;
            if !seen.insert(field.name.clone()) {
                return Err(duplicate("field", format!("{}.{}", owner, field.name), position));
            }
            Ok(field)
        })
    }

    /// `name : type`
    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let ty = FieldType::from_name(&self.expect_identifier()?);
        Ok(Field { name, ty })
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.scope.clear();

        let name = self.expect_identifier()?;
        self.expect(TokenKind::LeftBrace)?;

        self.expect(TokenKind::Input)?;
        let params = self.parse_list(true, Self::parse_param)?;

        self.expect(TokenKind::Rules)?;
        let body = self.parse_list(true, Self::parse_expression)?;

        self.expect(TokenKind::RightBrace)?;
        self.scope.clear();

        Ok(Rule { name, params, body })
    }

    /// Rule parameter; registers the variable for the rest of the rule
    fn parse_param(&mut self) -> Result<Term, ParseError> {
        let position = self.current_token.position;
        let Field { name, ty } = self.parse_field()?;
        if self.scope.insert(name.clone(), ty.clone()).is_some() {
            return Err(duplicate("parameter", name, position));
        }
        Ok(Term::Variable { name, ty })
    }

    fn parse_test(&mut self) -> Result<Test, ParseError> {
        self.scope.clear();

        let name = match self.current_token.kind {
            TokenKind::String | TokenKind::Identifier => self.advance()?.literal,
            _ => {
                return Err(self.error(format!("Expected test name, got {}", self.current_token)));
            }
        };
        self.expect(TokenKind::LeftBrace)?;

        self.expect(TokenKind::Facts)?;
        let facts = self.parse_list(true, Self::parse_fact)?;

        self.expect(TokenKind::Rules)?;
        let body = self.parse_list(true, Self::parse_invocation)?;

        self.expect(TokenKind::RightBrace)?;
        self.scope.clear();

        Ok(Test { name, facts, body })
    }

    fn parse_fact(&mut self) -> Result<Expression, ParseError> {
        if self.at_invocation()? {
            return self.parse_invocation();
        }
        self.parse_instantiation()
    }

    /// `var : Type { field : value, ... }`
    fn parse_instantiation(&mut self) -> Result<Expression, ParseError> {
        let position = self.current_token.position;
        let var = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let object = self.expect_identifier()?;

        let mut args = vec![Node::Term(Term::object(var.clone(), object.clone()))];
        let mut seen = HashSet::default();
        let assignments = self.parse_list(false, |p| {
            let at = p.current_token.position;
            let name = p.expect_identifier()?;
            p.expect(TokenKind::Colon)?;
            let value = p.parse_literal()?;
            if !seen.insert(name.clone()) {
                return Err(duplicate("field", format!("{}.{}", var, name), at));
            }
            Ok(Term::field(name, value))
        })?;
        args.extend(assignments.into_iter().map(Node::Term));

        if self.scope.insert(var.clone(), FieldType::Object(object)).is_some() {
            return Err(duplicate("variable", var, position));
        }

        Ok(Expression::new(NEW_FUNCTOR, args))
    }

    /// A rule-body expression: an invocation or an operator chain
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        if self.at_invocation()? {
            return self.parse_invocation();
        }

        match self.parse_chain()?.into_node() {
            Node::Expression(expr) => Ok(expr),
            Node::Term(_) => Err(self.error(format!(
                "Expected operator, got {}",
                self.current_token
            ))),
        }
    }

    /// `functor(arg, ...)`
    fn parse_invocation(&mut self) -> Result<Expression, ParseError> {
        let functor = self.expect_identifier()?;
        self.expect(TokenKind::LeftParen)?;

        let mut args = Vec::new();
        if self.current_token.kind != TokenKind::RightParen {
            loop {
                args.push(self.parse_chain()?.into_node());

                if self.current_token.kind == TokenKind::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }

        self.expect(TokenKind::RightParen)?;

        Ok(Expression::new(functor, args))
    }

    /// `operand (operator operand)*`, merged by precedence
    fn parse_chain(&mut self) -> Result<Tree, ParseError> {
        let mut tree = Tree::Leaf(self.parse_operand()?);

        while self.current_token.kind.is_operator() {
            let (op, precedence) = self.parse_operator()?;
            let operand = self.parse_operand()?;
            tree = tree.merge(op, precedence, operand);
        }

        Ok(tree)
    }

    fn parse_operand(&mut self) -> Result<Node, ParseError> {
        match self.current_token.kind {
            TokenKind::LeftParen => {
                self.advance()?;
                let group = self.parse_chain()?;
                self.expect(TokenKind::RightParen)?;
                Ok(group.into_node())
            }
            kind if kind.is_literal() => Ok(Node::Term(self.parse_literal()?)),
            _ => Err(self.error(format!("Expected operand, got {}", self.current_token))),
        }
    }

    fn parse_operator(&mut self) -> Result<(TokenKind, u8), ParseError> {
        let token = self.advance()?;
        match token.kind.precedence() {
            Some(precedence) => Ok((token.kind, precedence)),
            None => Err(ParseError::Operator {
                operator: token.kind.as_str().to_string(),
                position: token.position,
            }),
        }
    }

    /// A single literal token, resolving identifiers against the scope
    fn parse_literal(&mut self) -> Result<Term, ParseError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier => Ok(match self.scope.get(&token.literal) {
                Some(ty) => Term::Variable {
                    ty: ty.clone(),
                    name: token.literal,
                },
                None => Term::Ident(token.literal),
            }),
            TokenKind::Int => token.literal.parse().map(Term::Int).map_err(|_| {
                syntax(format!("Invalid integer: {}", token.literal), token.position)
            }),
            TokenKind::Float => Ok(Term::Float(token.literal)),
            TokenKind::String => Ok(Term::String(token.literal)),
            _ => Err(syntax(format!("Expected literal, got {}", token), token.position)),
        }
    }

    /// `{ item (, item)* }`, optionally empty
    fn parse_list<T>(
        &mut self,
        allow_empty: bool,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect(TokenKind::LeftBrace)?;

        let mut items = Vec::new();
        if allow_empty && self.current_token.kind == TokenKind::RightBrace {
            self.advance()?;
            return Ok(items);
        }

        loop {
            items.push(item(self)?);

            match self.current_token.kind {
                TokenKind::Comma => {
                    self.advance()?;
                }
                TokenKind::RightBrace => {
                    self.advance()?;
                    return Ok(items);
                }
                _ => {
                    return Err(self.error(format!(
                        "Expected ',' or '}}', got {}",
                        self.current_token
                    )));
                }
            }
        }
    }

    /// Identifier directly followed by `(`
    fn at_invocation(&mut self) -> Result<bool, ParseError> {
        Ok(self.current_token.kind == TokenKind::Identifier
            && self.peek()?.kind == TokenKind::LeftParen)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        if self.current_token.kind == expected {
            self.advance()
        } else {
            Err(self.error(format!("Expected '{}', got {}", expected, self.current_token)))
        }
    }

    pub fn expect_end(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Eof).map(|_| ())
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current_token.kind {
            TokenKind::Identifier => Ok(self.advance()?.literal),
            _ => Err(self.error(format!("Expected identifier, got {}", self.current_token))),
        }
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => Self::next_significant(&mut self.lexer)?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Move to the next token, returning the one just consumed
    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => Self::next_significant(&mut self.lexer)?,
        };
        Ok(std::mem::replace(&mut self.current_token, next))
    }

    /// Comments never reach the grammar
    fn next_significant(lexer: &mut Lexer) -> Result<Token, ParseError> {
        loop {
            let token = lexer.next_token()?;
            if token.kind != TokenKind::Comment {
                return Ok(token);
            }
        }
    }

    fn error(&self, message: String) -> ParseError {
        syntax(message, self.current_token.position)
    }
}

fn syntax(message: String, position: Position) -> ParseError {
    ParseError::Syntax { message, position }
}

fn duplicate(kind: &'static str, name: String, position: Position) -> ParseError {
    ParseError::Duplicate {
        kind,
        name,
        position,
    }
}
