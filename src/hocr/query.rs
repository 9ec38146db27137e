//! A small XPath subset for selecting nodes of an hOCR [`Document`].
//!
//! Supported:
//!
//! - absolute paths built from `/` (child) and `//` (descendant) steps,
//!   combined with `|`
//! - node tests: element names, `*` and `text()`
//! - predicates with `and`, `or`, `not(..)`, parentheses, `@attr`,
//!   `@attr='value'`, `@attr!='value'`, `contains(@attr, 'value')` and
//!   relative child paths used as existence tests (`*`, `span[@class='x']`)
//!
//! Anything else is rejected with a [`QueryError`].

use crate::error::QueryError;
use crate::hocr::document::{Document, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Pipe,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Eq,
    NotEq,
    Comma,
    Star,
    Name(String),
    Literal(String),
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn tokenize(query: &str) -> Result<Vec<(usize, Token)>, QueryError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = query.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' => {
                if matches!(chars.get(i + 1), Some((_, '/'))) {
                    i += 1;
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '|' => Token::Pipe,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '@' => Token::At,
            '=' => Token::Eq,
            ',' => Token::Comma,
            '*' => Token::Star,
            '!' => {
                if matches!(chars.get(i + 1), Some((_, '='))) {
                    i += 1;
                    Token::NotEq
                } else {
                    return Err(QueryError::new(query, pos, "expected '=' after '!'"));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some((_, ch)) if *ch == quote => break,
                        Some((_, ch)) => value.push(*ch),
                        None => return Err(QueryError::new(query, pos, "unterminated string literal")),
                    }
                    i += 1;
                }
                Token::Literal(value)
            }
            c if is_name_char(c) => {
                let mut name = String::new();
                while let Some((_, ch)) = chars.get(i) {
                    if !is_name_char(*ch) {
                        break;
                    }
                    name.push(*ch);
                    i += 1;
                }
                tokens.push((pos, Token::Name(name)));
                continue;
            }
            other => {
                return Err(QueryError::new(
                    query,
                    pos,
                    format!("unexpected character '{}'", other),
                ))
            }
        };
        tokens.push((pos, token));
        i += 1;
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    AnyElement,
    Element(String),
    Text,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    HasAttr(String),
    AttrEq(String, String),
    AttrNotEq(String, String),
    Contains(String, String),
    /// Relative child path, true when it selects at least one node.
    Exists(Vec<Step>),
}

/// A parsed query. Parse once, evaluate against any number of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    branches: Vec<Vec<Step>>,
}

struct Parser<'q> {
    query: &'q str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl<'q> Parser<'q> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(p, _)| *p)
            .unwrap_or(self.query.len())
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::new(self.query, self.offset(), message)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), QueryError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", expected)))
        }
    }

    fn parse_union(&mut self) -> Result<Vec<Vec<Step>>, QueryError> {
        let mut branches = vec![self.parse_absolute_path()?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            branches.push(self.parse_absolute_path()?);
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(branches)
    }

    fn parse_absolute_path(&mut self) -> Result<Vec<Step>, QueryError> {
        let mut steps = Vec::new();
        loop {
            let axis = match self.peek() {
                Some(Token::Slash) => Axis::Child,
                Some(Token::DoubleSlash) => Axis::Descendant,
                _ if steps.is_empty() => return Err(self.error("query must start with '/' or '//'")),
                _ => break,
            };
            self.pos += 1;
            steps.push(self.parse_step(axis)?);
        }
        Ok(steps)
    }

    fn parse_relative_path(&mut self) -> Result<Vec<Step>, QueryError> {
        let mut steps = vec![self.parse_step(Axis::Child)?];
        loop {
            let axis = match self.peek() {
                Some(Token::Slash) => Axis::Child,
                Some(Token::DoubleSlash) => Axis::Descendant,
                _ => break,
            };
            self.pos += 1;
            steps.push(self.parse_step(axis)?);
        }
        Ok(steps)
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, QueryError> {
        let test = match self.next() {
            Some(Token::Star) => NodeTest::AnyElement,
            Some(Token::Name(name)) if name == "text" && self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                self.expect(Token::RParen)?;
                NodeTest::Text
            }
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos -= 1;
                    return Err(self.error(format!("unsupported node test '{}()'", name)));
                }
                if name.starts_with(|c: char| c.is_ascii_digit()) {
                    self.pos -= 1;
                    return Err(self.error("positional predicates are not supported"));
                }
                NodeTest::Element(name)
            }
            _ => {
                self.pos -= 1;
                return Err(self.error("expected a node test"));
            }
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Name(n)) if n == "or") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut lhs = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::Name(n)) if n == "and") {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, QueryError> {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::LParen), _) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            (Some(Token::Name(n)), Some(Token::LParen)) if n == "not" => {
                self.pos += 2;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Not(Box::new(inner)))
            }
            (Some(Token::Name(n)), Some(Token::LParen)) if n == "contains" => {
                self.pos += 2;
                self.expect(Token::At)?;
                let attr = self.parse_name()?;
                self.expect(Token::Comma)?;
                let needle = self.parse_literal()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Contains(attr, needle))
            }
            (Some(Token::At), _) => {
                self.pos += 1;
                let attr = self.parse_name()?;
                match self.peek() {
                    Some(Token::Eq) => {
                        self.pos += 1;
                        Ok(Expr::AttrEq(attr, self.parse_literal()?))
                    }
                    Some(Token::NotEq) => {
                        self.pos += 1;
                        Ok(Expr::AttrNotEq(attr, self.parse_literal()?))
                    }
                    _ => Ok(Expr::HasAttr(attr)),
                }
            }
            (Some(Token::Star), _) | (Some(Token::Name(_)), _) => {
                Ok(Expr::Exists(self.parse_relative_path()?))
            }
            _ => Err(self.error("expected a predicate expression")),
        }
    }

    fn parse_name(&mut self) -> Result<String, QueryError> {
        match self.next() {
            Some(Token::Name(name)) => Ok(name),
            _ => {
                self.pos -= 1;
                Err(self.error("expected a name"))
            }
        }
    }

    fn parse_literal(&mut self) -> Result<String, QueryError> {
        match self.next() {
            Some(Token::Literal(value)) => Ok(value),
            _ => {
                self.pos -= 1;
                Err(self.error("expected a quoted string"))
            }
        }
    }
}

impl Query {
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(query)?;
        if tokens.is_empty() {
            return Err(QueryError::new(query, 0, "empty query"));
        }
        let mut parser = Parser {
            query,
            tokens,
            pos: 0,
        };
        let branches = parser.parse_union()?;
        Ok(Self {
            source: query.to_string(),
            branches,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Nodes selected by this query, deduplicated, in document order.
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        let order = doc.document_order();
        let mut result = Vec::new();
        for branch in &self.branches {
            result.extend(eval_steps(doc, &order, vec![doc.root()], branch));
        }
        sort_document_order(&order, &mut result);
        result
    }
}

fn sort_document_order(order: &[usize], nodes: &mut Vec<NodeId>) {
    nodes.sort_by_key(|id| order[id.index()]);
    nodes.dedup();
}

fn eval_steps(doc: &Document, order: &[usize], context: Vec<NodeId>, steps: &[Step]) -> Vec<NodeId> {
    let mut current = context;
    for step in steps {
        let mut next = Vec::new();
        for node in &current {
            match step.axis {
                Axis::Child => {
                    next.extend(doc.children(*node).iter().copied().filter(|c| step.matches(doc, order, *c)))
                }
                Axis::Descendant => {
                    next.extend(doc.descendants(*node).filter(|c| step.matches(doc, order, *c)))
                }
            }
        }
        sort_document_order(order, &mut next);
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

impl Step {
    fn matches(&self, doc: &Document, order: &[usize], id: NodeId) -> bool {
        let test = match (&self.test, doc.kind(id)) {
            (NodeTest::AnyElement, NodeKind::Element(_)) => true,
            (NodeTest::Element(name), NodeKind::Element(e)) => e.name == *name,
            (NodeTest::Text, NodeKind::Text(_)) | (NodeTest::Text, NodeKind::CData(_)) => true,
            _ => false,
        };
        test && self.predicates.iter().all(|p| p.eval(doc, order, id))
    }
}

impl Expr {
    fn eval(&self, doc: &Document, order: &[usize], id: NodeId) -> bool {
        match self {
            Expr::Or(a, b) => a.eval(doc, order, id) || b.eval(doc, order, id),
            Expr::And(a, b) => a.eval(doc, order, id) && b.eval(doc, order, id),
            Expr::Not(inner) => !inner.eval(doc, order, id),
            Expr::HasAttr(name) => doc.attribute(id, name).is_some(),
            Expr::AttrEq(name, value) => doc.attribute(id, name) == Some(value.as_str()),
            Expr::AttrNotEq(name, value) => doc
                .attribute(id, name)
                .map(|v| v != value)
                .unwrap_or(false),
            Expr::Contains(name, needle) => doc
                .attribute(id, name)
                .map(|v| v.contains(needle.as_str()))
                .unwrap_or(false),
            Expr::Exists(steps) => !eval_steps(doc, order, vec![id], steps).is_empty(),
        }
    }
}
