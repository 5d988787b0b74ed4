//! The parser registry: token rules grouped by syntactic class.
//!
//! The tree builder asks four [`ParserList`]s, one per class, whether the
//! unconsumed input starts with one of their tokens:
//!
//! - values: numeric literals, named constants, function calls, groups
//! - prefix operators
//! - postfix operators
//! - binary operators
//!
//! Within a list, rules are kept sorted by token length, longest first, so that
//! `<=` is tried before `<`. Structural rules without a fixed token (literals,
//! groups) come last.

use crate::error::{ExprError, Result};
use crate::lexer::{Cursor, scan_group};
use crate::types::{BinaryOp, Function, Node, UnaryOp};
use crate::{Real, String, ToString, Vec};
use alloc::format;
use alloc::rc::Rc;
use core::cmp::Ordering;

/// Callback into the tree builder used by rules that contain nested
/// expressions, such as function arguments and parenthesised groups.
pub trait SubParser {
    /// Parses `text` as a complete expression.
    fn parse_nested(&mut self, text: &str) -> Result<Node>;

    /// Records that the function `name` is called by the expression.
    fn note_function(&mut self, name: &str);
}

/// How a value rule may be removed through the engine API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Literals and groups.
    Structural,
    /// Named constants such as `pi`.
    Constant,
    /// Function calls.
    Function,
}

/// A rule producing a value node from the start of the input.
pub trait ValueRule {
    /// The token this rule matches, or `None` for pattern rules.
    fn token(&self) -> Option<&str>;

    fn kind(&self) -> ValueKind {
        ValueKind::Structural
    }

    /// Consumes the matched text and returns the node, or returns `Ok(None)`
    /// without touching `input` when the rule does not apply.
    fn parse(&self, input: &mut Cursor<'_>, parser: &mut dyn SubParser) -> Result<Option<Node>>;
}

/// Numeric literals such as `12`, `.75` or `1.5e-3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberRule;

impl ValueRule for NumberRule {
    fn token(&self) -> Option<&str> {
        None
    }

    fn parse(&self, input: &mut Cursor<'_>, _: &mut dyn SubParser) -> Result<Option<Node>> {
        Ok(input.number()?.map(Node::Constant))
    }
}

/// Parenthesised sub-expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupRule;

impl ValueRule for GroupRule {
    fn token(&self) -> Option<&str> {
        None
    }

    fn parse(&self, input: &mut Cursor<'_>, parser: &mut dyn SubParser) -> Result<Option<Node>> {
        let mut probe = *input;
        probe.skip_whitespace();
        if probe.peek() != Some('(') {
            return Ok(None);
        }
        let after = &probe.rest()[1..];
        let Some(group) = scan_group(after) else {
            return Err(ExprError::Syntax(format!(
                "Mismatched braces from '{}'",
                probe.rest()
            )));
        };
        let inner = &after[..group.consumed - 1];
        if inner.trim().is_empty() {
            return Err(ExprError::Syntax(
                "Empty braces - a value was expected".to_string(),
            ));
        }
        let node = parser.parse_nested(inner)?;
        probe.advance(1 + group.consumed);
        *input = probe;
        Ok(Some(node))
    }
}

/// A named constant such as `pi`.
#[derive(Debug, Clone)]
pub struct ConstantRule {
    pub name: String,
    pub value: Real,
}

impl ValueRule for ConstantRule {
    fn token(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Constant
    }

    fn parse(&self, input: &mut Cursor<'_>, _: &mut dyn SubParser) -> Result<Option<Node>> {
        if input.eat_word(&self.name) {
            Ok(Some(Node::Constant(self.value)))
        } else {
            Ok(None)
        }
    }
}

/// A call `name(arg, ...)` to a [`Function`].
#[derive(Debug, Clone)]
pub struct FunctionRule {
    pub function: Rc<Function>,
}

impl ValueRule for FunctionRule {
    fn token(&self) -> Option<&str> {
        Some(&self.function.name)
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Function
    }

    fn parse(&self, input: &mut Cursor<'_>, parser: &mut dyn SubParser) -> Result<Option<Node>> {
        let name = self.function.name.as_str();
        let mut probe = *input;
        if !probe.eat_call_open(name) {
            return Ok(None);
        }
        let Some(group) = scan_group(probe.rest()) else {
            return Err(ExprError::Syntax(format!(
                "Missing closing brace for function {}",
                name
            )));
        };
        let parts: &[&str] = match group.parts.as_slice() {
            [only] if only.trim().is_empty() => &[],
            parts => parts,
        };
        if parts.len() < self.function.min_args {
            return Err(ExprError::Syntax(format!(
                "Insufficient arguments for function {}",
                name
            )));
        }
        if self.function.max_args.is_some_and(|max| parts.len() > max) {
            return Err(ExprError::Syntax(format!(
                "Too many arguments for function {}",
                name
            )));
        }
        let mut args = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if part.trim().is_empty() {
                return Err(ExprError::Syntax(format!(
                    "Empty argument {} for function {}",
                    i + 1,
                    name
                )));
            }
            args.push(parser.parse_nested(part)?);
        }
        probe.advance(group.consumed);
        *input = probe;
        parser.note_function(name);
        Ok(Some(Node::Call {
            function: self.function.clone(),
            args,
        }))
    }
}

/// A registrable rule of any class.
#[derive(Clone)]
pub enum Rule {
    Value(Rc<dyn ValueRule>),
    Prefix(Rc<UnaryOp>),
    Postfix(Rc<UnaryOp>),
    Binary(Rc<BinaryOp>),
}

impl Rule {
    pub fn token(&self) -> Option<&str> {
        match self {
            Rule::Value(rule) => rule.token(),
            Rule::Prefix(op) | Rule::Postfix(op) => Some(&op.token),
            Rule::Binary(op) => Some(&op.token),
        }
    }

    pub fn constant(name: &str, value: Real) -> Self {
        Rule::Value(Rc::new(ConstantRule {
            name: name.to_string(),
            value,
        }))
    }

    pub fn function(function: Function) -> Self {
        Rule::Value(Rc::new(FunctionRule {
            function: Rc::new(function),
        }))
    }

    pub fn prefix(op: UnaryOp) -> Self {
        Rule::Prefix(Rc::new(op))
    }

    pub fn postfix(op: UnaryOp) -> Self {
        Rule::Postfix(Rc::new(op))
    }

    pub fn binary(op: BinaryOp) -> Self {
        Rule::Binary(Rc::new(op))
    }
}

/// A named, ordered set of rules registered and removed as a unit.
pub trait Library {
    fn name(&self) -> &'static str;
    fn rules(&self) -> Vec<Rule>;
}

/// Access to the token of a registry entry.
pub trait Tokened {
    fn token(&self) -> Option<&str>;
}

impl Tokened for Rc<dyn ValueRule> {
    fn token(&self) -> Option<&str> {
        ValueRule::token(self.as_ref())
    }
}

impl Tokened for Rc<UnaryOp> {
    fn token(&self) -> Option<&str> {
        Some(&self.token)
    }
}

impl Tokened for Rc<BinaryOp> {
    fn token(&self) -> Option<&str> {
        Some(&self.token)
    }
}

#[derive(Clone)]
struct Entry<T> {
    rule: T,
    library: Option<&'static str>,
}

/// Rules of one class, longest token first.
#[derive(Clone)]
pub struct ParserList<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for ParserList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

fn by_token_length(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.len().cmp(&a.len()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<T: Tokened> ParserList<T> {
    /// Adds `rule`, replacing any rule with the same token.
    pub fn insert(&mut self, rule: T, library: Option<&'static str>) {
        if let Some(token) = rule.token() {
            self.entries.retain(|e| e.rule.token() != Some(token));
        }
        self.entries.push(Entry { rule, library });
        // stable, so equal lengths keep registration order
        self.entries
            .sort_by(|a, b| by_token_length(a.rule.token(), b.rule.token()));
    }

    /// Removes every rule for which `pred` holds and returns how many were removed.
    fn remove_where(&mut self, mut pred: impl FnMut(&Entry<T>) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(e));
        before - self.entries.len()
    }

    pub fn remove_token(&mut self, token: &str) -> usize {
        self.remove_where(|e| e.rule.token() == Some(token))
    }

    pub fn remove_library(&mut self, library: &str) -> usize {
        self.remove_where(|e| e.library == Some(library))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.rule)
    }

    pub fn tokens(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().map(|e| e.rule.token())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ParserList<Rc<dyn ValueRule>> {
    fn remove_kind(&mut self, token: &str, kind: ValueKind) -> usize {
        self.remove_where(|e| e.rule.token() == Some(token) && e.rule.kind() == kind)
    }
}

/// All rules known to one engine.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    values: ParserList<Rc<dyn ValueRule>>,
    prefix: ParserList<Rc<UnaryOp>>,
    postfix: ParserList<Rc<UnaryOp>>,
    binary: ParserList<Rc<BinaryOp>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user rule.
    pub fn add(&mut self, rule: Rule) {
        self.insert(rule, None);
    }

    fn insert(&mut self, rule: Rule, library: Option<&'static str>) {
        log::trace!("registering rule {:?} from {:?}", rule.token(), library);
        match rule {
            Rule::Value(r) => self.values.insert(r, library),
            Rule::Prefix(op) => self.prefix.insert(op, library),
            Rule::Postfix(op) => self.postfix.insert(op, library),
            Rule::Binary(op) => self.binary.insert(op, library),
        }
    }

    pub fn add_library(&mut self, library: &dyn Library) {
        for rule in library.rules() {
            self.insert(rule, Some(library.name()));
        }
    }

    /// Removes the rules `library` registered. Rules that replaced them under
    /// the same token stay.
    pub fn remove_library(&mut self, library: &dyn Library) -> usize {
        let name = library.name();
        let removed = self.values.remove_library(name)
            + self.prefix.remove_library(name)
            + self.postfix.remove_library(name)
            + self.binary.remove_library(name);
        log::trace!("removed {} rules of library {}", removed, name);
        removed
    }

    /// Removes rules with `token` from every class.
    pub fn remove_token(&mut self, token: &str) -> usize {
        self.values.remove_token(token)
            + self.prefix.remove_token(token)
            + self.postfix.remove_token(token)
            + self.binary.remove_token(token)
    }

    /// Removes value rules (functions and constants) with `token`.
    pub fn remove_value(&mut self, token: &str) -> usize {
        self.values.remove_token(token)
    }

    /// Removes only named constants with `token`.
    pub fn remove_constant(&mut self, token: &str) -> usize {
        self.values.remove_kind(token, ValueKind::Constant)
    }

    pub fn values(&self) -> &ParserList<Rc<dyn ValueRule>> {
        &self.values
    }

    pub fn prefix(&self) -> &ParserList<Rc<UnaryOp>> {
        &self.prefix
    }

    pub fn postfix(&self) -> &ParserList<Rc<UnaryOp>> {
        &self.postfix
    }

    pub fn binary(&self) -> &ParserList<Rc<BinaryOp>> {
        &self.binary
    }
}
