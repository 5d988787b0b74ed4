//! Precedence-climbing tree builder.
//!
//! The builder cycles through four states until the input is exhausted:
//!
//! 1. PREFIX: any number of prefix operators, each waiting for its operand.
//! 2. VALUE: exactly one value (literal, constant, call, group or variable).
//! 3. POSTFIX: postfix operators wrapping the value just read.
//! 4. OPERATOR: one binary operator, or an implicit multiplication.
//!
//! Partial trees live in a scratch arena of nodes linked to their parents by
//! index. A binary operator climbs from the last value through every ancestor
//! whose precedence is at least its own and is spliced in above the ancestor
//! it stops at. The finished arena is converted into an owned [`Node`] tree and
//! folded once.

use crate::config::ParseFlags;
use crate::context::{Slot, ValueTable};
use crate::error::{ExprError, Result};
use crate::eval::fold;
use crate::lexer::Cursor;
use crate::registry::{ParserRegistry, SubParser};
use crate::types::{BinaryOp, Fixity, Node, Precedence, UnaryOp};
use crate::{Box, Real, String, ToString};
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::rc::Rc;
use bumpalo::Bump;

/// Groups and calls may nest this deep before parsing fails.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Longest expression text accepted, in bytes.
pub const MAX_EXPRESSION_LENGTH: usize = 100_000;

/// Most operators one statement may contain, implicit multiplications
/// included. Together with [`MAX_NESTING_DEPTH`] this bounds the depth of
/// every tree, which is built, folded, evaluated and dropped recursively.
pub const MAX_OPERATORS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prefix,
    Value,
    Postfix,
    Operator,
}

enum Pending {
    Value(Node),
    Prefix {
        op: Rc<UnaryOp>,
        operand: Option<usize>,
    },
    Postfix {
        op: Rc<UnaryOp>,
        operand: usize,
    },
    Binary {
        op: Rc<BinaryOp>,
        left: usize,
        right: Option<usize>,
    },
}

struct ArenaNode {
    pending: Option<Pending>,
    parent: Option<usize>,
}

/// A tree under construction.
struct Assembly<'s> {
    nodes: bumpalo::collections::Vec<'s, ArenaNode>,
    root: Option<usize>,
    last_value: Option<usize>,
    /// Operator still waiting for its right-hand operand.
    last_operator: Option<usize>,
}

impl<'s> Assembly<'s> {
    fn new(scratch: &'s Bump) -> Self {
        Self {
            nodes: bumpalo::collections::Vec::new_in(scratch),
            root: None,
            last_value: None,
            last_operator: None,
        }
    }

    fn push(&mut self, pending: Pending, parent: Option<usize>) -> usize {
        self.nodes.push(ArenaNode {
            pending: Some(pending),
            parent,
        });
        self.nodes.len() - 1
    }

    fn precedence(&self, idx: usize) -> Option<Precedence> {
        match self.nodes[idx].pending.as_ref()? {
            Pending::Value(_) => None,
            Pending::Prefix { .. } => Some(Precedence::Prefix),
            Pending::Postfix { .. } => Some(Precedence::Postfix),
            Pending::Binary { op, .. } => Some(op.precedence),
        }
    }

    fn token(&self, idx: usize) -> &str {
        match self.nodes[idx].pending.as_ref() {
            Some(Pending::Prefix { op, .. }) | Some(Pending::Postfix { op, .. }) => &op.token,
            Some(Pending::Binary { op, .. }) => &op.token,
            _ => "",
        }
    }

    /// Gives the waiting operator `parent` its operand.
    fn fill(&mut self, parent: usize, child: usize) {
        match self.nodes[parent].pending.as_mut() {
            Some(Pending::Prefix { operand, .. }) => *operand = Some(child),
            Some(Pending::Binary { right, .. }) => *right = Some(child),
            _ => {}
        }
        self.nodes[child].parent = Some(parent);
    }

    /// Points `parent` at `new` wherever it pointed at `old`.
    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        match self.nodes[parent].pending.as_mut() {
            Some(Pending::Prefix { operand, .. }) if *operand == Some(old) => *operand = Some(new),
            Some(Pending::Postfix { operand, .. }) if *operand == old => *operand = new,
            Some(Pending::Binary { left, .. }) if *left == old => *left = new,
            Some(Pending::Binary { right, .. }) if *right == Some(old) => *right = Some(new),
            _ => {}
        }
    }

    /// Inserts `pending` as the parent of `child`, taking over `child`'s place.
    fn wrap(&mut self, child: usize, pending: Pending) -> usize {
        let parent = self.nodes[child].parent;
        let idx = self.push(pending, parent);
        self.nodes[child].parent = Some(idx);
        match parent {
            Some(p) => self.replace_child(p, child, idx),
            None => self.root = Some(idx),
        }
        idx
    }

    fn attach_value(&mut self, node: Node) {
        let idx = self.push(Pending::Value(node), None);
        match self.last_operator.take() {
            Some(op) => self.fill(op, idx),
            None => {
                if self.root.is_none() {
                    self.root = Some(idx);
                }
            }
        }
        self.last_value = Some(idx);
    }

    fn attach_prefix(&mut self, op: Rc<UnaryOp>) {
        let idx = self.push(Pending::Prefix { op, operand: None }, None);
        match self.last_operator {
            Some(parent) => self.fill(parent, idx),
            None => self.root = Some(idx),
        }
        self.last_operator = Some(idx);
    }

    fn attach_postfix(&mut self, op: Rc<UnaryOp>, value: usize) {
        let idx = self.wrap(value, Pending::Postfix { op, operand: value });
        self.last_value = Some(idx);
    }

    fn attach_binary(&mut self, op: Rc<BinaryOp>, value: usize) {
        let mut lvalue = value;
        while let Some(parent) = self.nodes[lvalue].parent {
            if !self.precedence(parent).is_some_and(|p| p >= op.precedence) {
                break;
            }
            lvalue = parent;
        }
        let idx = self.wrap(
            lvalue,
            Pending::Binary {
                op,
                left: lvalue,
                right: None,
            },
        );
        self.last_operator = Some(idx);
        self.last_value = None;
    }

    /// Moves the subtree at `idx` out of the arena.
    fn build(&mut self, idx: usize) -> Result<Node> {
        let incomplete = || ExprError::Syntax("Incomplete expression".to_string());
        let pending = self.nodes[idx].pending.take().ok_or_else(incomplete)?;
        Ok(match pending {
            Pending::Value(node) => node,
            Pending::Prefix { op, operand } => Node::Unary {
                op,
                fixity: Fixity::Prefix,
                operand: Box::new(self.build(operand.ok_or_else(incomplete)?)?),
            },
            Pending::Postfix { op, operand } => Node::Unary {
                op,
                fixity: Fixity::Postfix,
                operand: Box::new(self.build(operand)?),
            },
            Pending::Binary { op, left, right } => Node::Binary {
                op,
                left: Box::new(self.build(left)?),
                right: Box::new(self.build(right.ok_or_else(incomplete)?)?),
            },
        })
    }
}

/// What a parsed expression refers to.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    /// Every variable slot read.
    pub used: BTreeSet<Slot>,
    /// Names read whose slot has not been declared.
    pub undeclared: BTreeSet<String>,
    /// Functions called.
    pub functions: BTreeSet<String>,
}

/// Builds folded trees from expression text.
///
/// Unknown identifiers are allocated in the value table as they are met, so a
/// builder borrows the table mutably for its lifetime.
pub struct TreeBuilder<'a> {
    registry: &'a ParserRegistry,
    table: &'a mut ValueTable,
    scratch: &'a Bump,
    implicit_multiply: &'a Rc<BinaryOp>,
    flags: ParseFlags,
    depth: usize,
    operators: usize,
    usage: Usage,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        registry: &'a ParserRegistry,
        table: &'a mut ValueTable,
        scratch: &'a Bump,
        implicit_multiply: &'a Rc<BinaryOp>,
        flags: ParseFlags,
    ) -> Self {
        Self {
            registry,
            table,
            scratch,
            implicit_multiply,
            flags,
            depth: 0,
            operators: 0,
            usage: Usage::default(),
        }
    }

    /// Parses `text` into a folded tree.
    ///
    /// Empty text yields a NaN constant.
    pub fn parse(&mut self, text: &str) -> Result<Node> {
        if text.len() > MAX_EXPRESSION_LENGTH {
            return Err(ExprError::Syntax(format!(
                "Expression too long: {} characters (maximum is {})",
                text.len(),
                MAX_EXPRESSION_LENGTH
            )));
        }
        let tree = self.assemble(text)?;
        Ok(fold(tree, self.flags))
    }

    /// Variables and functions referenced by everything parsed so far.
    pub fn into_usage(self) -> Usage {
        self.usage
    }

    fn assemble(&mut self, text: &str) -> Result<Node> {
        let mut input = Cursor::new(text);
        if input.is_empty() {
            return Ok(Node::Constant(Real::NAN));
        }
        let mut tree = Assembly::new(self.scratch);
        let mut state = State::Prefix;
        while !input.is_empty() {
            state = match state {
                State::Prefix => {
                    if self.read_prefix(&mut input, &mut tree)? {
                        State::Prefix
                    } else {
                        State::Value
                    }
                }
                State::Value => {
                    if !self.read_value(&mut input, &mut tree)? {
                        return Err(ExprError::Syntax(format!(
                            "Expected a value or expression at '{}'",
                            input.rest()
                        )));
                    }
                    State::Postfix
                }
                State::Postfix => {
                    if self.read_postfix(&mut input, &mut tree)?
                        && self.flags.contains(ParseFlags::MULTIPLE_POSTFIX)
                    {
                        State::Postfix
                    } else {
                        State::Operator
                    }
                }
                State::Operator => {
                    self.read_operator(&mut input, &mut tree)?;
                    State::Prefix
                }
            };
        }
        if let Some(op) = tree.last_operator {
            return Err(ExprError::Syntax(format!(
                "Expected a value after {}",
                tree.token(op)
            )));
        }
        let Some(root) = tree.root else {
            return Err(ExprError::EmptyExpression {
                expression: text.trim().to_string(),
            });
        };
        tree.build(root)
    }

    fn count_operator(&mut self) -> Result<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(ExprError::Syntax(format!(
                "Expression has more than {} operators",
                MAX_OPERATORS
            )));
        }
        Ok(())
    }

    fn read_prefix(&mut self, input: &mut Cursor<'_>, tree: &mut Assembly<'_>) -> Result<bool> {
        let registry = self.registry;
        match registry.prefix().iter().find(|op| input.eat_operator(&op.token)) {
            Some(op) => {
                self.count_operator()?;
                tree.attach_prefix(op.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn read_value(&mut self, input: &mut Cursor<'_>, tree: &mut Assembly<'_>) -> Result<bool> {
        let registry = self.registry;
        for rule in registry.values().iter() {
            if let Some(node) = rule.parse(input, self)? {
                tree.attach_value(node);
                return Ok(true);
            }
        }

        let Some((lead, name)) = input.identifier() else {
            return Ok(false);
        };
        if input.rest()[lead + name.len()..].starts_with('(') {
            return Err(ExprError::UnknownMethod {
                remaining: input.rest()[lead..].to_string(),
            });
        }
        input.advance(lead + name.len());
        let slot = self.table.slot_or_insert(name);
        self.usage.used.insert(slot);
        if !self.table.is_declared(slot) {
            self.usage.undeclared.insert(name.to_string());
        }
        tree.attach_value(Node::Variable(slot));
        Ok(true)
    }

    fn read_postfix(&mut self, input: &mut Cursor<'_>, tree: &mut Assembly<'_>) -> Result<bool> {
        let Some(value) = tree.last_value else {
            return Ok(false);
        };
        let registry = self.registry;
        for op in registry.postfix().iter() {
            // `!` must not steal the start of a binary `!=`
            if self.binary_shadows(input, &op.token) {
                continue;
            }
            if input.eat_operator(&op.token) {
                self.count_operator()?;
                tree.attach_postfix(op.clone(), value);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True when a binary operator longer than `token` matches here.
    fn binary_shadows(&self, input: &Cursor<'_>, token: &str) -> bool {
        let rest = input.rest().trim_start();
        rest.starts_with(token)
            && self
                .registry
                .binary()
                .iter()
                .any(|op| op.token.len() > token.len() && rest.starts_with(op.token.as_str()))
    }

    fn read_operator(&mut self, input: &mut Cursor<'_>, tree: &mut Assembly<'_>) -> Result<()> {
        let registry = self.registry;
        let op = match registry.binary().iter().find(|op| input.eat_operator(&op.token)) {
            Some(op) => op.clone(),
            None if self.flags.contains(ParseFlags::IMPLICIT_MULTIPLICATION) => {
                input.skip_whitespace();
                self.implicit_multiply.clone()
            }
            None => {
                return Err(ExprError::OperatorExpected {
                    remaining: input.rest().to_string(),
                });
            }
        };
        let Some(value) = tree.last_value else {
            return Err(ExprError::Syntax(format!(
                "Expected a value before {}",
                op.token
            )));
        };
        self.count_operator()?;
        tree.attach_binary(op, value);
        Ok(())
    }
}

impl SubParser for TreeBuilder<'_> {
    fn parse_nested(&mut self, text: &str) -> Result<Node> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ExprError::Syntax(format!(
                "Expression nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        let result = self.assemble(text);
        self.depth -= 1;
        result
    }

    fn note_function(&mut self, name: &str) {
        self.usage.functions.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Core, multiply};
    use alloc::string::String;

    fn dump(text: &str, flags: ParseFlags) -> Result<String> {
        let mut registry = ParserRegistry::new();
        registry.add_library(&Core);
        let mut table = ValueTable::new();
        let scratch = Bump::new();
        let mul = Rc::new(multiply());
        let mut builder = TreeBuilder::new(&registry, &mut table, &scratch, &mul, flags);
        Ok(format!("{}", builder.parse(text)?))
    }

    #[test]
    fn test_climbing_respects_precedence() {
        assert_eq!(
            dump("a + b * c", ParseFlags::default()).unwrap(),
            "Binary +\n  Variable[0]\n  Binary *\n    Variable[1]\n    Variable[2]\n"
        );
        assert_eq!(
            dump("a - b - c", ParseFlags::default()).unwrap(),
            "Binary -\n  Binary -\n    Variable[0]\n    Variable[1]\n  Variable[2]\n"
        );
    }

    #[test]
    fn test_prefix_binds_tighter_than_power() {
        assert_eq!(
            dump("-a ^ b", ParseFlags::default()).unwrap(),
            "Binary ^\n  Prefix -\n    Variable[0]\n  Variable[1]\n"
        );
    }

    #[test]
    fn test_usage_collects_undeclared_names() {
        let mut registry = ParserRegistry::new();
        registry.add_library(&Core);
        let mut table = ValueTable::new();
        let a = table.declare("a").unwrap();
        let scratch = Bump::new();
        let mul = Rc::new(multiply());
        let mut builder =
            TreeBuilder::new(&registry, &mut table, &scratch, &mul, ParseFlags::default());
        builder.parse("a * (b + c)").unwrap();
        let usage = builder.into_usage();
        assert!(usage.used.contains(&a));
        assert_eq!(usage.used.len(), 3);
        assert_eq!(
            usage.undeclared.iter().map(String::as_str).collect::<alloc::vec::Vec<_>>(),
            ["b", "c"]
        );
    }

    #[test]
    fn test_empty_nested_text_is_nan() {
        assert_eq!(
            dump("", ParseFlags::default()).unwrap(),
            "Constant = NaN\n"
        );
    }

    #[test]
    fn test_too_long() {
        let text = "1+".repeat(MAX_EXPRESSION_LENGTH);
        assert!(dump(&text, ParseFlags::default()).is_err());
    }
}
