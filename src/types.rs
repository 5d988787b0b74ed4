//! Type definitions for compiled expression trees.
//!
//! A parsed statement is a [`Node`] tree. Leaves are constants and variable
//! slots; interior nodes apply an operator or a function. Operators and
//! functions are shared through `Rc`, so a tree keeps the definitions that were
//! registered when it was parsed even if the registry changes afterwards.

use crate::context::Slot;
use crate::{Box, Real, String, ToString, Vec};
use alloc::rc::Rc;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Binding strength of operators, weakest first.
///
/// The order is total. When a binary operator is read, the builder climbs past
/// every ancestor whose precedence is greater than or equal to the new one,
/// which makes all binary operators left-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precedence {
    Assignment,
    Conditional,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Power,
    Prefix,
    Postfix,
}

/// Algebraic identities a binary operator may apply when only one side is
/// constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Simplify {
    #[default]
    None,
    /// `0+x` and `x+0` become `x`.
    Add,
    /// `x-0` becomes `x`.
    Subtract,
    /// `x*1` and `1*x` become `x`; `x*0` and `0*x` become `0`.
    Multiply,
    /// `x/1` becomes `x`; `0/x` becomes `0`.
    Divide,
    /// `x^1` becomes `x`; `x^0` becomes `1`.
    Power,
    /// `0 mod x` becomes `0`.
    Modulo,
}

/// Where a unary operator is written relative to its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Postfix,
}

/// A unary operator such as `-x` or `x!`.
pub struct UnaryOp {
    pub token: String,
    pub apply: Rc<dyn Fn(Real) -> Real>,
    /// The operator returns its operand unchanged and is removed when folding.
    pub transparent: bool,
}

impl UnaryOp {
    pub fn new<F>(token: &str, apply: F) -> Self
    where
        F: Fn(Real) -> Real + 'static,
    {
        Self {
            token: token.to_string(),
            apply: Rc::new(apply),
            transparent: false,
        }
    }

    /// Marks the operator as an identity, like unary plus.
    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }
}

impl fmt::Debug for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryOp")
            .field("token", &self.token)
            .field("transparent", &self.transparent)
            .finish()
    }
}

/// A binary infix operator.
pub struct BinaryOp {
    pub token: String,
    pub precedence: Precedence,
    pub apply: Rc<dyn Fn(Real, Real) -> Real>,
    pub simplify: Simplify,
}

impl BinaryOp {
    pub fn new<F>(token: &str, precedence: Precedence, apply: F) -> Self
    where
        F: Fn(Real, Real) -> Real + 'static,
    {
        Self {
            token: token.to_string(),
            precedence,
            apply: Rc::new(apply),
            simplify: Simplify::None,
        }
    }

    pub fn with_simplify(mut self, simplify: Simplify) -> Self {
        self.simplify = simplify;
        self
    }
}

impl fmt::Debug for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOp")
            .field("token", &self.token)
            .field("precedence", &self.precedence)
            .field("simplify", &self.simplify)
            .finish()
    }
}

/// A function callable as `name(arg, ...)`.
///
/// The callback receives exactly the evaluated arguments written at the call
/// site, so a function declared with a range of arities sees a slice whose
/// length varies between `min_args` and `max_args`.
///
/// # Examples
///
/// ```
/// use exp_fold::types::Function;
///
/// let hypot = Function::new("hypot", 2, |args| (args[0] * args[0] + args[1] * args[1]).sqrt());
/// assert_eq!(hypot.call(&[3.0, 4.0]), 5.0);
///
/// let sum = Function::variadic("sum", 1, |args| args.iter().sum());
/// assert_eq!(sum.max_args, None);
/// ```
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub min_args: usize,
    /// `None` accepts any number of arguments from `min_args` upward.
    pub max_args: Option<usize>,
    /// Pure functions with constant arguments are evaluated while folding.
    pub pure: bool,
    pub callback: Rc<dyn Fn(&[Real]) -> Real>,
}

impl Function {
    /// A pure function taking exactly `arity` arguments.
    pub fn new<F>(name: &str, arity: usize, callback: F) -> Self
    where
        F: Fn(&[Real]) -> Real + 'static,
    {
        Self::with_range(name, arity, arity, callback)
    }

    /// A pure function taking between `min` and `max` arguments.
    pub fn with_range<F>(name: &str, min: usize, max: usize, callback: F) -> Self
    where
        F: Fn(&[Real]) -> Real + 'static,
    {
        Self {
            name: name.to_string(),
            min_args: min,
            max_args: Some(max.max(min)),
            pure: true,
            callback: Rc::new(callback),
        }
    }

    /// A pure function taking `min` or more arguments.
    pub fn variadic<F>(name: &str, min: usize, callback: F) -> Self
    where
        F: Fn(&[Real]) -> Real + 'static,
    {
        Self {
            name: name.to_string(),
            min_args: min,
            max_args: None,
            pure: true,
            callback: Rc::new(callback),
        }
    }

    /// Marks the function as impure so calls to it are never folded.
    pub fn impure(mut self) -> Self {
        self.pure = false;
        self
    }

    pub fn call(&self, args: &[Real]) -> Real {
        (self.callback)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("pure", &self.pure)
            .finish()
    }
}

/// A node of a compiled expression tree.
#[derive(Debug, Clone)]
pub enum Node {
    Constant(Real),
    /// Reads the value table at the given slot.
    Variable(Slot),
    Unary {
        op: Rc<UnaryOp>,
        fixity: Fixity,
        operand: Box<Node>,
    },
    Binary {
        op: Rc<BinaryOp>,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call {
        function: Rc<Function>,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn as_constant(&self) -> Option<Real> {
        match self {
            Node::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// Precedence of an operator node; `None` for values.
    pub fn precedence(&self) -> Option<Precedence> {
        match self {
            Node::Unary { fixity: Fixity::Prefix, .. } => Some(Precedence::Prefix),
            Node::Unary { fixity: Fixity::Postfix, .. } => Some(Precedence::Postfix),
            Node::Binary { op, .. } => Some(op.precedence),
            _ => None,
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Node::Constant(_) | Node::Variable(_) => 1,
            Node::Unary { operand, .. } => 1 + operand.node_count(),
            Node::Binary { left, right, .. } => 1 + left.node_count() + right.node_count(),
            Node::Call { args, .. } => 1 + args.iter().map(Node::node_count).sum::<usize>(),
        }
    }

    /// Appends every variable slot this tree reads to `out`.
    pub fn collect_slots(&self, out: &mut Vec<Slot>) {
        match self {
            Node::Constant(_) => {}
            Node::Variable(slot) => out.push(*slot),
            Node::Unary { operand, .. } => operand.collect_slots(out),
            Node::Binary { left, right, .. } => {
                left.collect_slots(out);
                right.collect_slots(out);
            }
            Node::Call { args, .. } => args.iter().for_each(|a| a.collect_slots(out)),
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if depth > 0 {
            write!(f, "{:width$}", "", width = depth * 2)?;
        }
        match self {
            Node::Constant(v) => writeln!(f, "Constant = {:?}", v),
            Node::Variable(slot) => writeln!(f, "Variable[{}]", slot),
            Node::Unary { op, fixity, operand } => {
                let label = match fixity {
                    Fixity::Prefix => "Prefix",
                    Fixity::Postfix => "Postfix",
                };
                writeln!(f, "{} {}", label, op.token)?;
                operand.write_tree(f, depth + 1)
            }
            Node::Binary { op, left, right } => {
                writeln!(f, "Binary {}", op.token)?;
                left.write_tree(f, depth + 1)?;
                right.write_tree(f, depth + 1)
            }
            Node::Call { function, args } => {
                writeln!(f, "Function {}", function.name)?;
                for arg in args {
                    arg.write_tree(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Renders the tree one node per line, indenting two spaces per level.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}
