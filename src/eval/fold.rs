//! Constant folding.
//!
//! Folding runs once per parsed statement, bottom-up. Subtrees whose inputs are
//! all constant collapse into a single constant; operators with algebraic
//! identities collapse further when just one side is a known `0` or `1`.
//!
//! The absorbing rules (`x*0`, `0*x`, `0/x`, `0 mod x`) ignore that `x` may be
//! infinite or NaN at run time. [`ParseFlags::IEEE_FOLDING`] turns them off.

use crate::config::ParseFlags;
use crate::types::{BinaryOp, Node, Simplify};
use crate::{Box, Real, Vec};
use alloc::rc::Rc;

/// Folds `node` and returns the simplified tree.
pub fn fold(node: Node, flags: ParseFlags) -> Node {
    match node {
        Node::Constant(_) | Node::Variable(_) => node,
        Node::Unary {
            op,
            fixity,
            operand,
        } => {
            let operand = fold(*operand, flags);
            if op.transparent {
                return operand;
            }
            match operand.as_constant() {
                Some(v) => Node::Constant((op.apply)(v)),
                None => Node::Unary {
                    op,
                    fixity,
                    operand: Box::new(operand),
                },
            }
        }
        Node::Binary { op, left, right } => {
            let left = fold(*left, flags);
            let right = fold(*right, flags);
            if let (Some(a), Some(b)) = (left.as_constant(), right.as_constant()) {
                return Node::Constant((op.apply)(a, b));
            }
            simplify(op, left, right, !flags.contains(ParseFlags::IEEE_FOLDING))
        }
        Node::Call { function, args } => {
            let args: Vec<Node> = args.into_iter().map(|arg| fold(arg, flags)).collect();
            if function.pure {
                let constants: Option<Vec<Real>> = args.iter().map(Node::as_constant).collect();
                if let Some(values) = constants {
                    return Node::Constant(function.call(&values));
                }
            }
            Node::Call { function, args }
        }
    }
}

/// Applies the identities of `op` when exactly one side is constant.
fn simplify(op: Rc<BinaryOp>, left: Node, right: Node, absorb: bool) -> Node {
    let l = left.as_constant();
    let r = right.as_constant();
    match op.simplify {
        Simplify::Add if l == Some(0.0) => return right,
        Simplify::Add | Simplify::Subtract if r == Some(0.0) => return left,
        Simplify::Multiply if r == Some(1.0) => return left,
        Simplify::Multiply if l == Some(1.0) => return right,
        Simplify::Multiply if absorb && (l == Some(0.0) || r == Some(0.0)) => {
            return Node::Constant(0.0);
        }
        Simplify::Divide if r == Some(1.0) => return left,
        Simplify::Divide | Simplify::Modulo if absorb && l == Some(0.0) => {
            return Node::Constant(0.0);
        }
        Simplify::Power if r == Some(0.0) => return Node::Constant(1.0),
        Simplify::Power if r == Some(1.0) => return left,
        _ => {}
    }
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
