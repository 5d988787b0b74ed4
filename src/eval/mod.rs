//! Evaluation of compiled expression trees.
//!
//! Trees are evaluated recursively against the value table's backing array.
//! Evaluation cannot fail: invalid arithmetic produces NaN or an infinity as
//! IEEE 754 prescribes.

pub mod fold;

pub use fold::fold;

use crate::types::{Function, Node};
use crate::{Real, Vec};

/// Calls with at most this many arguments evaluate them into a stack buffer.
const INLINE_ARGS: usize = 8;

impl Node {
    /// Evaluates the tree, reading variables from `values` by slot.
    ///
    /// A slot outside `values` reads as NaN.
    pub fn eval(&self, values: &[Real]) -> Real {
        match self {
            Node::Constant(v) => *v,
            Node::Variable(slot) => values.get(*slot).copied().unwrap_or(Real::NAN),
            Node::Unary { op, operand, .. } => (op.apply)(operand.eval(values)),
            Node::Binary { op, left, right } => (op.apply)(left.eval(values), right.eval(values)),
            Node::Call { function, args } => call(function, args, values),
        }
    }
}

fn call(function: &Function, args: &[Node], values: &[Real]) -> Real {
    if args.len() <= INLINE_ARGS {
        let mut buf: heapless::Vec<Real, INLINE_ARGS> = heapless::Vec::new();
        buf.extend(args.iter().map(|arg| arg.eval(values)));
        function.call(&buf)
    } else {
        let buf: Vec<Real> = args.iter().map(|arg| arg.eval(values)).collect();
        function.call(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BinaryOp, Fixity, Precedence, UnaryOp};
    use crate::Box;
    use alloc::rc::Rc;
    use alloc::vec;

    #[test]
    fn test_eval_reads_slots() {
        let add = Rc::new(BinaryOp::new("+", Precedence::Additive, |a, b| a + b));
        let neg = Rc::new(UnaryOp::new("-", |a| -a));
        let tree = Node::Binary {
            op: add,
            left: Box::new(Node::Variable(0)),
            right: Box::new(Node::Unary {
                op: neg,
                fixity: Fixity::Prefix,
                operand: Box::new(Node::Variable(1)),
            }),
        };
        assert_eq!(tree.eval(&[5.0, 2.0]), 3.0);
        assert_eq!(tree.eval(&[1.0, -1.0]), 2.0);
    }

    #[test]
    fn test_missing_slot_is_nan() {
        assert!(Node::Variable(3).eval(&[1.0]).is_nan());
    }

    #[test]
    fn test_calls_beyond_inline_buffer() {
        let sum = Rc::new(Function::variadic("sum", 0, |args| args.iter().sum()));
        let args: Vec<Node> = (1..=20).map(|i| Node::Constant(i as Real)).collect();
        let tree = Node::Call {
            function: sum.clone(),
            args,
        };
        assert_eq!(tree.eval(&[]), 210.0);
        let small = Node::Call {
            function: sum,
            args: vec![Node::Constant(1.0), Node::Variable(0)],
        };
        assert_eq!(small.eval(&[4.0]), 5.0);
    }
}
