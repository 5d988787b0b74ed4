#![cfg_attr(not(feature = "std"), no_std)]
#![doc = r#"
# exp-fold

An expression compiler for numeric formulas. Text is parsed once into a
constant-folded tree over a table of variable slots, then evaluated as often as
needed after the variables change.

## Overview

- Operators, functions and constants come from a registry of parse rules. The
  longest matching token always wins, so `<=` is never read as `<` followed by
  `=`.
- Operator precedence is resolved by a small state machine that climbs the
  partial tree, so a rule only needs to declare its precedence.
- Sub-trees whose value is known at parse time are replaced by constants, and
  identities such as `x + 0`, `x * 1` and `x ^ 1` are removed.
- Several assignments separated by `;` form a program. Selecting outputs
  switches off the statements they do not depend on.
- `no_std` with `alloc`; all math goes through `libm`.

## Quick Start

```rust
use exp_fold::Expression;

let mut expr = Expression::new();
expr.parse("a * b + c").unwrap();
expr.add_variable_with_value("a", 2.0).unwrap();
expr.add_variable_with_value("b", 5.0).unwrap();
expr.add_variable_with_value("c", 3.0).unwrap();
assert_eq!(expr.evaluate().unwrap(), 13.0);
```

Variables used but never declared are reported together:

```rust
use exp_fold::{ErrorKind, Expression};

let mut expr = Expression::new();
expr.set_allow_undeclared_variables(false);
let err = expr.parse("x + y").unwrap_err();
assert_eq!(err.kind(), ErrorKind::UndeclaredVariable);
assert_eq!(err.to_string(), "There are 2 undeclared variables: x, y");
```

## Libraries

Every engine contains [`functions::Core`]. The math, logic and bitwise
libraries are added on request:

```rust
use exp_fold::Expression;
use exp_fold::functions::{Logic, Math};

let mut expr = Expression::with_libraries(&[&Math, &Logic]);
expr.parse("if(x <= 1, sqrt(16), max(1, 7, 3))").unwrap();
expr.add_variable_with_value("x", 0.5).unwrap();
assert_eq!(expr.evaluate().unwrap(), 4.0);
```

## Custom Rules

```rust
use exp_fold::{Expression, Function, Precedence, Rule, UnaryOp};

let mut expr = Expression::new();
expr.add_user_function(Function::new("twice", 1, |args| 2.0 * args[0])).unwrap();
expr.add_rule(Rule::postfix(UnaryOp::new("%%", |a| a / 100.0)));
expr.parse("twice(50%%)").unwrap();
assert_eq!(expr.evaluate().unwrap(), 1.0);
```

## Feature Flags

- `std` (default): enables the `random()` function of the math library.
"#]

extern crate alloc;

pub use alloc::boxed::Box;
pub use alloc::string::{String, ToString};
pub use alloc::vec::Vec;

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod expression;
pub mod functions;
pub mod lexer;
pub mod program;
pub mod registry;
pub mod types;

pub use config::{Config, ParseFlags};
pub use context::{Slot, ValueTable};
pub use error::{ErrorKind, ExprError, Result};
pub use expression::Expression;
pub use registry::{Library, Rule};
pub use types::{BinaryOp, Fixity, Function, Node, Precedence, Simplify, UnaryOp};

/// Every value is a double.
pub type Real = f64;

pub mod constants {
    use super::Real;

    pub const PI: Real = core::f64::consts::PI;
    pub const E: Real = core::f64::consts::E;
    pub const TEST_PRECISION: Real = 1e-10;
}

/// Utility macro to check if two floating point values are approximately equal
/// within a specified epsilon. Supports optional format arguments like assert_eq!.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $crate::constants::TEST_PRECISION)
    };
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;

        if left_val.is_nan() && right_val.is_nan() {
            // NaN == NaN for our purposes
        } else if left_val.is_infinite()
            && right_val.is_infinite()
            && left_val.signum() == right_val.signum()
        {
            // Same-signed infinities are equal
        } else {
            assert!(
                (left_val - right_val).abs() < eps,
                "assertion failed: `(left ≈ right)` (left: `{}`, right: `{}`, epsilon: `{}`)",
                left_val,
                right_val,
                eps
            );
        }
    }};
    ($left:expr, $right:expr, $epsilon:expr, $fmt:expr, $($arg:tt)+) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;

        if left_val.is_nan() && right_val.is_nan() {
        } else if left_val.is_infinite()
            && right_val.is_infinite()
            && left_val.signum() == right_val.signum()
        {
        } else {
            assert!((left_val - right_val).abs() < eps, $fmt, $($arg)+);
        }
    }};
}
