//! Built-in libraries of operators, constants and functions.
//!
//! Every engine starts with [`Core`], which provides number literals,
//! parenthesised groups, the arithmetic operators and `nan`. The other
//! libraries are opt-in:
//!
//! - [`Math`]: trigonometric, hyperbolic, exponential and rounding functions,
//!   plus `e` and `pi`
//! - [`Logic`]: comparisons, boolean operators, `if`, `true`, `false`
//! - [`Bitwise`]: integer bit operations on values truncated to `i64`
//!
//! All math goes through `libm`, so the libraries work without `std`.

use libm::{
    acos as libm_acos, acosh as libm_acosh, asin as libm_asin, asinh as libm_asinh,
    atan as libm_atan, atan2 as libm_atan2, atanh as libm_atanh, cbrt as libm_cbrt,
    ceil as libm_ceil, cos as libm_cos, cosh as libm_cosh, exp as libm_exp, fabs as libm_fabs,
    floor as libm_floor, fmod as libm_fmod, hypot as libm_hypot, log as libm_ln,
    log10 as libm_log10, pow as libm_pow, sin as libm_sin, sinh as libm_sinh, sqrt as libm_sqrt,
    tan as libm_tan, tanh as libm_tanh,
};

use crate::Real;
use crate::Vec;
use crate::constants::{E, PI};
use crate::registry::{GroupRule, Library, NumberRule, Rule};
use crate::types::{BinaryOp, Function, Precedence, Simplify, UnaryOp};
use alloc::rc::Rc;
use alloc::vec;

/// Truth value of a number: anything other than zero and NaN.
pub fn truthy(value: Real) -> bool {
    value > 0.0 || value < 0.0
}

/// `1.0` for true, `0.0` for false.
pub fn flag(value: bool) -> Real {
    if value { 1.0 } else { 0.0 }
}

/// Rounds half-way cases towards positive infinity.
pub fn round(value: Real) -> Real {
    libm_floor(value + 0.5)
}

/// Converts radians to degrees.
pub fn to_degrees(radians: Real) -> Real {
    radians * 180.0 / PI
}

/// Converts degrees to radians.
pub fn to_radians(degrees: Real) -> Real {
    degrees / 180.0 * PI
}

/// Shifts `a` left by `b` bits. Negative shifts move right.
pub fn shift_left(a: Real, b: Real) -> Real {
    let (a, b) = (a as i64, b as i64);
    let shifted = if b >= 0 {
        a.wrapping_shl(b as u32)
    } else {
        a.wrapping_shr(b.unsigned_abs() as u32)
    };
    shifted as Real
}

/// The multiplication operator, also used for implicit multiplication.
pub fn multiply() -> BinaryOp {
    BinaryOp::new("*", Precedence::Multiplicative, |a, b| a * b).with_simplify(Simplify::Multiply)
}

fn unary(name: &str, f: fn(Real) -> Real) -> Rule {
    Rule::function(Function::new(name, 1, move |args| f(args[0])))
}

fn binary_fn(name: &str, f: fn(Real, Real) -> Real) -> Rule {
    Rule::function(Function::new(name, 2, move |args| f(args[0], args[1])))
}

fn comparison(token: &str, precedence: Precedence, f: fn(&Real, &Real) -> bool) -> Rule {
    Rule::binary(BinaryOp::new(token, precedence, move |a, b| flag(f(&a, &b))))
}

fn bitwise(token: &str, precedence: Precedence, f: fn(i64, i64) -> i64) -> Rule {
    Rule::binary(BinaryOp::new(token, precedence, move |a, b| {
        f(a as i64, b as i64) as Real
    }))
}

/// Literals, groups, arithmetic operators and `nan`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Core;

impl Library for Core {
    fn name(&self) -> &'static str {
        "core"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::Value(Rc::new(NumberRule)),
            Rule::Value(Rc::new(GroupRule)),
            Rule::constant("nan", Real::NAN),
            Rule::binary(
                BinaryOp::new("+", Precedence::Additive, |a, b| a + b)
                    .with_simplify(Simplify::Add),
            ),
            Rule::binary(
                BinaryOp::new("-", Precedence::Additive, |a, b| a - b)
                    .with_simplify(Simplify::Subtract),
            ),
            Rule::binary(multiply()),
            Rule::binary(
                BinaryOp::new("/", Precedence::Multiplicative, |a, b| a / b)
                    .with_simplify(Simplify::Divide),
            ),
            Rule::binary(
                BinaryOp::new("%", Precedence::Multiplicative, libm_fmod)
                    .with_simplify(Simplify::Modulo),
            ),
            Rule::binary(
                BinaryOp::new("^", Precedence::Power, libm_pow).with_simplify(Simplify::Power),
            ),
            Rule::prefix(UnaryOp::new("+", |a| a).transparent()),
            Rule::prefix(UnaryOp::new("-", |a| -a)),
        ]
    }
}

/// Mathematical functions and the constants `e` and `pi`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Math;

impl Library for Math {
    fn name(&self) -> &'static str {
        "math"
    }

    fn rules(&self) -> Vec<Rule> {
        let mut rules = vec![
            Rule::constant("e", E),
            Rule::constant("pi", PI),
            unary("abs", libm_fabs),
            unary("acos", libm_acos),
            unary("acosh", libm_acosh),
            unary("asin", libm_asin),
            unary("asinh", libm_asinh),
            unary("atan", libm_atan),
            unary("atanh", libm_atanh),
            unary("cbrt", libm_cbrt),
            unary("ceil", libm_ceil),
            unary("cos", libm_cos),
            unary("cosh", libm_cosh),
            unary("cot", |x| 1.0 / libm_tan(x)),
            unary("cosec", |x| 1.0 / libm_sin(x)),
            unary("sec", |x| 1.0 / libm_cos(x)),
            unary("exp", libm_exp),
            unary("floor", libm_floor),
            unary("log", libm_ln),
            unary("log10", libm_log10),
            unary("round", round),
            unary("sin", libm_sin),
            unary("sinh", libm_sinh),
            unary("sqrt", libm_sqrt),
            unary("tan", libm_tan),
            unary("tanh", libm_tanh),
            unary("toDegrees", to_degrees),
            unary("toRadians", to_radians),
            binary_fn("atan2", libm_atan2),
            binary_fn("hypot", libm_hypot),
            binary_fn("mod", libm_fmod),
            binary_fn("pow", libm_pow),
            Rule::function(Function::variadic("max", 1, |args| {
                args.iter().copied().fold(Real::NEG_INFINITY, libm::fmax)
            })),
            Rule::function(Function::variadic("min", 1, |args| {
                args.iter().copied().fold(Real::INFINITY, libm::fmin)
            })),
        ];
        #[cfg(feature = "std")]
        rules.push(Rule::function(
            Function::new("random", 0, |_| rand::random::<Real>()).impure(),
        ));
        rules
    }
}

/// Comparisons, boolean operators and the `if` function.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logic;

impl Library for Logic {
    fn name(&self) -> &'static str {
        "logic"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            Rule::constant("true", 1.0),
            Rule::constant("false", 0.0),
            Rule::function(Function::new("if", 3, |args| {
                if truthy(args[0]) { args[1] } else { args[2] }
            })),
            Rule::function(Function::new("isnan", 1, |args| flag(args[0].is_nan()))),
            Rule::function(Function::new("isinf", 1, |args| flag(args[0].is_infinite()))),
            Rule::binary(BinaryOp::new("&&", Precedence::LogicalAnd, |a, b| {
                flag(truthy(a) && truthy(b))
            })),
            Rule::binary(BinaryOp::new("||", Precedence::LogicalOr, |a, b| {
                flag(truthy(a) || truthy(b))
            })),
            comparison("==", Precedence::Equality, Real::eq),
            comparison("!=", Precedence::Equality, Real::ne),
            comparison("<", Precedence::Relational, Real::lt),
            comparison("<=", Precedence::Relational, Real::le),
            comparison(">", Precedence::Relational, Real::gt),
            comparison(">=", Precedence::Relational, Real::ge),
            Rule::prefix(UnaryOp::new("!", |a| flag(!truthy(a)))),
        ]
    }
}

/// Bitwise operators on values truncated to 64-bit integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bitwise;

impl Library for Bitwise {
    fn name(&self) -> &'static str {
        "bitwise"
    }

    fn rules(&self) -> Vec<Rule> {
        vec![
            bitwise("&", Precedence::BitwiseAnd, |a, b| a & b),
            bitwise("|", Precedence::BitwiseOr, |a, b| a | b),
            bitwise("xor", Precedence::BitwiseXor, |a, b| a ^ b),
            Rule::binary(BinaryOp::new("<<", Precedence::Shift, shift_left)),
            Rule::binary(BinaryOp::new(">>", Precedence::Shift, |a, b| {
                shift_left(a, -b)
            })),
            Rule::prefix(UnaryOp::new("~", |a| !(a as i64) as Real)),
        ]
    }
}

/// Every built-in library.
pub fn all() -> [&'static dyn Library; 4] {
    [&Core, &Math, &Logic, &Bitwise]
}
