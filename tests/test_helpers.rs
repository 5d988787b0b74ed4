use exp_fold::functions::{self, Bitwise, Logic, Math};
use exp_fold::{Expression, Real};

/// Engine with every built-in library loaded.
#[allow(dead_code)]
pub fn full_engine() -> Expression {
    Expression::with_libraries(&[&Math, &Logic, &Bitwise])
}

/// Parses `text` on a full engine with `vars` declared and evaluates it.
#[allow(dead_code)]
pub fn eval_with(text: &str, vars: &[(&str, Real)]) -> Real {
    let mut expr = full_engine();
    for (name, value) in vars {
        expr.add_variable_with_value(name, *value).unwrap();
    }
    expr.parse(text)
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", text, e));
    expr.evaluate().unwrap()
}

/// Tree dump of `text` with `v` and `b` declared before parsing.
#[allow(dead_code)]
pub fn tree_of(text: &str) -> String {
    let mut expr = full_engine();
    expr.add_variable("v").unwrap();
    expr.add_variable("b").unwrap();
    expr.parse(text)
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", text, e));
    expr.to_tree()
}

/// Integer factorial, for postfix operator tests.
#[allow(dead_code)]
pub fn factorial(n: Real) -> Real {
    (1..=n as u64).map(|k| k as Real).product()
}

#[allow(dead_code)]
pub fn library_count() -> usize {
    functions::all().len()
}
