//! Integration tests for the exp-fold library
//! Parsing, multi-statement programs, output selection and introspection.

use exp_fold::functions::Math;
use exp_fold::{ErrorKind, ExprError, Expression, Function, assert_approx_eq};
use std::cell::Cell;
use std::rc::Rc;

mod test_helpers;
use test_helpers::{eval_with, full_engine};

#[test]
fn test_basic_evaluation() {
    assert_eq!(eval_with("2 + 3", &[]), 5.0);
    assert_eq!(eval_with("2 * 3 + 4", &[]), 10.0);
    assert_eq!(eval_with("2 * (3 + 4)", &[]), 14.0);
    assert_eq!(eval_with("7 % 4", &[]), 3.0);
    assert_eq!(eval_with("-2 - -3", &[]), 1.0);
    assert_eq!(eval_with("1.5e2 / .5", &[]), 300.0);
    assert_approx_eq!(eval_with("pi", &[]), exp_fold::constants::PI);
    assert_approx_eq!(eval_with("sin(pi / 2) + cos(0)", &[]), 2.0);
}

#[test]
fn test_variables_after_parse() {
    let mut expr = Expression::new();
    expr.parse("a * b + c").unwrap();
    let a = expr.add_variable_with_value("a", 2.0).unwrap();
    expr.add_variable_with_value("b", 5.0).unwrap();
    expr.add_variable_with_value("c", 3.0).unwrap();
    assert_eq!(expr.evaluate().unwrap(), 13.0);

    expr.set_variable(a, 4.0).unwrap();
    assert_eq!(expr.evaluate().unwrap(), 23.0);
    expr.set_variable_by_name("c", -20.0).unwrap();
    assert_eq!(expr.evaluate().unwrap(), 0.0);
}

#[test]
fn test_multi_statement_program() {
    let mut expr = Expression::new();
    expr.parse("x = a + b; y = x * 2").unwrap();
    expr.add_variable_with_value("a", 1.0).unwrap();
    expr.add_variable_with_value("b", 2.0).unwrap();
    assert_eq!(expr.evaluate().unwrap(), 6.0);
    assert_eq!(expr.variable_value_by_name("x").unwrap(), 3.0);
    assert_eq!(expr.variable_value_by_name("y").unwrap(), 6.0);
}

#[test]
fn test_trailing_separator_and_whitespace() {
    let mut expr = Expression::new();
    expr.parse("  x = 1 ;\n y = x + 1 ; ").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 2.0);
}

#[test]
fn test_enable_outputs_controls_execution() {
    let mut expr = Expression::new();
    expr.add_variable_with_value("a", 4.0).unwrap();
    expr.add_variable_with_value("b", 2.0).unwrap();
    expr.parse("x = a + 1; y = b * 2; out1 = x * y; out2 = x / y")
        .unwrap();
    assert_eq!(expr.execution_sequence(), vec!["x", "y", "out1", "out2"]);

    expr.enable_outputs(&["x"]).unwrap();
    assert_eq!(expr.execution_sequence(), vec!["x"]);
    assert_eq!(expr.evaluate().unwrap(), 5.0);

    expr.enable_outputs(&["out1"]).unwrap();
    assert_eq!(expr.execution_sequence(), vec!["x", "y", "out1"]);
    assert_eq!(expr.evaluate().unwrap(), 20.0);

    expr.enable_outputs(&["out2"]).unwrap();
    assert_eq!(expr.execution_sequence(), vec!["x", "y", "out2"]);
    assert_eq!(expr.evaluate().unwrap(), 1.25);

    expr.enable_outputs(&["y", "x"]).unwrap();
    assert_eq!(expr.execution_sequence(), vec!["x", "y"]);

    expr.enable_all_outputs();
    assert_eq!(expr.execution_sequence().len(), 4);
}

#[test]
fn test_enable_outputs_skips_unrelated_statements() {
    let mut expr = Expression::new();
    expr.parse("x = 1; y = 2; z = x + 1").unwrap();
    expr.enable_outputs(&["z"]).unwrap();
    assert!(!expr.to_tree().contains("y = "));
    expr.evaluate().unwrap();
    assert_eq!(expr.variable_value_by_name("z").unwrap(), 2.0);
    assert_eq!(expr.variable_value_by_name("y").unwrap(), 0.0);
}

#[test]
fn test_enable_outputs_rejects_bad_names() {
    let mut expr = Expression::new();
    expr.parse("x = 1").unwrap();
    assert_eq!(
        expr.enable_outputs(&["a-b"]).unwrap_err().kind(),
        ErrorKind::InvalidToken
    );
    assert_eq!(
        expr.enable_outputs(&["missing"]).unwrap_err(),
        ExprError::UndeclaredVariable {
            names: vec!["missing".to_string()]
        }
    );
    assert_eq!(
        expr.enable_output_slots(&[99]).unwrap_err(),
        ExprError::UnknownSlot { slot: 99 }
    );
}

#[test]
fn test_evaluate_with_nothing_enabled() {
    let mut expr = Expression::new();
    expr.parse("x = 1").unwrap();
    expr.add_variable("unused").unwrap();
    expr.enable_outputs(&["unused"]).unwrap();
    assert!(expr.execution_sequence().is_empty());
    assert!(expr.evaluate().unwrap().is_nan());
}

#[test]
fn test_variable_listings() {
    let mut expr = Expression::with_libraries(&[&Math]);
    expr.add_variable("spare").unwrap();
    expr.parse("x = a + b; y = sqrt(x) * 2").unwrap();

    assert_eq!(expr.list_all_variables(), vec!["spare", "x", "a", "b", "y"]);
    assert_eq!(expr.list_active_variables(), vec!["x", "a", "b", "y"]);
    assert_eq!(expr.list_all_inputs(), vec!["a", "b"]);
    assert_eq!(expr.list_all_outputs_or_intermediates(), vec!["x", "y"]);
    assert_eq!(expr.list_active_functions(), vec!["sqrt"]);
    assert_eq!(expr.list_undeclared(), vec!["a", "b"]);

    expr.add_variable("a").unwrap();
    assert_eq!(expr.list_undeclared(), vec!["b"]);
}

#[test]
fn test_folded_functions_are_still_listed() {
    let mut expr = Expression::with_libraries(&[&Math]);
    expr.parse("abs(-3) + v").unwrap();
    assert_eq!(expr.list_active_functions(), vec!["abs"]);
    assert!(!expr.to_tree().contains("Function"));
}

#[test]
fn test_undeclared_variables_reported_together() {
    let mut expr = Expression::new();
    expr.set_allow_undeclared_variables(false);
    expr.add_variable("k").unwrap();
    let err = expr.parse("abc = def + g; k = h * abc").unwrap_err();
    assert_eq!(
        err,
        ExprError::UndeclaredVariable {
            names: vec!["def".to_string(), "g".to_string(), "h".to_string()]
        }
    );
    assert_eq!(err.to_string(), "There are 3 undeclared variables: def, g, h");

    let err = expr.parse("k = zz").unwrap_err();
    assert_eq!(err.to_string(), "The variable 'zz' was not declared");

    for name in ["def", "g", "h", "zz"] {
        expr.add_variable(name).unwrap();
    }
    expr.parse("abc = def + g; k = h * abc").unwrap();
}

#[test]
fn test_outputs_count_as_declared() {
    let mut expr = Expression::new();
    expr.set_allow_undeclared_variables(false);
    expr.add_variable_with_value("a", 1.0).unwrap();
    expr.parse("x = a * 2; y = x + a").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 3.0);
}

#[test]
fn test_later_outputs_are_not_declared_early() {
    let mut expr = Expression::new();
    expr.set_allow_undeclared_variables(false);
    let err = expr.parse("x = y; y = 1").unwrap_err();
    assert_eq!(
        err,
        ExprError::UndeclaredVariable {
            names: vec!["y".to_string()]
        }
    );
    assert_eq!(
        expr.parse("x = x + 1").unwrap_err().to_string(),
        "The variable 'x' was not declared"
    );

    expr.parse("y = 1; x = y").unwrap();
    expr.parse("x = y; y = 1").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 1.0);
}

#[test]
fn test_failed_parse_declares_nothing() {
    let mut expr = Expression::new();
    expr.set_allow_undeclared_variables(false);
    assert_eq!(
        expr.parse("w = 1; v = (").unwrap_err().kind(),
        ErrorKind::Syntax
    );
    assert_eq!(
        expr.parse("q = w").unwrap_err(),
        ExprError::UndeclaredVariable {
            names: vec!["w".to_string()]
        }
    );
    assert_eq!(
        expr.parse("a = 2; b = c").unwrap_err().kind(),
        ErrorKind::UndeclaredVariable
    );
    assert_eq!(expr.parse("q = a").unwrap_err().kind(), ErrorKind::UndeclaredVariable);

    expr.parse("w = 1; v = w * 3").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 3.0);
    expr.parse("q = v + w").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 4.0);
}

#[test]
fn test_add_variable_is_idempotent() {
    let mut expr = Expression::new();
    let first = expr.add_variable_with_value("speed", 12.5).unwrap();
    let second = expr.add_variable("speed").unwrap();
    assert_eq!(first, second);
    assert_eq!(expr.variable_value(first).unwrap(), 12.5);
    assert_eq!(expr.list_all_variables(), vec!["speed"]);
}

#[test]
fn test_impure_function_is_not_folded() {
    let counter = Rc::new(Cell::new(0.0));
    let ticks = counter.clone();
    let mut expr = Expression::new();
    expr.add_user_function(
        Function::new("tick", 0, move |_| {
            ticks.set(ticks.get() + 1.0);
            ticks.get()
        })
        .impure(),
    )
    .unwrap();
    expr.parse("tick() * 10").unwrap();
    assert_eq!(counter.get(), 0.0);
    assert_eq!(expr.evaluate().unwrap(), 10.0);
    assert_eq!(expr.evaluate().unwrap(), 20.0);
    assert_eq!(expr.list_active_functions(), vec!["tick"]);
}

#[test]
fn test_pure_function_folds_at_parse_time() {
    let counter = Rc::new(Cell::new(0));
    let calls = counter.clone();
    let mut expr = Expression::new();
    expr.add_user_function(Function::new("seven", 0, move |_| {
        calls.set(calls.get() + 1);
        7.0
    }))
    .unwrap();
    expr.parse("seven() + 1").unwrap();
    assert_eq!(counter.get(), 1);
    assert_eq!(expr.to_tree(), "result = Constant = 8.0\n");
    expr.evaluate().unwrap();
    expr.evaluate().unwrap();
    assert_eq!(counter.get(), 1);
}

#[cfg(feature = "std")]
#[test]
fn test_random_varies_between_evaluations() {
    let mut expr = Expression::with_libraries(&[&Math]);
    expr.parse("random()").unwrap();
    let values: Vec<f64> = (0..8).map(|_| expr.evaluate().unwrap()).collect();
    assert!(values.iter().all(|v| (0.0..1.0).contains(v)));
    assert!(values.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn test_user_function_replaces_builtin() {
    let mut expr = Expression::with_libraries(&[&Math]);
    expr.add_user_function(Function::new("sqrt", 1, |args| args[0] * 10.0))
        .unwrap();
    expr.parse("sqrt(4)").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 40.0);

    assert!(expr.remove_function("sqrt"));
    assert!(!expr.remove_function("sqrt"));
    assert_eq!(
        expr.parse("sqrt(4)").unwrap_err().kind(),
        ErrorKind::UnknownMethod
    );
    assert_eq!(
        expr.add_user_function(Function::new("no way", 1, |a| a[0]))
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidToken
    );
}

#[test]
fn test_variadic_and_ranged_functions() {
    let mut expr = Expression::new();
    expr.add_user_function(Function::variadic("sum", 0, |args| args.iter().sum()))
        .unwrap();
    expr.add_user_function(Function::with_range("lerp", 2, 3, |args| {
        let t = args.get(2).copied().unwrap_or(0.5);
        args[0] + (args[1] - args[0]) * t
    }))
    .unwrap();
    expr.parse("sum() + sum(1, 2, 3, 4, 5, 6, 7, 8, 9, 10)").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 55.0);
    expr.parse("lerp(0, 10) + lerp(0, 10, 0.1)").unwrap();
    assert_eq!(expr.evaluate().unwrap(), 6.0);
}

#[test]
fn test_tree_dump_is_deterministic() {
    let dump = || {
        let mut expr = full_engine();
        expr.add_variable("x").unwrap();
        expr.parse("y = x * 2 + max(x, 3); z = -y").unwrap();
        expr.to_tree()
    };
    let first = dump();
    assert_eq!(first, dump());
    assert!(first.starts_with("y = Binary +\n"));
    assert!(first.contains("\nz = Prefix -\n  Variable[1]\n"));
}

#[test]
fn test_remove_constant() {
    let mut expr = Expression::new();
    expr.parse("nan").unwrap();
    assert!(expr.evaluate().unwrap().is_nan());

    assert!(!expr.remove_constant(""));
    assert!(expr.remove_constant("nan"));
    assert!(!expr.remove_constant("nan"));

    expr.parse("nan").unwrap();
    assert_eq!(expr.list_undeclared(), vec!["nan"]);
    expr.add_variable_with_value("nan", 4.0).unwrap();
    assert_eq!(expr.evaluate().unwrap(), 4.0);
}

#[test]
fn test_undeclared_listed_after_lenient_parse() {
    let mut expr = Expression::new();
    expr.add_variable_with_value("a", 1.0).unwrap();
    expr.parse("a*def+g/h").unwrap();
    assert_eq!(expr.list_undeclared(), vec!["def", "g", "h"]);
}

#[test]
fn test_declared_after_parse_scenario() {
    let mut expr = Expression::new();
    expr.parse("a*b+c").unwrap();
    expr.add_variable_with_value("a", 2.0).unwrap();
    expr.add_variable_with_value("b", 3.0).unwrap();
    expr.add_variable_with_value("c", 7.0).unwrap();
    assert_eq!(expr.evaluate().unwrap(), 13.0);
}

#[test]
fn test_enable_single_output_of_three() {
    let mut expr = Expression::new();
    expr.parse("a = 2; b = a * 3; c = b + 100").unwrap();
    expr.evaluate().unwrap();
    expr.set_variable_by_name("c", 0.0).unwrap();
    expr.enable_outputs(&["b"]).unwrap();
    assert_eq!(expr.execution_sequence(), vec!["a", "b"]);
    assert_eq!(expr.evaluate().unwrap(), 6.0);
    assert_eq!(expr.variable_value_by_name("c").unwrap(), 0.0);
}
