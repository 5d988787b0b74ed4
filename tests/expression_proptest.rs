//! Property-based tests for parsing, folding and output selection.

use exp_fold::{Expression, Real};
use proptest::prelude::*;

/// Generate valid variable names
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}".prop_map(|s| s.to_string())
}

fn value_strategy() -> impl Strategy<Value = Real> {
    -1.0e6..1.0e6f64
}

proptest! {
    /// Variables set after parsing are what evaluation sees
    #[test]
    fn prop_linear_expression(a in value_strategy(), b in value_strategy(), c in value_strategy()) {
        let mut expr = Expression::new();
        expr.parse("a * b + c").unwrap();
        expr.add_variable_with_value("a", a).unwrap();
        expr.add_variable_with_value("b", b).unwrap();
        expr.add_variable_with_value("c", c).unwrap();
        prop_assert_eq!(expr.evaluate().unwrap(), a * b + c);
    }

    /// Intermediate outputs feed later statements
    #[test]
    fn prop_chained_statements(a in value_strategy(), b in value_strategy()) {
        let mut expr = Expression::new();
        expr.add_variable_with_value("a", a).unwrap();
        expr.add_variable_with_value("b", b).unwrap();
        expr.parse("x = a + b; y = x * 2").unwrap();
        prop_assert_eq!(expr.evaluate().unwrap(), (a + b) * 2.0);
        prop_assert_eq!(expr.variable_value_by_name("x").unwrap(), a + b);
    }

    /// Integer literals parse exactly and fold to a single constant
    #[test]
    fn prop_integer_literals(n in 0u32..1_000_000, m in 1u32..1000) {
        let mut expr = Expression::new();
        expr.parse(&format!("{} + {} * 2", n, m)).unwrap();
        prop_assert_eq!(expr.to_tree().lines().count(), 1);
        prop_assert_eq!(expr.evaluate().unwrap(), n as Real + m as Real * 2.0);
    }

    /// Declaring a name twice keeps its slot and value
    #[test]
    fn prop_add_variable_idempotent(name in name_strategy(), value in value_strategy()) {
        let mut expr = Expression::new();
        let slot = expr.add_variable_with_value(&name, value).unwrap();
        prop_assert_eq!(expr.add_variable(&name).unwrap(), slot);
        prop_assert_eq!(expr.variable_value(slot).unwrap(), value);
        prop_assert_eq!(expr.variable_slot(&name).unwrap(), slot);
    }

    /// Multiplying by one never adds nodes
    #[test]
    fn prop_identity_folding(name in name_strategy()) {
        prop_assume!(name != "nan");
        let mut expr = Expression::new();
        expr.add_variable(&name).unwrap();
        expr.parse(&format!("({0} * 1) + 0 - 0 + {0} ^ 1 * 1", name)).unwrap();
        let dump = expr.to_tree();
        prop_assert_eq!(dump.lines().count(), 3, "{}", dump);
    }

    /// Enabling one statement of a chain runs exactly its prefix
    #[test]
    fn prop_enable_outputs_chain(len in 1usize..12, pick in 0usize..12) {
        let pick = pick % len;
        let text = (0..len)
            .map(|i| if i == 0 { "s0 = 1".to_string() } else { format!("s{} = s{} + 1", i, i - 1) })
            .collect::<Vec<_>>()
            .join("; ");
        let mut expr = Expression::new();
        expr.parse(&text).unwrap();
        let target = format!("s{}", pick);
        expr.enable_outputs(&[target.as_str()]).unwrap();

        let expected: Vec<String> = (0..=pick).map(|i| format!("s{}", i)).collect();
        prop_assert_eq!(expr.execution_sequence(), expected);
        prop_assert_eq!(expr.evaluate().unwrap(), (pick + 1) as Real);
    }
}
