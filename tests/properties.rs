//! Property tests over the optimizer and the execution pipeline.

use proptest::prelude::*;

use minic::tac::optimize::optimize;
use minic::tac::Opcode;
use minic::{compile, execute};

/// Arbitrary arithmetic expression over integer literals, rendered as
/// source text. Parenthesized so the generated shape is the parsed
/// shape.
fn arb_literal_expr() -> impl Strategy<Value = String> {
    let leaf = (0i64..100).prop_map(|n| n.to_string());
    leaf.prop_recursive(4, 24, 2, |inner| {
        (
            inner.clone(),
            prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")],
            inner,
        )
            .prop_map(|(l, op, r)| format!("({} {} {})", l, op, r))
    })
}

/// Arbitrary printable string literal body (no quotes, no newlines).
fn arb_string_body() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,16}"
}

proptest! {
    #[test]
    fn optimizer_is_idempotent(expr in arb_literal_expr()) {
        let source = format!("int main() {{ print({}); return 0; }}", expr);
        let compilation = compile(&source).expect("generated program compiles");
        let once = compilation.optimized;
        let twice = optimize(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn literal_expressions_fold_completely(expr in arb_literal_expr()) {
        let source = format!("int main() {{ return {}; }}", expr);
        let compilation = compile(&source).expect("generated program compiles");
        // FUNC, RET, END_FUNC and nothing else: no arithmetic survives
        prop_assert_eq!(compilation.optimized.len(), 3);
        prop_assert!(!compilation.optimized.iter().any(|i| i.op.is_binary()));
        prop_assert_eq!(compilation.optimized[1].op, Opcode::Ret);
    }

    #[test]
    fn optimization_preserves_observable_behavior(expr in arb_literal_expr()) {
        let source = format!("int main() {{ print({}); return {}; }}", expr, expr);
        let compilation = compile(&source).expect("generated program compiles");
        let raw = execute(&compilation.tac).expect("unoptimized TAC runs");
        let opt = execute(&compilation.optimized).expect("optimized TAC runs");
        prop_assert_eq!(raw.output, opt.output);
        prop_assert_eq!(raw.exit_value, opt.exit_value);
    }

    #[test]
    fn execution_is_deterministic(expr in arb_literal_expr(), text in arb_string_body()) {
        let source = format!(
            "int main() {{ print(\"{}\"); int v = {}; print(v); return v; }}",
            text, expr
        );
        let compilation = compile(&source).expect("generated program compiles");
        let first = execute(&compilation.optimized).expect("runs");
        let second = execute(&compilation.optimized).expect("runs");
        prop_assert_eq!(first.output, second.output);
        prop_assert_eq!(first.exit_value, second.exit_value);
    }

    #[test]
    fn nonnegative_literal_returns_round_trip(n in 0i64..=i64::MAX) {
        let source = format!("int main() {{ return {}; }}", n);
        let compilation = compile(&source).expect("generated program compiles");
        let result = execute(&compilation.optimized).expect("runs");
        prop_assert_eq!(result.exit_value, n);
    }

    #[test]
    fn negative_values_round_trip_via_subtraction(n in 1i64..=i64::MAX) {
        // The grammar has no unary minus; negative values come from 0 - n
        let source = format!("int main() {{ return 0 - {}; }}", n);
        let compilation = compile(&source).expect("generated program compiles");
        let result = execute(&compilation.optimized).expect("runs");
        prop_assert_eq!(result.exit_value, -n);
    }

    #[test]
    fn string_prints_exactly_once(text in arb_string_body()) {
        let source = format!("int main() {{ print(\"{}\"); return 0; }}", text);
        let compilation = compile(&source).expect("generated program compiles");
        let result = execute(&compilation.optimized).expect("runs");
        prop_assert_eq!(result.output, vec![text]);
        prop_assert_eq!(result.exit_value, 0);
    }
}
