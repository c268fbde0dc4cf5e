//! Tests for executor-level behavior: tracing, reuse, custom expression
//! evaluators, and result bookkeeping.

use opforge::executor::Executor;
use opforge::expr::ExprEvaluator;
use opforge::op::{con, eval_expr, par, seq, var, with};
use opforge::value::Value;

#[test]
fn test_trace_mode_does_not_change_results() {
    let build = || {
        with(
            "a",
            con(5),
            seq(vec![var("a"), eval_expr(vec![var("a")], "a + 1")]),
        )
    };
    let quiet = Executor::new(false).execute(build()).unwrap();
    let traced = Executor::new(true).execute(build()).unwrap();
    assert_eq!(quiet, traced);
    assert_eq!(traced, Value::Int(6));
}

#[test]
fn test_results_table_is_populated_after_a_run() {
    let mut ex = Executor::new(false);
    ex.execute(par(vec![con(1), con(2)])).unwrap();
    // Root and both children each record five phase results.
    assert!(ex.results_len() >= 15);
}

#[test]
fn test_custom_expression_evaluator() {
    struct Upper;

    impl ExprEvaluator for Upper {
        fn eval(&self, source: &str, bindings: &[(String, Value)]) -> anyhow::Result<Value> {
            // A toy language: the expression is a binding name whose string
            // value is upper-cased.
            let name = source.trim();
            let found = bindings
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown name {}", name))?;
            match found {
                Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
                other => Ok(other),
            }
        }
    }

    let program = with("word", con("quiet"), eval_expr(vec![var("word")], "a"));
    let mut ex = Executor::new(false).with_expr_evaluator(Upper);
    assert_eq!(ex.execute(program).unwrap(), Value::from("QUIET"));
}

#[test]
fn test_failure_reports_the_failing_job() {
    let program = seq(vec![con(1), var("ghost")]);
    let error = Executor::new(false).execute(program).unwrap_err();
    let job = error.job.as_ref().expect("failure should carry a job");
    assert_eq!(job.phase, opforge::job::Phase::Exec);
    assert!(error.to_string().contains("ghost"));
    assert!(!error.detail().is_empty());
}

#[test]
fn test_deep_sequences_do_not_recurse_on_the_host_stack() {
    // A thousand chained operations would overflow a recursive evaluator's
    // stack long before the queue-driven one notices.
    let ops: Vec<_> = (0..1000).map(|n| con(n)).collect();
    let result = Executor::new(false).execute(seq(ops)).unwrap();
    assert_eq!(result, Value::Int(999));
}
