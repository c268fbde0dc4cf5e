//! End-to-end tests for the core operation algebra.

use std::sync::{Arc, Mutex};

use opforge::error::OpError;
use opforge::executor::Executor;
use opforge::op::{call, con, eval_expr, eval_fn, fun, iter, match_, var, with, Case};
use opforge::value::Value;

fn run(program: opforge::op::Op) -> Value {
    Executor::new(false).execute(program).unwrap()
}

#[test]
fn test_with_returns_the_bound_value() {
    assert_eq!(run(with("v", con(42), var("v"))), Value::Int(42));
}

#[test]
fn test_with_binding() {
    let program = with("a", con(5), eval_expr(vec![var("a")], "a + 1"));
    assert_eq!(run(program), Value::Int(6));
}

#[test]
fn test_match_first_case_wins() {
    let program = match_(
        "x",
        con(5),
        vec![
            Case::new(var("x").eq(5), con("a")),
            Case::new(var("x").eq(5), con("b")),
            Case::new(var("x").eq(1), con("c")),
        ],
    );
    assert_eq!(run(program), Value::from("a"));
}

#[test]
fn test_match_skips_falsy_cases() {
    let program = match_(
        "x",
        con(5),
        vec![
            Case::new(var("x").eq(1), con("a")),
            Case::new(var("x").eq(5), con("b")),
            Case::new(var("x").eq(1), con("c")),
        ],
    );
    assert_eq!(run(program), Value::from("b"));
}

#[test]
fn test_match_reaches_last_case() {
    let program = match_(
        "x",
        con(5),
        vec![
            Case::new(var("x").eq(1), con("a")),
            Case::new(var("x").eq(2), con("b")),
            Case::new(var("x").eq(5), con("c")),
        ],
    );
    assert_eq!(run(program), Value::from("c"));
}

#[test]
fn test_function_call() {
    let program = with(
        "fn",
        fun(
            &["x", "y", "z"],
            eval_fn(vec![var("x"), var("y"), var("z")], |args| {
                Ok(Value::List(args.to_vec()))
            }),
        ),
        call(var("fn"), vec![con(5), con(6), con(7)]),
    );
    assert_eq!(run(program), Value::from(vec![5, 6, 7]));
}

#[test]
fn test_call_matches_with_binding_semantics() {
    // Call(Fun(v.., body), a..) behaves exactly like With(v, a, .., body).
    let body = || eval_expr(vec![var("p"), var("q")], "a * 10 + b");
    let through_call = call(fun(&["p", "q"], body()), vec![con(3), con(4)]);
    let through_with = with("p", con(3), with("q", con(4), body()));
    assert_eq!(run(through_call), run(through_with));
}

#[test]
fn test_iter_counts_and_returns_last_body_value() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();

    let program = iter(
        "x",
        con(0),
        eval_expr(vec![var("x")], "(a, a + 1) if a < 5 else (a, None)"),
        eval_fn(vec![var("x")], move |args| {
            sink.lock().unwrap().push(args[0].clone());
            Ok(args[0].clone())
        }),
    );

    assert_eq!(run(program), Value::Int(4));
    let seen = observed.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            Value::Int(0),
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
        ],
    );
}

#[test]
fn test_iter_with_expression_loop() {
    let program = iter(
        "id",
        con(0),
        eval_expr(vec![var("id")], "(a, a + 1) if a < 10 else (a, None)"),
        eval_expr(vec![var("id")], "a"),
    );
    assert_eq!(run(program), Value::Int(9));
}

#[test]
fn test_unmatched_failure_carries_the_match_location() {
    let program = match_(
        "m",
        con(5),
        vec![Case::new(var("m").eq(1), con("x"))],
    );
    let expected_line = line!() - 5;

    let error = Executor::new(false).execute(program).unwrap_err();
    assert!(matches!(error.cause, OpError::Unmatched));
    let loc = error.loc().expect("unmatched failure should carry a location");
    assert!(loc.file.ends_with("dsl_test.rs"), "bad file: {}", loc.file);
    assert_eq!(loc.line, expected_line);
}

#[test]
fn test_err_formats_its_arguments() {
    let program = match_(
        "m",
        con(5),
        vec![Case::new(
            var("m").eq(5),
            opforge::op::err("No matching branches found %s", vec![var("m")]),
        )],
    );
    let error = Executor::new(false).execute(program).unwrap_err();
    match &error.cause {
        OpError::User(reason) => assert_eq!(reason, "No matching branches found 5"),
        other => panic!("expected a user error, got {}", other),
    }
}

#[test]
fn test_var_outside_any_binding_fails() {
    let error = Executor::new(false).execute(var("ghost")).unwrap_err();
    assert!(matches!(&error.cause, OpError::NameUnbound(name) if name == "ghost"));
}

#[test]
fn test_shadowing_restores_the_outer_binding() {
    let program = with(
        "a",
        con(1),
        eval_fn(
            vec![
                with("a", con(2), var("a")),
                var("a"),
            ],
            |args| Ok(Value::List(args.to_vec())),
        ),
    );
    assert_eq!(run(program), Value::from(vec![2, 1]));
}

#[test]
fn test_call_arity_mismatch() {
    let two_arg = || fun(&["x", "y"], var("x"));

    let error = Executor::new(false)
        .execute(call(two_arg(), vec![con(1)]))
        .unwrap_err();
    assert!(matches!(
        error.cause,
        OpError::MissingArgs {
            expected: 2,
            given: 1
        }
    ));

    let error = Executor::new(false)
        .execute(call(two_arg(), vec![con(1), con(2), con(3)]))
        .unwrap_err();
    assert!(matches!(
        error.cause,
        OpError::ExtraArgs {
            expected: 2,
            given: 3
        }
    ));
}

#[test]
fn test_calling_a_non_function_fails() {
    let error = Executor::new(false)
        .execute(call(con(5), vec![]))
        .unwrap_err();
    assert!(matches!(error.cause, OpError::NotCallable { .. }));
}

#[test]
fn test_duplicate_parameter_names_fail_at_construction() {
    let result = opforge::op::try_fun(&["x", "x"], var("x"));
    assert!(matches!(result, Err(OpError::DuplicateArg(name)) if name == "x"));
}

#[test]
#[should_panic(expected = "duplicate parameter name `x`")]
fn test_fun_panics_on_duplicate_parameter_names() {
    let _ = fun(&["x", "y", "x"], var("x"));
}

#[test]
fn test_determinism_across_runs() {
    let build = || {
        iter(
            "x",
            con(0),
            eval_expr(vec![var("x")], "(a, a + 1) if a < 3 else (a, None)"),
            eval_expr(vec![var("x")], "a * a"),
        )
    };
    let first = Executor::new(false).execute(build()).unwrap();
    let second = Executor::new(false).execute(build()).unwrap();
    assert_eq!(first, second);
}
