//! Tests for `Seq`, `Par`, and `Arr` neutral elements and ordering.

use opforge::executor::Executor;
use opforge::op::{arr, con, par, seq, Op};
use opforge::value::Value;

fn run(program: Op) -> Value {
    Executor::new(false).execute(program).unwrap()
}

#[test]
fn test_empty_seq_yields_none() {
    assert_eq!(run(seq(vec![])), Value::None);
}

#[test]
fn test_seq_of_one_yields_the_raw_value() {
    assert_eq!(run(seq(vec![con(1)])), Value::Int(1));
}

#[test]
fn test_seq_yields_the_last_value() {
    assert_eq!(run(seq(vec![con(1), con(2)])), Value::Int(2));
    assert_eq!(run(seq(vec![con(1), con(2), con(3)])), Value::Int(3));
}

#[test]
fn test_seq_ignores_intermediate_values() {
    let program = seq(vec![con("side"), con(vec![9, 9]), con("last")]);
    assert_eq!(run(program), Value::from("last"));
}

#[test]
fn test_empty_par_yields_an_empty_list() {
    assert_eq!(run(par(vec![])), Value::List(Vec::new()));
}

#[test]
fn test_par_collects_in_operand_order() {
    assert_eq!(run(par(vec![con(1)])), Value::from(vec![1]));
    assert_eq!(run(par(vec![con(1), con(2)])), Value::from(vec![1, 2]));
    assert_eq!(
        run(par(vec![con(1), con(2), con(3)])),
        Value::from(vec![1, 2, 3]),
    );
}

#[test]
fn test_empty_arr_yields_an_empty_tuple() {
    assert_eq!(run(arr(vec![])), Value::List(Vec::new()));
}

#[test]
fn test_arr_collects_in_operand_order() {
    assert_eq!(
        run(arr(vec![con("a"), con(1)])),
        Value::List(vec![Value::from("a"), Value::Int(1)]),
    );
}

#[test]
fn test_nested_seq_of_par() {
    let program = seq(vec![par(vec![con(1), con(2)]), par(vec![con(3)])]);
    assert_eq!(run(program), Value::from(vec![3]));
}
