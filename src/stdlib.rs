//! Prebuilt function values for common program shapes.

use crate::op::{err, fun, match_, var, Case, Op};
use crate::value::Value;

/// A function of one list that yields the list's only element, or fails
/// with the list's length when it does not have exactly one.
///
/// Apply with [`crate::op::call`]:
///
/// ```
/// use opforge::executor::Executor;
/// use opforge::op::con;
/// use opforge::stdlib::assert_single;
/// use opforge::value::Value;
///
/// let mut ex = Executor::new(false);
/// let program = opforge::op::call(assert_single(), vec![con(vec![5])]);
/// assert_eq!(ex.execute(program).unwrap(), Value::Int(5));
/// ```
#[track_caller]
pub fn assert_single() -> Op {
    fun(
        &["items"],
        match_(
            "m",
            var("items"),
            vec![
                Case::new(var("m").len().eq(1), var("m").item(0)),
                Case::new(true, err("Wrong number of items: %s", vec![var("m").len()])),
            ],
        ),
    )
}

/// A function of one value that fails on `None` and passes anything else
/// through unchanged.
#[track_caller]
pub fn assert_not_none() -> Op {
    fun(
        &["x"],
        match_(
            "m",
            var("x"),
            vec![
                Case::new(var("m").eq(Value::None), err("%s is None", vec![var("m")])),
                Case::new(true, var("m")),
            ],
        ),
    )
}
