//! Construction-time sugar: operators and builder methods that synthesize
//! `Eval`/`GetAttr`/`GetItem` nodes.
//!
//! The evaluator never sees these operators; by the time a program runs,
//! `a + b` is an ordinary `Eval` over a built-in host callable.

use crate::value::{self, Value};

use super::{eval_fn, get_attr, get_attr_or, get_item, Op};

fn truthy_bool(v: bool) -> anyhow::Result<Value> {
    Ok(Value::Bool(v))
}

#[track_caller]
fn binary(lhs: Op, rhs: Op, apply: fn(&Value, &Value) -> anyhow::Result<Value>) -> Op {
    eval_fn(vec![lhs, rhs], move |args| apply(&args[0], &args[1]))
}

#[track_caller]
fn comparison(lhs: Op, rhs: Op, accept: fn(std::cmp::Ordering) -> bool) -> Op {
    eval_fn(vec![lhs, rhs], move |args| {
        let ordering = value::compare(&args[0], &args[1])?;
        truthy_bool(accept(ordering))
    })
}

impl<R: Into<Op>> std::ops::Add<R> for Op {
    type Output = Op;

    #[track_caller]
    fn add(self, rhs: R) -> Op {
        binary(self, rhs.into(), value::add)
    }
}

impl<R: Into<Op>> std::ops::Sub<R> for Op {
    type Output = Op;

    #[track_caller]
    fn sub(self, rhs: R) -> Op {
        binary(self, rhs.into(), value::sub)
    }
}

impl<R: Into<Op>> std::ops::Mul<R> for Op {
    type Output = Op;

    #[track_caller]
    fn mul(self, rhs: R) -> Op {
        binary(self, rhs.into(), value::mul)
    }
}

impl<R: Into<Op>> std::ops::Div<R> for Op {
    type Output = Op;

    #[track_caller]
    fn div(self, rhs: R) -> Op {
        binary(self, rhs.into(), value::div)
    }
}

impl<R: Into<Op>> std::ops::Rem<R> for Op {
    type Output = Op;

    #[track_caller]
    fn rem(self, rhs: R) -> Op {
        binary(self, rhs.into(), value::rem)
    }
}

impl std::ops::Neg for Op {
    type Output = Op;

    #[track_caller]
    fn neg(self) -> Op {
        eval_fn(vec![self], |args| value::neg(&args[0]))
    }
}

impl std::ops::Not for Op {
    type Output = Op;

    #[track_caller]
    fn not(self) -> Op {
        eval_fn(vec![self], |args| truthy_bool(!args[0].truthy()))
    }
}

impl Op {
    /// `self == other`, numeric across int/float.
    #[track_caller]
    pub fn eq(self, other: impl Into<Op>) -> Op {
        eval_fn(vec![self, other.into()], |args| {
            truthy_bool(args[0] == args[1])
        })
    }

    /// `self != other`.
    #[track_caller]
    pub fn ne(self, other: impl Into<Op>) -> Op {
        eval_fn(vec![self, other.into()], |args| {
            truthy_bool(args[0] != args[1])
        })
    }

    /// `self < other`.
    #[track_caller]
    pub fn lt(self, other: impl Into<Op>) -> Op {
        comparison(self, other.into(), std::cmp::Ordering::is_lt)
    }

    /// `self <= other`.
    #[track_caller]
    pub fn le(self, other: impl Into<Op>) -> Op {
        comparison(self, other.into(), std::cmp::Ordering::is_le)
    }

    /// `self > other`.
    #[track_caller]
    pub fn gt(self, other: impl Into<Op>) -> Op {
        comparison(self, other.into(), std::cmp::Ordering::is_gt)
    }

    /// `self >= other`.
    #[track_caller]
    pub fn ge(self, other: impl Into<Op>) -> Op {
        comparison(self, other.into(), std::cmp::Ordering::is_ge)
    }

    /// Truthiness conjunction; yields a boolean, not the operand.
    #[track_caller]
    pub fn and(self, other: impl Into<Op>) -> Op {
        eval_fn(vec![self, other.into()], |args| {
            truthy_bool(args[0].truthy() && args[1].truthy())
        })
    }

    /// Truthiness disjunction; yields a boolean, not the operand.
    #[track_caller]
    pub fn or(self, other: impl Into<Op>) -> Op {
        eval_fn(vec![self, other.into()], |args| {
            truthy_bool(args[0].truthy() || args[1].truthy())
        })
    }

    /// Membership: element of a list, key of a map, or substring.
    #[track_caller]
    pub fn is_in(self, container: impl Into<Op>) -> Op {
        eval_fn(vec![self, container.into()], |args| {
            let (needle, haystack) = (&args[0], &args[1]);
            let found = match haystack {
                Value::List(items) => items.contains(needle),
                Value::Map(entries) => match needle {
                    Value::Str(key) => entries.contains_key(key),
                    _ => false,
                },
                Value::Str(text) => match needle {
                    Value::Str(part) => text.contains(part.as_str()),
                    _ => false,
                },
                _ => anyhow::bail!("{} is not a container", haystack.type_name()),
            };
            truthy_bool(found)
        })
    }

    /// Size of the evaluated value (`GetAttr` with the `len` key).
    #[track_caller]
    pub fn len(self) -> Op {
        get_attr(self, "len")
    }

    /// Named member of the evaluated value.
    #[track_caller]
    pub fn attr(self, name: &str) -> Op {
        get_attr(self, name)
    }

    /// Named member with a fallback.
    #[track_caller]
    pub fn attr_or(self, name: &str, default: impl Into<Op>) -> Op {
        get_attr_or(self, name, default)
    }

    /// Index of the evaluated value.
    #[track_caller]
    pub fn item(self, key: impl Into<Op>) -> Op {
        get_item(self, key)
    }
}
