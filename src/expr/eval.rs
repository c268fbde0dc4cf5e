//! Tree-walking evaluator for the built-in expression language.

use std::collections::HashMap;

use anyhow::bail;

use crate::value::{self, Value};

use super::{BinOp, Expr, UnaryOp};

pub(crate) fn eval(expr: &Expr, env: &HashMap<String, Value>) -> anyhow::Result<Value> {
    match expr {
        Expr::None => Ok(Value::None),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Name(name) => match env.get(name) {
            Some(found) => Ok(found.clone()),
            None => bail!("name `{}` is not defined", name),
        },
        Expr::Tuple(items) | Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, env))
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(Value::List(values))
        }
        Expr::Unary(UnaryOp::Neg, inner) => value::neg(&eval(inner, env)?),
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!eval(inner, env)?.truthy())),
        Expr::Binary(BinOp::And, lhs, rhs) => {
            if !eval(lhs, env)?.truthy() {
                Ok(Value::Bool(false))
            } else {
                Ok(Value::Bool(eval(rhs, env)?.truthy()))
            }
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            if eval(lhs, env)?.truthy() {
                Ok(Value::Bool(true))
            } else {
                Ok(Value::Bool(eval(rhs, env)?.truthy()))
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let (a, b) = (eval(lhs, env)?, eval(rhs, env)?);
            apply_binary(*op, &a, &b)
        }
        Expr::Cond { then, test, other } => {
            if eval(test, env)?.truthy() {
                eval(then, env)
            } else {
                eval(other, env)
            }
        }
        Expr::Index(target, index) => {
            let (target, index) = (eval(target, env)?, eval(index, env)?);
            match target.index(&index) {
                Some(found) => Ok(found),
                None => bail!(
                    "index `{}` is missing on {} value",
                    index,
                    target.type_name()
                ),
            }
        }
        Expr::Attr(target, member) => {
            let target = eval(target, env)?;
            match target.attr(member) {
                Some(found) => Ok(found),
                None => bail!(
                    "member `{}` is missing on {} value",
                    member,
                    target.type_name()
                ),
            }
        }
    }
}

fn apply_binary(op: BinOp, a: &Value, b: &Value) -> anyhow::Result<Value> {
    match op {
        BinOp::Add => value::add(a, b),
        BinOp::Sub => value::sub(a, b),
        BinOp::Mul => value::mul(a, b),
        BinOp::Div => value::div(a, b),
        BinOp::Mod => value::rem(a, b),
        BinOp::Eq => Ok(Value::Bool(a == b)),
        BinOp::Ne => Ok(Value::Bool(a != b)),
        BinOp::Lt => Ok(Value::Bool(value::compare(a, b)?.is_lt())),
        BinOp::Le => Ok(Value::Bool(value::compare(a, b)?.is_le())),
        BinOp::Gt => Ok(Value::Bool(value::compare(a, b)?.is_gt())),
        BinOp::Ge => Ok(Value::Bool(value::compare(a, b)?.is_ge())),
        BinOp::And | BinOp::Or => unreachable!("logic operators short-circuit in eval"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    fn run(source: &str, env: &[(&str, Value)]) -> anyhow::Result<Value> {
        let env: HashMap<String, Value> = env
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        eval(&parse(source).unwrap(), &env)
    }

    #[test]
    fn test_short_circuit_and() {
        // `q` is undefined; short-circuit must avoid evaluating it.
        assert_eq!(run("False and q", &[]).unwrap(), Value::Bool(false));
        assert!(run("True and q", &[]).is_err());
    }

    #[test]
    fn test_short_circuit_or() {
        assert_eq!(run("True or q", &[]).unwrap(), Value::Bool(true));
        assert!(run("False or q", &[]).is_err());
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            run("a + 'c'", &[("a", Value::from("ab"))]).unwrap(),
            Value::from("abc"),
        );
    }

    #[test]
    fn test_modulo_chain() {
        assert_eq!(run("17 % 5 % 2", &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_negative_literal_arithmetic() {
        assert_eq!(run("-3 * -2", &[]).unwrap(), Value::Int(6));
    }
}
