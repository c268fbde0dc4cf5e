//! `Eval`: the boundary between operation trees and the host.
//!
//! An `Eval` body comes in three families: a host-expression string
//! evaluated with the argument values bound to positional names, a host
//! callable invoked with the values directly, or a nested operation
//! (supplied literally or built by a host callable) that is evaluated as a
//! post-dependency. The last family is how deferred sub-trees enter a
//! running program.

use std::fmt;
use std::sync::Arc;

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::atom::ConOp;
use super::{Lifecycle, Op, OpKind, StepEnv};

/// A host callable crossing the evaluation boundary.
pub type HostFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// The body of an `Eval` operation.
#[derive(Clone)]
pub(crate) enum EvalBody {
    /// A host-expression string, evaluated with positional argument names.
    Expr(String),
    /// A host callable receiving the argument values.
    Func(HostFn),
    /// A nested operation, evaluated as a post-dependency.
    Op(OpRef),
    /// A host callable building a deferred operation from the argument
    /// values.
    Build(HostFn),
}

impl fmt::Debug for EvalBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalBody::Expr(source) => f.debug_tuple("Expr").field(source).finish(),
            EvalBody::Func(_) => f.write_str("Func(<host fn>)"),
            EvalBody::Op(op) => f.debug_tuple("Op").field(op).finish(),
            EvalBody::Build(_) => f.write_str("Build(<host fn>)"),
        }
    }
}

impl fmt::Display for EvalBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalBody::Expr(source) => write!(f, "{:?}", source),
            EvalBody::Func(_) => f.write_str("<host fn>"),
            EvalBody::Op(op) => write!(f, "{}", op),
            EvalBody::Build(_) => f.write_str("<deferred>"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EvalOp {
    pub(crate) args: Vec<OpRef>,
    pub(crate) body: EvalBody,
    pub(crate) wrap: bool,
}

impl Lifecycle for EvalOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, self.args.clone()))
    }

    fn execute(&self, env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let value = match &self.body {
            EvalBody::Expr(source) => {
                let bindings = positional_bindings(deps);
                env.expr
                    .eval(source, &bindings)
                    .map_err(|cause| OpError::Host { cause })?
            }
            EvalBody::Func(f) | EvalBody::Build(f) => {
                f(deps).map_err(|cause| OpError::Host { cause })?
            }
            EvalBody::Op(op) => Value::Op(op.clone()),
        };
        Ok((ctx, value))
    }

    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        match &self.body {
            EvalBody::Expr(_) | EvalBody::Func(_) => Ok((ctx, Vec::new())),
            EvalBody::Op(op) => Ok((ctx, vec![op.clone()])),
            EvalBody::Build(_) => match exec {
                Value::Op(op) => Ok((ctx, vec![op.clone()])),
                plain if self.wrap => {
                    let wrapped = Op::at(
                        env.loc,
                        OpKind::Con(ConOp {
                            value: plain.clone(),
                        }),
                    );
                    Ok((ctx, vec![Arc::new(wrapped)]))
                }
                plain => Err(OpError::EvalBodyNotOp {
                    value: plain.to_string(),
                }),
            },
        }
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        _deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let value = match &self.body {
            EvalBody::Expr(_) | EvalBody::Func(_) => exec.clone(),
            EvalBody::Op(_) | EvalBody::Build(_) => post.first().cloned().unwrap_or(Value::None),
        };
        Ok((ctx, value))
    }
}

/// Binds argument values to their positional expression names.
///
/// Index `i` binds under two names at once: a base-26 letter name
/// (`a`…`z`, then `ab`, `bb`, … with the least significant letter first)
/// and the plain `x{i}`.
pub(crate) fn positional_bindings(deps: &[Value]) -> Vec<(String, Value)> {
    let mut bindings = Vec::with_capacity(deps.len() * 2);
    for (i, value) in deps.iter().enumerate() {
        bindings.push((letter_name(i), value.clone()));
    }
    for (i, value) in deps.iter().enumerate() {
        bindings.push((format!("x{}", i), value.clone()));
    }
    bindings
}

fn letter_name(mut i: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut name = String::new();
    loop {
        name.push(ALPHABET[i % 26] as char);
        i /= 26;
        if i == 0 {
            break;
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_names_are_little_endian_base26() {
        assert_eq!(letter_name(0), "a");
        assert_eq!(letter_name(1), "b");
        assert_eq!(letter_name(25), "z");
        assert_eq!(letter_name(26), "ab");
        assert_eq!(letter_name(27), "bb");
    }

    #[test]
    fn test_positional_bindings_cover_both_name_families() {
        let deps = vec![Value::Int(10), Value::Int(20)];
        let bindings = positional_bindings(&deps);
        assert!(bindings.contains(&("a".to_string(), Value::Int(10))));
        assert!(bindings.contains(&("b".to_string(), Value::Int(20))));
        assert!(bindings.contains(&("x0".to_string(), Value::Int(10))));
        assert!(bindings.contains(&("x1".to_string(), Value::Int(20))));
    }
}
