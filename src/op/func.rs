//! Function values and their application.

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::{Lifecycle, Op, OpKind, StepEnv};

/// `Fun`: a first-class function value.
///
/// Executing a `Fun` yields the node itself as a value; the body only runs
/// when a `Call` applies it. Free variables in the body resolve against
/// the context at the call site, not the definition site.
#[derive(Debug, Clone)]
pub(crate) struct FunOp {
    pub(crate) params: Vec<String>,
    pub(crate) body: OpRef,
}

impl Lifecycle for FunOp {
    fn execute(&self, env: &StepEnv<'_>, ctx: Ctx, _deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let node = Op::at(env.loc, OpKind::Fun(self.clone()));
        Ok((ctx, Value::Op(node.into())))
    }
}

/// `Call`: applies an evaluated function value to evaluated arguments.
///
/// The callee and all arguments evaluate as pre-dependencies. `PostDeps`
/// checks arity, binds each formal to its actual, and requests the
/// function body; `PostExec` pops the bindings again.
#[derive(Debug, Clone)]
pub(crate) struct CallOp {
    pub(crate) target: OpRef,
    pub(crate) args: Vec<OpRef>,
}

impl CallOp {
    fn resolve<'a>(&self, deps: &'a [Value]) -> Result<&'a FunOp, OpError> {
        let callee = &deps[0];
        let Value::Op(op) = callee else {
            return Err(OpError::NotCallable {
                value: callee.to_string(),
            });
        };
        match &op.kind {
            OpKind::Fun(fun) => Ok(fun),
            _ => Err(OpError::NotCallable {
                value: callee.to_string(),
            }),
        }
    }
}

impl Lifecycle for CallOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let mut deps = vec![self.target.clone()];
        deps.extend(self.args.iter().cloned());
        Ok((ctx, deps))
    }

    fn post_dependencies(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let fun = self.resolve(deps)?;
        let given = deps.len() - 1;
        let expected = fun.params.len();
        if given < expected {
            return Err(OpError::MissingArgs { expected, given });
        }
        if given > expected {
            return Err(OpError::ExtraArgs { expected, given });
        }

        let mut ctx = ctx;
        for (param, actual) in fun.params.iter().zip(&deps[1..]) {
            ctx = ctx.push(param.clone(), actual.clone());
        }
        Ok((ctx, vec![fun.body.clone()]))
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let fun = self.resolve(deps)?;
        let mut ctx = ctx;
        for param in fun.params.iter().rev() {
            ctx = ctx.pop(param)?;
        }
        Ok((ctx, post.first().cloned().unwrap_or(Value::None)))
    }
}
