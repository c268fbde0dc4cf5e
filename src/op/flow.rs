//! Structural operations: sequencing, simultaneous groups, and scoped
//! bindings.

use std::sync::Arc;

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::{Lifecycle, Op, OpKind, StepEnv};

/// `Seq`: strict left-to-right execution.
///
/// Sequencing is a head/tail recursion through post-dependencies: the head
/// runs as a pre-dependency, and the remaining operations are rewrapped as
/// a fresh `Seq` post-dependency, which only starts once the head has
/// settled. The value is the tail's value, so the whole sequence yields
/// its last operand (or `None` when empty).
#[derive(Debug, Clone)]
pub(crate) struct SeqOp {
    pub(crate) ops: Vec<OpRef>,
}

impl Lifecycle for SeqOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, self.ops.first().cloned().into_iter().collect()))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, deps.first().cloned().unwrap_or(Value::None)))
    }

    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        if self.ops.len() > 1 {
            let tail = Op::at(
                env.loc,
                OpKind::Seq(SeqOp {
                    ops: self.ops[1..].to_vec(),
                }),
            );
            Ok((ctx, vec![Arc::new(tail)]))
        } else {
            Ok((ctx, Vec::new()))
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
        let value = match post.first() {
            Some(tail) => tail.clone(),
            None => exec.clone(),
        };
        Ok((ctx, value))
    }
}

/// `Par`: declares all operands at once; yields their values in operand
/// order.
#[derive(Debug, Clone)]
pub(crate) struct ParOp {
    pub(crate) ops: Vec<OpRef>,
}

impl Lifecycle for ParOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, self.ops.clone()))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, Value::List(deps.to_vec())))
    }
}

/// `Arr`: like `Par`, but contractually a fixed-arity tuple. `Fil` pairs
/// each element with its predicate verdict through one of these.
#[derive(Debug, Clone)]
pub(crate) struct ArrOp {
    pub(crate) ops: Vec<OpRef>,
}

impl Lifecycle for ArrOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, self.ops.clone()))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, Value::List(deps.to_vec())))
    }
}

/// `With`: scoped bindings.
///
/// Binding values evaluate as pre-dependencies under the outer context;
/// `Exec` pushes them, the body runs as a post-dependency under the
/// extended context, and `PostExec` pops them again. Shadowing works
/// because `pop` removes only the topmost binding of each name.
#[derive(Debug, Clone)]
pub(crate) struct WithOp {
    pub(crate) bindings: Vec<(String, OpRef)>,
    pub(crate) body: OpRef,
}

impl Lifecycle for WithOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, self.bindings.iter().map(|(_, v)| v.clone()).collect()))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let mut ctx = ctx;
        for ((name, _), value) in self.bindings.iter().zip(deps) {
            ctx = ctx.push(name.clone(), value.clone());
        }
        Ok((ctx, Value::None))
    }

    fn post_dependencies(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, vec![self.body.clone()]))
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let mut ctx = ctx;
        for (name, _) in self.bindings.iter().rev() {
            ctx = ctx.pop(name)?;
        }
        Ok((ctx, post.first().cloned().unwrap_or(Value::None)))
    }
}

/// Builds a `With` wrapper sharing the given subtrees, inheriting the
/// synthesizing operation's location. Used by the iterating and matching
/// operations to bind their element variables.
pub(crate) fn synth_with(env: &StepEnv<'_>, name: &str, value: OpRef, body: OpRef) -> OpRef {
    Arc::new(Op::at(
        env.loc,
        OpKind::With(WithOp {
            bindings: vec![(name.to_string(), value)],
            body,
        }),
    ))
}

/// Builds a constant node inheriting the synthesizing operation's location.
pub(crate) fn synth_con(env: &StepEnv<'_>, value: Value) -> OpRef {
    Arc::new(Op::at(
        env.loc,
        OpKind::Con(super::atom::ConOp { value }),
    ))
}
