//! `Match`: ordered case selection over a bound value.

use std::sync::Arc;

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::flow::synth_with;
use super::{Lifecycle, Op, OpKind, StepEnv};

/// One `Match` arm: a match operation and the body selected when it is
/// truthy. Both run with the match variable bound to the matched value.
#[derive(Debug, Clone)]
pub struct Case {
    pub(crate) match_op: OpRef,
    pub(crate) body: OpRef,
}

impl Case {
    /// Creates a case from a match operation and a body.
    pub fn new(match_op: impl Into<Op>, body: impl Into<Op>) -> Self {
        Self {
            match_op: Arc::new(match_op.into()),
            body: Arc::new(body.into()),
        }
    }
}

/// `Match`: tries cases in order and short-circuits on the first truthy
/// match.
///
/// Each round evaluates the head case's match operation as a
/// pre-dependency (with the variable bound), then either selects that
/// case's body or reduces to a fresh `Match` over the remaining cases as a
/// post-dependency. Running out of cases fails `Unmatched` from the
/// reduced node, which inherits this node's location.
#[derive(Debug, Clone)]
pub(crate) struct MatchOp {
    pub(crate) var: String,
    pub(crate) value: OpRef,
    pub(crate) cases: Vec<Case>,
}

impl Lifecycle for MatchOp {
    fn dependencies(&self, env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let Some(head) = self.cases.first() else {
            return Err(OpError::Unmatched);
        };
        let probe = synth_with(env, &self.var, self.value.clone(), head.match_op.clone());
        Ok((ctx, vec![probe]))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, deps[0].clone()))
    }

    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let child = if exec.truthy() {
            synth_with(
                env,
                &self.var,
                self.value.clone(),
                self.cases[0].body.clone(),
            )
        } else {
            Arc::new(Op::at(
                env.loc,
                OpKind::Match(MatchOp {
                    var: self.var.clone(),
                    value: self.value.clone(),
                    cases: self.cases[1..].to_vec(),
                }),
            ))
        };
        Ok((ctx, vec![child]))
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, post.first().cloned().unwrap_or(Value::None)))
    }
}
