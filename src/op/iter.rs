//! Iterating operations: `Map`, `Fil`, and the general `Iter` loop.
//!
//! All three realize repetition without host-stack recursion: the iterable
//! (or the loop step) evaluates as a pre-dependency, and the per-element
//! work is spawned as post-dependencies once the elements are known.

use std::sync::Arc;

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::flow::{synth_con, synth_with, ArrOp};
use super::{Lifecycle, Op, OpKind, StepEnv};

/// `Map`: evaluates a body once per element, preserving input order.
#[derive(Debug, Clone)]
pub(crate) struct MapOp {
    pub(crate) var: String,
    pub(crate) body: OpRef,
    pub(crate) iterable: OpRef,
}

impl Lifecycle for MapOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, vec![self.iterable.clone()]))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        require_list(&deps[0])?;
        Ok((ctx, deps[0].clone()))
    }

    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let elements = require_list(exec)?;
        let children = elements
            .iter()
            .map(|element| {
                synth_with(
                    env,
                    &self.var,
                    synth_con(env, element.clone()),
                    self.body.clone(),
                )
            })
            .collect();
        Ok((ctx, children))
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        Ok((ctx, Value::List(post.to_vec())))
    }
}

/// `Fil`: keeps elements whose predicate is truthy, preserving input
/// order.
///
/// Each element spawns an `Arr` pairing the element with its predicate
/// verdict, so `PostExec` can filter without re-evaluating anything.
#[derive(Debug, Clone)]
pub(crate) struct FilOp {
    pub(crate) var: String,
    pub(crate) pred: OpRef,
    pub(crate) iterable: OpRef,
}

impl Lifecycle for FilOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, vec![self.iterable.clone()]))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        require_list(&deps[0])?;
        Ok((ctx, deps[0].clone()))
    }

    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let elements = require_list(exec)?;
        let children = elements
            .iter()
            .map(|element| {
                let element_var = Arc::new(Op::at(
                    env.loc,
                    OpKind::Var(super::atom::VarOp {
                        name: self.var.clone(),
                    }),
                ));
                let paired = Arc::new(Op::at(
                    env.loc,
                    OpKind::Arr(ArrOp {
                        ops: vec![element_var, self.pred.clone()],
                    }),
                ));
                synth_with(env, &self.var, synth_con(env, element.clone()), paired)
            })
            .collect();
        Ok((ctx, children))
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let mut kept = Vec::new();
        for pair in post {
            let Some([element, verdict]) = pair.as_list().and_then(|p| p.first_chunk::<2>())
            else {
                return Err(OpError::NotPair {
                    value: pair.to_string(),
                });
            };
            if verdict.truthy() {
                kept.push(element.clone());
            }
        }
        Ok((ctx, Value::List(kept)))
    }
}

/// `Iter`: a general loop driven by an `(item, next_aggregate)` stepping
/// operation.
///
/// One round evaluates `next` with the loop variable bound to the current
/// aggregate. A `None` next-aggregate ends the loop; otherwise the round
/// spawns the continuation and this step's body as post-dependencies. The
/// loop's value is the body result of the last round that ran a body: each
/// round prefers its continuation's value and falls back to its own body
/// value once the continuation reports `None`.
#[derive(Debug, Clone)]
pub(crate) struct IterOp {
    pub(crate) var: String,
    pub(crate) init: OpRef,
    pub(crate) next: OpRef,
    pub(crate) body: OpRef,
}

impl Lifecycle for IterOp {
    fn dependencies(&self, env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let step = synth_with(env, &self.var, self.init.clone(), self.next.clone());
        Ok((ctx, vec![step]))
    }

    fn execute(&self, _env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let step = &deps[0];
        if step.as_list().map(|p| p.len()) != Some(2) {
            return Err(OpError::NotPair {
                value: step.to_string(),
            });
        }
        Ok((ctx, step.clone()))
    }

    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        _deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let Some([item, next_agg]) = exec.as_list().and_then(|p| p.first_chunk::<2>()) else {
            return Err(OpError::NotPair {
                value: exec.to_string(),
            });
        };
        if next_agg.is_none() {
            return Ok((ctx, Vec::new()));
        }
        let continuation = Arc::new(Op::at(
            env.loc,
            OpKind::Iter(IterOp {
                var: self.var.clone(),
                init: synth_con(env, next_agg.clone()),
                next: self.next.clone(),
                body: self.body.clone(),
            }),
        ));
        let step_body = synth_with(
            env,
            &self.var,
            synth_con(env, item.clone()),
            self.body.clone(),
        );
        Ok((ctx, vec![continuation, step_body]))
    }

    fn post_execute(
        &self,
        _env: &StepEnv<'_>,
        ctx: Ctx,
        _exec: &Value,
        _deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let value = match post {
            [continuation, step_body] => {
                if continuation.is_none() {
                    step_body.clone()
                } else {
                    continuation.clone()
                }
            }
            _ => Value::None,
        };
        Ok((ctx, value))
    }
}

fn require_list(value: &Value) -> Result<&[Value], OpError> {
    value.as_list().ok_or(OpError::NotIterable {
        type_name: value.type_name(),
    })
}
