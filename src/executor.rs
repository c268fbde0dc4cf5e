//! The evaluation driver.
//!
//! [`Executor::execute`] reduces an operation tree to a single value. No
//! recursion happens on the host stack: every operation is decomposed into
//! five phase jobs registered in a [`DepIndex`], and a single-threaded loop
//! pops ready jobs, invokes the matching lifecycle callback, records the
//! result, and advances the job to its next phase. Operations spawn
//! children from their `Deps` and `PostDeps` callbacks; a child's `Result`
//! phase gates the parent's next phase.
//!
//! Evaluation terminates through the exit sentinel: a distinguished job
//! with no operation that depends on the root's `Result` phase. Popping it
//! means the root has settled. If the ready queue drains while the
//! sentinel is still pending, the graph is deadlocked and the run fails.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::Ctx;
use crate::dep::DepIndex;
use crate::error::{ExecError, OpError};
use crate::expr::{DefaultExprEvaluator, ExprEvaluator};
use crate::job::{JobId, JobKey, JobRec, Phase};
use crate::op::Op;
use crate::value::{OpRef, Value};

/// Single-threaded cooperative evaluator for operation trees.
///
/// An executor is reusable; each [`execute`](Executor::execute) call starts
/// from a fresh job store. The result and requirement tables of the most
/// recent run stay readable until the next run begins.
pub struct Executor {
    trace: bool,
    expr: Arc<dyn ExprEvaluator>,
    next_id: JobId,
    index: DepIndex<JobKey, JobRec, fn(&JobRec) -> JobKey>,
    results: HashMap<JobKey, Value>,
    reqs: HashMap<JobKey, Vec<JobKey>>,
}

impl Executor {
    /// Creates an executor. With `trace` enabled, every job transition
    /// emits a `debug`-level record under the `opforge::trace` target.
    pub fn new(trace: bool) -> Self {
        Self {
            trace,
            expr: Arc::new(DefaultExprEvaluator),
            next_id: 0,
            index: DepIndex::new(JobRec::key),
            results: HashMap::new(),
            reqs: HashMap::new(),
        }
    }

    /// Replaces the host-expression evaluator used by `Eval` string bodies.
    #[must_use]
    pub fn with_expr_evaluator(mut self, expr: impl ExprEvaluator + 'static) -> Self {
        self.expr = Arc::new(expr);
        self
    }

    /// Number of recorded phase results from the most recent run.
    pub fn results_len(&self) -> usize {
        self.results.len()
    }

    /// Reduces `root` to its value.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn execute(&mut self, root: Op) -> Result<Value, ExecError> {
        self.next_id = 0;
        self.index = DepIndex::new(JobRec::key);
        self.results.clear();
        self.reqs.clear();

        let root_ctx = Ctx::new();
        let root_rec = JobRec::new(
            self.alloc_id(),
            Phase::Deps,
            Some(Arc::new(root)),
            root_ctx.clone(),
        );
        let exit_rec = JobRec::new(self.alloc_id(), Phase::Deps, None, root_ctx);

        self.index
            .put(exit_rec, vec![(root_rec.id, Phase::Result)]);
        self.index.put(root_rec, Vec::new());

        while let Some((job, job_deps)) = self.index.try_pop() {
            let Some(op) = job.op.clone() else {
                // Exit sentinel: its only dependency is the root's Result.
                let value = job_deps
                    .first()
                    .and_then(|dep| self.results.get(&dep.key()))
                    .cloned()
                    .expect("exit sentinel released without a root result");
                return Ok(value);
            };

            let (new_ctx, children, value) = match self.step(&op, &job) {
                Ok(outcome) => outcome,
                Err(cause) => return Err(ExecError::new(job, job_deps, cause)),
            };

            let mut req_keys = Vec::with_capacity(children.len());
            for child in &children {
                let child_rec = JobRec::new(
                    self.alloc_id(),
                    Phase::Deps,
                    Some(child.clone()),
                    new_ctx.clone(),
                );
                req_keys.push((child_rec.id, Phase::Result));
                self.index.put(child_rec, Vec::new());
            }

            if self.trace {
                debug!(
                    target: "opforge::trace",
                    id = job.id,
                    phase = %job.phase,
                    op = %op,
                    spawned = children.len(),
                    value = %value,
                    ctx = %new_ctx,
                );
            }

            self.reqs.insert(job.key(), req_keys.clone());
            self.results.insert(job.key(), value);

            if let Some(next) = job.phase.successor() {
                self.index
                    .put(job.with_phase(next).with_ctx(new_ctx), req_keys);
            }
        }

        Err(ExecError::scheduler(OpError::DeadlockedGraph {
            pending: self.index.pending_len(),
        }))
    }

    fn alloc_id(&mut self) -> JobId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Invokes the lifecycle callback matching the job's phase, returning
    /// the updated context, spawned children, and the phase's value.
    fn step(&self, op: &Op, job: &JobRec) -> Result<(Ctx, Vec<OpRef>, Value), OpError> {
        let expr = &*self.expr;
        let ctx = job.ctx.clone();
        match job.phase {
            Phase::Deps => {
                let (ctx, children) = op.context_dependencies(expr, ctx)?;
                Ok((ctx, children, Value::None))
            }
            Phase::Exec => {
                let deps = self.gathered(job.id, Phase::Deps);
                let (ctx, value) = op.context_execute(expr, ctx, &deps)?;
                Ok((ctx, Vec::new(), value))
            }
            Phase::PostDeps => {
                let exec = self.result_of(job.id, Phase::Exec);
                let deps = self.gathered(job.id, Phase::Deps);
                let (ctx, children) = op.context_post_dependencies(expr, ctx, &exec, &deps)?;
                Ok((ctx, children, Value::None))
            }
            Phase::PostExec => {
                let exec = self.result_of(job.id, Phase::Exec);
                let deps = self.gathered(job.id, Phase::Deps);
                let post = self.gathered(job.id, Phase::PostDeps);
                let (ctx, value) = op.context_post_execute(expr, ctx, &exec, &deps, &post)?;
                Ok((ctx, Vec::new(), value))
            }
            Phase::Result => {
                let value = self.result_of(job.id, Phase::PostExec);
                Ok((ctx, Vec::new(), value))
            }
        }
    }

    /// Results of the children spawned in the given phase, in declaration
    /// order.
    fn gathered(&self, id: JobId, phase: Phase) -> Vec<Value> {
        self.reqs
            .get(&(id, phase))
            .map(|keys| {
                keys.iter()
                    .map(|key| self.results.get(key).cloned().unwrap_or(Value::None))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn result_of(&self, id: JobId, phase: Phase) -> Value {
        self.results
            .get(&(id, phase))
            .cloned()
            .unwrap_or(Value::None)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{con, seq};

    #[test]
    fn test_executor_is_reusable() {
        let mut ex = Executor::new(false);
        assert_eq!(ex.execute(con(1)).unwrap(), Value::Int(1));
        assert_eq!(ex.execute(con(2)).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_results_survive_until_next_run() {
        let mut ex = Executor::new(false);
        ex.execute(seq(vec![con(1), con(2)])).unwrap();
        assert!(ex.results_len() > 0);
    }
}
