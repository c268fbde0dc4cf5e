//! Job records: the scheduling units of an evaluation.
//!
//! Every operation is driven through five phases; each `(operation, phase)`
//! pair is materialized as a [`JobRec`] and keyed by [`JobKey`] in the
//! dependency index. The phase graph is a straight line, so a job advances
//! by rewriting its own record with the successor phase.

use std::fmt;

use strum::Display;

use crate::context::Ctx;
use crate::op::Loc;
use crate::value::OpRef;

/// Process-unique, monotonically increasing job identifier.
pub type JobId = u64;

/// Identity of one phase of one job in the dependency index.
pub type JobKey = (JobId, Phase);

/// Lifecycle phase of a job.
///
/// `Deps` and `PostDeps` enumerate dependencies; `Exec` and `PostExec`
/// produce values; `Result` republishes the final value under a stable key
/// so consumers can depend on an operation without knowing which phase
/// produced its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Phase {
    /// Enumerate pre-dependencies.
    Deps,
    /// Compute the primary value from pre-dependency results.
    Exec,
    /// Enumerate post-dependencies from the primary value.
    PostDeps,
    /// Combine all results into the final value.
    PostExec,
    /// Republish the final value.
    Result,
}

impl Phase {
    /// The next phase in the straight-line lifecycle, if any.
    pub fn successor(self) -> Option<Phase> {
        match self {
            Phase::Deps => Some(Phase::Exec),
            Phase::Exec => Some(Phase::PostDeps),
            Phase::PostDeps => Some(Phase::PostExec),
            Phase::PostExec => Some(Phase::Result),
            Phase::Result => None,
        }
    }
}

/// One phase of one operation, scheduled in the dependency index.
///
/// `op` is `None` only for the exit sentinel, the distinguished job whose
/// readiness terminates the driver loop.
#[derive(Debug, Clone)]
pub struct JobRec {
    /// Process-unique job identifier.
    pub id: JobId,
    /// The phase this record schedules.
    pub phase: Phase,
    /// The operation, or `None` for the exit sentinel.
    pub op: Option<OpRef>,
    /// Context this phase will execute under.
    pub ctx: Ctx,
}

impl JobRec {
    pub(crate) fn new(id: JobId, phase: Phase, op: Option<OpRef>, ctx: Ctx) -> Self {
        Self { id, phase, op, ctx }
    }

    /// Identity of this record in the dependency index.
    pub fn key(&self) -> JobKey {
        (self.id, self.phase)
    }

    /// The same job at a different phase.
    #[must_use]
    pub fn with_phase(&self, phase: Phase) -> JobRec {
        JobRec {
            phase,
            ..self.clone()
        }
    }

    /// The same job with an updated context.
    #[must_use]
    pub fn with_ctx(&self, ctx: Ctx) -> JobRec {
        JobRec {
            ctx,
            ..self.clone()
        }
    }

    /// Construction site of this job's operation, if it has one.
    pub fn loc(&self) -> Option<Loc> {
        self.op.as_ref().map(|op| op.loc())
    }
}

impl fmt::Display for JobRec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Some(op) => write!(
                f,
                "job {} {} {} at {}",
                self.id,
                self.phase,
                op.name(),
                op.loc()
            ),
            None => write!(f, "job {} {} <exit>", self.id, self.phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_is_a_straight_line() {
        assert!(Phase::Deps < Phase::Exec);
        assert!(Phase::Exec < Phase::PostDeps);
        assert!(Phase::PostDeps < Phase::PostExec);
        assert!(Phase::PostExec < Phase::Result);
        assert_eq!(Phase::Deps.successor(), Some(Phase::Exec));
        assert_eq!(Phase::Result.successor(), None);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::PostDeps.to_string(), "PostDeps");
    }

    #[test]
    fn test_job_key_tracks_phase() {
        let rec = JobRec::new(3, Phase::Deps, None, Ctx::new());
        assert_eq!(rec.key(), (3, Phase::Deps));
        assert_eq!(rec.with_phase(Phase::Result).key(), (3, Phase::Result));
    }
}
