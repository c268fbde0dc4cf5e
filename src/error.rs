//! Domain-specific error types for opforge.
//!
//! This module defines `OpError`, a `thiserror`-based enum with typed
//! variants for every way an operation or the scheduler can fail, and
//! `ExecError`, the wrapper the executor raises around any such failure.
//! `ExecError` carries the failing job record and the records of its
//! dependencies, so the construction site of the failing operation stays
//! recoverable for diagnostics.
//!
//! Host-side failures (expression evaluation, host callables) cross the
//! boundary as `anyhow::Error` and are carried in `OpError::Host`.

use std::fmt;

use crate::job::JobRec;
use crate::op::Loc;

/// Typed failure raised by a lifecycle callback, a context lookup, or the
/// scheduler.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OpError {
    /// A `Var` lookup (or context `pop`) missed.
    #[error("name `{0}` is not bound in the current context")]
    NameUnbound(String),

    /// `GetAttr` missed and no default was given.
    #[error("member `{name}` is missing on {type_name} value")]
    MemberMissing {
        /// The requested member name.
        name: String,
        /// Type of the value the member was looked up on.
        type_name: &'static str,
    },

    /// `GetItem` missed.
    #[error("index `{key}` is missing on {type_name} value")]
    IndexMissing {
        /// Display form of the requested key.
        key: String,
        /// Type of the value that was indexed.
        type_name: &'static str,
    },

    /// A `Match` ran out of cases without a truthy match.
    #[error("no case matched")]
    Unmatched,

    /// A deferred `Eval` body produced a plain value without `wrap`.
    #[error("`{value}` returned to Eval is not an Op")]
    EvalBodyNotOp {
        /// Display form of the offending value.
        value: String,
    },

    /// `Map`/`Fil` received a non-list iterable.
    #[error("expected a list to iterate, got {type_name}")]
    NotIterable {
        /// Type of the value that was iterated.
        type_name: &'static str,
    },

    /// `Iter`'s next-op produced something other than an `(item, next)` pair.
    #[error("expected an (item, next) pair, got `{value}`")]
    NotPair {
        /// Display form of the offending value.
        value: String,
    },

    /// `Call` resolved its callee to something other than a function.
    #[error("`{value}` is not callable")]
    NotCallable {
        /// Display form of the offending value.
        value: String,
    },

    /// `Call` supplied fewer arguments than the function declares.
    #[error("function takes {expected} argument(s) but {given} were given")]
    MissingArgs {
        /// Number of declared parameters.
        expected: usize,
        /// Number of supplied arguments.
        given: usize,
    },

    /// `Call` supplied more arguments than the function declares.
    #[error("function takes {expected} argument(s) but {given} were given")]
    ExtraArgs {
        /// Number of declared parameters.
        expected: usize,
        /// Number of supplied arguments.
        given: usize,
    },

    /// A `Fun` was constructed with a repeated parameter name.
    #[error("duplicate parameter name `{0}` in function definition")]
    DuplicateArg(String),

    /// The program invoked `Err`.
    #[error("{0}")]
    User(String),

    /// `DepIndex::pop` was called with no ready item.
    #[error("no ready item in the dependency queue")]
    QueueEmpty,

    /// The ready queue drained while jobs were still pending.
    #[error("dependency graph deadlocked with {pending} job(s) pending")]
    DeadlockedGraph {
        /// Jobs still registered but unreleasable.
        pending: usize,
    },

    /// A host callable or host expression failed.
    #[error("host evaluation failed: {cause:#}")]
    Host {
        /// The boundary-side failure.
        cause: anyhow::Error,
    },
}

/// Failure of a whole evaluation.
///
/// Wraps the underlying [`OpError`] together with the job record that was
/// executing and the records of its dependencies, as popped from the
/// dependency index. `job` is `None` only for scheduler-level failures
/// with no job in flight (a deadlocked graph).
#[derive(Debug)]
pub struct ExecError {
    /// The job whose lifecycle callback failed, if any.
    pub job: Option<JobRec>,
    /// Dependency records of the failing job, in declaration order.
    pub job_deps: Vec<JobRec>,
    /// The underlying failure.
    pub cause: OpError,
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl ExecError {
    pub(crate) fn new(job: JobRec, job_deps: Vec<JobRec>, cause: OpError) -> Self {
        Self {
            job: Some(job),
            job_deps,
            cause,
        }
    }

    pub(crate) fn scheduler(cause: OpError) -> Self {
        Self {
            job: None,
            job_deps: Vec::new(),
            cause,
        }
    }

    /// Construction site of the failing operation, when known.
    pub fn loc(&self) -> Option<Loc> {
        self.job.as_ref().and_then(|job| job.loc())
    }

    /// Formats the failing job together with its dependency records.
    pub fn detail(&self) -> String {
        let mut out = self.render();
        for dep in &self.job_deps {
            out.push_str("\n  dependency: ");
            out.push_str(&dep.to_string());
        }
        out
    }

    fn render(&self) -> String {
        match &self.job {
            Some(job) => {
                let site = job
                    .loc()
                    .map(|loc| format!(" at {}", loc))
                    .unwrap_or_default();
                format!(
                    "job {} failed in {} phase{}: {}",
                    job.id, job.phase, site, self.cause
                )
            }
            None => format!("evaluation failed: {}", self.cause),
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
