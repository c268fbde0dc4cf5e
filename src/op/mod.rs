//! The operation algebra: declarative descriptions of build work.
//!
//! This module provides the [`Op`] node type — an enum where each variant
//! holds the data for one operation kind, and methods on the enum dispatch
//! exhaustively to the variant's lifecycle implementation. Adding a new
//! operation requires:
//!
//! 1. Adding a variant to `OpKind`
//! 2. Creating a data struct in the matching submodule
//! 3. Implementing [`Lifecycle`] for the struct
//!
//! The compiler enforces exhaustiveness, ensuring every operation is
//! handled by the dispatcher and the display code.
//!
//! Operations never execute themselves; they only describe the five-phase
//! lifecycle. `Deps`/`PostDeps` callbacks enumerate child operations,
//! `Exec`/`PostExec` callbacks produce values, and every callback threads a
//! possibly-updated [`Ctx`] forward. Control flow (sequencing, matching,
//! iteration, function application) is expressed entirely through
//! post-dependencies: operations synthesize new child operations after
//! seeing their primary result.

mod atom;
mod diag;
mod eval;
mod flow;
mod func;
mod iter;
mod loc;
mod matching;
mod sugar;

use std::fmt;
use std::sync::Arc;

use crate::context::Ctx;
use crate::error::OpError;
use crate::expr::ExprEvaluator;
use crate::value::{OpRef, Value};

pub use eval::HostFn;
pub use loc::Loc;
pub use matching::Case;

/// Per-step environment handed to lifecycle callbacks: the operation's own
/// construction site and the host-expression evaluator configured on the
/// executor.
pub(crate) struct StepEnv<'a> {
    pub(crate) loc: Loc,
    pub(crate) expr: &'a dyn ExprEvaluator,
}

/// The five-phase lifecycle contract.
///
/// Callbacks with defaults behave as identities: no dependencies, a `None`
/// primary value, and a pass-through final value.
pub(crate) trait Lifecycle {
    /// Declares the operations whose results are needed before `execute`.
    fn dependencies(&self, env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let _ = env;
        Ok((ctx, Vec::new()))
    }

    /// Computes the operation's primary value from dependency results.
    fn execute(&self, env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let _ = (env, deps);
        Ok((ctx, Value::None))
    }

    /// Declares a second round of dependencies, computed from the primary
    /// value. This is the control-flow hook.
    fn post_dependencies(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let _ = (env, exec, deps);
        Ok((ctx, Vec::new()))
    }

    /// Combines all results into the operation's final value.
    fn post_execute(
        &self,
        env: &StepEnv<'_>,
        ctx: Ctx,
        exec: &Value,
        deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let _ = (env, deps, post);
        Ok((ctx, exec.clone()))
    }
}

/// A node in a build program.
///
/// Identity is by construction: two structurally equal nodes are distinct,
/// because the same subtree may legitimately execute twice under different
/// contexts. Nodes are immutable once built; cloning shares subtrees.
#[derive(Debug, Clone)]
pub struct Op {
    pub(crate) kind: OpKind,
    loc: Loc,
}

#[derive(Debug, Clone)]
pub(crate) enum OpKind {
    Con(atom::ConOp),
    Var(atom::VarOp),
    GetAttr(atom::GetAttrOp),
    GetItem(atom::GetItemOp),
    Eval(eval::EvalOp),
    Log(diag::LogOp),
    Err(diag::ErrOp),
    Seq(flow::SeqOp),
    Par(flow::ParOp),
    Arr(flow::ArrOp),
    With(flow::WithOp),
    Map(iter::MapOp),
    Fil(iter::FilOp),
    Iter(iter::IterOp),
    Match(matching::MatchOp),
    Fun(func::FunOp),
    Call(func::CallOp),
}

impl Op {
    pub(crate) fn at(loc: Loc, kind: OpKind) -> Op {
        Op { kind, loc }
    }

    /// Construction site of this operation.
    pub fn loc(&self) -> Loc {
        self.loc
    }

    /// Variant name, used by trace output and error rendering.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            OpKind::Con(_) => "Con",
            OpKind::Var(_) => "Var",
            OpKind::GetAttr(_) => "GetAttr",
            OpKind::GetItem(_) => "GetItem",
            OpKind::Eval(_) => "Eval",
            OpKind::Log(_) => "Log",
            OpKind::Err(_) => "Err",
            OpKind::Seq(_) => "Seq",
            OpKind::Par(_) => "Par",
            OpKind::Arr(_) => "Arr",
            OpKind::With(_) => "With",
            OpKind::Map(_) => "Map",
            OpKind::Fil(_) => "Fil",
            OpKind::Iter(_) => "Iter",
            OpKind::Match(_) => "Match",
            OpKind::Fun(_) => "Fun",
            OpKind::Call(_) => "Call",
        }
    }

    fn as_lifecycle(&self) -> &dyn Lifecycle {
        match &self.kind {
            OpKind::Con(op) => op,
            OpKind::Var(op) => op,
            OpKind::GetAttr(op) => op,
            OpKind::GetItem(op) => op,
            OpKind::Eval(op) => op,
            OpKind::Log(op) => op,
            OpKind::Err(op) => op,
            OpKind::Seq(op) => op,
            OpKind::Par(op) => op,
            OpKind::Arr(op) => op,
            OpKind::With(op) => op,
            OpKind::Map(op) => op,
            OpKind::Fil(op) => op,
            OpKind::Iter(op) => op,
            OpKind::Match(op) => op,
            OpKind::Fun(op) => op,
            OpKind::Call(op) => op,
        }
    }

    pub(crate) fn context_dependencies(
        &self,
        expr: &dyn ExprEvaluator,
        ctx: Ctx,
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let env = StepEnv {
            loc: self.loc,
            expr,
        };
        self.as_lifecycle().dependencies(&env, ctx)
    }

    pub(crate) fn context_execute(
        &self,
        expr: &dyn ExprEvaluator,
        ctx: Ctx,
        deps: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let env = StepEnv {
            loc: self.loc,
            expr,
        };
        self.as_lifecycle().execute(&env, ctx, deps)
    }

    pub(crate) fn context_post_dependencies(
        &self,
        expr: &dyn ExprEvaluator,
        ctx: Ctx,
        exec: &Value,
        deps: &[Value],
    ) -> Result<(Ctx, Vec<OpRef>), OpError> {
        let env = StepEnv {
            loc: self.loc,
            expr,
        };
        self.as_lifecycle().post_dependencies(&env, ctx, exec, deps)
    }

    pub(crate) fn context_post_execute(
        &self,
        expr: &dyn ExprEvaluator,
        ctx: Ctx,
        exec: &Value,
        deps: &[Value],
        post: &[Value],
    ) -> Result<(Ctx, Value), OpError> {
        let env = StepEnv {
            loc: self.loc,
            expr,
        };
        self.as_lifecycle()
            .post_execute(&env, ctx, exec, deps, post)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OpKind::Con(op) => write!(f, "Con({})", op.value),
            OpKind::Var(op) => write!(f, "Var({})", op.name),
            OpKind::GetAttr(op) => write!(f, "GetAttr({}, {})", op.obj, op.name),
            OpKind::GetItem(op) => write!(f, "GetItem({}, {})", op.obj, op.key),
            OpKind::Eval(op) => {
                write!(f, "Eval(")?;
                for arg in &op.args {
                    write!(f, "{}, ", arg)?;
                }
                write!(f, "{})", op.body)
            }
            OpKind::Log(op) => write!(f, "Log({})", op.node),
            OpKind::Err(op) => write!(f, "Err({:?})", op.message),
            OpKind::Seq(op) => write_joined(f, "Seq", op.ops.iter()),
            OpKind::Par(op) => write_joined(f, "Par", op.ops.iter()),
            OpKind::Arr(op) => write_joined(f, "Arr", op.ops.iter()),
            OpKind::With(op) => {
                write!(f, "With(")?;
                for (name, value) in &op.bindings {
                    write!(f, "{}={}, ", name, value)?;
                }
                write!(f, "{})", op.body)
            }
            OpKind::Map(op) => write!(f, "Map({}, {}, {})", op.var, op.body, op.iterable),
            OpKind::Fil(op) => write!(f, "Fil({}, {}, {})", op.var, op.pred, op.iterable),
            OpKind::Iter(op) => {
                write!(f, "Iter({}, {}, {}, {})", op.var, op.init, op.next, op.body)
            }
            OpKind::Match(op) => {
                write!(f, "Match({}, {}", op.var, op.value)?;
                for case in &op.cases {
                    write!(f, ", Case({}, {})", case.match_op, case.body)?;
                }
                write!(f, ")")
            }
            OpKind::Fun(op) => {
                write!(f, "Fun(")?;
                for param in &op.params {
                    write!(f, "{}, ", param)?;
                }
                write!(f, "{})", op.body)
            }
            OpKind::Call(op) => {
                write!(f, "Call({}", op.target)?;
                for arg in &op.args {
                    write!(f, ", {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    ops: impl Iterator<Item = &'a OpRef>,
) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, op) in ops.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", op)?;
    }
    write!(f, ")")
}

// ---------------------------------------------------------------------------
// Literal conversions: constructors accept either operations or raw values,
// raw values are wrapped as `Con`.
// ---------------------------------------------------------------------------

impl From<Value> for Op {
    fn from(value: Value) -> Self {
        Op::at(Loc::capture(), OpKind::Con(atom::ConOp { value }))
    }
}

macro_rules! impl_from_literal {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Op {
            fn from(value: $ty) -> Self {
                Op::from(Value::from(value))
            }
        })*
    };
}

impl_from_literal!((), bool, i32, i64, f64, &str, String);

impl From<Vec<Value>> for Op {
    fn from(items: Vec<Value>) -> Self {
        Op::from(Value::List(items))
    }
}

// ---------------------------------------------------------------------------
// Constructors. All are `#[track_caller]` so the operation records the
// user's construction site.
// ---------------------------------------------------------------------------

fn opref(op: impl Into<Op>) -> OpRef {
    Arc::new(op.into())
}

/// A literal constant; evaluates to its value.
#[track_caller]
pub fn con(value: impl Into<Value>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Con(atom::ConOp {
            value: value.into(),
        }),
    )
}

/// A variable reference; evaluates to the topmost context binding.
#[track_caller]
pub fn var(name: impl Into<String>) -> Op {
    Op::at(Loc::capture(), OpKind::Var(atom::VarOp { name: name.into() }))
}

/// Resolves a named member of the evaluated object. The key `len` resolves
/// to the size of sized values.
#[track_caller]
pub fn get_attr(obj: impl Into<Op>, name: impl Into<String>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::GetAttr(atom::GetAttrOp {
            obj: opref(obj),
            name: name.into(),
            default: None,
        }),
    )
}

/// Like [`get_attr`], but yields `default` when the member is absent.
#[track_caller]
pub fn get_attr_or(obj: impl Into<Op>, name: impl Into<String>, default: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::GetAttr(atom::GetAttrOp {
            obj: opref(obj),
            name: name.into(),
            default: Some(opref(default)),
        }),
    )
}

/// Indexes the evaluated object by the evaluated key.
#[track_caller]
pub fn get_item(obj: impl Into<Op>, key: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::GetItem(atom::GetItemOp {
            obj: opref(obj),
            key: opref(key),
        }),
    )
}

/// Evaluates a host-expression string with argument values bound to the
/// names `a, b, …` and `x0, x1, …`.
#[track_caller]
pub fn eval_expr(args: Vec<Op>, source: impl Into<String>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Eval(eval::EvalOp {
            args: args.into_iter().map(Arc::new).collect(),
            body: eval::EvalBody::Expr(source.into()),
            wrap: false,
        }),
    )
}

/// Invokes a host callable with the evaluated argument values.
#[track_caller]
pub fn eval_fn<F>(args: Vec<Op>, body: F) -> Op
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Op::at(
        Loc::capture(),
        OpKind::Eval(eval::EvalOp {
            args: args.into_iter().map(Arc::new).collect(),
            body: eval::EvalBody::Func(Arc::new(body)),
            wrap: false,
        }),
    )
}

/// Evaluates a nested operation as a post-dependency and yields its value.
#[track_caller]
pub fn eval_op(args: Vec<Op>, body: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Eval(eval::EvalOp {
            args: args.into_iter().map(Arc::new).collect(),
            body: eval::EvalBody::Op(opref(body)),
            wrap: false,
        }),
    )
}

/// Invokes a host callable that builds a deferred sub-tree from the
/// argument values; the returned operation is evaluated as a
/// post-dependency. A plain (non-operation) return value fails evaluation.
#[track_caller]
pub fn defer<F>(args: Vec<Op>, build: F) -> Op
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Op::at(
        Loc::capture(),
        OpKind::Eval(eval::EvalOp {
            args: args.into_iter().map(Arc::new).collect(),
            body: eval::EvalBody::Build(Arc::new(build)),
            wrap: false,
        }),
    )
}

/// Like [`defer`], but a plain return value is wrapped into a constant
/// instead of failing.
#[track_caller]
pub fn defer_wrap<F>(args: Vec<Op>, build: F) -> Op
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Op::at(
        Loc::capture(),
        OpKind::Eval(eval::EvalOp {
            args: args.into_iter().map(Arc::new).collect(),
            body: eval::EvalBody::Build(Arc::new(build)),
            wrap: true,
        }),
    )
}

/// Evaluates `node`, emits its value as a diagnostic line, and forwards the
/// value unchanged.
#[track_caller]
pub fn log(node: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Log(diag::LogOp {
            name: None,
            message: None,
            node: opref(node),
        }),
    )
}

/// Like [`log`], with a logger name and message prefix on the emitted line.
#[track_caller]
pub fn log_named(name: impl Into<String>, message: impl Into<String>, node: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Log(diag::LogOp {
            name: Some(name.into()),
            message: Some(message.into()),
            node: opref(node),
        }),
    )
}

/// Evaluates the arguments, then fails with `message` formatted against
/// them (`%s` placeholders are substituted in order).
#[track_caller]
pub fn err(message: impl Into<String>, args: Vec<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Err(diag::ErrOp {
            message: message.into(),
            args: args.into_iter().map(Arc::new).collect(),
        }),
    )
}

/// Executes operations strictly in order; yields the last value, or `None`
/// when empty.
#[track_caller]
pub fn seq(ops: Vec<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Seq(flow::SeqOp {
            ops: ops.into_iter().map(Arc::new).collect(),
        }),
    )
}

/// Declares all operands at once; yields the list of their values in
/// operand order. Parallel execution is an allowance, not a requirement.
#[track_caller]
pub fn par(ops: Vec<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Par(flow::ParOp {
            ops: ops.into_iter().map(Arc::new).collect(),
        }),
    )
}

/// Like [`par`], but contractually a fixed-arity tuple.
#[track_caller]
pub fn arr(ops: Vec<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Arr(flow::ArrOp {
            ops: ops.into_iter().map(Arc::new).collect(),
        }),
    )
}

/// Binds one name for the duration of `body`.
#[track_caller]
pub fn with(name: impl Into<String>, value: impl Into<Op>, body: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::With(flow::WithOp {
            bindings: vec![(name.into(), opref(value))],
            body: opref(body),
        }),
    )
}

/// Binds several names at once for the duration of `body`.
#[track_caller]
pub fn with_all(bindings: Vec<(&str, Op)>, body: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::With(flow::WithOp {
            bindings: bindings
                .into_iter()
                .map(|(name, value)| (name.to_string(), Arc::new(value)))
                .collect(),
            body: opref(body),
        }),
    )
}

/// Evaluates `body` once per element of the evaluated list, with `var`
/// bound to the element; yields the list of body values in input order.
#[track_caller]
pub fn map(var: impl Into<String>, body: impl Into<Op>, iterable: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Map(iter::MapOp {
            var: var.into(),
            body: opref(body),
            iterable: opref(iterable),
        }),
    )
}

/// Keeps the elements of the evaluated list for which `pred` is truthy,
/// preserving input order.
#[track_caller]
pub fn fil(var: impl Into<String>, pred: impl Into<Op>, iterable: impl Into<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Fil(iter::FilOp {
            var: var.into(),
            pred: opref(pred),
            iterable: opref(iterable),
        }),
    )
}

/// Loops `body` over the aggregate produced by repeatedly evaluating
/// `next`, starting from `init`.
///
/// Each round evaluates `next` with `var` bound to the current aggregate,
/// expecting an `(item, next_aggregate)` pair; the loop continues while
/// `next_aggregate` is not `None`, evaluating `body` with `var` bound to
/// `item`. The loop's value is the body result of the last round executed.
#[track_caller]
pub fn iter(
    var: impl Into<String>,
    init: impl Into<Op>,
    next: impl Into<Op>,
    body: impl Into<Op>,
) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Iter(iter::IterOp {
            var: var.into(),
            init: opref(init),
            next: opref(next),
            body: opref(body),
        }),
    )
}

/// Binds the evaluated value to `var` and tries each case's match
/// operation in order; the first truthy match selects its body. An
/// exhausted match fails.
#[track_caller]
pub fn match_(var: impl Into<String>, value: impl Into<Op>, cases: Vec<Case>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Match(matching::MatchOp {
            var: var.into(),
            value: opref(value),
            cases,
        }),
    )
}

/// A function value: formal parameter names plus a body evaluated by
/// [`call`].
///
/// # Panics
///
/// Panics if a parameter name repeats. Use [`try_fun`] for a fallible
/// variant.
#[track_caller]
pub fn fun(params: &[&str], body: impl Into<Op>) -> Op {
    match try_fun(params, body) {
        Ok(op) => op,
        Err(e) => panic!("{}", e),
    }
}

/// Fallible [`fun`]: fails with `DuplicateArg` on a repeated parameter
/// name.
#[track_caller]
pub fn try_fun(params: &[&str], body: impl Into<Op>) -> Result<Op, OpError> {
    let mut seen: Vec<&str> = Vec::new();
    for param in params {
        if seen.contains(param) {
            return Err(OpError::DuplicateArg(param.to_string()));
        }
        seen.push(param);
    }
    Ok(Op::at(
        Loc::capture(),
        OpKind::Fun(func::FunOp {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: opref(body),
        }),
    ))
}

/// Evaluates `target` to a function value and applies it to the evaluated
/// arguments.
#[track_caller]
pub fn call(target: impl Into<Op>, args: Vec<Op>) -> Op {
    Op::at(
        Loc::capture(),
        OpKind::Call(func::CallOp {
            target: opref(target),
            args: args.into_iter().map(Arc::new).collect(),
        }),
    )
}
