//! Host-expression evaluation boundary.
//!
//! `Eval` operations with string bodies hand the string and the evaluated
//! argument values to an [`ExprEvaluator`]. The executor does not care
//! what language the string is in; [`DefaultExprEvaluator`] provides a
//! small Python-flavored expression language that covers the needs of
//! build programs: literals, names, arithmetic, comparisons, boolean
//! logic, conditionals, tuple/list displays, indexing, and `.len`.
//!
//! Embedders with richer needs implement the trait and install their
//! evaluator with [`crate::executor::Executor::with_expr_evaluator`].

mod eval;
mod parser;

use std::collections::HashMap;

use anyhow::Context;

use crate::value::Value;

/// Evaluates host-expression strings under a set of named argument values.
///
/// Implementations must fail cleanly: a malformed or misbehaving
/// expression surfaces as an `Err`, which the executor wraps into the
/// failing job's error.
pub trait ExprEvaluator: Send + Sync {
    /// Evaluates `source` with the given name bindings.
    fn eval(&self, source: &str, bindings: &[(String, Value)]) -> anyhow::Result<Value>;
}

/// The built-in expression language.
///
/// Grammar, loosest to tightest binding: conditionals (`x if c else y`),
/// `or`, `and`, `not`, comparisons (`== != < <= > >=`), `+ -`, `* / %`,
/// unary `-`, postfix indexing `a[i]` and member access `a.len`. Atoms are
/// integers, floats, single- or double-quoted strings, `True`/`False`/
/// `None` (capitalized or not), names, parenthesized expressions, tuple
/// displays, and list displays. Tuples and lists both evaluate to list
/// values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExprEvaluator;

impl ExprEvaluator for DefaultExprEvaluator {
    fn eval(&self, source: &str, bindings: &[(String, Value)]) -> anyhow::Result<Value> {
        let parsed = parser::parse(source)
            .map_err(|reason| anyhow::anyhow!("failed to parse expression {:?}: {}", source, reason))?;
        let env: HashMap<String, Value> = bindings.iter().cloned().collect();
        eval::eval(&parsed, &env)
            .with_context(|| format!("failed to evaluate expression {:?}", source))
    }
}

/// Expression AST produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `then if test else other` — only the selected branch is evaluated.
    Cond {
        then: Box<Expr>,
        test: Box<Expr>,
        other: Box<Expr>,
    },
    Index(Box<Expr>, Box<Expr>),
    Attr(Box<Expr>, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}
