//! opforge — a make-like build DSL and its graph-driven evaluator.
//!
//! Programs are trees of declarative operations built with the
//! constructors in [`op`]. Handing the root to an [`executor::Executor`]
//! reduces the tree to a single [`value::Value`]. Instead of recursing,
//! the executor decomposes every operation into a five-phase lifecycle and
//! drives the resulting job graph through a ready queue; operations emit
//! *post-dependencies* after executing, which is how branching, looping,
//! matching, and function application work without touching the host
//! stack.
//!
//! ```
//! use opforge::executor::Executor;
//! use opforge::op::{con, eval_expr, var, with};
//! use opforge::value::Value;
//!
//! let program = with("a", con(5), eval_expr(vec![var("a")], "a + 1"));
//! let mut ex = Executor::new(false);
//! assert_eq!(ex.execute(program).unwrap(), Value::Int(6));
//! ```

pub mod context;
pub mod dep;
pub mod error;
pub mod executor;
pub mod expr;
pub mod job;
pub mod manifest;
pub mod op;
mod serde_helpers;
pub mod stdlib;
pub mod value;

pub use context::Ctx;
pub use error::{ExecError, OpError};
pub use executor::Executor;
pub use value::Value;

use anyhow::{Context, Result};
use serde::Deserialize;
use strum::Display;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::FmtSubscriber;

/// Verbosity for [`init_logging`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Installs a global `tracing` subscriber at the given level.
///
/// Embedders that already configure `tracing` themselves should skip this;
/// executor trace records and `Log` operations emit through the standard
/// `tracing` macros either way.
pub fn init_logging(log_level: LogLevel) -> Result<()> {
    let filter = match log_level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}
