//! Diagnostic operations: pass-through logging and user-raised failures.

use tracing::info;

use crate::context::Ctx;
use crate::error::OpError;
use crate::value::{OpRef, Value};

use super::{Lifecycle, StepEnv};

/// `Log`: evaluates a node, emits its value, forwards it unchanged.
///
/// Always pass-through; never alters error propagation.
#[derive(Debug, Clone)]
pub(crate) struct LogOp {
    pub(crate) name: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) node: OpRef,
}

impl Lifecycle for LogOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, vec![self.node.clone()]))
    }

    fn execute(&self, env: &StepEnv<'_>, ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        let value = deps[0].clone();
        info!(
            target: "opforge::log",
            name = self.name.as_deref().unwrap_or_default(),
            message = self.message.as_deref().unwrap_or_default(),
            loc = %env.loc,
            value = %value,
        );
        Ok((ctx, value))
    }
}

/// `Err`: evaluates its arguments, then fails with the formatted message.
#[derive(Debug, Clone)]
pub(crate) struct ErrOp {
    pub(crate) message: String,
    pub(crate) args: Vec<OpRef>,
}

impl Lifecycle for ErrOp {
    fn dependencies(&self, _env: &StepEnv<'_>, ctx: Ctx) -> Result<(Ctx, Vec<OpRef>), OpError> {
        Ok((ctx, self.args.clone()))
    }

    fn execute(&self, _env: &StepEnv<'_>, _ctx: Ctx, deps: &[Value]) -> Result<(Ctx, Value), OpError> {
        Err(OpError::User(format_message(&self.message, deps)))
    }
}

/// Substitutes each `%s` placeholder with the next argument value.
///
/// Placeholders beyond the argument count stay verbatim; surplus arguments
/// are ignored.
fn format_message(message: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    let mut next = args.iter();
    while let Some(pos) = rest.find("%s") {
        let Some(arg) = next.next() else { break };
        out.push_str(&rest[..pos]);
        out.push_str(&arg.to_string());
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_substitutes_in_order() {
        let args = vec![Value::Int(5), Value::from("x")];
        assert_eq!(format_message("got %s and %s", &args), "got 5 and x");
    }

    #[test]
    fn test_format_message_keeps_surplus_placeholders() {
        assert_eq!(format_message("%s then %s", &[Value::Int(1)]), "1 then %s");
    }

    #[test]
    fn test_format_message_ignores_surplus_args() {
        let args = vec![Value::Int(1), Value::Int(2)];
        assert_eq!(format_message("only %s", &args), "only 1");
    }
}
