//! Lexical variable environment threaded through the operation lifecycle.
//!
//! A [`Ctx`] is a persistent stack of `(name, value)` bindings. Lifecycle
//! callbacks never mutate a context in place; they return a possibly-new
//! one, which keeps sibling jobs isolated from each other's bindings.

use std::fmt;

use crate::error::OpError;
use crate::value::Value;

/// Persistent stack of named bindings.
///
/// Lookup scans from the most recent binding down, which gives lexical
/// shadowing; `pop` removes only the topmost binding of a name, so an
/// unshadowed outer binding survives an inner scope.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    bindings: Vec<(String, Value)>,
}

impl Ctx {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the topmost binding of `name`.
    pub fn get(&self, name: &str) -> Result<&Value, OpError> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| OpError::NameUnbound(name.to_string()))
    }

    /// Returns a new context extended with `name` bound on top.
    #[must_use]
    pub fn push(&self, name: impl Into<String>, value: impl Into<Value>) -> Ctx {
        let mut bindings = self.bindings.clone();
        bindings.push((name.into(), value.into()));
        Ctx { bindings }
    }

    /// Returns a new context with the topmost binding of `name` removed.
    pub fn pop(&self, name: &str) -> Result<Ctx, OpError> {
        let index = self
            .bindings
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| OpError::NameUnbound(name.to_string()))?;
        let mut bindings = self.bindings.clone();
        bindings.remove(index);
        Ok(Ctx { bindings })
    }

    /// Iterates bindings from oldest to newest, for diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of bindings, shadowed ones included.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no binding exists.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_name_fails() {
        let ctx = Ctx::new();
        assert!(matches!(ctx.get("a"), Err(OpError::NameUnbound(n)) if n == "a"));
    }

    #[test]
    fn test_push_get() {
        let ctx = Ctx::new().push("a", 5);
        assert_eq!(ctx.get("a").unwrap(), &Value::Int(5));
    }

    #[test]
    fn test_shadowing_returns_topmost() {
        let ctx = Ctx::new().push("a", 1).push("a", 2);
        assert_eq!(ctx.get("a").unwrap(), &Value::Int(2));
    }

    #[test]
    fn test_pop_removes_only_topmost_shadow() {
        let ctx = Ctx::new().push("a", 1).push("b", 7).push("a", 2);
        let ctx = ctx.pop("a").unwrap();
        assert_eq!(ctx.get("a").unwrap(), &Value::Int(1));
        assert_eq!(ctx.get("b").unwrap(), &Value::Int(7));
        let ctx = ctx.pop("a").unwrap();
        assert!(ctx.get("a").is_err());
        assert!(ctx.pop("a").is_err());
    }

    #[test]
    fn test_push_is_persistent() {
        let base = Ctx::new().push("a", 1);
        let extended = base.push("a", 2);
        assert_eq!(base.get("a").unwrap(), &Value::Int(1));
        assert_eq!(extended.get("a").unwrap(), &Value::Int(2));
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn test_display_snapshot() {
        let ctx = Ctx::new().push("a", 5).push("b", "x");
        assert_eq!(ctx.to_string(), "{a=5, b=x}");
    }
}
