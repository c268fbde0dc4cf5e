//! Dynamic values flowing through an evaluation.
//!
//! Operation results, context bindings, and host-expression arguments are
//! all [`Value`]s. The variants mirror what a build manifest can express
//! (scalars, lists, string-keyed maps) plus [`Value::Op`], which carries a
//! first-class operation — function values produced by `Fun` and deferred
//! sub-trees returned to `Eval`.
//!
//! Serde support lives in [`crate::serde_helpers`]; everything except
//! `Value::Op` round-trips through YAML.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::op::Op;

/// Shared handle to an operation node.
///
/// Operations synthesized during evaluation share their subtrees through
/// this handle, so re-wrapping a `Seq` tail or a `Match` reduction copies a
/// small wrapper instead of the whole program.
pub type OpRef = Arc<Op>;

/// A dynamic value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The unit/absent value. Also the result of an empty `Seq`.
    #[default]
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered list. Also the representation of `Par`/`Arr` results and of
    /// tuple displays in the expression language.
    List(Vec<Value>),
    /// String-keyed map with deterministic iteration order.
    Map(BTreeMap<String, Value>),
    /// A first-class operation (a `Fun` value or a deferred sub-tree).
    Op(OpRef),
}

impl Value {
    /// Python-style truthiness: `None`, `false`, zero, and empty
    /// collections are falsy; everything else is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Op(_) => true,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Op(_) => "op",
        }
    }

    /// Returns the element/character/entry count for sized values.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Resolves a named member.
    ///
    /// Maps expose their entries as members; the key `len` resolves to the
    /// size of any sized value.
    pub fn attr(&self, name: &str) -> Option<Value> {
        if name == "len" {
            if let Some(n) = self.length() {
                return Some(Value::Int(n as i64));
            }
        }
        match self {
            Value::Map(entries) => entries.get(name).cloned(),
            _ => None,
        }
    }

    /// Indexes the value.
    ///
    /// Lists and strings take integer indices (negative counts from the
    /// end), maps take string keys.
    pub fn index(&self, key: &Value) -> Option<Value> {
        match (self, key) {
            (Value::List(items), Value::Int(i)) => {
                items.get(normalize_index(*i, items.len())?).cloned()
            }
            (Value::Str(s), Value::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                let ch = chars.get(normalize_index(*i, chars.len())?)?;
                Some(Value::Str(ch.to_string()))
            }
            (Value::Map(entries), Value::Str(k)) => entries.get(k).cloned(),
            _ => None,
        }
    }

    /// Returns the list elements if this value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns true for `Value::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    if i >= 0 {
        let i = i as usize;
        (i < len).then_some(i)
    } else {
        let back = i.unsigned_abs() as usize;
        (back <= len).then(|| len - back)
    }
}

/// Equality follows value semantics; integers and floats compare
/// numerically, operations compare by node identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Op(a), Value::Op(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Op(op) => write!(f, "<{}>", op),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl From<OpRef> for Value {
    fn from(op: OpRef) -> Self {
        Value::Op(op)
    }
}

impl From<Op> for Value {
    fn from(op: Op) -> Self {
        Value::Op(Arc::new(op))
    }
}

// ---------------------------------------------------------------------------
// Arithmetic and comparison used by operator sugar and the default
// expression evaluator. Host-side semantics, host-side errors.
// ---------------------------------------------------------------------------

pub(crate) fn add(a: &Value, b: &Value) -> anyhow::Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or_else(|| anyhow::anyhow!("integer overflow in {} + {}", x, y)),
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{}{}", x, y))),
        (Value::List(x), Value::List(y)) => {
            let mut joined = x.clone();
            joined.extend(y.iter().cloned());
            Ok(Value::List(joined))
        }
        _ => numeric(a, b, "+", |x, y| x + y),
    }
}

pub(crate) fn sub(a: &Value, b: &Value) -> anyhow::Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_sub(*y)
            .map(Value::Int)
            .ok_or_else(|| anyhow::anyhow!("integer overflow in {} - {}", x, y)),
        _ => numeric(a, b, "-", |x, y| x - y),
    }
}

pub(crate) fn mul(a: &Value, b: &Value) -> anyhow::Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_mul(*y)
            .map(Value::Int)
            .ok_or_else(|| anyhow::anyhow!("integer overflow in {} * {}", x, y)),
        _ => numeric(a, b, "*", |x, y| x * y),
    }
}

pub(crate) fn div(a: &Value, b: &Value) -> anyhow::Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                anyhow::bail!("division by zero");
            }
            Ok(Value::Int(x / y))
        }
        _ => {
            if let Some(y) = as_f64(b) {
                if y == 0.0 {
                    anyhow::bail!("division by zero");
                }
            }
            numeric(a, b, "/", |x, y| x / y)
        }
    }
}

pub(crate) fn rem(a: &Value, b: &Value) -> anyhow::Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                anyhow::bail!("modulo by zero");
            }
            Ok(Value::Int(x % y))
        }
        _ => anyhow::bail!(
            "unsupported operand types for %: {} and {}",
            a.type_name(),
            b.type_name()
        ),
    }
}

pub(crate) fn neg(a: &Value) -> anyhow::Result<Value> {
    match a {
        Value::Int(x) => Ok(Value::Int(-x)),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => anyhow::bail!("unsupported operand type for unary -: {}", a.type_name()),
    }
}

/// Ordering for `<`/`<=`/`>`/`>=`: numbers compare numerically, strings
/// lexicographically. Anything else is unordered.
pub(crate) fn compare(a: &Value, b: &Value) -> anyhow::Result<std::cmp::Ordering> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| {
                anyhow::anyhow!("cannot order {} and {}", a.type_name(), b.type_name())
            }),
            _ => anyhow::bail!(
                "cannot order {} and {}",
                a.type_name(),
                b.type_name()
            ),
        },
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn numeric(
    a: &Value,
    b: &Value,
    op: &str,
    apply: impl Fn(f64, f64) -> f64,
) -> anyhow::Result<Value> {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => Ok(Value::Float(apply(x, y))),
        _ => anyhow::bail!(
            "unsupported operand types for {}: {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(!Value::List(vec![]).truthy());
        assert!(Value::Int(-1).truthy());
        assert!(Value::Str("x".into()).truthy());
        assert!(Value::from(vec![0]).truthy());
    }

    #[test]
    fn test_numeric_equality_crosses_int_and_float() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
    }

    #[test]
    fn test_length() {
        assert_eq!(Value::from("abc").length(), Some(3));
        assert_eq!(Value::from(vec![1, 2]).length(), Some(2));
        assert_eq!(Value::Int(5).length(), None);
    }

    #[test]
    fn test_attr_len_and_map_member() {
        let mut entries = BTreeMap::new();
        entries.insert("mirror".to_string(), Value::from("deb.debian.org"));
        let map = Value::Map(entries);
        assert_eq!(map.attr("mirror"), Some(Value::from("deb.debian.org")));
        assert_eq!(map.attr("len"), Some(Value::Int(1)));
        assert_eq!(map.attr("suite"), None);
    }

    #[test]
    fn test_index_list_negative() {
        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(list.index(&Value::Int(0)), Some(Value::Int(1)));
        assert_eq!(list.index(&Value::Int(-1)), Some(Value::Int(3)));
        assert_eq!(list.index(&Value::Int(3)), None);
    }

    #[test]
    fn test_index_str() {
        let s = Value::from("abc");
        assert_eq!(s.index(&Value::Int(1)), Some(Value::from("b")));
        assert_eq!(s.index(&Value::Int(-3)), Some(Value::from("a")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::from("a b").to_string(), "a b");
    }

    #[test]
    fn test_add_concatenates_strings_and_lists() {
        let ab = add(&Value::from("a"), &Value::from("b")).unwrap();
        assert_eq!(ab, Value::from("ab"));
        let joined = add(&Value::from(vec![1]), &Value::from(vec![2])).unwrap();
        assert_eq!(joined, Value::from(vec![1, 2]));
    }

    #[test]
    fn test_arithmetic_promotes_to_float() {
        assert_eq!(add(&Value::Int(1), &Value::Float(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!(mul(&Value::Int(3), &Value::Int(4)).unwrap(), Value::Int(12));
    }

    #[test]
    fn test_division_by_zero_fails() {
        assert!(div(&Value::Int(1), &Value::Int(0)).is_err());
        assert!(rem(&Value::Int(1), &Value::Int(0)).is_err());
    }

    #[test]
    fn test_compare_mixed_types_fails() {
        assert!(compare(&Value::from("a"), &Value::Int(1)).is_err());
        assert_eq!(
            compare(&Value::Int(1), &Value::Float(2.0)).unwrap(),
            std::cmp::Ordering::Less
        );
    }
}
