//! Source-location tagging for operations.
//!
//! Every operation records the `file:line` of its construction site so that
//! evaluation failures point at the user's program, not at library
//! internals. Constructors are `#[track_caller]`; operations synthesized
//! inside lifecycle callbacks inherit the location of the operation that
//! synthesized them.

use std::fmt;
use std::panic::Location;

/// Construction-site location of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Loc {
    /// Source file of the construction site.
    pub file: &'static str,
    /// 1-based line of the construction site.
    pub line: u32,
}

impl Loc {
    /// Captures the caller's location.
    ///
    /// Only meaningful when every public constructor on the path here is
    /// itself `#[track_caller]`, which keeps the reported frame outside the
    /// library.
    #[track_caller]
    pub(crate) fn capture() -> Self {
        let caller = Location::caller();
        Self {
            file: caller.file(),
            line: caller.line(),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_points_at_caller() {
        let loc = Loc::capture();
        assert!(loc.file.ends_with("loc.rs"));
        assert!(loc.line > 0);
    }

    #[test]
    fn test_display() {
        let loc = Loc {
            file: "build.of",
            line: 12,
        };
        assert_eq!(loc.to_string(), "build.of:12");
    }
}
