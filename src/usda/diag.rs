//! Positioned error and warning stacks.

use std::fmt;

/// Source position. Stored 0-based, printed 1-based.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Position,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USDA source near line {}, col {}: {}",
            self.pos.row + 1,
            self.pos.col + 1,
            self.message
        )
    }
}

/// Error and warning stacks.
///
/// Both stacks are LIFO: the most recent entry is reported first.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, pos: Position, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            pos,
            message: message.into(),
        });
    }

    /// Record a warning. Warnings never stop parsing.
    pub fn push_warning(&mut self, pos: Position, message: impl Into<String>) {
        let diag = Diagnostic {
            pos,
            message: message.into(),
        };

        log::warn!("{diag}");
        self.warnings.push(diag);
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[inline]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Drain the error stack, newest first, one entry per line.
    pub fn take_errors(&mut self) -> String {
        drain(&mut self.errors)
    }

    pub fn take_warnings(&mut self) -> String {
        drain(&mut self.warnings)
    }
}

fn drain(stack: &mut Vec<Diagnostic>) -> String {
    let mut out = String::new();
    while let Some(diag) = stack.pop() {
        out.push_str(&diag.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifo_drain() {
        let mut diag = Diagnostics::new();
        diag.push_error(Position::new(0, 0), "first");
        diag.push_error(Position::new(4, 9), "second");

        assert!(diag.has_errors());
        assert_eq!(
            diag.take_errors(),
            "USDA source near line 5, col 10: second\nUSDA source near line 1, col 1: first\n"
        );

        assert!(!diag.has_errors());
        assert_eq!(diag.take_errors(), "");
    }

    #[test]
    fn warnings_are_separate() {
        let mut diag = Diagnostics::new();
        diag.push_warning(Position::new(1, 2), "odd");

        assert!(!diag.has_errors());
        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.take_warnings(), "USDA source near line 2, col 3: odd\n");
    }
}
