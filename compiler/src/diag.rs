// diag.rs — Unified diagnostics model
//
// Provides the shared diagnostic types used by the frontend and the pass
// pipeline. Diagnostics are non-fatal: they accumulate alongside a result and
// callers inspect them even when a result looks successful.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0300`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // ── Fatal document errors ──
    pub const E0001: DiagCode = DiagCode("E0001"); // invalid JSON
    pub const E0002: DiagCode = DiagCode("E0002"); // not a JSON object
    pub const E0003: DiagCode = DiagCode("E0003"); // missing id/name

    // ── Input errors (fragment dropped) ──
    pub const E0100: DiagCode = DiagCode("E0100"); // type missing
    pub const E0101: DiagCode = DiagCode("E0101"); // unknown input type
    pub const E0102: DiagCode = DiagCode("E0102"); // File with value-choices
    pub const E0103: DiagCode = DiagCode("E0103"); // value-choices not an array
    pub const E0104: DiagCode = DiagCode("E0104"); // no valid value-choices
    pub const E0105: DiagCode = DiagCode("E0105"); // Flag without command-line-flag
    pub const E0106: DiagCode = DiagCode("E0106"); // empty subcommand union

    // ── Command-line errors ──
    pub const E0200: DiagCode = DiagCode("E0200"); // template tokenization failed

    // ── Warnings ──
    pub const W0100: DiagCode = DiagCode("W0100"); // enum choice ignored
    pub const W0101: DiagCode = DiagCode("W0101"); // subcommand alternative skipped
    pub const W0102: DiagCode = DiagCode("W0102"); // list-entry bounds ignored
    pub const W0103: DiagCode = DiagCode("W0103"); // empty integer range
    pub const W0200: DiagCode = DiagCode("W0200"); // no command-line
    pub const W0201: DiagCode = DiagCode("W0201"); // output references unplaced input
    pub const W0300: DiagCode = DiagCode("W0300"); // pipeline did not converge
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any phase.
///
/// `location` is a JSON-pointer-like path into the descriptor document
/// (e.g. `/inputs/2/type/0`), when one is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub location: Option<String>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, location, or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            location: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a descriptor location.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(location) = &self.location {
            write!(f, "\n  at: {}", location)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// True if any diagnostic in the slice is error-level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_code() {
        let d = Diagnostic::error("something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code() {
        let d = Diagnostic::warning("choice ignored").with_code(codes::W0100);
        assert_eq!(format!("{d}"), "warning[W0100]: choice ignored");
    }

    #[test]
    fn display_with_location_and_hint() {
        let d = Diagnostic::error("type is missing for input: 'x'")
            .with_code(codes::E0100)
            .at("/inputs/0")
            .with_hint("declare one of String, Number, File, Flag");
        assert_eq!(
            format!("{d}"),
            "error[E0100]: type is missing for input: 'x'\n  at: /inputs/0\n  hint: declare one of String, Number, File, Flag"
        );
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::new(DiagLevel::Error, "bad flag")
            .with_code(codes::E0105)
            .at("/inputs/3");

        assert_eq!(d.code, Some(codes::E0105));
        assert_eq!(d.location.as_deref(), Some("/inputs/3"));
        assert!(d.hint.is_none());
        assert!(d.is_error());
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let diags = vec![Diagnostic::warning("a"), Diagnostic::warning("b")];
        assert!(!has_errors(&diags));
        let diags = vec![Diagnostic::warning("a"), Diagnostic::error("b")];
        assert!(has_errors(&diags));
    }
}
