use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of syntax errors collected before the front end gives up.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Type,
    Resolution,
    Scope,
    Structure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Type => write!(f, "type"),
            Self::Resolution => write!(f, "resolution"),
            Self::Scope => write!(f, "scope"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// Numeric error code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_DELIMITER: Self = Self(101);
    pub const INVALID_LITERAL: Self = Self(102);
    pub const INCONSISTENT_INDENT: Self = Self(103);

    // ── Type errors (E200–E299) ──
    pub const UNKNOWN_TYPE: Self = Self(200);
    pub const TYPE_MISMATCH: Self = Self(201);
    pub const WRONG_ARG_COUNT: Self = Self(202);
    pub const CONSTANT_REQUIRED: Self = Self(203);
    pub const COMPONENT_COUNT: Self = Self(204);
    pub const INVALID_SWIZZLE: Self = Self(205);
    pub const UNSUPPORTED_COMPARISON: Self = Self(206);

    // ── Resolution errors (E300–E399) ──
    pub const UNKNOWN_FUNCTION: Self = Self(300);
    pub const UNKNOWN_GRAPH: Self = Self(301);

    // ── Scope errors (E500–E599) ──
    pub const UNKNOWN_VARIABLE: Self = Self(500);
    pub const UNUSED_VARIABLE: Self = Self(501);
    pub const INVALID_ASSIGN_TARGET: Self = Self(502);

    // ── Structure errors (E600–E699) ──
    pub const NO_OUTPUT: Self = Self(600);
    pub const MISPLACED_STATEMENT: Self = Self(601);
    pub const UNSUPPORTED_SYNTAX: Self = Self(602);
    pub const MISSING_ANNOTATION: Self = Self(603);
    pub const UNKNOWN_DECORATOR: Self = Self(604);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Type,
            300..=399 => ErrorCategory::Resolution,
            500..=599 => ErrorCategory::Scope,
            _ => ErrorCategory::Structure,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

fn location_prefix(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!("[{span}] "),
        None => String::new(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CompileError
// ══════════════════════════════════════════════════════════════════════════════

/// A fatal compile error.
///
/// Rendered as `[line L: col C] ERROR: message`; the location prefix is
/// dropped when the error has no source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{}ERROR: {message}", location_prefix(.span))]
pub struct CompileError {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    pub span: Option<Span>,
    /// The offending source line, attached by the front end when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<String>,
}

impl CompileError {
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: None,
        }
    }

    /// Error located at `span`.
    pub fn at(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(code, message, Some(span))
    }

    pub fn with_source_line(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Diagnostic
// ══════════════════════════════════════════════════════════════════════════════

/// A non-fatal notice emitted during compilation, such as an unused variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn warning(code: ErrorCode, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}: {}",
            location_prefix(&self.span),
            self.severity,
            self.message
        )
    }
}

impl From<CompileError> for Diagnostic {
    fn from(err: CompileError) -> Self {
        Self {
            severity: Severity::Error,
            code: err.code,
            message: err.message,
            span: err.span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CompileErrors
// ══════════════════════════════════════════════════════════════════════════════

/// Errors collected by the lexer and parser, which recover and keep going.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
    pub total_errors: usize,
}

impl CompileErrors {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, keeping at most [`MAX_ERRORS`] of them.
    pub fn push_error(&mut self, error: CompileError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Returns `true` once the error cap is reached.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Append every error from `other`.
    pub fn extend(&mut self, other: CompileErrors) {
        let dropped = other.total_errors - other.errors.len();
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += dropped;
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        if self.total_errors > self.errors.len() {
            write!(
                f,
                "\n... and {} more errors",
                self.total_errors - self.errors.len()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}
