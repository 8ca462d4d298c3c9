//! Shared types for the fngraph compiler.
//!
//! This crate defines the AST node types, source spans, error and
//! diagnostic types shared by the lexer, the parser and the graph compiler.

mod error;
mod span;
pub mod ast;

pub use error::{
    CompileError, CompileErrors, Diagnostic, ErrorCategory, ErrorCode, Severity, MAX_ERRORS,
};
pub use span::{SourceFile, Span};

/// Result type used throughout the fngraph compiler.
pub type Result<T> = std::result::Result<T, CompileError>;
