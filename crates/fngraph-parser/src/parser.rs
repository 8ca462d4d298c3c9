//! Core parser infrastructure: token cursor, error reporting, helpers.

use fngraph_lexer::token::{Token, TokenKind};
use fngraph_lexer::Lexer;
use fngraph_types::ast::{Ident, Module};
use fngraph_types::{CompileError, CompileErrors, ErrorCode, SourceFile, Span};

/// Maximum expression nesting depth before the parser bails out.
const MAX_EXPR_DEPTH: u32 = 64;

/// The fngraph parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Module`].
/// Collects errors and resynchronizes at the next line when possible.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: CompileErrors,
    pub(crate) expr_depth: u32,
}

/// Result of parsing.
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: CompileErrors,
}

/// Lex and parse a source file in one step.
pub fn parse(source_file: &SourceFile) -> ParseResult {
    let lexed = Lexer::new(source_file).lex();
    let mut result = Parser::new(lexed.tokens, source_file).parse();
    if lexed.errors.has_errors() {
        let mut errors = lexed.errors;
        errors.extend(result.errors);
        result.errors = errors;
        result.module = None;
    }
    result
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            expr_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should end with Eof")
        })
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Kind of the token `n` positions ahead of the cursor.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(idx) => self.tokens[idx].span,
            None => Span::point(1, 1),
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{other}'"),
                );
                None
            }
        }
    }

    /// `a.b.c` as a single dotted string.
    pub(crate) fn expect_dotted_name(&mut self) -> Option<(String, Span)> {
        let first = self.expect_identifier()?;
        let mut name = first.name;
        let mut span = first.span;
        while self.eat(&TokenKind::Dot) {
            let part = self.expect_identifier()?;
            name.push('.');
            name.push_str(&part.name);
            span = span.merge(part.span);
        }
        Some((name, span))
    }

    /// End of a simple statement: a newline, or end of input.
    pub(crate) fn expect_newline(&mut self) -> Option<()> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Some(())
            }
            TokenKind::Eof | TokenKind::Dedent => Some(()),
            other => {
                let message = format!("expected end of line, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = CompileError::at(code, message, span).with_source_line(source_line);
        self.errors.push_error(error);
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    pub(crate) fn enter_expr(&mut self) -> bool {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::UNSUPPORTED_SYNTAX,
                format!("expression nesting deeper than {MAX_EXPR_DEPTH} levels"),
            );
            self.expr_depth -= 1;
            return false;
        }
        true
    }

    pub(crate) fn exit_expr(&mut self) {
        self.expr_depth -= 1;
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip to the start of the next logical line after an error.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Newline => {
                    self.advance();
                    return;
                }
                TokenKind::Dedent => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Module`].
    pub fn parse(mut self) -> ParseResult {
        let start = self.current_span();
        let body = self.parse_block_until(&TokenKind::Eof);
        let span = start.merge(self.previous_span());
        let module = if self.errors.has_errors() {
            None
        } else {
            Some(Module { body, span })
        };
        ParseResult {
            module,
            errors: self.errors,
        }
    }
}
