//! Core lexer: converts source text to a token stream.
//!
//! Features:
//! - Python-style layout: `Newline` ends a logical line, `Indent`/`Dedent`
//!   track block structure, blank and comment-only lines are ignored
//! - Newlines inside `()`, `[]` and `{}` are implicit line joins
//! - `#` comments, `\` line continuations
//! - System identifiers spelled `$name`
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use fngraph_types::{CompileError, CompileErrors, ErrorCode, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// Width a tab advances the indentation column to.
const TAB_WIDTH: u32 = 4;

pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    line: u32,
    col: u32,
    errors: CompileErrors,
    /// Open indentation levels; the bottom entry is always 0.
    indent_stack: Vec<u32>,
    /// Nesting depth of open brackets.
    bracket_depth: u32,
    at_line_start: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens: Vec<Token> = Vec::new();

        while !self.errors.is_full() {
            if self.at_line_start && self.bracket_depth == 0 {
                self.at_line_start = false;
                self.scan_indentation(&mut tokens);
            }
            match self.scan_token() {
                Some(token) => {
                    if token.kind == TokenKind::Newline {
                        self.at_line_start = true;
                        // Blank logical lines (e.g. after a continuation) collapse.
                        if tokens.last().is_none_or(|t| t.kind == TokenKind::Newline) {
                            continue;
                        }
                    }
                    tokens.push(token);
                }
                None => break,
            }
        }

        if self.bracket_depth > 0 {
            self.emit_error(
                ErrorCode::UNCLOSED_DELIMITER,
                "Unexpected end of file: unclosed bracket",
                self.current_span(),
            );
        }

        let eof = self.current_span();
        if tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            tokens.push(Token::new(TokenKind::Newline, eof));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, eof));
        }
        tokens.push(Token::new(TokenKind::Eof, eof));

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn text_from(&self, start: usize) -> &'src str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("")
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = CompileError::at(code, message, span).with_source_line(source_line);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────

    /// Measure the indentation of the next non-blank line and emit
    /// `Indent`/`Dedent` tokens for the change.
    fn scan_indentation(&mut self, tokens: &mut Vec<Token>) {
        loop {
            let mut width = 0u32;
            while let Some(ch) = self.peek() {
                match ch {
                    b' ' => width += 1,
                    b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    b'\r' => {}
                    _ => break,
                }
                self.advance();
            }
            match self.peek() {
                None => return,
                Some(b'\n') => {
                    self.advance();
                    continue;
                }
                Some(b'#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {}
            }

            let span = self.current_span();
            let top = *self.indent_stack.last().unwrap_or(&0);
            if width > top {
                self.indent_stack.push(width);
                tokens.push(Token::new(TokenKind::Indent, span));
            } else if width < top {
                while self.indent_stack.last().is_some_and(|&level| level > width) {
                    self.indent_stack.pop();
                    tokens.push(Token::new(TokenKind::Dedent, span));
                }
                if self.indent_stack.last() != Some(&width) {
                    self.emit_error(
                        ErrorCode::INCONSISTENT_INDENT,
                        "Unindent does not match any outer indentation level",
                        span,
                    );
                    self.indent_stack.push(width);
                }
            }
            return;
        }
    }

    /// Skip a `#` comment up to (not including) the newline.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan the next token; `None` at end of input.
    fn scan_token(&mut self) -> Option<Token> {
        loop {
            match self.peek()? {
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'#' => self.skip_comment(),
                b'\\' if matches!(self.peek_at(1), Some(b'\n')) => {
                    self.advance();
                    self.advance();
                }
                b'\\' if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.advance();
                    self.advance();
                    self.advance();
                }
                b'\n' if self.bracket_depth > 0 => {
                    self.advance();
                }
                _ => break,
            }
        }

        let start_line = self.line;
        let start_col = self.col;
        let start = self.pos;
        let ch = self.advance()?;

        let simple = |kind: TokenKind, lexer: &Self| {
            Some(Token::new(kind, lexer.span_from(start_line, start_col)))
        };

        match ch {
            b'\n' => Some(Token::new(TokenKind::Newline, Span::point(start_line, start_col))),

            b'\'' | b'"' => Some(self.scan_string(ch, start_line, start_col)),

            b'0'..=b'9' => Some(self.scan_number(start, start_line, start_col)),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                Some(self.scan_number(start, start_line, start_col))
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.consume_ident_chars();
                let text = self.text_from(start);
                let kind = TokenKind::from_keyword(text)
                    .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
                simple(kind, self)
            }

            b'$' => {
                if matches!(self.peek(), Some(b'a'..=b'z' | b'A'..=b'Z' | b'_')) {
                    self.consume_ident_chars();
                    let text = self.text_from(start).to_string();
                    simple(TokenKind::Identifier(text), self)
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "'$' must be followed by a name",
                        span,
                    );
                    self.scan_token()
                }
            }

            b'+' => self.operator(TokenKind::Plus, start_line, start_col),
            b'*' => self.operator(TokenKind::Star, start_line, start_col),
            b'/' => self.operator(TokenKind::Slash, start_line, start_col),
            b'%' => self.operator(TokenKind::Percent, start_line, start_col),
            b'@' => self.operator(TokenKind::At, start_line, start_col),
            b'^' => self.operator(TokenKind::Caret, start_line, start_col),
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    simple(TokenKind::Arrow, self)
                } else {
                    self.operator(TokenKind::Minus, start_line, start_col)
                }
            }

            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::EqEq, self)
                } else {
                    simple(TokenKind::Eq, self)
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::NotEq, self)
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "Unexpected character '!', use 'not' for negation",
                        span,
                    );
                    self.scan_token()
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::LessEq, self)
                } else {
                    simple(TokenKind::Less, self)
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    simple(TokenKind::GreaterEq, self)
                } else {
                    simple(TokenKind::Greater, self)
                }
            }

            b'(' | b'[' | b'{' => {
                self.bracket_depth += 1;
                let kind = match ch {
                    b'(' => TokenKind::LParen,
                    b'[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                };
                simple(kind, self)
            }
            b')' | b']' | b'}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                let kind = match ch {
                    b')' => TokenKind::RParen,
                    b']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                };
                simple(kind, self)
            }
            b',' => simple(TokenKind::Comma, self),
            b':' => simple(TokenKind::Colon, self),
            b'.' => simple(TokenKind::Dot, self),

            _ => {
                let span = self.span_from(start_line, start_col);
                let shown = self.source_file.source[start..]
                    .chars()
                    .next()
                    .unwrap_or('?');
                // Skip the rest of a multi-byte character.
                while self.peek().is_some_and(|b| (b & 0xC0) == 0x80) {
                    self.pos += 1;
                }
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Unexpected character '{shown}'"),
                    span,
                );
                self.scan_token()
            }
        }
    }

    /// An arithmetic operator, or its augmented-assignment form when followed by `=`.
    fn operator(&mut self, kind: TokenKind, start_line: u32, start_col: u32) -> Option<Token> {
        let kind = if self.peek() == Some(b'=') {
            self.advance();
            TokenKind::AugAssign(Box::new(kind))
        } else {
            kind
        };
        Some(Token::new(kind, self.span_from(start_line, start_col)))
    }

    fn consume_ident_chars(&mut self) {
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == b'_')
        {
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        let mut is_float = self.source[start] == b'.';
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        // `1.5` and `1.` are floats; `v.x` style access never starts with a digit.
        if !is_float
            && self.peek() == Some(b'.')
            && !matches!(self.peek_at(1), Some(b'a'..=b'z' | b'A'..=b'Z' | b'_'))
        {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if matches!(self.peek_at(1 + sign), Some(b'0'..=b'9')) {
                is_float = true;
                for _ in 0..=sign {
                    self.advance();
                }
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.advance();
                }
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = self.text_from(start);
        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(value) => TokenKind::FloatLit(value),
                Err(_) => {
                    self.emit_error(
                        ErrorCode::INVALID_LITERAL,
                        format!("Invalid float literal '{text}'"),
                        span,
                    );
                    TokenKind::FloatLit(0.0)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => TokenKind::IntLit(value),
                Err(_) => {
                    self.emit_error(
                        ErrorCode::INVALID_LITERAL,
                        format!("Integer literal '{text}' is out of range"),
                        span,
                    );
                    TokenKind::IntLit(0)
                }
            }
        };
        Token::new(kind, span)
    }

    /// Scan a string literal after its opening quote.
    fn scan_string(&mut self, quote: u8, start_line: u32, start_col: u32) -> Token {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNCLOSED_DELIMITER,
                        "Unterminated string literal",
                        span,
                    );
                    break;
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        Some(b'n') => buf.push(b'\n'),
                        Some(b't') => buf.push(b'\t'),
                        Some(b'r') => buf.push(b'\r'),
                        Some(b'0') => buf.push(0),
                        Some(other) => buf.push(other),
                        None => {}
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
        let text = String::from_utf8_lossy(&buf).into_owned();
        Token::new(
            TokenKind::StringLit(text),
            self.span_from(start_line, start_col),
        )
    }
}
