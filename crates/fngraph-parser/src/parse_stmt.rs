//! Statement parsing: assignments, `return`, function definitions with
//! decorators, and imports.

use fngraph_lexer::token::TokenKind;
use fngraph_types::ast::*;
use fngraph_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse statements until `end` (not consumed) or end of input.
    pub(crate) fn parse_block_until(&mut self, end: &TokenKind) -> Vec<Stmt> {
        let mut body = Vec::new();
        loop {
            if self.too_many_errors() || self.at_end() || self.check(end) {
                break;
            }
            match self.peek_kind() {
                TokenKind::Newline => {
                    self.advance();
                    continue;
                }
                TokenKind::Indent => {
                    self.error_at_current(ErrorCode::INCONSISTENT_INDENT, "unexpected indent");
                    self.advance();
                    continue;
                }
                // Closes an unexpected indent reported above.
                TokenKind::Dedent => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        body
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::At | TokenKind::Def => self.parse_function_def(),
            TokenKind::Import => self.parse_import(),
            TokenKind::From => self.parse_import_from(),
            _ => self.parse_simple_statement(),
        }
    }

    /// Statements that fit on one line.
    fn parse_simple_statement(&mut self) -> Option<Stmt> {
        let stmt = match self.peek_kind() {
            TokenKind::Return => self.parse_return()?,
            TokenKind::Pass => Stmt::Pass(self.advance().span),
            _ => self.parse_expression_statement()?,
        };
        self.expect_newline()?;
        Some(stmt)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Simple Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_return(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        if matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent
        ) {
            self.error_at(
                ErrorCode::UNEXPECTED_TOKEN,
                "return needs a value",
                start,
            );
            return None;
        }
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// An expression, optionally followed by `=`, `: type =` or `op=`.
    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression()?;
        match self.peek_kind().clone() {
            TokenKind::Eq => {
                self.advance();
                if !matches!(expr.kind, ExprKind::Name(_) | ExprKind::Attribute { .. }) {
                    self.error_at(
                        ErrorCode::INVALID_ASSIGN_TARGET,
                        "can only assign to a variable name",
                        expr.span,
                    );
                    return None;
                }
                let value = self.parse_expression()?;
                if self.check(&TokenKind::Eq) {
                    self.error_at_current(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "chained assignment is not supported",
                    );
                    return None;
                }
                let span = expr.span.merge(value.span);
                Some(Stmt::Assign(AssignStmt {
                    target: expr,
                    value,
                    span,
                }))
            }
            TokenKind::Colon => {
                self.advance();
                let target = self.assign_target_name(expr, "annotated")?;
                let annotation = self.expect_identifier()?;
                if !self.check(&TokenKind::Eq) {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("annotated variable [{}] needs a value", target.name),
                    );
                    return None;
                }
                self.advance();
                let value = self.parse_expression()?;
                let span = target.span.merge(value.span);
                Some(Stmt::AnnAssign(AnnAssignStmt {
                    target,
                    annotation,
                    value,
                    span,
                }))
            }
            TokenKind::AugAssign(op_token) => {
                let op = match aug_assign_op(&op_token) {
                    Some(op) => op,
                    None => {
                        self.error_at_current(
                            ErrorCode::UNSUPPORTED_SYNTAX,
                            format!("unsupported augmented assignment '{op_token}='"),
                        );
                        return None;
                    }
                };
                self.advance();
                let target = self.assign_target_name(expr, "augmented")?;
                let value = self.parse_expression()?;
                let span = target.span.merge(value.span);
                Some(Stmt::AugAssign(AugAssignStmt {
                    target,
                    op,
                    value,
                    span,
                }))
            }
            _ => {
                let span = expr.span;
                Some(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    fn assign_target_name(&mut self, expr: Expr, what: &str) -> Option<Ident> {
        match expr.kind {
            ExprKind::Name(name) => Some(Ident::new(name, expr.span)),
            _ => {
                self.error_at(
                    ErrorCode::INVALID_ASSIGN_TARGET,
                    format!("{what} assignment needs a plain variable name"),
                    expr.span,
                );
                None
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Function Definitions
    // ══════════════════════════════════════════════════════════════════════════

    /// `{ Decorator } "def" Identifier "(" Params ")" [ "->" Identifier ] ":" Body`
    fn parse_function_def(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let mut decorators = Vec::new();
        while self.check(&TokenKind::At) {
            decorators.push(self.parse_decorator()?);
            while self.eat(&TokenKind::Newline) {}
        }

        self.expect(&TokenKind::Def)?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_param()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;

        let returns = if self.eat(&TokenKind::Arrow) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect(&TokenKind::Colon)?;

        let body = if self.eat(&TokenKind::Newline) {
            if !self.check(&TokenKind::Indent) {
                self.error_at_current(
                    ErrorCode::INCONSISTENT_INDENT,
                    format!("expected an indented block after 'def {}'", name.name),
                );
                return None;
            }
            self.advance();
            let body = self.parse_block_until(&TokenKind::Dedent);
            self.eat(&TokenKind::Dedent);
            body
        } else {
            vec![self.parse_simple_statement()?]
        };

        let span = start.merge(self.previous_span());
        Some(Stmt::FunctionDef(FunctionDef {
            name,
            args,
            returns,
            decorators,
            body,
            span,
        }))
    }

    /// `Identifier [ ":" Identifier ]`
    fn parse_param(&mut self) -> Option<Arg> {
        let name = self.expect_identifier()?;
        let annotation = if self.eat(&TokenKind::Colon) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let span = match &annotation {
            Some(ann) => name.span.merge(ann.span),
            None => name.span,
        };
        Some(Arg {
            name,
            annotation,
            span,
        })
    }

    /// `"@" DottedName [ "(" { Expr | Identifier "=" Expr } ")" ] Newline`
    fn parse_decorator(&mut self) -> Option<Decorator> {
        let start = self.advance().span;
        let (name, _) = self.expect_dotted_name()?;
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) {
                let is_keyword = matches!(self.peek_kind(), TokenKind::Identifier(_))
                    && *self.look_ahead(1) == TokenKind::Eq;
                if is_keyword {
                    let key = self.expect_identifier()?;
                    self.advance();
                    let value = self.parse_expression()?;
                    keywords.push(Keyword { name: key, value });
                } else {
                    if !keywords.is_empty() {
                        self.error_at_current(
                            ErrorCode::UNEXPECTED_TOKEN,
                            "positional argument follows keyword argument",
                        );
                        return None;
                    }
                    args.push(self.parse_expression()?);
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        let span = start.merge(self.previous_span());
        self.expect(&TokenKind::Newline)?;
        Some(Decorator {
            name,
            args,
            keywords,
            span,
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Imports
    // ══════════════════════════════════════════════════════════════════════════

    /// `"import" DottedName [ "as" Identifier ] { "," ... }`
    fn parse_import(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let mut names = vec![self.parse_import_alias(true)?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_import_alias(true)?);
        }
        let span = start.merge(self.previous_span());
        self.expect_newline()?;
        Some(Stmt::Import(ImportStmt { names, span }))
    }

    /// `"from" DottedName "import" ( "*" | Names | "(" Names ")" )`
    fn parse_import_from(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let (module, _) = self.expect_dotted_name()?;
        self.expect(&TokenKind::Import)?;

        let names = if self.eat(&TokenKind::Star) {
            ImportNames::Glob
        } else {
            let parenthesized = self.eat(&TokenKind::LParen);
            let mut list = vec![self.parse_import_alias(false)?];
            while self.eat(&TokenKind::Comma) {
                if parenthesized && self.check(&TokenKind::RParen) {
                    break;
                }
                list.push(self.parse_import_alias(false)?);
            }
            if parenthesized {
                self.expect(&TokenKind::RParen)?;
            }
            ImportNames::List(list)
        };

        let span = start.merge(self.previous_span());
        self.expect_newline()?;
        Some(Stmt::ImportFrom(ImportFromStmt {
            module,
            names,
            span,
        }))
    }

    fn parse_import_alias(&mut self, dotted: bool) -> Option<ImportAlias> {
        let (name, mut span) = if dotted {
            self.expect_dotted_name()?
        } else {
            let ident = self.expect_identifier()?;
            (ident.name, ident.span)
        };
        let alias = if self.eat(&TokenKind::As) {
            let alias = self.expect_identifier()?;
            span = span.merge(alias.span);
            Some(alias)
        } else {
            None
        };
        Some(ImportAlias { name, alias, span })
    }
}

/// Map the operator carried by an augmented assignment token.
fn aug_assign_op(op: &TokenKind) -> Option<BinOp> {
    Some(match op {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::At => BinOp::MatMul,
        TokenKind::Caret => BinOp::BitXor,
        _ => return None,
    })
}
