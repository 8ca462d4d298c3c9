//! Expression parsing with Python operator precedence.
//!
//! Precedence (lowest → highest):
//! 8. `a if c else b`
//! 7. `or`
//! 6. `and`
//! 5. `not`
//! 4. `<`, `<=`, `>`, `>=`, `==`, `!=` (chains parse into one `Compare`)
//! 3. `^`
//! 2. `+`, `-`
//! 1. `*`, `/`, `%`, `@`
//! 0. unary `-`/`+`, then `.attr` and calls
//!
//! A unary minus applied directly to a number literal is folded into the
//! literal, so `-1` is the constant `-1`.

use fngraph_lexer::token::TokenKind;
use fngraph_types::ast::*;
use fngraph_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        if !self.enter_expr() {
            return None;
        }
        let result = self.parse_ternary();
        self.exit_expr();
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Ternary = OrExpr [ "if" OrExpr "else" Ternary ]`
    fn parse_ternary(&mut self) -> Option<Expr> {
        let body = self.parse_or()?;
        if !self.eat(&TokenKind::If) {
            return Some(body);
        }
        let test = self.parse_or()?;
        self.expect(&TokenKind::Else)?;
        let orelse = self.parse_expression()?;
        let span = body.span.merge(orelse.span);
        Some(Expr::new(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            span,
        ))
    }

    /// `OrExpr = AndExpr { "or" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        self.parse_bool_chain(&TokenKind::Or, BoolOp::Or, Self::parse_and)
    }

    /// `AndExpr = NotExpr { "and" NotExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        self.parse_bool_chain(&TokenKind::And, BoolOp::And, Self::parse_not)
    }

    fn parse_bool_chain(
        &mut self,
        token: &TokenKind,
        op: BoolOp,
        operand: fn(&mut Self) -> Option<Expr>,
    ) -> Option<Expr> {
        let first = operand(self)?;
        if !self.check(token) {
            return Some(first);
        }
        let mut values = vec![first];
        while self.eat(token) {
            values.push(operand(self)?);
        }
        let span = values[0].span.merge(values[values.len() - 1].span);
        Some(Expr::new(ExprKind::BoolOp { op, values }, span))
    }

    /// `NotExpr = "not" NotExpr | CompExpr`
    fn parse_not(&mut self) -> Option<Expr> {
        if self.check(&TokenKind::Not) {
            let start = self.advance().span;
            let operand = self.parse_not()?;
            let span = start.merge(operand.span);
            return Some(Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    /// `CompExpr = XorExpr { CompOp XorExpr }`
    fn parse_comparison(&mut self) -> Option<Expr> {
        let left = self.parse_xor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.match_comparison_op() {
            self.advance();
            ops.push(op);
            comparators.push(self.parse_xor()?);
        }
        match comparators.last() {
            None => Some(left),
            Some(last) => {
                let span = left.span.merge(last.span);
                Some(Expr::new(
                    ExprKind::Compare {
                        left: Box::new(left),
                        ops,
                        comparators,
                    },
                    span,
                ))
            }
        }
    }

    fn match_comparison_op(&self) -> Option<CmpOp> {
        match self.peek_kind() {
            TokenKind::Greater => Some(CmpOp::Gt),
            TokenKind::GreaterEq => Some(CmpOp::GtE),
            TokenKind::Less => Some(CmpOp::Lt),
            TokenKind::LessEq => Some(CmpOp::LtE),
            TokenKind::EqEq => Some(CmpOp::Eq),
            TokenKind::NotEq => Some(CmpOp::NotEq),
            _ => None,
        }
    }

    /// `XorExpr = AddExpr { "^" AddExpr }`
    fn parse_xor(&mut self) -> Option<Expr> {
        let mut left = self.parse_add()?;
        while self.eat(&TokenKind::Caret) {
            let right = self.parse_add()?;
            left = binary(left, BinOp::BitXor, right);
        }
        Some(left)
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%" | "@") UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                TokenKind::At => BinOp::MatMul,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `UnaryExpr = ("-" | "+") UnaryExpr | PostfixExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        match self.peek_kind() {
            TokenKind::Minus => {
                let start = self.advance().span;
                let operand = self.parse_unary()?;
                let span = start.merge(operand.span);
                let kind = match operand.kind {
                    ExprKind::Int(n) => ExprKind::Int(-n),
                    ExprKind::Float(n) => ExprKind::Float(-n),
                    _ => ExprKind::UnaryOp {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                };
                Some(Expr::new(kind, span))
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    /// `PostfixExpr = Primary { "." Identifier | "(" Args ")" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_identifier()?;
                    let span = expr.span.merge(attr.span);
                    expr = Expr::new(
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let close = self.expect(&TokenKind::RParen)?;
                    let span = expr.span.merge(close.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.error_at_current(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "subscripts are not supported, use swizzling such as v.x",
                    );
                    return None;
                }
                _ => break,
            }
        }
        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::IntLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Int(n), start))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Float(n), start))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Some(Expr::new(ExprKind::Str(s), start))
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(false), start))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Name(name), start))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                if self.check(&TokenKind::Comma) {
                    self.error_at_current(
                        ErrorCode::UNSUPPORTED_SYNTAX,
                        "tuples are not supported, use a vector literal {a, b}",
                    );
                    return None;
                }
                self.expect(&TokenKind::RParen)?;
                // Parentheses only group; the inner node keeps its own kind.
                Some(Expr::new(inner.kind, start.merge(self.previous_span())))
            }
            TokenKind::LBrace => self.parse_vector_literal(),
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                None
            }
        }
    }

    /// `VectorLit = "{" [ Expr { "," Expr } [ "," ] ] "}"`
    fn parse_vector_literal(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            elements.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBrace)?;
        Some(Expr::new(ExprKind::Vector(elements), start.merge(close.span)))
    }

    /// Positional call arguments, up to (not including) the closing paren.
    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            if matches!(self.peek_kind(), TokenKind::Identifier(_))
                && *self.look_ahead(1) == TokenKind::Eq
            {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "keyword arguments are only supported in decorators",
                );
                return None;
            }
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(args)
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
