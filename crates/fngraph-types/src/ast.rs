//! AST node types for fngraph source.
//!
//! The tree mirrors the shape of a Python module restricted to what the graph
//! compiler understands. Every node carries a [`Span`] for error reporting.

use crate::Span;
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed source file: a flat sequence of top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    /// Top-level function definitions in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::FunctionDef(def) => Some(def),
            _ => None,
        })
    }

    /// Returns `true` if the module has statements outside of function
    /// definitions and imports.
    pub fn has_top_level_code(&self) -> bool {
        self.body.iter().any(|stmt| !stmt.is_declaration())
    }
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `target = value`
    Assign(AssignStmt),
    /// `name: type = value`
    AnnAssign(AnnAssignStmt),
    /// `name += value`
    AugAssign(AugAssignStmt),
    /// `return value`
    Return(ReturnStmt),
    /// A bare expression, usually a call such as `export(x)`.
    Expr(ExprStmt),
    FunctionDef(FunctionDef),
    Import(ImportStmt),
    ImportFrom(ImportFromStmt),
    /// `pass`
    Pass(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign(s) => s.span,
            Stmt::AnnAssign(s) => s.span,
            Stmt::AugAssign(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::FunctionDef(s) => s.span,
            Stmt::Import(s) => s.span,
            Stmt::ImportFrom(s) => s.span,
            Stmt::Pass(span) => *span,
        }
    }

    /// Function definitions and imports are handled by module orchestration,
    /// not by the statement compiler.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Stmt::FunctionDef(_) | Stmt::Import(_) | Stmt::ImportFrom(_)
        )
    }
}

/// `target = value`. The target is a name or an attribute; the compiler
/// rejects attribute targets.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnAssignStmt {
    pub target: Ident,
    /// Type name, e.g. `float2`.
    pub annotation: Ident,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AugAssignStmt {
    pub target: Ident,
    pub op: BinOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// `@decorators def name(args) -> returns: body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub args: Vec<Arg>,
    pub returns: Option<Ident>,
    pub decorators: Vec<Decorator>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A function argument with an optional type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Ident,
    pub annotation: Option<Ident>,
    pub span: Span,
}

/// `@name` or `@name(arg, key=value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    /// Dotted decorator name.
    pub name: String,
    pub args: Vec<Expr>,
    pub keywords: Vec<Keyword>,
    pub span: Span,
}

/// `key=value` inside a decorator call.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: Ident,
    pub value: Expr,
}

/// `import a.b as c, d`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub names: Vec<ImportAlias>,
    pub span: Span,
}

/// `from a.b import x as y` or `from a.b import *`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFromStmt {
    pub module: String,
    pub names: ImportNames,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportNames {
    Glob,
    List(Vec<ImportAlias>),
}

/// A (possibly dotted) imported name with an optional `as` alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportAlias {
    pub name: String,
    pub alias: Option<Ident>,
    pub span: Span,
}

impl ImportAlias {
    /// The name this import binds in the importing module.
    pub fn local_name(&self) -> &str {
        self.alias
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or(&self.name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// `a`, `a.b`, `a.b.c` rendered as a dotted name; `None` for anything else.
    pub fn dotted_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Name(name) => Some(name.clone()),
            ExprKind::Attribute { value, attr } => {
                let mut prefix = value.dotted_name()?;
                prefix.push('.');
                prefix.push_str(&attr.name);
                Some(prefix)
            }
            _ => None,
        }
    }

    pub fn is_numeric_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Int(_) | ExprKind::Float(_))
    }

    pub fn as_str_literal(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// `{a, b, c}`: builds a vector from 1–4 components.
    Vector(Vec<Expr>),

    // ── Names ──
    Name(String),
    /// `value.attr`: a swizzle on values, a namespace step in call targets.
    Attribute { value: Box<Expr>, attr: Ident },

    // ── Operators ──
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `a and b and c` keeps every operand in one node.
    BoolOp { op: BoolOp, values: Vec<Expr> },
    /// `a < b`; chains such as `a < b < c` parse but do not compile.
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    /// `body if test else orelse`
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call { func: Box<Expr>, args: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `@`: vector scaled by a scalar.
    MatMul,
    /// `^`: dot product.
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Gt,
    GtE,
    Lt,
    LtE,
    Eq,
    NotEq,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::MatMul => "@",
            BinOp::BitXor => "^",
        };
        f.write_str(s)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Expr {
        Expr::new(ExprKind::Name(n.into()), Span::point(1, 1))
    }

    #[test]
    fn dotted_name_of_attribute_chain() {
        let expr = Expr::new(
            ExprKind::Attribute {
                value: Box::new(Expr::new(
                    ExprKind::Attribute {
                        value: Box::new(name("sbs")),
                        attr: Ident::new("noise", Span::point(1, 5)),
                    },
                    Span::point(1, 1),
                )),
                attr: Ident::new("perlin", Span::point(1, 11)),
            },
            Span::point(1, 1),
        );
        assert_eq!(expr.dotted_name().as_deref(), Some("sbs.noise.perlin"));
    }

    #[test]
    fn dotted_name_rejects_calls() {
        let call = Expr::new(
            ExprKind::Call {
                func: Box::new(name("f")),
                args: vec![],
            },
            Span::point(1, 1),
        );
        assert_eq!(call.dotted_name(), None);
    }

    #[test]
    fn import_alias_local_name() {
        let plain = ImportAlias {
            name: "pkg.lib".into(),
            alias: None,
            span: Span::point(1, 1),
        };
        let aliased = ImportAlias {
            alias: Some(Ident::new("l", Span::point(1, 15))),
            ..plain.clone()
        };
        assert_eq!(plain.local_name(), "pkg.lib");
        assert_eq!(aliased.local_name(), "l");
    }
}
