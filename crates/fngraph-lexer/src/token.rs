//! Token types for the fngraph lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the Python-style source
//! language and [`Token`], which pairs a kind with a source [`Span`].

use fngraph_types::Span;
use std::fmt;

/// Reserved words. They cannot be used as variable names.
pub const ALL_KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "else", "def", "return", "import", "from", "as", "pass", "True",
    "False",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `42`
    IntLit(i64),
    /// `3.5`, `.5`, `1e3`
    FloatLit(f64),
    /// `'text'` or `"text"`
    StringLit(String),
    True,
    False,

    // ── Identifiers ──────────────────────────────────────────
    /// `my_var`, or a system name such as `$pos`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    And,
    Or,
    Not,
    If,
    Else,
    Def,
    Return,
    Import,
    From,
    As,
    Pass,

    // ── Operators ────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `@`: scalar product between operands, decorator marker at line start
    At,
    /// `^`
    Caret,
    EqEq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,

    // ── Assignment ───────────────────────────────────────────
    Eq,
    /// `+=`, `-=`, ... carrying the operator token it augments
    AugAssign(Box<TokenKind>),

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    /// `->`
    Arrow,

    // ── Layout ───────────────────────────────────────────────
    /// End of a logical line.
    Newline,
    /// Indentation increased.
    Indent,
    /// Indentation decreased by one level.
    Dedent,
    Eof,
}

impl TokenKind {
    /// Look up a reserved word.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "pass" => TokenKind::Pass,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::Def
                | TokenKind::Return
                | TokenKind::Import
                | TokenKind::From
                | TokenKind::As
                | TokenKind::Pass
                | TokenKind::True
                | TokenKind::False
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLit(n) => write!(f, "{n}"),
            TokenKind::FloatLit(n) => write!(f, "{n:?}"),
            TokenKind::StringLit(s) => write!(f, "'{s}'"),
            TokenKind::True => f.write_str("True"),
            TokenKind::False => f.write_str("False"),
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Not => f.write_str("not"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::Def => f.write_str("def"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Import => f.write_str("import"),
            TokenKind::From => f.write_str("from"),
            TokenKind::As => f.write_str("as"),
            TokenKind::Pass => f.write_str("pass"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::At => f.write_str("@"),
            TokenKind::Caret => f.write_str("^"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::NotEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Eq => f.write_str("="),
            TokenKind::AugAssign(op) => write!(f, "{op}="),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Arrow => f.write_str("->"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Indent => f.write_str("indent"),
            TokenKind::Dedent => f.write_str("dedent"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_keyword_round_trips() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw)
                .unwrap_or_else(|| panic!("'{kw}' should be a keyword"));
            assert!(kind.is_keyword());
            assert_eq!(kind.to_string(), *kw);
        }
    }

    #[test]
    fn builtin_names_are_not_keywords() {
        for name in ["float2", "vector3", "export", "_OUT_", "true"] {
            assert_eq!(TokenKind::from_keyword(name), None);
        }
    }

    #[test]
    fn aug_assign_display() {
        let tok = TokenKind::AugAssign(Box::new(TokenKind::At));
        assert_eq!(tok.to_string(), "@=");
    }
}
