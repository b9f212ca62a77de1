//! Token definitions for the scripting dialect.

use std::fmt;

/// Source location of a token or syntax tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based).
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    /// Merge two spans, keeping the position of the earlier one.
    pub fn merge(self, other: Span) -> Self {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// Token types of the scripting dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (42, 0xFF)
    Integer(i64),
    /// Floating point literal (3.14, 1e9)
    Float(f64),
    /// String literal ("hello", 'world')
    String(String),
    /// Head of a template literal up to the first interpolation,
    /// or the whole literal when there is none.
    TemplateHead {
        cooked: String,
        /// True when the part ends the literal (no `${` follows).
        tail: bool,
    },
    /// Middle or tail part of a template literal, after a `}` that closes
    /// an interpolation.
    TemplateMiddle { cooked: String, tail: bool },
    True,
    False,
    Null,
    Undefined,

    /// Identifier (variable, function or property name).
    Identifier(String),

    // Keywords
    Break,
    Case,
    Catch,
    Const,
    Continue,
    Default,
    Do,
    Else,
    Export,
    Finally,
    For,
    From,
    Function,
    If,
    Import,
    In,
    Let,
    Of,
    Return,
    Switch,
    Throw,
    Try,
    TypeOf,
    Var,
    While,

    // Punctuators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    Ellipsis,
    Colon,
    Question,
    Arrow,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    UshrAssign,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Not,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
    Ushr,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Is this token a variable declaration keyword?
    pub fn is_declaration_kind(&self) -> bool {
        matches!(self, TokenKind::Let | TokenKind::Const | TokenKind::Var)
    }

    /// Is this token an assignment operator (plain or compound)?
    pub fn is_assignment_op(&self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
                | TokenKind::AmpAssign
                | TokenKind::PipeAssign
                | TokenKind::CaretAssign
                | TokenKind::ShlAssign
                | TokenKind::ShrAssign
                | TokenKind::UshrAssign
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::Float(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "{:?}", s),
            TokenKind::TemplateHead { cooked, .. } => write!(f, "`{}…", cooked),
            TokenKind::TemplateMiddle { cooked, .. } => write!(f, "…{}`", cooked),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::Eof => write!(f, "<end of input>"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
