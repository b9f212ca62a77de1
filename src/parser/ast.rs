//! Typed syntax tree for the scripting dialect.
//!
//! Statements and expressions are closed sum types; every expression
//! carries a parser-assigned [`NodeId`] that gives it a stable identity
//! for the evaluator's per-thread value cache, plus a [`Span`] for
//! diagnostics.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::token::Span;

/// Identity of an expression node.
pub type NodeId = u32;

static NODE_ID_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Allocate a fresh node id. Ids are process-global so trees from
/// separate parses can execute on the same logical thread without
/// colliding in its value cache.
pub fn next_node_id() -> NodeId {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Let,
    Const,
    Var,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Let => "let",
            VarKind::Const => "const",
            VarKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LooselyEqual,
    LooselyUnequal,
    StrictlyEqual,
    StrictlyUnequal,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
    BitAnd,
    BitOr,
    BitXor,
    In,
    // Short-circuiting; right operand evaluated lazily.
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    ShiftRightUnsignedAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Binding pattern for declarations, arrow parameters and catch clauses.
#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(Ident),
    /// `[a, , b]` — `None` slots are elisions.
    Array {
        span: Span,
        elements: Vec<Option<Pattern>>,
    },
    /// `{a, q: b, nested: [c]}`
    Object {
        span: Span,
        properties: Vec<ObjectPatternProperty>,
    },
    /// `...rest`
    Rest { span: Span, argument: Box<Pattern> },
    /// `a = expr` — applied when the source value is missing or undefined.
    Default {
        span: Span,
        target: Box<Pattern>,
        fallback: Box<Expr>,
    },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(id) => id.span,
            Pattern::Array { span, .. } => *span,
            Pattern::Object { span, .. } => *span,
            Pattern::Rest { span, .. } => *span,
            Pattern::Default { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProperty {
    pub span: Span,
    /// Source key on the object being destructured.
    pub key: String,
    /// Target pattern; for shorthand `{a}` this is the identifier `a`.
    pub value: Pattern,
    pub shorthand: bool,
}

#[derive(Debug, Clone)]
pub enum PropertyKey {
    Identifier(String),
    String(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum ObjectProperty {
    KeyValue { key: PropertyKey, value: Expr },
    Shorthand(Ident),
    Spread(Expr),
}

/// Arrow function. Shared behind `Rc` so function values can reference
/// their defining tree without cloning it per call.
#[derive(Debug, Clone)]
pub struct ArrowFn {
    pub id: NodeId,
    pub span: Span,
    pub params: Vec<Pattern>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expression(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub enum MemberProperty {
    /// `obj.name`
    Static(String),
    /// `obj[expr]`
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        id: NodeId,
        span: Span,
        value: Literal,
    },
    Identifier {
        id: NodeId,
        span: Span,
        name: String,
    },
    TemplateLiteral {
        id: NodeId,
        span: Span,
        /// Literal text parts; always `expressions.len() + 1` entries.
        quasis: Vec<String>,
        expressions: Vec<Expr>,
    },
    /// `None` slots are elisions.
    ArrayLiteral {
        id: NodeId,
        span: Span,
        elements: Vec<Option<Expr>>,
    },
    ObjectLiteral {
        id: NodeId,
        span: Span,
        properties: Vec<ObjectProperty>,
    },
    Unary {
        id: NodeId,
        span: Span,
        op: UnaryOp,
        argument: Box<Expr>,
    },
    Binary {
        id: NodeId,
        span: Span,
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Sequence {
        id: NodeId,
        span: Span,
        expressions: Vec<Expr>,
    },
    Conditional {
        id: NodeId,
        span: Span,
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        id: NodeId,
        span: Span,
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Member {
        id: NodeId,
        span: Span,
        object: Box<Expr>,
        property: MemberProperty,
    },
    Assignment {
        id: NodeId,
        span: Span,
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Update {
        id: NodeId,
        span: Span,
        op: UpdateOp,
        argument: Box<Expr>,
        prefix: bool,
    },
    Arrow {
        id: NodeId,
        span: Span,
        func: Rc<ArrowFn>,
    },
    Spread {
        id: NodeId,
        span: Span,
        argument: Box<Expr>,
    },
    /// Marker for event handlers invoked without arguments.
    NoArgs { id: NodeId, span: Span },
    /// Reactive variable declaration in expression position; binds
    /// through to the caller-supplied local context.
    ReactiveVarDecl {
        id: NodeId,
        span: Span,
        name: String,
        init: Box<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::TemplateLiteral { span, .. }
            | Expr::ArrayLiteral { span, .. }
            | Expr::ObjectLiteral { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Sequence { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Call { span, .. }
            | Expr::Member { span, .. }
            | Expr::Assignment { span, .. }
            | Expr::Update { span, .. }
            | Expr::Arrow { span, .. }
            | Expr::Spread { span, .. }
            | Expr::NoArgs { span, .. }
            | Expr::ReactiveVarDecl { span, .. } => *span,
        }
    }

    pub fn node_id(&self) -> NodeId {
        match self {
            Expr::Literal { id, .. }
            | Expr::Identifier { id, .. }
            | Expr::TemplateLiteral { id, .. }
            | Expr::ArrayLiteral { id, .. }
            | Expr::ObjectLiteral { id, .. }
            | Expr::Unary { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Sequence { id, .. }
            | Expr::Conditional { id, .. }
            | Expr::Call { id, .. }
            | Expr::Member { id, .. }
            | Expr::Assignment { id, .. }
            | Expr::Update { id, .. }
            | Expr::Arrow { id, .. }
            | Expr::Spread { id, .. }
            | Expr::NoArgs { id, .. }
            | Expr::ReactiveVarDecl { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub span: Span,
    pub id: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Pattern>,
    pub body: Vec<Stmt>,
    pub exported: bool,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub span: Span,
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub span: Span,
    /// `None` for the `default` clause.
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    VarDecl {
        kind: VarKind,
        declarations: Vec<VarDeclarator>,
    },
    Expression(Expr),
}

#[derive(Debug, Clone)]
pub enum ForTarget {
    Declaration { kind: VarKind, pattern: Pattern },
    Pattern(Pattern),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block {
        span: Span,
        body: Vec<Stmt>,
    },
    Empty {
        span: Span,
    },
    Expression {
        span: Span,
        expression: Expr,
    },
    /// An arrow expression in statement position; its body executes
    /// directly against the current scope chain (event handler form).
    ArrowExpression {
        span: Span,
        func: Rc<ArrowFn>,
    },
    VarDecl {
        span: Span,
        kind: VarKind,
        declarations: Vec<VarDeclarator>,
    },
    FunctionDecl(FunctionDecl),
    If {
        span: Span,
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Return {
        span: Span,
        argument: Option<Expr>,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    While {
        span: Span,
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        span: Span,
        test: Expr,
        body: Box<Stmt>,
    },
    For {
        span: Span,
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        span: Span,
        left: ForTarget,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        span: Span,
        left: ForTarget,
        right: Expr,
        body: Box<Stmt>,
    },
    Throw {
        span: Span,
        argument: Expr,
    },
    Try {
        span: Span,
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        span: Span,
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Import {
        span: Span,
        specifiers: Vec<ImportSpecifier>,
        module: String,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block { span, .. }
            | Stmt::Empty { span }
            | Stmt::Expression { span, .. }
            | Stmt::ArrowExpression { span, .. }
            | Stmt::VarDecl { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForIn { span, .. }
            | Stmt::ForOf { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Import { span, .. } => *span,
            Stmt::FunctionDecl(decl) => decl.span,
        }
    }
}
