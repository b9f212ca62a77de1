//! Static legality checks for module-level (restrictive) parsing.
//!
//! A script module only admits `var`-kind declarations, function
//! declarations and imports at top level. `let`/`const` are legal inside
//! function bodies but not at module scope, and get their own error code
//! so tooling can suggest `var` instead.

use super::ast::{Stmt, VarKind};

/// Classification of a statement at module top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelKind {
    /// Legal at module scope.
    Legal,
    /// `let`/`const`: legal in inner scopes only.
    InnerScopeOnly,
    /// Not a module-level statement at all.
    NotModuleStatement,
}

pub fn classify_top_level(stmt: &Stmt) -> TopLevelKind {
    match stmt {
        Stmt::VarDecl { kind, .. } => match kind {
            VarKind::Var => TopLevelKind::Legal,
            VarKind::Let | VarKind::Const => TopLevelKind::InnerScopeOnly,
        },
        Stmt::FunctionDecl(_) | Stmt::Import { .. } | Stmt::Empty { .. } => TopLevelKind::Legal,
        _ => TopLevelKind::NotModuleStatement,
    }
}
