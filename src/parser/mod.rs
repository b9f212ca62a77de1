//! Source text → syntax tree.

pub mod ast;
mod api;
mod lexer;
pub mod printer;
pub mod static_semantics;
pub mod token;
#[cfg(test)]
mod unit_tests;

use std::fmt;

pub use api::Parser;
pub use lexer::Lexer;
pub use printer::{arrow_source, print_expr, print_stmt, print_stmts};

use ast::{Expr, Stmt};

/// A single parse diagnostic. The parser collects as many of these as it
/// can rather than stopping at the first.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub code: u32,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "E{:03} at {}:{}: {}",
            self.code, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParserError {}

/// Parse a statement sequence. Returns the collected diagnostics instead
/// of a tree whenever any error was recorded; a tree with outstanding
/// errors is never handed to callers.
pub fn parse_statements(source: &str) -> Result<Vec<Stmt>, Vec<ParserError>> {
    let mut parser = Parser::new(source);
    let statements = parser.parse_statements();
    if parser.errors().is_empty() {
        Ok(statements)
    } else {
        Err(parser.take_errors())
    }
}

/// Parse a single expression, requiring the whole input to be consumed.
pub fn parse_expr(source: &str) -> Result<Expr, Vec<ParserError>> {
    let mut parser = Parser::new(source);
    let expr = parser.parse_single_expression();
    match expr {
        Some(expr) if parser.errors().is_empty() => Ok(expr),
        _ => Err(parser.take_errors()),
    }
}
