//! Runtime error taxonomy.

use std::fmt;

use super::value::Value;

/// An error raised while evaluating a tree. Errors propagate straight to
/// the embedding caller; the engine never retries.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// A value thrown by script code via `throw`, or rethrown from a
    /// catch block.
    Thrown(Value),
    /// An operation applied to a value of the wrong shape.
    TypeError(String),
    /// An identifier that resolves to no binding anywhere on the scope
    /// chain or in the host contexts.
    UnknownIdentifier { name: String },
    /// A `let`/`const` re-declaration in the same block scope.
    AlreadyDeclared { name: String },
    /// Assignment to a `const` binding.
    ConstAssignment { name: String },
    /// Call of a non-function value.
    NotCallable { what: String },
    /// `break`/`continue` outside of a loop.
    IllegalLoopControl { keyword: &'static str },
    /// The synchronous driver met a genuine suspension point.
    SuspendedInSyncMode,
    /// The embedding host flagged the evaluation context as cancelled.
    Cancelled,
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::TypeError(message.into())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Thrown(value) => write!(f, "uncaught: {}", value.to_display_string()),
            RuntimeError::TypeError(message) => write!(f, "type error: {}", message),
            RuntimeError::UnknownIdentifier { name } => {
                write!(f, "unknown identifier '{}'", name)
            }
            RuntimeError::AlreadyDeclared { name } => {
                write!(f, "'{}' is already declared in this scope", name)
            }
            RuntimeError::ConstAssignment { name } => {
                write!(f, "cannot assign to constant '{}'", name)
            }
            RuntimeError::NotCallable { what } => write!(f, "{} is not a function", what),
            RuntimeError::IllegalLoopControl { keyword } => {
                write!(f, "'{}' is only legal inside a loop", keyword)
            }
            RuntimeError::SuspendedInSyncMode => {
                write!(f, "synchronous evaluation hit a suspension point")
            }
            RuntimeError::Cancelled => write!(f, "evaluation was cancelled"),
        }
    }
}

impl std::error::Error for RuntimeError {}
