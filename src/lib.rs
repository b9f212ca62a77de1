//! An embeddable expression and statement engine for host UI trees.
//!
//! The crate parses a small JavaScript-like dialect into a typed tree,
//! links multi-module code-behind sources, and evaluates trees against
//! host-supplied contexts, either synchronously or with suspension at
//! async native calls.
//!
//! ```
//! use uiscript::parser::parse_statements;
//! use uiscript::runner::{process_statement_queue, EvalContext, LogicalThread, Value};
//!
//! let statements = parse_statements("let x = 2; return x * 21;").unwrap();
//! let ctx = EvalContext::new();
//! let mut thread = LogicalThread::new();
//! let result = process_statement_queue(&statements, &ctx, &mut thread).unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```

pub mod module;
pub mod parser;
pub mod runner;
