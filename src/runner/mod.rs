//! Tree-walking evaluation: runtime data structures and the two
//! evaluation drivers.

pub mod ds;
pub mod eval;

pub use ds::{LogicalThread, RuntimeError, Value};
pub use eval::{
    eval_expression, eval_expression_async, process_statement_queue,
    process_statement_queue_async, EvalContext, Hooks, UpdateHookKind,
};
