//! Tree evaluation.
//!
//! There is a single evaluator core, written as async functions so it
//! can suspend at async native-function calls. The synchronous driver
//! polls the evaluation future exactly once with a no-op waker: a run
//! composed solely of ready sub-futures completes on that first poll,
//! so a `Pending` result proves a genuine suspension and surfaces as
//! [`RuntimeError::SuspendedInSyncMode`].

pub mod builtins;
pub mod expression;
pub mod statement;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::pin_mut;

use crate::parser::ast::Stmt;
use crate::runner::ds::{LogicalThread, RuntimeError, Value};

pub use statement::{process_statement_queue, process_statement_queue_async};

/// Classification of a binding update reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateHookKind {
    /// Plain or compound assignment, including member writes.
    Assignment,
    /// Prefix/postfix increment or decrement.
    PrePost,
    /// A method call on a host-context value.
    FunctionCall,
}

impl UpdateHookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateHookKind::Assignment => "assignment",
            UpdateHookKind::PrePost => "pre-post",
            UpdateHookKind::FunctionCall => "function-call",
        }
    }
}

/// Host callbacks. All optional; a missing hook costs nothing.
#[derive(Clone, Default)]
pub struct Hooks {
    pub on_statement_started: Option<Rc<dyn Fn(&Stmt)>>,
    pub on_statement_completed: Option<Rc<dyn Fn(&Stmt)>>,
    /// Fired with the *root* binding name just before a host-context
    /// binding is updated. Bindings declared by the script itself never
    /// fire.
    pub on_will_update: Option<Rc<dyn Fn(UpdateHookKind, &str)>>,
    /// The post-mutation counterpart of `on_will_update`.
    pub on_did_update: Option<Rc<dyn Fn(UpdateHookKind, &str)>>,
}

/// Everything the evaluator needs besides the thread it runs on.
#[derive(Clone, Default)]
pub struct EvalContext {
    /// Component-local host bindings. Assignment to an unknown name
    /// creates it here.
    pub local_context: Rc<RefCell<HashMap<String, Value>>>,
    /// Application-wide host bindings.
    pub app_context: Rc<RefCell<HashMap<String, Value>>>,
    pub hooks: Hooks,
    /// Cooperative cancellation flag, checked between statements by the
    /// asynchronous driver. Rollback of partial effects is the host's
    /// concern.
    pub cancelled: Option<Rc<Cell<bool>>>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext::default()
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), RuntimeError> {
        match &self.cancelled {
            Some(flag) if flag.get() => Err(RuntimeError::Cancelled),
            _ => Ok(()),
        }
    }

    pub(crate) fn fire_started(&self, stmt: &Stmt) {
        if let Some(hook) = &self.hooks.on_statement_started {
            hook(stmt);
        }
    }

    pub(crate) fn fire_completed(&self, stmt: &Stmt) {
        if let Some(hook) = &self.hooks.on_statement_completed {
            hook(stmt);
        }
    }

    pub(crate) fn fire_will_update(&self, kind: UpdateHookKind, name: &str) {
        if let Some(hook) = &self.hooks.on_will_update {
            hook(kind, name);
        }
    }

    pub(crate) fn fire_did_update(&self, kind: UpdateHookKind, name: &str) {
        if let Some(hook) = &self.hooks.on_did_update {
            hook(kind, name);
        }
    }
}

/// Drive an evaluation future in synchronous mode.
pub(crate) fn run_sync<F>(future: F) -> Result<Value, RuntimeError>
where
    F: Future<Output = Result<Value, RuntimeError>>,
{
    let waker = futures::task::noop_waker();
    let mut cx = Context::from_waker(&waker);
    pin_mut!(future);
    match future.as_mut().poll(&mut cx) {
        Poll::Ready(result) => result,
        Poll::Pending => Err(RuntimeError::SuspendedInSyncMode),
    }
}

/// Evaluate a single expression synchronously. An async native call on
/// the way fails with [`RuntimeError::SuspendedInSyncMode`].
pub fn eval_expression(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    expr: &crate::parser::ast::Expr,
) -> Result<Value, RuntimeError> {
    ensure_root_block(thread);
    run_sync(expression::eval_expr(ctx, thread, expr))
}

/// Evaluate a single expression, awaiting suspension points.
pub async fn eval_expression_async(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    expr: &crate::parser::ast::Expr,
) -> Result<Value, RuntimeError> {
    ensure_root_block(thread);
    expression::eval_expr(ctx, thread, expr).await
}

/// Threads keep their root block across driver calls, so consecutive
/// statement queues on one thread share top-level declarations.
pub(crate) fn ensure_root_block(thread: &mut LogicalThread) {
    if thread.blocks.is_empty() {
        thread.push_block();
    }
}
