//! Statement execution and the two queue drivers.
//!
//! Statements complete with a [`Completion`]; `throw` travels as a
//! `RuntimeError` through `Result`. Loop statements re-fire the
//! statement hooks once per condition evaluation, so a loop that runs
//! its body N times reports N+1 starts for the loop statement itself.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::debug;

use crate::parser::ast::{
    next_node_id, ArrowBody, ArrowFn, Expr, ForInit, ForTarget, Stmt, VarKind,
};
use crate::runner::ds::{
    BindingKind, FunctionValue, LogicalThread, LoopScope, RuntimeError, TryScope, Value,
};

use super::expression::{destructure, eval_expr, BindMode};
use super::EvalContext;

/// How a statement finished.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Run a statement queue synchronously. A genuine suspension point on
/// the way fails with [`RuntimeError::SuspendedInSyncMode`].
pub fn process_statement_queue(
    statements: &[Stmt],
    ctx: &EvalContext,
    thread: &mut LogicalThread,
) -> Result<Value, RuntimeError> {
    super::run_sync(process_statement_queue_async(statements, ctx, thread))
}

/// Run a statement queue, awaiting suspension points. The cancellation
/// flag is checked between statements.
pub async fn process_statement_queue_async(
    statements: &[Stmt],
    ctx: &EvalContext,
    thread: &mut LogicalThread,
) -> Result<Value, RuntimeError> {
    debug!("processing a queue of {} statements", statements.len());
    super::ensure_root_block(thread);
    thread.return_value = None;
    for stmt in statements {
        ctx.check_cancelled()?;
        if let Completion::Return(value) = exec_stmt(ctx, thread, stmt).await? {
            thread.return_value = Some(value);
            break;
        }
    }
    Ok(thread.return_value.take().unwrap_or(Value::Undefined))
}

pub(crate) fn exec_stmt<'a>(
    ctx: &'a EvalContext,
    thread: &'a mut LogicalThread,
    stmt: &'a Stmt,
) -> LocalBoxFuture<'a, Result<Completion, RuntimeError>> {
    async move {
        ctx.fire_started(stmt);
        let result = dispatch(ctx, thread, stmt).await;
        ctx.fire_completed(stmt);
        result
    }
    .boxed_local()
}

async fn dispatch(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    stmt: &Stmt,
) -> Result<Completion, RuntimeError> {
    match stmt {
        Stmt::Empty { .. } | Stmt::Import { .. } => Ok(Completion::Normal),
        Stmt::Block { body, .. } => exec_block_stmts(ctx, thread, body).await,
        Stmt::Expression { expression, .. } => {
            eval_expr(ctx, thread, expression).await?;
            Ok(Completion::Normal)
        }
        Stmt::ArrowExpression { func, .. } => match &func.body {
            // Event-handler form: the body runs against the current
            // scope chain rather than a fresh call thread.
            ArrowBody::Expression(expr) => {
                let value = eval_expr(ctx, thread, expr).await?;
                thread.return_value = Some(value);
                Ok(Completion::Normal)
            }
            ArrowBody::Block(body) => exec_block_stmts(ctx, thread, body).await,
        },
        Stmt::VarDecl {
            kind, declarations, ..
        } => {
            for declarator in declarations {
                let value = match &declarator.init {
                    Some(init) => eval_expr(ctx, thread, init).await?,
                    None => Value::Undefined,
                };
                destructure(
                    ctx,
                    thread,
                    &declarator.id,
                    value,
                    BindMode::Declare(binding_kind(*kind)),
                )
                .await?;
            }
            Ok(Completion::Normal)
        }
        Stmt::FunctionDecl(decl) => {
            let func = Rc::new(ArrowFn {
                id: next_node_id(),
                span: decl.span,
                params: decl.params.clone(),
                body: ArrowBody::Block(decl.body.clone()),
            });
            let value = Value::Function(Rc::new(FunctionValue {
                id: func.id,
                func: Rc::clone(&func),
                closures: thread.capture_closures(),
            }));
            thread.declare(&decl.name.name, BindingKind::Var, value)?;
            Ok(Completion::Normal)
        }
        Stmt::If {
            test,
            consequent,
            alternate,
            ..
        } => {
            if eval_expr(ctx, thread, test).await?.is_truthy() {
                exec_stmt(ctx, thread, consequent).await
            } else if let Some(alternate) = alternate {
                exec_stmt(ctx, thread, alternate).await
            } else {
                Ok(Completion::Normal)
            }
        }
        Stmt::Return { argument, .. } => {
            let value = match argument {
                Some(argument) => eval_expr(ctx, thread, argument).await?,
                None => Value::Undefined,
            };
            Ok(Completion::Return(value))
        }
        Stmt::Break { .. } => {
            if thread.loops.is_empty() {
                Err(RuntimeError::IllegalLoopControl { keyword: "break" })
            } else {
                Ok(Completion::Break)
            }
        }
        Stmt::Continue { .. } => {
            if thread.loops.iter().any(|scope| scope.accepts_continue) {
                Ok(Completion::Continue)
            } else {
                Err(RuntimeError::IllegalLoopControl { keyword: "continue" })
            }
        }
        Stmt::While { test, body, .. } => {
            thread.loops.push(LoopScope {
                block_depth: thread.blocks.len(),
                accepts_continue: true,
            });
            let result = exec_while(ctx, thread, stmt, test, body).await;
            thread.loops.pop();
            result
        }
        Stmt::DoWhile { test, body, .. } => {
            thread.loops.push(LoopScope {
                block_depth: thread.blocks.len(),
                accepts_continue: true,
            });
            let result = exec_do_while(ctx, thread, stmt, test, body).await;
            thread.loops.pop();
            result
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            // Head scope for loop-declared variables.
            thread.push_block();
            thread.loops.push(LoopScope {
                block_depth: thread.blocks.len(),
                accepts_continue: true,
            });
            let result = exec_for(ctx, thread, stmt, init, test, update, body).await;
            thread.loops.pop();
            thread.pop_block();
            result
        }
        Stmt::ForIn {
            left, right, body, ..
        } => {
            let source = eval_expr(ctx, thread, right).await?;
            let keys: Vec<Value> = match &source {
                Value::Object(fields) => {
                    // HashMap iteration order is arbitrary; enumerate
                    // keys sorted so runs are deterministic.
                    let mut keys: Vec<String> = fields.borrow().keys().cloned().collect();
                    keys.sort();
                    keys.into_iter().map(Value::String).collect()
                }
                Value::Array(items) => {
                    (0..items.borrow().len() as i64).map(Value::Int).collect()
                }
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "for..in needs an object or array, got a {}",
                        other.type_name()
                    )))
                }
            };
            run_for_each(ctx, thread, stmt, left, keys, body).await
        }
        Stmt::ForOf {
            left, right, body, ..
        } => {
            let source = eval_expr(ctx, thread, right).await?;
            let values: Vec<Value> = match &source {
                Value::Array(items) => items.borrow().clone(),
                Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "for..of needs an array or string, got a {}",
                        other.type_name()
                    )))
                }
            };
            run_for_each(ctx, thread, stmt, left, values, body).await
        }
        Stmt::Throw { argument, .. } => {
            let value = eval_expr(ctx, thread, argument).await?;
            Err(RuntimeError::Thrown(value))
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => exec_try(ctx, thread, block, handler.as_ref(), finalizer.as_deref()).await,
        Stmt::Switch {
            discriminant,
            cases,
            ..
        } => exec_switch(ctx, thread, discriminant, cases).await,
    }
}

async fn exec_while(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    stmt: &Stmt,
    test: &Expr,
    body: &Stmt,
) -> Result<Completion, RuntimeError> {
    let mut first = true;
    loop {
        if !first {
            ctx.fire_completed(stmt);
            ctx.fire_started(stmt);
        }
        first = false;
        if !eval_expr(ctx, thread, test).await?.is_truthy() {
            return Ok(Completion::Normal);
        }
        match exec_stmt(ctx, thread, body).await? {
            Completion::Normal | Completion::Continue => {}
            Completion::Break => return Ok(Completion::Normal),
            ret @ Completion::Return(_) => return Ok(ret),
        }
        ctx.check_cancelled()?;
    }
}

async fn exec_do_while(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    stmt: &Stmt,
    test: &Expr,
    body: &Stmt,
) -> Result<Completion, RuntimeError> {
    let mut first = true;
    loop {
        if !first {
            ctx.fire_completed(stmt);
            ctx.fire_started(stmt);
        }
        first = false;
        match exec_stmt(ctx, thread, body).await? {
            Completion::Normal | Completion::Continue => {}
            Completion::Break => return Ok(Completion::Normal),
            ret @ Completion::Return(_) => return Ok(ret),
        }
        if !eval_expr(ctx, thread, test).await?.is_truthy() {
            return Ok(Completion::Normal);
        }
        ctx.check_cancelled()?;
    }
}

#[allow(clippy::too_many_arguments)]
async fn exec_for(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    stmt: &Stmt,
    init: &Option<ForInit>,
    test: &Option<Expr>,
    update: &Option<Expr>,
    body: &Stmt,
) -> Result<Completion, RuntimeError> {
    match init {
        Some(ForInit::VarDecl {
            kind, declarations, ..
        }) => {
            for declarator in declarations {
                let value = match &declarator.init {
                    Some(init) => eval_expr(ctx, thread, init).await?,
                    None => Value::Undefined,
                };
                destructure(
                    ctx,
                    thread,
                    &declarator.id,
                    value,
                    BindMode::Declare(binding_kind(*kind)),
                )
                .await?;
            }
        }
        Some(ForInit::Expression(expr)) => {
            eval_expr(ctx, thread, expr).await?;
        }
        None => {}
    }
    let mut first = true;
    loop {
        if !first {
            ctx.fire_completed(stmt);
            ctx.fire_started(stmt);
        }
        first = false;
        if let Some(test) = test {
            if !eval_expr(ctx, thread, test).await?.is_truthy() {
                return Ok(Completion::Normal);
            }
        }
        match exec_stmt(ctx, thread, body).await? {
            Completion::Normal | Completion::Continue => {}
            Completion::Break => return Ok(Completion::Normal),
            ret @ Completion::Return(_) => return Ok(ret),
        }
        if let Some(update) = update {
            eval_expr(ctx, thread, update).await?;
        }
        ctx.check_cancelled()?;
    }
}

async fn run_for_each(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    stmt: &Stmt,
    left: &ForTarget,
    values: Vec<Value>,
    body: &Stmt,
) -> Result<Completion, RuntimeError> {
    thread.loops.push(LoopScope {
        block_depth: thread.blocks.len(),
        accepts_continue: true,
    });
    let result = exec_for_each(ctx, thread, stmt, left, values, body).await;
    thread.loops.pop();
    result
}

async fn exec_for_each(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    stmt: &Stmt,
    left: &ForTarget,
    values: Vec<Value>,
    body: &Stmt,
) -> Result<Completion, RuntimeError> {
    let mut first = true;
    for value in values {
        if !first {
            ctx.fire_completed(stmt);
            ctx.fire_started(stmt);
        }
        first = false;
        thread.push_block();
        let bound = match left {
            ForTarget::Declaration { kind, pattern } => {
                destructure(ctx, thread, pattern, value, BindMode::Declare(binding_kind(*kind)))
                    .await
            }
            ForTarget::Pattern(pattern) => {
                destructure(ctx, thread, pattern, value, BindMode::Assign).await
            }
        };
        let result = match bound {
            Ok(()) => exec_stmt(ctx, thread, body).await,
            Err(error) => Err(error),
        };
        thread.pop_block();
        match result? {
            Completion::Normal | Completion::Continue => {}
            Completion::Break => return Ok(Completion::Normal),
            ret @ Completion::Return(_) => return Ok(ret),
        }
        ctx.check_cancelled()?;
    }
    Ok(Completion::Normal)
}

async fn exec_try(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    block: &[Stmt],
    handler: Option<&crate::parser::ast::CatchClause>,
    finalizer: Option<&[Stmt]>,
) -> Result<Completion, RuntimeError> {
    let depth = thread.blocks.len();
    thread.try_blocks.push(TryScope { block_depth: depth });
    let result = exec_block_stmts(ctx, thread, block).await;
    thread.try_blocks.pop();

    let result = match result {
        Err(error) if is_catchable(&error) => {
            thread.blocks.truncate(depth);
            match handler {
                Some(clause) => {
                    thread.push_block();
                    let bound = match &clause.param {
                        Some(param) => {
                            destructure(
                                ctx,
                                thread,
                                param,
                                caught_value(error),
                                BindMode::Declare(BindingKind::Let),
                            )
                            .await
                        }
                        None => Ok(()),
                    };
                    let handled = match bound {
                        Ok(()) => exec_stmts_seq(ctx, thread, &clause.body).await,
                        Err(error) => Err(error),
                    };
                    thread.pop_block();
                    handled
                }
                None => Err(error),
            }
        }
        other => other,
    };

    if let Some(finalizer) = finalizer {
        // An abrupt finalizer completion replaces the try's outcome.
        match exec_block_stmts(ctx, thread, finalizer).await? {
            Completion::Normal => {}
            abrupt => return Ok(abrupt),
        }
    }
    result
}

async fn exec_switch(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    discriminant: &Expr,
    cases: &[crate::parser::ast::SwitchCase],
) -> Result<Completion, RuntimeError> {
    let value = eval_expr(ctx, thread, discriminant).await?;
    let mut matched = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            if eval_expr(ctx, thread, test).await? == value {
                matched = Some(i);
                break;
            }
        }
    }
    let start = match matched.or_else(|| cases.iter().position(|c| c.test.is_none())) {
        Some(start) => start,
        None => return Ok(Completion::Normal),
    };

    // One scope shared by every executed case body; `break` ends the
    // switch without touching any enclosing loop.
    thread.push_block();
    thread.loops.push(LoopScope {
        block_depth: thread.blocks.len(),
        accepts_continue: false,
    });
    let mut result = Ok(Completion::Normal);
    'cases: for case in &cases[start..] {
        for stmt in &case.consequent {
            match exec_stmt(ctx, thread, stmt).await {
                Ok(Completion::Normal) => {}
                Ok(Completion::Break) => break 'cases,
                Ok(abrupt) => {
                    result = Ok(abrupt);
                    break 'cases;
                }
                Err(error) => {
                    result = Err(error);
                    break 'cases;
                }
            }
        }
    }
    thread.loops.pop();
    thread.pop_block();
    result
}

async fn exec_block_stmts(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    body: &[Stmt],
) -> Result<Completion, RuntimeError> {
    thread.push_block();
    let result = exec_stmts_seq(ctx, thread, body).await;
    thread.pop_block();
    result
}

async fn exec_stmts_seq(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    body: &[Stmt],
) -> Result<Completion, RuntimeError> {
    for stmt in body {
        ctx.check_cancelled()?;
        match exec_stmt(ctx, thread, stmt).await? {
            Completion::Normal => {}
            abrupt => return Ok(abrupt),
        }
    }
    Ok(Completion::Normal)
}

fn is_catchable(error: &RuntimeError) -> bool {
    !matches!(
        error,
        RuntimeError::Cancelled | RuntimeError::SuspendedInSyncMode
    )
}

/// The value a catch clause binds for the caught error.
fn caught_value(error: RuntimeError) -> Value {
    match error {
        RuntimeError::Thrown(value) => value,
        other => Value::String(other.to_string()),
    }
}

fn binding_kind(kind: VarKind) -> BindingKind {
    match kind {
        VarKind::Let => BindingKind::Let,
        VarKind::Const => BindingKind::Const,
        VarKind::Var => BindingKind::Var,
    }
}
