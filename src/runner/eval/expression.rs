//! Expression evaluation.
//!
//! Every entry point here is suspension-capable: evaluation is an async
//! call tree boxed at the recursion points, and the only genuine awaits
//! are async native-function calls. The synchronous driver relies on
//! that — see [`super::run_sync`].

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::trace;

use crate::parser::ast::{
    ArrowBody, AssignOp, BinaryOp, Expr, Literal, MemberProperty, ObjectProperty, Pattern,
    PropertyKey, UnaryOp, UpdateOp,
};
use crate::runner::ds::{
    BindingKind, FunctionValue, LogicalThread, NativeImpl, RuntimeError, Value,
};

use super::builtins;
use super::statement::{self, Completion};
use super::{EvalContext, UpdateHookKind};

/// A resolved member key.
#[derive(Debug, Clone)]
pub(crate) enum PropKey {
    Index(i64),
    Name(String),
}

/// How [`destructure`] writes resolved bindings.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BindMode {
    Declare(BindingKind),
    Assign,
}

pub(crate) fn eval_expr<'a>(
    ctx: &'a EvalContext,
    thread: &'a mut LogicalThread,
    expr: &'a Expr,
) -> LocalBoxFuture<'a, Result<Value, RuntimeError>> {
    async move {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::Identifier { name, .. } => lookup_name(ctx, thread, name)
                .ok_or_else(|| RuntimeError::UnknownIdentifier { name: name.clone() }),
            Expr::TemplateLiteral {
                quasis,
                expressions,
                ..
            } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(part) = expressions.get(i) {
                        let value = eval_expr(ctx, thread, part).await?;
                        out.push_str(&value.to_display_string());
                    }
                }
                Ok(Value::String(out))
            }
            Expr::ArrayLiteral { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        None => items.push(Value::Undefined),
                        Some(Expr::Spread { argument, .. }) => {
                            let spread = eval_expr(ctx, thread, argument).await?;
                            match spread {
                                Value::Array(source) => {
                                    items.extend(source.borrow().iter().cloned())
                                }
                                other => {
                                    return Err(RuntimeError::type_error(format!(
                                        "cannot spread a {} into an array",
                                        other.type_name()
                                    )))
                                }
                            }
                        }
                        Some(element) => items.push(eval_expr(ctx, thread, element).await?),
                    }
                }
                Ok(Value::new_array(items))
            }
            Expr::ObjectLiteral { properties, .. } => {
                let mut fields = std::collections::HashMap::new();
                for property in properties {
                    match property {
                        ObjectProperty::KeyValue { key, value } => {
                            let key = match key {
                                PropertyKey::Identifier(name) | PropertyKey::String(name) => {
                                    name.clone()
                                }
                                PropertyKey::Computed(expr) => {
                                    eval_expr(ctx, thread, expr).await?.to_display_string()
                                }
                            };
                            let value = eval_expr(ctx, thread, value).await?;
                            fields.insert(key, value);
                        }
                        ObjectProperty::Shorthand(id) => {
                            let value = lookup_name(ctx, thread, &id.name).ok_or_else(|| {
                                RuntimeError::UnknownIdentifier {
                                    name: id.name.clone(),
                                }
                            })?;
                            fields.insert(id.name.clone(), value);
                        }
                        ObjectProperty::Spread(expr) => {
                            let spread = eval_expr(ctx, thread, expr).await?;
                            match spread {
                                Value::Object(source) => {
                                    for (k, v) in source.borrow().iter() {
                                        fields.insert(k.clone(), v.clone());
                                    }
                                }
                                other => {
                                    return Err(RuntimeError::type_error(format!(
                                        "cannot spread a {} into an object",
                                        other.type_name()
                                    )))
                                }
                            }
                        }
                    }
                }
                Ok(Value::new_object(fields))
            }
            Expr::Unary { op, argument, .. } => {
                if *op == UnaryOp::TypeOf {
                    // `typeof` on an unresolvable name is "undefined",
                    // not an error.
                    if let Expr::Identifier { name, .. } = &**argument {
                        if lookup_name(ctx, thread, name).is_none() {
                            return Ok(Value::String("undefined".to_string()));
                        }
                    }
                }
                let value = eval_expr(ctx, thread, argument).await?;
                apply_unary(*op, value)
            }
            Expr::Binary {
                op, left, right, ..
            } => match op {
                BinaryOp::And => {
                    let left = eval_expr(ctx, thread, left).await?;
                    if left.is_truthy() {
                        eval_expr(ctx, thread, right).await
                    } else {
                        Ok(left)
                    }
                }
                BinaryOp::Or => {
                    let left = eval_expr(ctx, thread, left).await?;
                    if left.is_truthy() {
                        Ok(left)
                    } else {
                        eval_expr(ctx, thread, right).await
                    }
                }
                _ => {
                    let left = eval_expr(ctx, thread, left).await?;
                    let right = eval_expr(ctx, thread, right).await?;
                    apply_binary(*op, left, right)
                }
            },
            Expr::Sequence { expressions, .. } => {
                let mut last = Value::Undefined;
                for expression in expressions {
                    last = eval_expr(ctx, thread, expression).await?;
                }
                Ok(last)
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                let test = eval_expr(ctx, thread, test).await?;
                if test.is_truthy() {
                    eval_expr(ctx, thread, consequent).await
                } else {
                    eval_expr(ctx, thread, alternate).await
                }
            }
            Expr::Call {
                callee, arguments, ..
            } => eval_call(ctx, thread, callee, arguments).await,
            Expr::Member {
                object, property, ..
            } => {
                let value = eval_expr(ctx, thread, object).await?;
                let key = resolve_prop_key(ctx, thread, property).await?;
                member_get(&value, &key)
            }
            Expr::Assignment {
                op, target, value, ..
            } => eval_assignment(ctx, thread, *op, target, value).await,
            Expr::Update {
                op,
                argument,
                prefix,
                ..
            } => eval_update(ctx, thread, *op, argument, *prefix).await,
            Expr::Arrow { id, func, .. } => {
                // Cached per thread so the same arrow node yields the
                // same function identity on re-evaluation.
                if let Some(cached) = thread.value_cache.get(id) {
                    return Ok(cached.clone());
                }
                let value = Value::Function(Rc::new(FunctionValue {
                    id: *id,
                    func: Rc::clone(func),
                    closures: thread.capture_closures(),
                }));
                thread.value_cache.insert(*id, value.clone());
                Ok(value)
            }
            Expr::Spread { .. } => Err(RuntimeError::type_error(
                "spread is only legal in call arguments and literals",
            )),
            Expr::NoArgs { .. } => Ok(Value::Undefined),
            Expr::ReactiveVarDecl { name, init, .. } => {
                let value = eval_expr(ctx, thread, init).await?;
                ctx.local_context
                    .borrow_mut()
                    .insert(name.clone(), value.clone());
                Ok(value)
            }
        }
    }
    .boxed_local()
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Scope-chain lookup: blocks, closures, then the host contexts.
pub(crate) fn lookup_name(
    ctx: &EvalContext,
    thread: &LogicalThread,
    name: &str,
) -> Option<Value> {
    if let Some(value) = thread.lookup(name) {
        return Some(value);
    }
    if let Some(value) = ctx.local_context.borrow().get(name) {
        return Some(value.clone());
    }
    ctx.app_context.borrow().get(name).cloned()
}

fn host_has(ctx: &EvalContext, name: &str) -> bool {
    ctx.local_context.borrow().contains_key(name) || ctx.app_context.borrow().contains_key(name)
}

/// Write through to wherever `name` lives: the thread's scope chain
/// first, then the host contexts. An entirely unknown name is created in
/// the local context.
pub(crate) fn assign_name(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    name: &str,
    value: Value,
) -> Result<(), RuntimeError> {
    if thread.assign(name, value.clone())? {
        return Ok(());
    }
    if ctx.app_context.borrow().contains_key(name) && !ctx.local_context.borrow().contains_key(name)
    {
        ctx.app_context
            .borrow_mut()
            .insert(name.to_string(), value);
        return Ok(());
    }
    trace!("assignment binds '{}' in the local context", name);
    ctx.local_context
        .borrow_mut()
        .insert(name.to_string(), value);
    Ok(())
}

/// Innermost base identifier of a member chain, e.g. `x` in `x.a[3]`.
pub(crate) fn root_binding_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Identifier { name, .. } => Some(name),
        Expr::Member { object, .. } => root_binding_name(object),
        _ => None,
    }
}

async fn eval_call(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    callee: &Expr,
    arguments: &[Expr],
) -> Result<Value, RuntimeError> {
    if let Expr::Member {
        object, property, ..
    } = callee
    {
        let receiver = eval_expr(ctx, thread, object).await?;
        let key = resolve_prop_key(ctx, thread, property).await?;
        let args = eval_args(ctx, thread, arguments).await?;
        let hook_root = root_binding_name(object)
            .filter(|root| !thread.is_scoped(root) && host_has(ctx, root));
        if let Some(root) = hook_root {
            ctx.fire_will_update(UpdateHookKind::FunctionCall, root);
        }
        let result = call_member(ctx, &receiver, &key, args).await?;
        if let Some(root) = hook_root {
            ctx.fire_did_update(UpdateHookKind::FunctionCall, root);
        }
        return Ok(result);
    }
    let function = eval_expr(ctx, thread, callee).await?;
    let args = eval_args(ctx, thread, arguments).await?;
    call_value(ctx, function, args).await
}

async fn call_member(
    ctx: &EvalContext,
    receiver: &Value,
    key: &PropKey,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match (receiver, key) {
        (Value::Array(items), PropKey::Name(name)) if builtins::is_higher_order(name) => {
            builtins::call_array_higher_order(ctx, items, name, args).await
        }
        _ => {
            let function = member_get(receiver, key)?;
            call_value(ctx, function, args).await
        }
    }
}

async fn eval_args(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    arguments: &[Expr],
) -> Result<Vec<Value>, RuntimeError> {
    let mut args = Vec::with_capacity(arguments.len());
    for argument in arguments {
        match argument {
            Expr::Spread { argument, .. } => {
                let spread = eval_expr(ctx, thread, argument).await?;
                match spread {
                    Value::Array(items) => args.extend(items.borrow().iter().cloned()),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot spread a {} into arguments",
                            other.type_name()
                        )))
                    }
                }
            }
            Expr::NoArgs { .. } => {}
            _ => args.push(eval_expr(ctx, thread, argument).await?),
        }
    }
    Ok(args)
}

/// Invoke any callable value.
pub(crate) async fn call_value(
    ctx: &EvalContext,
    callee: Value,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match callee {
        Value::Function(function) => call_function(ctx, &function, args).await,
        Value::Native(native) => match &native.imp {
            NativeImpl::Sync(f) => f(args),
            NativeImpl::Async(f) => f(args).await,
        },
        other => Err(RuntimeError::NotCallable {
            what: other.type_name().to_string(),
        }),
    }
}

/// Script function call: runs the body on a forked child thread over
/// the callee's captured closure chain.
pub(crate) async fn call_function(
    ctx: &EvalContext,
    function: &FunctionValue,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let mut thread = LogicalThread::fork(function.closures.clone());
    thread.push_block();
    for (i, param) in function.func.params.iter().enumerate() {
        if let Pattern::Rest { argument, .. } = param {
            let rest = Value::new_array(args.get(i..).unwrap_or_default().to_vec());
            destructure(
                ctx,
                &mut thread,
                argument,
                rest,
                BindMode::Declare(BindingKind::Let),
            )
            .await?;
            break;
        }
        let arg = args.get(i).cloned().unwrap_or(Value::Undefined);
        destructure(
            ctx,
            &mut thread,
            param,
            arg,
            BindMode::Declare(BindingKind::Let),
        )
        .await?;
    }
    match &function.func.body {
        ArrowBody::Expression(expr) => eval_expr(ctx, &mut thread, expr).await,
        ArrowBody::Block(body) => {
            for stmt in body {
                ctx.check_cancelled()?;
                match statement::exec_stmt(ctx, &mut thread, stmt).await? {
                    Completion::Return(value) => return Ok(value),
                    _ => {}
                }
            }
            Ok(Value::Undefined)
        }
    }
}

async fn eval_assignment(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    op: AssignOp,
    target: &Expr,
    value: &Expr,
) -> Result<Value, RuntimeError> {
    match target {
        Expr::Identifier { name, .. } => {
            let new_value = match assign_binop(op) {
                None => eval_expr(ctx, thread, value).await?,
                Some(binop) => {
                    let old = lookup_name(ctx, thread, name).ok_or_else(|| {
                        RuntimeError::UnknownIdentifier { name: name.clone() }
                    })?;
                    let rhs = eval_expr(ctx, thread, value).await?;
                    apply_binary(binop, old, rhs)?
                }
            };
            let external = !thread.is_scoped(name);
            if external {
                ctx.fire_will_update(UpdateHookKind::Assignment, name);
            }
            assign_name(ctx, thread, name, new_value.clone())?;
            if external {
                ctx.fire_did_update(UpdateHookKind::Assignment, name);
            }
            Ok(new_value)
        }
        Expr::Member {
            object, property, ..
        } => {
            let receiver = eval_expr(ctx, thread, object).await?;
            let key = resolve_prop_key(ctx, thread, property).await?;
            let new_value = match assign_binop(op) {
                None => eval_expr(ctx, thread, value).await?,
                Some(binop) => {
                    let old = member_get(&receiver, &key)?;
                    let rhs = eval_expr(ctx, thread, value).await?;
                    apply_binary(binop, old, rhs)?
                }
            };
            let hook_root = root_binding_name(object).filter(|root| !thread.is_scoped(root));
            if let Some(root) = hook_root {
                ctx.fire_will_update(UpdateHookKind::Assignment, root);
            }
            member_set(&receiver, &key, new_value.clone())?;
            if let Some(root) = hook_root {
                ctx.fire_did_update(UpdateHookKind::Assignment, root);
            }
            Ok(new_value)
        }
        _ => Err(RuntimeError::type_error("invalid assignment target")),
    }
}

async fn eval_update(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    op: UpdateOp,
    argument: &Expr,
    prefix: bool,
) -> Result<Value, RuntimeError> {
    match argument {
        Expr::Identifier { name, .. } => {
            let old = lookup_name(ctx, thread, name)
                .ok_or_else(|| RuntimeError::UnknownIdentifier { name: name.clone() })?;
            let new_value = step(&old, op)?;
            let external = !thread.is_scoped(name);
            if external {
                ctx.fire_will_update(UpdateHookKind::PrePost, name);
            }
            assign_name(ctx, thread, name, new_value.clone())?;
            if external {
                ctx.fire_did_update(UpdateHookKind::PrePost, name);
            }
            Ok(if prefix { new_value } else { old })
        }
        Expr::Member {
            object, property, ..
        } => {
            let receiver = eval_expr(ctx, thread, object).await?;
            let key = resolve_prop_key(ctx, thread, property).await?;
            let old = member_get(&receiver, &key)?;
            let new_value = step(&old, op)?;
            let hook_root = root_binding_name(object).filter(|root| !thread.is_scoped(root));
            if let Some(root) = hook_root {
                ctx.fire_will_update(UpdateHookKind::PrePost, root);
            }
            member_set(&receiver, &key, new_value.clone())?;
            if let Some(root) = hook_root {
                ctx.fire_did_update(UpdateHookKind::PrePost, root);
            }
            Ok(if prefix { new_value } else { old })
        }
        _ => Err(RuntimeError::type_error(
            "increment/decrement needs a variable or member target",
        )),
    }
}

fn step(value: &Value, op: UpdateOp) -> Result<Value, RuntimeError> {
    let delta = match op {
        UpdateOp::Increment => 1,
        UpdateOp::Decrement => -1,
    };
    match value {
        Value::Int(n) => Ok(Value::Int(n.wrapping_add(delta))),
        Value::Float(n) => Ok(Value::Float(n + delta as f64)),
        other => Err(RuntimeError::type_error(format!(
            "cannot increment/decrement a {}",
            other.type_name()
        ))),
    }
}

async fn resolve_prop_key(
    ctx: &EvalContext,
    thread: &mut LogicalThread,
    property: &MemberProperty,
) -> Result<PropKey, RuntimeError> {
    match property {
        MemberProperty::Static(name) => Ok(PropKey::Name(name.clone())),
        MemberProperty::Computed(expr) => {
            let value = eval_expr(ctx, thread, expr).await?;
            Ok(match value {
                Value::Int(i) => PropKey::Index(i),
                Value::Float(f) if f.fract() == 0.0 => PropKey::Index(f as i64),
                other => PropKey::Name(other.to_display_string()),
            })
        }
    }
}

pub(crate) fn member_get(value: &Value, key: &PropKey) -> Result<Value, RuntimeError> {
    match value {
        Value::Array(items) => match key {
            PropKey::Index(i) => {
                let items = items.borrow();
                if *i >= 0 && (*i as usize) < items.len() {
                    Ok(items[*i as usize].clone())
                } else {
                    Ok(Value::Undefined)
                }
            }
            PropKey::Name(name) => Ok(builtins::array_member(items, name).unwrap_or(Value::Undefined)),
        },
        Value::String(s) => match key {
            PropKey::Index(i) => Ok(s
                .chars()
                .nth((*i).max(0) as usize)
                .filter(|_| *i >= 0)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Undefined)),
            PropKey::Name(name) => Ok(builtins::string_member(s, name).unwrap_or(Value::Undefined)),
        },
        Value::Object(fields) => {
            let name = match key {
                PropKey::Index(i) => i.to_string(),
                PropKey::Name(name) => name.clone(),
            };
            Ok(fields.borrow().get(&name).cloned().unwrap_or(Value::Undefined))
        }
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
            "cannot read {} of {}",
            key_display(key),
            value.type_name()
        ))),
        _ => Ok(Value::Undefined),
    }
}

fn member_set(value: &Value, key: &PropKey, new_value: Value) -> Result<(), RuntimeError> {
    match value {
        Value::Array(items) => match key {
            PropKey::Index(i) if *i >= 0 => {
                let mut items = items.borrow_mut();
                let index = *i as usize;
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = new_value;
                Ok(())
            }
            _ => Err(RuntimeError::type_error(format!(
                "cannot set {} on an array",
                key_display(key)
            ))),
        },
        Value::Object(fields) => {
            let name = match key {
                PropKey::Index(i) => i.to_string(),
                PropKey::Name(name) => name.clone(),
            };
            fields.borrow_mut().insert(name, new_value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "cannot set {} on a {}",
            key_display(key),
            other.type_name()
        ))),
    }
}

fn key_display(key: &PropKey) -> String {
    match key {
        PropKey::Index(i) => format!("index {}", i),
        PropKey::Name(name) => format!("property '{}'", name),
    }
}

/// Destructure `value` through `pattern`, declaring or assigning each
/// resolved binding.
pub(crate) fn destructure<'a>(
    ctx: &'a EvalContext,
    thread: &'a mut LogicalThread,
    pattern: &'a Pattern,
    value: Value,
    mode: BindMode,
) -> LocalBoxFuture<'a, Result<(), RuntimeError>> {
    async move {
        match pattern {
            Pattern::Identifier(id) => match mode {
                BindMode::Declare(kind) => thread.declare(&id.name, kind, value),
                BindMode::Assign => {
                    let external = !thread.is_scoped(&id.name);
                    if external {
                        ctx.fire_will_update(UpdateHookKind::Assignment, &id.name);
                    }
                    assign_name(ctx, thread, &id.name, value)?;
                    if external {
                        ctx.fire_did_update(UpdateHookKind::Assignment, &id.name);
                    }
                    Ok(())
                }
            },
            Pattern::Default {
                target, fallback, ..
            } => {
                let value = if matches!(value, Value::Undefined) {
                    eval_expr(ctx, thread, fallback).await?
                } else {
                    value
                };
                destructure(ctx, thread, target, value, mode).await
            }
            Pattern::Array { elements, .. } => {
                let items: Vec<Value> = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    Value::String(s) => {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    }
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot destructure a {} as an array",
                            other.type_name()
                        )))
                    }
                };
                for (i, element) in elements.iter().enumerate() {
                    let element = match element {
                        Some(element) => element,
                        None => continue,
                    };
                    if let Pattern::Rest { argument, .. } = element {
                        let rest =
                            Value::new_array(items.get(i..).unwrap_or_default().to_vec());
                        destructure(ctx, thread, argument, rest, mode).await?;
                        break;
                    }
                    let item = items.get(i).cloned().unwrap_or(Value::Undefined);
                    destructure(ctx, thread, element, item, mode).await?;
                }
                Ok(())
            }
            Pattern::Object { properties, .. } => {
                let fields = match &value {
                    Value::Object(fields) => fields.borrow().clone(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot destructure a {} as an object",
                            other.type_name()
                        )))
                    }
                };
                for property in properties {
                    let item = fields.get(&property.key).cloned().unwrap_or(Value::Undefined);
                    destructure(ctx, thread, &property.value, item, mode).await?;
                }
                Ok(())
            }
            Pattern::Rest { .. } => Err(RuntimeError::type_error(
                "a rest pattern is only legal inside a destructuring pattern",
            )),
        }
    }
    .boxed_local()
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::TypeOf => Ok(Value::String(value.type_name().to_string())),
        UnaryOp::Minus => match value {
            Value::Int(n) => Ok(n
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(n as f64)))),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(RuntimeError::type_error(format!(
                "cannot negate a {}",
                other.type_name()
            ))),
        },
        UnaryOp::Plus => match value {
            Value::Int(_) | Value::Float(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(if b { 1 } else { 0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(float_or_int)
                .map_err(|_| RuntimeError::type_error(format!("'{}' is not a number", s))),
            other => Err(RuntimeError::type_error(format!(
                "cannot convert a {} to a number",
                other.type_name()
            ))),
        },
        UnaryOp::BitNot => Ok(Value::Int(!to_int32(&value)? as i64)),
    }
}

fn float_or_int(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

pub(crate) fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                return Ok(Value::String(format!(
                    "{}{}",
                    left.to_display_string(),
                    right.to_display_string()
                )));
            }
            numeric_binop(op, &left, &right, i64::checked_add, |a, b| a + b)
        }
        BinaryOp::Subtract => numeric_binop(op, &left, &right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Multiply => numeric_binop(op, &left, &right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Divide => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) if *b != 0 && a % b == 0 => Ok(Value::Int(a / b)),
            _ => {
                let (a, b) = numeric_pair(op, &left, &right)?;
                Ok(Value::Float(a / b))
            }
        },
        BinaryOp::Remainder => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) if *b != 0 => Ok(Value::Int(a % b)),
            _ => {
                let (a, b) = numeric_pair(op, &left, &right)?;
                Ok(Value::Float(a % b))
            }
        },
        BinaryOp::StrictlyEqual => Ok(Value::Bool(left == right)),
        BinaryOp::StrictlyUnequal => Ok(Value::Bool(left != right)),
        BinaryOp::LooselyEqual => Ok(Value::Bool(loose_eq(&left, &right))),
        BinaryOp::LooselyUnequal => Ok(Value::Bool(!loose_eq(&left, &right))),
        BinaryOp::LessThan => relational(op, &left, &right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LessThanEqual => {
            relational(op, &left, &right, |o| o != std::cmp::Ordering::Greater)
        }
        BinaryOp::GreaterThan => {
            relational(op, &left, &right, |o| o == std::cmp::Ordering::Greater)
        }
        BinaryOp::GreaterThanEqual => {
            relational(op, &left, &right, |o| o != std::cmp::Ordering::Less)
        }
        BinaryOp::ShiftLeft => {
            let (a, b) = (to_int32(&left)?, to_int32(&right)?);
            Ok(Value::Int((a << (b & 31)) as i64))
        }
        BinaryOp::ShiftRight => {
            let (a, b) = (to_int32(&left)?, to_int32(&right)?);
            Ok(Value::Int((a >> (b & 31)) as i64))
        }
        BinaryOp::ShiftRightUnsigned => {
            let (a, b) = (to_int32(&left)? as u32, to_int32(&right)?);
            Ok(Value::Int((a >> (b & 31)) as i64))
        }
        BinaryOp::BitAnd => Ok(Value::Int((to_int32(&left)? & to_int32(&right)?) as i64)),
        BinaryOp::BitOr => Ok(Value::Int((to_int32(&left)? | to_int32(&right)?) as i64)),
        BinaryOp::BitXor => Ok(Value::Int((to_int32(&left)? ^ to_int32(&right)?) as i64)),
        BinaryOp::In => match &right {
            Value::Object(fields) => Ok(Value::Bool(
                fields.borrow().contains_key(&left.to_display_string()),
            )),
            Value::Array(items) => {
                let index = left.as_number().unwrap_or(-1.0);
                Ok(Value::Bool(
                    index >= 0.0 && (index as usize) < items.borrow().len(),
                ))
            }
            other => Err(RuntimeError::type_error(format!(
                "'in' needs an object or array, got a {}",
                other.type_name()
            ))),
        },
        BinaryOp::And | BinaryOp::Or => {
            // Short-circuit forms are handled before operand evaluation.
            Err(RuntimeError::type_error("logical operator in strict position"))
        }
    }
}

fn numeric_binop(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        if let Some(n) = int_op(*a, *b) {
            return Ok(Value::Int(n));
        }
    }
    let (a, b) = numeric_pair(op, left, right)?;
    Ok(Value::Float(float_op(a, b)))
}

fn numeric_pair(op: BinaryOp, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::type_error(format!(
            "{:?} needs numbers, got {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn relational(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::Bool(accept(a.cmp(b))));
    }
    let (a, b) = numeric_pair(op, left, right)?;
    Ok(Value::Bool(a.partial_cmp(&b).map(accept).unwrap_or(false)))
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    if matches!(left, Value::Null | Value::Undefined)
        && matches!(right, Value::Null | Value::Undefined)
    {
        return true;
    }
    match (coercible_number(left), coercible_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn coercible_number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        _ => value.as_number(),
    }
}

fn to_int32(value: &Value) -> Result<i32, RuntimeError> {
    match value.as_number() {
        Some(n) => Ok(n as i64 as i32),
        None => Err(RuntimeError::type_error(format!(
            "bitwise operation needs a number, got a {}",
            value.type_name()
        ))),
    }
}

fn assign_binop(op: AssignOp) -> Option<BinaryOp> {
    match op {
        AssignOp::Assign => None,
        AssignOp::AddAssign => Some(BinaryOp::Add),
        AssignOp::SubtractAssign => Some(BinaryOp::Subtract),
        AssignOp::MultiplyAssign => Some(BinaryOp::Multiply),
        AssignOp::DivideAssign => Some(BinaryOp::Divide),
        AssignOp::RemainderAssign => Some(BinaryOp::Remainder),
        AssignOp::ShiftLeftAssign => Some(BinaryOp::ShiftLeft),
        AssignOp::ShiftRightAssign => Some(BinaryOp::ShiftRight),
        AssignOp::ShiftRightUnsignedAssign => Some(BinaryOp::ShiftRightUnsigned),
        AssignOp::BitAndAssign => Some(BinaryOp::BitAnd),
        AssignOp::BitOrAssign => Some(BinaryOp::BitOr),
        AssignOp::BitXorAssign => Some(BinaryOp::BitXor),
    }
}
