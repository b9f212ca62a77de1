//! Built-in members on arrays and strings.
//!
//! Simple methods are exposed as native function values capturing their
//! receiver, so `arr.push` is itself a callable value. `map` and
//! `filter` need the evaluator to call back into script functions, so
//! they are dispatched at the call site instead.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::{NativeFunction, NativeImpl, RuntimeError, Value};

use super::expression::call_value;
use super::EvalContext;

fn native(name: &str, f: impl Fn(Vec<Value>) -> Result<Value, RuntimeError> + 'static) -> Value {
    Value::Native(Rc::new(NativeFunction {
        name: name.to_string(),
        imp: NativeImpl::Sync(Rc::new(f)),
    }))
}

/// Methods that take a script function and must run through the call
/// machinery.
pub(crate) fn is_higher_order(name: &str) -> bool {
    matches!(name, "map" | "filter")
}

pub(crate) fn array_member(items: &Rc<RefCell<Vec<Value>>>, name: &str) -> Option<Value> {
    match name {
        "length" => Some(Value::Int(items.borrow().len() as i64)),
        "push" => {
            let items = Rc::clone(items);
            Some(native("push", move |args| {
                items.borrow_mut().extend(args);
                Ok(Value::Int(items.borrow().len() as i64))
            }))
        }
        "pop" => {
            let items = Rc::clone(items);
            Some(native("pop", move |_| {
                Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined))
            }))
        }
        "includes" => {
            let items = Rc::clone(items);
            Some(native("includes", move |args| {
                let needle = args.into_iter().next().unwrap_or(Value::Undefined);
                Ok(Value::Bool(items.borrow().iter().any(|v| *v == needle)))
            }))
        }
        "indexOf" => {
            let items = Rc::clone(items);
            Some(native("indexOf", move |args| {
                let needle = args.into_iter().next().unwrap_or(Value::Undefined);
                let index = items
                    .borrow()
                    .iter()
                    .position(|v| *v == needle)
                    .map(|i| i as i64)
                    .unwrap_or(-1);
                Ok(Value::Int(index))
            }))
        }
        "slice" => {
            let items = Rc::clone(items);
            Some(native("slice", move |args| {
                let items = items.borrow();
                let len = items.len() as i64;
                let start = clamp_index(arg_int(&args, 0).unwrap_or(0), len);
                let end = clamp_index(arg_int(&args, 1).unwrap_or(len), len);
                if start >= end {
                    return Ok(Value::new_array(Vec::new()));
                }
                Ok(Value::new_array(
                    items[start as usize..end as usize].to_vec(),
                ))
            }))
        }
        "join" => {
            let items = Rc::clone(items);
            Some(native("join", move |args| {
                let separator = match args.first() {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_display_string(),
                    None => ",".to_string(),
                };
                Ok(Value::String(
                    items
                        .borrow()
                        .iter()
                        .map(Value::to_display_string)
                        .collect::<Vec<_>>()
                        .join(&separator),
                ))
            }))
        }
        _ => None,
    }
}

pub(crate) async fn call_array_higher_order(
    ctx: &EvalContext,
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let callee = args.into_iter().next().ok_or_else(|| {
        RuntimeError::type_error(format!("{} needs a function argument", name))
    })?;
    // Snapshot so the callback can mutate the receiver safely.
    let snapshot: Vec<Value> = items.borrow().clone();
    match name {
        "map" => {
            let mut out = Vec::with_capacity(snapshot.len());
            for (i, item) in snapshot.into_iter().enumerate() {
                out.push(call_value(ctx, callee.clone(), vec![item, Value::Int(i as i64)]).await?);
            }
            Ok(Value::new_array(out))
        }
        "filter" => {
            let mut out = Vec::new();
            for (i, item) in snapshot.into_iter().enumerate() {
                let keep =
                    call_value(ctx, callee.clone(), vec![item.clone(), Value::Int(i as i64)])
                        .await?;
                if keep.is_truthy() {
                    out.push(item);
                }
            }
            Ok(Value::new_array(out))
        }
        _ => Err(RuntimeError::NotCallable {
            what: format!("array.{}", name),
        }),
    }
}

pub(crate) fn string_member(s: &str, name: &str) -> Option<Value> {
    match name {
        "length" => Some(Value::Int(s.chars().count() as i64)),
        "toUpperCase" => {
            let s = s.to_string();
            Some(native("toUpperCase", move |_| {
                Ok(Value::String(s.to_uppercase()))
            }))
        }
        "toLowerCase" => {
            let s = s.to_string();
            Some(native("toLowerCase", move |_| {
                Ok(Value::String(s.to_lowercase()))
            }))
        }
        "trim" => {
            let s = s.to_string();
            Some(native("trim", move |_| {
                Ok(Value::String(s.trim().to_string()))
            }))
        }
        "includes" => {
            let s = s.to_string();
            Some(native("includes", move |args| {
                let needle = match args.first() {
                    Some(Value::String(needle)) => needle.clone(),
                    Some(other) => other.to_display_string(),
                    None => return Ok(Value::Bool(false)),
                };
                Ok(Value::Bool(s.contains(&needle)))
            }))
        }
        "split" => {
            let s = s.to_string();
            Some(native("split", move |args| {
                let parts: Vec<Value> = match args.first() {
                    Some(Value::String(sep)) if !sep.is_empty() => {
                        s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()
                    }
                    Some(Value::String(_)) => {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    }
                    _ => vec![Value::String(s.clone())],
                };
                Ok(Value::new_array(parts))
            }))
        }
        "substring" => {
            let s = s.to_string();
            Some(native("substring", move |args| {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let a = arg_int(&args, 0).unwrap_or(0).clamp(0, len);
                let b = arg_int(&args, 1).unwrap_or(len).clamp(0, len);
                let (start, end) = if a <= b { (a, b) } else { (b, a) };
                Ok(Value::String(
                    chars[start as usize..end as usize].iter().collect(),
                ))
            }))
        }
        _ => None,
    }
}

fn arg_int(args: &[Value], index: usize) -> Option<i64> {
    args.get(index).and_then(Value::as_number).map(|n| n as i64)
}

/// Negative indices count from the end, then clamp into range.
fn clamp_index(index: i64, len: i64) -> i64 {
    let index = if index < 0 { index + len } else { index };
    index.clamp(0, len)
}
