//! Runtime values.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use super::error::RuntimeError;
use super::scope::ScopeRef;
use crate::parser::ast::{ArrowFn, NodeId};

/// A script function value: the arrow tree it runs plus the closure
/// chain captured at the point it was evaluated.
pub struct FunctionValue {
    pub id: NodeId,
    pub func: Rc<ArrowFn>,
    pub closures: Vec<ScopeRef>,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Closures can reach back to scopes holding this value; print
        // the identity only.
        f.debug_struct("FunctionValue").field("id", &self.id).finish()
    }
}

/// Host-implemented function body.
#[derive(Clone)]
pub enum NativeImpl {
    Sync(Rc<dyn Fn(Vec<Value>) -> Result<Value, RuntimeError>>),
    Async(Rc<dyn Fn(Vec<Value>) -> LocalBoxFuture<'static, Result<Value, RuntimeError>>>),
}

/// A function provided by the embedding host or the built-in library.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub imp: NativeImpl,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.imp {
            NativeImpl::Sync(_) => "sync",
            NativeImpl::Async(_) => "async",
        };
        write!(f, "NativeFunction({} {})", kind, self.name)
    }
}

/// The dialect's value universe. Arrays and objects are shared mutable
/// references; cloning a `Value` clones the handle, not the contents.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<HashMap<String, Value>>>),
    Function(Rc<FunctionValue>),
    Native(Rc<NativeFunction>),
}

impl Value {
    pub fn new_array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_object(fields: HashMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(fields)))
    }

    /// `typeof` result.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    /// Numeric view, for arithmetic and ordering. `None` when the value
    /// has no numeric interpretation.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Stringification used by template literals and `+` concatenation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) | Value::Native(_) => "[function]".to_string(),
        }
    }
}

/// The dialect's strict equality: numbers compare across `Int`/`Float`,
/// reference types compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
