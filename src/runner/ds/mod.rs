//! Runtime data structures: values, scopes, threads and errors.

pub mod error;
pub mod scope;
pub mod value;

pub use error::RuntimeError;
pub use scope::{BindingKind, BlockScope, LogicalThread, LoopScope, ScopeRef, TryScope};
pub use value::{FunctionValue, NativeFunction, NativeImpl, Value};
