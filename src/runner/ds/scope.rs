//! Scopes and logical threads.
//!
//! A [`LogicalThread`] is the evaluator's unit of isolation: an explicit
//! stack of block scopes over a captured closure chain, plus the
//! bookkeeping stacks for loops and try blocks. Function calls run on a
//! forked child thread that shares the callee's closure chain but
//! nothing else.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::error::RuntimeError;
use super::value::Value;
use crate::parser::ast::NodeId;

pub type ScopeRef = Rc<RefCell<BlockScope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub kind: BindingKind,
    pub value: Value,
}

/// One lexical block's bindings.
#[derive(Debug, Default)]
pub struct BlockScope {
    pub vars: HashMap<String, Binding>,
}

impl BlockScope {
    pub fn new() -> ScopeRef {
        Rc::new(RefCell::new(BlockScope::default()))
    }

    /// Declare a binding in this scope. Re-declaring a name in the same
    /// scope instance is an error, except `var` over an existing `var`.
    pub fn declare(
        &mut self,
        name: &str,
        kind: BindingKind,
        value: Value,
    ) -> Result<(), RuntimeError> {
        if let Some(existing) = self.vars.get(name) {
            if !(kind == BindingKind::Var && existing.kind == BindingKind::Var) {
                return Err(RuntimeError::AlreadyDeclared {
                    name: name.to_string(),
                });
            }
        }
        self.vars.insert(name.to_string(), Binding { kind, value });
        Ok(())
    }
}

/// Loop bookkeeping: remembers how deep the block stack was when the
/// loop started so unwinding on `break`/`continue` can truncate to it.
/// Switches push one too so `break` ends the switch, but they stay
/// transparent for `continue`.
#[derive(Debug, Clone, Copy)]
pub struct LoopScope {
    pub block_depth: usize,
    pub accepts_continue: bool,
}

/// Try-block bookkeeping, mirroring [`LoopScope`].
#[derive(Debug, Clone, Copy)]
pub struct TryScope {
    pub block_depth: usize,
}

/// One logical thread of execution.
#[derive(Debug, Default)]
pub struct LogicalThread {
    /// Closure chain captured at thread creation, outermost first.
    pub closures: Vec<ScopeRef>,
    /// Active block scopes, outermost first.
    pub blocks: Vec<ScopeRef>,
    pub loops: Vec<LoopScope>,
    pub try_blocks: Vec<TryScope>,
    /// Per-thread expression value cache; keeps arrow-expression value
    /// identity stable within a thread. Never shared between threads.
    pub value_cache: HashMap<NodeId, Value>,
    /// Set by a top-level `return`.
    pub return_value: Option<Value>,
}

impl LogicalThread {
    pub fn new() -> Self {
        LogicalThread::default()
    }

    /// Child thread for a function call: the callee's captured closure
    /// chain, fresh everything else.
    pub fn fork(closures: Vec<ScopeRef>) -> Self {
        LogicalThread {
            closures,
            ..LogicalThread::default()
        }
    }

    /// The closure chain a function value created on this thread must
    /// capture: existing closures plus every currently open block.
    pub fn capture_closures(&self) -> Vec<ScopeRef> {
        let mut captured = self.closures.clone();
        captured.extend(self.blocks.iter().cloned());
        captured
    }

    pub fn push_block(&mut self) -> ScopeRef {
        let scope = BlockScope::new();
        self.blocks.push(Rc::clone(&scope));
        scope
    }

    pub fn pop_block(&mut self) {
        self.blocks.pop();
    }

    /// Declare in the innermost open block.
    pub fn declare(
        &mut self,
        name: &str,
        kind: BindingKind,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match self.blocks.last() {
            Some(scope) => scope.borrow_mut().declare(name, kind, value),
            None => Err(RuntimeError::type_error(format!(
                "no open scope to declare '{}' in",
                name
            ))),
        }
    }

    /// Look the name up across blocks (innermost out) then the closure
    /// chain. Host contexts are the caller's concern.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        for scope in self.blocks.iter().rev().chain(self.closures.iter().rev()) {
            if let Some(binding) = scope.borrow().vars.get(name) {
                return Some(binding.value.clone());
            }
        }
        None
    }

    /// Assign to an existing scoped binding. `Ok(true)` when a binding
    /// was found and written, `Ok(false)` when the name is not scoped
    /// here at all.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<bool, RuntimeError> {
        for scope in self.blocks.iter().rev().chain(self.closures.iter().rev()) {
            let mut scope = scope.borrow_mut();
            if let Some(binding) = scope.vars.get_mut(name) {
                if binding.kind == BindingKind::Const {
                    return Err(RuntimeError::ConstAssignment {
                        name: name.to_string(),
                    });
                }
                binding.value = value;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether `name` resolves to a scoped (thread-local) binding, as
    /// opposed to a host-context one.
    pub fn is_scoped(&self, name: &str) -> bool {
        self.blocks
            .iter()
            .rev()
            .chain(self.closures.iter().rev())
            .any(|scope| scope.borrow().vars.contains_key(name))
    }
}
