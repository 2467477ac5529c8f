// Copyright 2026 the user-code runner authors. MIT license.

//! The interface through which the runner drives the sandboxing runtime:
//! create one module per emitted file, link modules by specifier, evaluate
//! the root with a wall-clock budget. The runtime itself (and its timeout
//! enforcement) is an external collaborator.

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::error::AnyError;

/// An ambient value exchanged with evaluated modules.
pub type Value = serde_json::Value;

/// A host function callable from inside the sandbox.
pub type HostFn = Rc<dyn Fn(&[Value]) -> Value>;

/// One ambient binding in an evaluation context.
#[derive(Clone)]
pub enum Binding {
  /// Declared but never assigned.
  Unset,
  Value(Value),
  Function(HostFn),
}

impl fmt::Debug for Binding {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Binding::Unset => write!(f, "Unset"),
      Binding::Value(v) => write!(f, "Value({})", v),
      Binding::Function(_) => write!(f, "Function(..)"),
    }
  }
}

/// Caller-owned handle through which ambient bindings (`args`, `result`,
/// injected globals) are exchanged with evaluated modules. Cloning yields
/// another handle to the same bindings, which is how the sandbox keeps hold
/// of the context a module was created against. Not re-entrant: each run
/// overwrites `args` and `result`, so sharing one context between
/// concurrent runs is undefined behavior.
#[derive(Clone, Debug, Default)]
pub struct EvalContext {
  bindings: Rc<RefCell<HashMap<String, Binding>>>,
}

impl EvalContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn inject(&self, name: impl Into<String>, binding: Binding) {
    self.bindings.borrow_mut().insert(name.into(), binding);
  }

  pub fn get(&self, name: &str) -> Option<Binding> {
    self.bindings.borrow().get(name).cloned()
  }
}

/// Identifier of a module instantiated inside the sandbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(pub i32);

/// A fault raised by module evaluation. `stack` is the raw V8-style stack
/// text, innermost frame first; a timeout carries the runtime's own timeout
/// message and whatever stack it captured.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationFault {
  pub message: String,
  pub stack: String,
}

impl EvaluationFault {
  pub fn new(message: impl Into<String>, stack: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      stack: stack.into(),
    }
  }
}

/// The sandboxing runtime. Modules are identified by the id returned from
/// `mod_new`; the context handed to `mod_new` is where the module reads and
/// writes ambient bindings.
#[async_trait(?Send)]
pub trait Sandbox {
  /// Compiles `code` into a module labeled `identifier`, bound to `ctx`.
  fn mod_new(
    &mut self,
    identifier: &str,
    code: &str,
    ctx: &EvalContext,
  ) -> Result<ModuleId, AnyError>;

  /// Resolves each of the module's import specifiers through `resolve`.
  /// A `None` resolution fails the link.
  fn mod_link(
    &mut self,
    id: ModuleId,
    resolve: &mut dyn FnMut(&str) -> Option<ModuleId>,
  ) -> Result<(), AnyError>;

  /// Evaluates the module graph rooted at `id`, imports first, within
  /// `timeout`. On timeout no partial result is observable.
  async fn mod_evaluate(
    &mut self,
    id: ModuleId,
    timeout: Duration,
  ) -> Result<(), EvaluationFault>;
}
