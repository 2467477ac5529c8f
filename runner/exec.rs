// Copyright 2026 the user-code runner authors. MIT license.

//! Loads compiled artifacts into the sandbox and evaluates the harness.
//! One module per emitted file, linked by stripped-name specifier; faults
//! raised while user code runs come back as mapped diagnostics, while link
//! failures and unknown specifiers are embedding bugs and abort the call.

use log::debug;
use log::warn;
use std::collections::HashMap;
use std::time::Duration;

use user_code_core::strip_extension;
use user_code_core::Binding;
use user_code_core::EvalContext;
use user_code_core::ModuleId;
use user_code_core::Sandbox;
use user_code_core::Value;

use crate::diagnostics::UserCodeError;
use crate::errors::HostError;
use crate::harness::HARNESS_FILE;
use crate::harness::USER_FILE;
use crate::js_errors;
use crate::program::CompilationArtifacts;

pub(crate) async fn execute(
  sandbox: &mut dyn Sandbox,
  ctx: &EvalContext,
  artifacts: &CompilationArtifacts,
  args: &[Value],
  timeout: Duration,
) -> Result<Result<Value, Vec<UserCodeError>>, HostError> {
  ctx.inject("args", Binding::Value(Value::Array(args.to_vec())));
  ctx.inject("result", Binding::Unset);

  let mut names: Vec<&String> = artifacts.js_by_name.keys().collect();
  names.sort();

  let mut ids: HashMap<&str, ModuleId> = HashMap::new();
  for name in &names {
    let id = sandbox
      .mod_new(name.as_str(), &artifacts.js_by_name[*name], ctx)
      .map_err(|error| HostError::ModuleLoad {
        identifier: (*name).clone(),
        error,
      })?;
    ids.insert(name.as_str(), id);
  }

  for name in &names {
    let id = ids[name.as_str()];
    let mut missing = None;
    let linked = sandbox.mod_link(id, &mut |specifier| {
      match ids.get(strip_extension(specifier)) {
        Some(target) => Some(*target),
        None => {
          missing = Some(specifier.to_string());
          None
        }
      }
    });
    if let Some(specifier) = missing {
      return Err(HostError::UnresolvedSpecifier {
        specifier,
        referrer: (*name).clone(),
      });
    }
    linked.map_err(|error| HostError::ModuleLink {
      identifier: (*name).clone(),
      error,
    })?;
  }

  let harness = ids
    .get(HARNESS_FILE)
    .copied()
    .ok_or_else(|| HostError::MissingEmit(HARNESS_FILE.to_string()))?;
  debug!("evaluating harness with a {:?} budget", timeout);
  match sandbox.mod_evaluate(harness, timeout).await {
    Ok(()) => {
      let value = match ctx.get("result") {
        Some(Binding::Value(value)) => value,
        Some(Binding::Function(_)) => {
          warn!("result binding holds a function; surfacing null");
          Value::Null
        }
        _ => Value::Null,
      };
      Ok(Ok(value))
    }
    Err(fault) => Ok(Err(vec![js_errors::map_fault(
      &fault,
      USER_FILE,
      &artifacts.user_source_map,
    )])),
  }
}
