// Copyright 2026 the user-code runner authors. MIT license.

//! Scripted stand-ins for the runner's two collaborators. The fake compiler
//! replays a fixed program — diagnostics, source units, checker answers —
//! and emits inputs unchanged; the fake sandbox replays scripted module
//! behaviors against the real evaluation context. Tests pin collaborator
//! output and exercise the pipeline around it.

use async_trait::async_trait;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use user_code_core::error::generic_error;
use user_code_core::strip_extension;
use user_code_core::AnyError;
use user_code_core::Binding;
use user_code_core::CallSignature;
use user_code_core::Compiler;
use user_code_core::CompilerHost;
use user_code_core::CompilerOptions;
use user_code_core::DeclarationShape;
use user_code_core::Diagnostic;
use user_code_core::EvalContext;
use user_code_core::EvaluationFault;
use user_code_core::FileKind;
use user_code_core::ModuleId;
use user_code_core::Program;
use user_code_core::Sandbox;
use user_code_core::SourceUnit;
use user_code_core::Span;
use user_code_core::SymbolId;
use user_code_core::TypeChecker;
use user_code_core::Value;

/// A source map whose single mapping sends the whole module to line 1,
/// column 1 of `source`.
pub fn identity_map(source: &str) -> String {
  format!(
    r#"{{"version":3,"sources":["{}"],"names":[],"mappings":"AAAA"}}"#,
    source
  )
}

#[derive(Clone, Debug, Default)]
struct FakeUnit {
  text: String,
  functions: Vec<(Span, String)>,
}

impl SourceUnit for FakeUnit {
  fn text(&self) -> &str {
    &self.text
  }

  fn enclosing_function_name(&self, pos: u32) -> String {
    self
      .functions
      .iter()
      .filter(|(span, _)| span.start <= pos && pos < span.end())
      .min_by_key(|(span, _)| span.length)
      .map(|(_, name)| name.clone())
      .unwrap_or_default()
  }
}

#[derive(Clone, Debug, Default)]
struct FakeChecker {
  default_exports: HashMap<String, SymbolId>,
  aliases: HashMap<SymbolId, SymbolId>,
  signatures: HashMap<SymbolId, CallSignature>,
  declarations: HashMap<SymbolId, DeclarationShape>,
}

impl TypeChecker for FakeChecker {
  fn module_default_export(&self, module: &str) -> Option<SymbolId> {
    self.default_exports.get(strip_extension(module)).copied()
  }

  fn resolve_alias(&self, symbol: SymbolId) -> Option<SymbolId> {
    self.aliases.get(&symbol).copied()
  }

  fn call_signature(&self, symbol: SymbolId) -> Option<CallSignature> {
    self.signatures.get(&symbol).cloned()
  }

  fn value_declaration(&self, symbol: SymbolId) -> Option<DeclarationShape> {
    self.declarations.get(&symbol).cloned()
  }
}

/// How a module's default export looks to the type-checker.
#[derive(Clone, Debug, Default)]
pub struct DefaultExport {
  /// Recorded as an alias (`const x = ...; export default x;`) that
  /// resolves to the real symbol in one hop.
  pub via_alias: bool,
  /// Present when the export is callable.
  pub signature: Option<CallSignature>,
  pub declaration: Option<DeclarationShape>,
}

#[derive(Clone, Debug, Default)]
pub struct FakeProgram {
  diagnostics: Vec<Diagnostic>,
  units: HashMap<String, FakeUnit>,
  checker: FakeChecker,
}

impl FakeProgram {
  pub fn builder() -> FakeProgramBuilder {
    FakeProgramBuilder {
      program: FakeProgram::default(),
      next_symbol: 0,
    }
  }
}

impl Program for FakeProgram {
  fn diagnostics(&self) -> Vec<Diagnostic> {
    self.diagnostics.clone()
  }

  fn source_unit(&self, name: &str) -> Option<&dyn SourceUnit> {
    self
      .units
      .get(strip_extension(name))
      .map(|unit| unit as &dyn SourceUnit)
  }

  fn checker(&self) -> &dyn TypeChecker {
    &self.checker
  }
}

pub struct FakeProgramBuilder {
  program: FakeProgram,
  next_symbol: u32,
}

impl FakeProgramBuilder {
  pub fn file(mut self, name: &str, text: &str) -> Self {
    self.program.units.insert(
      strip_extension(name).to_string(),
      FakeUnit {
        text: text.to_string(),
        functions: Vec::new(),
      },
    );
    self
  }

  /// Declares a function-like range inside a registered file, used to
  /// answer enclosing-function queries.
  pub fn function(mut self, file: &str, span: Span, name: &str) -> Self {
    self
      .program
      .units
      .get_mut(strip_extension(file))
      .expect("function() requires the file to be registered first")
      .functions
      .push((span, name.to_string()));
    self
  }

  pub fn diagnostic(mut self, diagnostic: Diagnostic) -> Self {
    self.program.diagnostics.push(diagnostic);
    self
  }

  pub fn default_export(mut self, module: &str, export: DefaultExport) -> Self {
    let target = SymbolId(self.next_symbol);
    self.next_symbol += 1;
    if let Some(signature) = export.signature {
      self.program.checker.signatures.insert(target, signature);
    }
    if let Some(declaration) = export.declaration {
      self.program.checker.declarations.insert(target, declaration);
    }
    let exported = if export.via_alias {
      let alias = SymbolId(self.next_symbol);
      self.next_symbol += 1;
      self.program.checker.aliases.insert(alias, target);
      alias
    } else {
      target
    };
    self
      .program
      .checker
      .default_exports
      .insert(strip_extension(module).to_string(), exported);
    self
  }

  pub fn build(self) -> FakeProgram {
    self.program
  }
}

/// A compiler that replays `program` and emits every non-declaration input
/// unchanged, with an identity source map unless overridden.
pub struct FakeCompiler {
  program: FakeProgram,
  js_overrides: HashMap<String, String>,
  map_overrides: HashMap<String, String>,
  compiles: Rc<Cell<usize>>,
}

impl FakeCompiler {
  pub fn new(program: FakeProgram) -> Self {
    Self {
      program,
      js_overrides: HashMap::new(),
      map_overrides: HashMap::new(),
      compiles: Rc::new(Cell::new(0)),
    }
  }

  pub fn with_emit(mut self, stripped_name: &str, js: &str) -> Self {
    self
      .js_overrides
      .insert(stripped_name.to_string(), js.to_string());
    self
  }

  pub fn with_source_map(mut self, stripped_name: &str, map: &str) -> Self {
    self
      .map_overrides
      .insert(stripped_name.to_string(), map.to_string());
    self
  }

  /// Shared invocation counter, usable after the compiler is boxed away.
  pub fn counter(&self) -> Rc<Cell<usize>> {
    self.compiles.clone()
  }
}

impl Compiler for FakeCompiler {
  fn compile(
    &self,
    host: &mut dyn CompilerHost,
    _root_names: &[String],
    options: &CompilerOptions,
  ) -> Result<Box<dyn Program>, AnyError> {
    self.compiles.set(self.compiles.get() + 1);
    let inputs: Vec<_> = host
      .input_files()
      .iter()
      .filter(|f| f.kind == FileKind::Source)
      .map(|f| (f.stripped_name().to_string(), f.text.clone()))
      .collect();
    for (stripped, text) in inputs {
      let js = self
        .js_overrides
        .get(&stripped)
        .cloned()
        .unwrap_or(text);
      host.write_file(&format!("{}.js", stripped), &js);
      if options.source_map {
        let map = self
          .map_overrides
          .get(&stripped)
          .cloned()
          .unwrap_or_else(|| identity_map(&stripped));
        host.write_file(&format!("{}.js.map", stripped), &map);
      }
    }
    Ok(Box::new(self.program.clone()))
  }
}

/// What a module does when its turn to evaluate comes.
#[derive(Clone, Debug)]
pub enum ModuleBehavior {
  /// Evaluates without observable effect.
  Inert,
  /// Assigns `result` in the context.
  SetResult(Value),
  /// Calls the named context function with the ambient `args` tuple,
  /// optionally assigning its return value to `result`.
  CallBinding { binding: String, set_result: bool },
  /// Raises a fault with the given message and raw stack text.
  Throw { message: String, stack: String },
  /// Exhausts the evaluation budget.
  TimeOut,
}

#[derive(Clone, Debug)]
pub struct ModuleScript {
  pub imports: Vec<String>,
  pub behavior: ModuleBehavior,
}

struct ModuleState {
  identifier: String,
  ctx: EvalContext,
  links: Vec<ModuleId>,
  evaluated: bool,
}

/// A sandbox that replays scripted behaviors. Modules with no script are
/// inert and import nothing. Imports evaluate before their importer, each
/// module at most once, the order recorded in `evaluation_order`.
#[derive(Default)]
pub struct FakeSandbox {
  scripts: HashMap<String, ModuleScript>,
  modules: Vec<ModuleState>,
  evaluated: Vec<String>,
}

impl FakeSandbox {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn script(
    mut self,
    identifier: &str,
    imports: &[&str],
    behavior: ModuleBehavior,
  ) -> Self {
    self.scripts.insert(
      identifier.to_string(),
      ModuleScript {
        imports: imports.iter().map(|s| s.to_string()).collect(),
        behavior,
      },
    );
    self
  }

  pub fn evaluation_order(&self) -> &[String] {
    &self.evaluated
  }

  fn evaluate_rec(
    &mut self,
    id: ModuleId,
    timeout: Duration,
  ) -> Result<(), EvaluationFault> {
    let index = id.0 as usize;
    if self.modules[index].evaluated {
      return Ok(());
    }
    self.modules[index].evaluated = true;
    for child in self.modules[index].links.clone() {
      self.evaluate_rec(child, timeout)?;
    }

    let identifier = self.modules[index].identifier.clone();
    let ctx = self.modules[index].ctx.clone();
    self.evaluated.push(identifier.clone());
    let behavior = match self.scripts.get(&identifier) {
      Some(script) => script.behavior.clone(),
      None => ModuleBehavior::Inert,
    };
    match behavior {
      ModuleBehavior::Inert => Ok(()),
      ModuleBehavior::SetResult(value) => {
        ctx.inject("result", Binding::Value(value));
        Ok(())
      }
      ModuleBehavior::CallBinding {
        binding,
        set_result,
      } => {
        let args = match ctx.get("args") {
          Some(Binding::Value(Value::Array(args))) => args,
          _ => Vec::new(),
        };
        let function = match ctx.get(&binding) {
          Some(Binding::Function(function)) => function,
          _ => {
            return Err(EvaluationFault::new(
              format!("{} is not a function", binding),
              format!("    at {}:1:1", identifier),
            ))
          }
        };
        let returned = function(&args);
        if set_result {
          ctx.inject("result", Binding::Value(returned));
        }
        Ok(())
      }
      ModuleBehavior::Throw { message, stack } => {
        Err(EvaluationFault::new(message, stack))
      }
      ModuleBehavior::TimeOut => Err(EvaluationFault::new(
        format!("Script execution timed out after {}ms", timeout.as_millis()),
        "",
      )),
    }
  }
}

#[async_trait(?Send)]
impl Sandbox for FakeSandbox {
  fn mod_new(
    &mut self,
    identifier: &str,
    _code: &str,
    ctx: &EvalContext,
  ) -> Result<ModuleId, AnyError> {
    let id = ModuleId(self.modules.len() as i32);
    self.modules.push(ModuleState {
      identifier: identifier.to_string(),
      ctx: ctx.clone(),
      links: Vec::new(),
      evaluated: false,
    });
    Ok(id)
  }

  fn mod_link(
    &mut self,
    id: ModuleId,
    resolve: &mut dyn FnMut(&str) -> Option<ModuleId>,
  ) -> Result<(), AnyError> {
    let identifier = self.modules[id.0 as usize].identifier.clone();
    let imports = match self.scripts.get(&identifier) {
      Some(script) => script.imports.clone(),
      None => Vec::new(),
    };
    for specifier in imports {
      match resolve(&specifier) {
        Some(target) => self.modules[id.0 as usize].links.push(target),
        None => {
          return Err(generic_error(format!(
            "unresolved specifier '{}' in '{}'",
            specifier, identifier
          )))
        }
      }
    }
    Ok(())
  }

  async fn mod_evaluate(
    &mut self,
    id: ModuleId,
    timeout: Duration,
  ) -> Result<(), EvaluationFault> {
    self.evaluate_rec(id, timeout)
  }
}
