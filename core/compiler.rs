// Copyright 2026 the user-code runner authors. MIT license.

//! The interface through which the runner drives the UL compiler. The
//! compiler is an external collaborator; these traits cover the slice of its
//! surface the runner consumes: program compilation over an in-memory file
//! host, per-unit source queries, and the type-checker facilities needed to
//! resolve a module's default export and print its types.

use crate::diagnostics::Diagnostic;
use crate::diagnostics::Span;
use crate::error::AnyError;

/// Suffixes recognized as file extensions, longest first so that a
/// declaration file strips as one unit.
const EXTENSIONS: [&str; 4] = [".d.ts", ".js.map", ".ts", ".js"];

/// Removes a recognized extension from a logical file name. The stripped
/// name is the unit of identity for virtual files and import specifiers.
pub fn strip_extension(name: &str) -> &str {
  for suffix in EXTENSIONS {
    if let Some(stripped) = name.strip_suffix(suffix) {
      return stripped;
    }
  }
  name
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
  /// A UL source unit that compiles to an emitted module.
  Source,
  /// A declaration unit contributing only types; never emitted or imported
  /// for side effects.
  Declaration,
  EmittedJs,
  SourceMap,
}

/// One file of the in-memory program handed to the compiler.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualFile {
  /// Logical name including extension, e.g. `helpers.ts`.
  pub name: String,
  pub text: String,
  pub kind: FileKind,
}

impl VirtualFile {
  pub fn new(name: impl Into<String>, text: impl Into<String>, kind: FileKind) -> Self {
    Self {
      name: name.into(),
      text: text.into(),
      kind,
    }
  }

  pub fn stripped_name(&self) -> &str {
    strip_extension(&self.name)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptTarget {
  Latest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
  /// ES modules with top-level `import`.
  EsModule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibKind {
  /// The latest standard library, and nothing else.
  Latest,
}

/// Fixed compilation settings. No ambient project configuration leaks in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompilerOptions {
  pub target: ScriptTarget,
  pub module: ModuleKind,
  pub lib: LibKind,
  pub source_map: bool,
}

impl Default for CompilerOptions {
  fn default() -> Self {
    Self {
      target: ScriptTarget::Latest,
      module: ModuleKind::EsModule,
      lib: LibKind::Latest,
      source_map: true,
    }
  }
}

/// The file surface the compiler reads from and emits into. Inputs are
/// served by stripped name; the implementation falls through to the real
/// file system only for the UL standard library.
pub trait CompilerHost {
  /// Input files in registration order.
  fn input_files(&self) -> &[VirtualFile];

  /// Text of the input registered under the stripped `name`.
  fn read_file(&self, name: &str) -> Option<&str>;

  /// Receives one emitted output, named `<stripped>.js` or
  /// `<stripped>.js.map`.
  fn write_file(&mut self, name: &str, text: &str);
}

/// Handle for a symbol in a compiled program's symbol table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// A parameter of a call signature, with its type rendered through the
/// checker's type printer and the span of its declaration site.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
  pub name: String,
  pub type_string: String,
  pub span: Span,
}

/// The lone call signature of a callable symbol's type.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSignature {
  /// Return type rendered through the checker's type printer.
  pub return_type: String,
  pub params: Vec<Parameter>,
}

/// Spans of a symbol's value declaration that a diagnostic can underline.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclarationShape {
  /// The whole declaration, or the whole `export default` assignment.
  pub span: Span,
  /// For function-like declarations: `function` keyword (or arrow
  /// parameters) through the close of the signature.
  pub signature_span: Option<Span>,
  /// The explicit return-type annotation, when the declaration has one.
  pub return_annotation: Option<Span>,
  pub is_function_like: bool,
}

/// Per-unit queries over a compiled source file.
pub trait SourceUnit {
  fn text(&self) -> &str;

  /// Name of the nearest enclosing function-like at `pos`, walking
  /// ancestors outward; empty at top level.
  fn enclosing_function_name(&self, pos: u32) -> String;
}

/// The slice of the type-checker the remapper consumes. Alias resolution is
/// exposed one hop at a time; deciding how many hops to take is the
/// caller's business.
pub trait TypeChecker {
  /// The default-export symbol recorded in `module`'s export table, or
  /// `None` when the module has no default export.
  fn module_default_export(&self, module: &str) -> Option<SymbolId>;

  /// The target of `symbol` when it is an alias, `None` otherwise.
  fn resolve_alias(&self, symbol: SymbolId) -> Option<SymbolId>;

  /// The call signature of the symbol's type, when it is callable.
  fn call_signature(&self, symbol: SymbolId) -> Option<CallSignature>;

  /// The shape of the symbol's value declaration.
  fn value_declaration(&self, symbol: SymbolId) -> Option<DeclarationShape>;
}

/// A compiled program: diagnostics plus query access to its units and
/// symbol table.
pub trait Program {
  /// Diagnostics in the order the compiler produced them.
  fn diagnostics(&self) -> Vec<Diagnostic>;

  /// The source unit registered under the stripped `name`.
  fn source_unit(&self, name: &str) -> Option<&dyn SourceUnit>;

  fn checker(&self) -> &dyn TypeChecker;
}

/// The compiler itself. One call checks and emits a whole program.
pub trait Compiler {
  fn compile(
    &self,
    host: &mut dyn CompilerHost,
    root_names: &[String],
    options: &CompilerOptions,
  ) -> Result<Box<dyn Program>, AnyError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strip_extension_handles_declaration_files() {
    assert_eq!(strip_extension("helpers.ts"), "helpers");
    assert_eq!(strip_extension("helpers.js"), "helpers");
    assert_eq!(strip_extension("helpers.js.map"), "helpers");
    assert_eq!(strip_extension("globals.d.ts"), "globals");
    assert_eq!(strip_extension("no_extension"), "no_extension");
    assert_eq!(strip_extension("dotted.name.ts"), "dotted.name");
  }
}
