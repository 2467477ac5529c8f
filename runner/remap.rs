// Copyright 2026 the user-code runner authors. MIT license.

//! Classification and remapping of compiler diagnostics. Every diagnostic
//! leaves this module pointing at the user's source with a domain-level
//! message; a harness diagnostic that cannot be explained in terms of the
//! user's code is a bug in the embedding.
//!
//! Harness diagnostics are classified by anchor identity: the smallest
//! recorded anchor span enclosing the diagnostic decides its meaning. The
//! whole decision is one match over `DiagnosticOrigin`.

use log::debug;

use user_code_core::strip_extension;
use user_code_core::Diagnostic;
use user_code_core::Program;
use user_code_core::Span;
use user_code_core::SymbolId;

use crate::diagnostics::line_col_at;
use crate::diagnostics::Location;
use crate::diagnostics::UserCodeError;
use crate::errors::HostError;
use crate::harness::HarnessAnchors;
use crate::harness::HARNESS_FILE;
use crate::harness::USER_FILE;
use crate::messages::MessageMappers;

/// Where a diagnostic lands after classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DiagnosticOrigin {
  /// Rooted in the user's file or an auxiliary file; passes through with
  /// message normalization.
  UserFile,
  /// On the result assignment: the default export's return type does not
  /// satisfy the expected return type.
  HarnessResult,
  /// On the call, callee, or argument list: the default export does not
  /// accept the expected argument tuple.
  HarnessCall,
  HarnessCallee,
  HarnessArgList,
  /// The user module has no default export.
  NoDefault,
  /// The user module is not a module at all.
  NotAModule,
  /// The default export exists but is not callable.
  NotCallable,
  /// A harness diagnostic with no mapping; an embedder bug.
  Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
  ResultLhs,
  Callee,
  ArgList,
  Call,
}

pub(crate) struct Remapper<'a> {
  pub program: &'a dyn Program,
  pub anchors: &'a HarnessAnchors,
  pub mappers: &'a MessageMappers,
  pub expected_return: &'a str,
  pub expected_args: &'a [String],
}

impl<'a> Remapper<'a> {
  /// Remaps every diagnostic, preserving compiler order.
  pub fn remap(&self, diagnostics: &[Diagnostic]) -> Result<Vec<UserCodeError>, HostError> {
    diagnostics.iter().map(|d| self.remap_one(d)).collect()
  }

  fn remap_one(&self, diagnostic: &Diagnostic) -> Result<UserCodeError, HostError> {
    let origin = self.classify(diagnostic);
    debug!(
      "diagnostic TS{} classified as {:?}",
      diagnostic.code, origin
    );
    match origin {
      DiagnosticOrigin::UserFile => self.pass_through(diagnostic),
      DiagnosticOrigin::NoDefault => Ok(self.missing_default(diagnostic.code, "No default export.")),
      DiagnosticOrigin::NotAModule => Ok(self.missing_default(diagnostic.code, "No exports.")),
      DiagnosticOrigin::NotCallable => self.not_callable(diagnostic.code),
      DiagnosticOrigin::HarnessResult => self.return_mismatch(diagnostic),
      DiagnosticOrigin::HarnessCall
      | DiagnosticOrigin::HarnessCallee
      | DiagnosticOrigin::HarnessArgList => self.argument_mismatch(diagnostic),
      DiagnosticOrigin::Other => Err(HostError::UnmappedHarnessDiagnostic {
        code: diagnostic.code,
        offset: diagnostic.span.map(|s| s.start).unwrap_or(0),
      }),
    }
  }

  fn classify(&self, diagnostic: &Diagnostic) -> DiagnosticOrigin {
    let file = diagnostic.file.as_deref().unwrap_or_default();
    if strip_extension(file) != HARNESS_FILE {
      return DiagnosticOrigin::UserFile;
    }
    match diagnostic.code {
      1192 => return DiagnosticOrigin::NoDefault,
      2306 => return DiagnosticOrigin::NotAModule,
      _ => {}
    }
    let span = match diagnostic.span {
      Some(span) => span,
      None => return DiagnosticOrigin::Other,
    };
    match (diagnostic.code, self.smallest_anchor(span)) {
      (2349, Some(Anchor::Callee)) => DiagnosticOrigin::NotCallable,
      (_, Some(Anchor::ResultLhs)) => DiagnosticOrigin::HarnessResult,
      (_, Some(Anchor::Call)) => DiagnosticOrigin::HarnessCall,
      (_, Some(Anchor::Callee)) => DiagnosticOrigin::HarnessCallee,
      (_, Some(Anchor::ArgList)) => DiagnosticOrigin::HarnessArgList,
      _ => DiagnosticOrigin::Other,
    }
  }

  /// The smallest anchor whose span encloses `span`.
  fn smallest_anchor(&self, span: Span) -> Option<Anchor> {
    let candidates = [
      (self.anchors.result_lhs, Anchor::ResultLhs),
      (self.anchors.callee, Anchor::Callee),
      (self.anchors.arg_list, Anchor::ArgList),
      (self.anchors.call, Anchor::Call),
    ];
    candidates
      .iter()
      .filter(|(anchor, _)| anchor.contains(span))
      .min_by_key(|(anchor, _)| anchor.length)
      .map(|(_, kind)| *kind)
  }

  /// User branch: location and stack from the originating file, message
  /// normalized through the mapper table.
  fn pass_through(&self, diagnostic: &Diagnostic) -> Result<UserCodeError, HostError> {
    let file = strip_extension(diagnostic.file.as_deref().unwrap_or_default());
    let unit = self
      .program
      .source_unit(file)
      .ok_or_else(|| HostError::MissingSourceUnit(file.to_string()))?;
    let start = diagnostic.span.map(|s| s.start).unwrap_or(0);
    let location = line_col_at(unit.text(), start);
    let name = unit.enclosing_function_name(start);
    let message = format!(
      "TypeError: TS{} {}",
      diagnostic.code,
      self.mappers.render(diagnostic.code, &diagnostic.message)?
    );
    Ok(UserCodeError::new(
      message,
      stack_line(&name, location),
      location,
    ))
  }

  fn expected_signature(&self) -> String {
    format!(
      "(...args: [{}]) => {}",
      self.expected_args.join(", "),
      self.expected_return
    )
  }

  /// The user module has no usable default export; the whole file is the
  /// offender.
  fn missing_default(&self, code: u32, phrase: &str) -> UserCodeError {
    let location = Location::new(1, 1);
    UserCodeError::new(
      format!(
        "TypeError: TS{} {} Expected a default export function with the signature: \"{}\".",
        code,
        phrase,
        self.expected_signature()
      ),
      stack_line("", location),
      location,
    )
  }

  /// The default-export symbol after one alias hop, the way the export is
  /// recorded in the module's export table.
  fn default_symbol(&self) -> Option<SymbolId> {
    let checker = self.program.checker();
    let symbol = checker.module_default_export(USER_FILE)?;
    Some(checker.resolve_alias(symbol).unwrap_or(symbol))
  }

  fn user_location(&self, span: Option<Span>) -> Result<(Location, String), HostError> {
    let unit = self
      .program
      .source_unit(USER_FILE)
      .ok_or_else(|| HostError::MissingSourceUnit(USER_FILE.to_string()))?;
    let start = span.map(|s| s.start).unwrap_or(0);
    let location = line_col_at(unit.text(), start);
    let name = unit.enclosing_function_name(start);
    Ok((location, name))
  }

  /// The default export exists but cannot be called; underline its whole
  /// declaration.
  fn not_callable(&self, code: u32) -> Result<UserCodeError, HostError> {
    let span = self
      .default_symbol()
      .and_then(|s| self.program.checker().value_declaration(s))
      .map(|d| d.span);
    let (location, name) = self.user_location(span)?;
    Ok(UserCodeError::new(
      format!(
        "TypeError: TS{} Default export is not a valid function. Expected a default export function with the signature: \"{}\".",
        code,
        self.expected_signature()
      ),
      stack_line(&name, location),
      location,
    ))
  }

  /// The assignment to `result` failed to type-check: the actual return
  /// type does not satisfy the expected one. Underline the explicit return
  /// annotation when there is one, otherwise the whole signature.
  fn return_mismatch(&self, diagnostic: &Diagnostic) -> Result<UserCodeError, HostError> {
    let checker = self.program.checker();
    let symbol = match self.default_symbol() {
      Some(symbol) => symbol,
      None => return Ok(self.missing_default(diagnostic.code, "No default export.")),
    };
    let signature = match checker.call_signature(symbol) {
      Some(signature) => signature,
      None => return Ok(self.missing_default(diagnostic.code, "No default export.")),
    };
    let declaration = checker.value_declaration(symbol);
    let span = declaration
      .as_ref()
      .and_then(|d| d.return_annotation.or(d.signature_span))
      .or_else(|| declaration.as_ref().map(|d| d.span));
    let (location, name) = self.user_location(span)?;
    Ok(UserCodeError::new(
      format!(
        "TypeError: TS{} Incorrect return type. Expected: '{}', Actual: '{}'.",
        diagnostic.code, self.expected_return, signature.return_type
      ),
      stack_line(&name, location),
      location,
    ))
  }

  /// The call itself failed to type-check: the parameters do not accept the
  /// expected argument tuple. Underline the parameter list, or the whole
  /// declaration when the signature takes nothing.
  fn argument_mismatch(&self, diagnostic: &Diagnostic) -> Result<UserCodeError, HostError> {
    let checker = self.program.checker();
    let symbol = match self.default_symbol() {
      Some(symbol) => symbol,
      None => return Ok(self.missing_default(diagnostic.code, "No default export.")),
    };
    let signature = match checker.call_signature(symbol) {
      Some(signature) => signature,
      None => return Ok(self.missing_default(diagnostic.code, "No default export.")),
    };
    let span = if signature.params.is_empty() {
      checker.value_declaration(symbol).map(|d| d.span)
    } else {
      let first = signature.params.first().unwrap().span;
      let last = signature.params.last().unwrap().span;
      Some(Span::new(first.start, last.end() - first.start))
    };
    let actual: Vec<&str> = signature
      .params
      .iter()
      .map(|p| p.type_string.as_str())
      .collect();
    let (location, name) = self.user_location(span)?;
    Ok(UserCodeError::new(
      format!(
        "TypeError: TS{} Incorrect argument type. Expected: '[{}]', Actual: '[{}]'.",
        diagnostic.code,
        self.expected_args.join(", "),
        actual.join(", ")
      ),
      stack_line(&name, location),
      location,
    ))
  }
}

fn stack_line(name: &str, location: Location) -> String {
  format!("at {}({}:{})", name, location.line, location.column)
}
