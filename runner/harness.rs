// Copyright 2026 the user-code runner authors. MIT license.

//! Synthesis of the execution harness: the hidden module that imports the
//! user's default export, declares the ambient `args`/`result` globals with
//! the caller-supplied types, and performs the call under type context.
//!
//! The anchor spans of the call statement and the ambient declarations are
//! recorded while the text is built, so the remapper can classify a
//! diagnostic by span identity instead of searching the text.

use std::fmt::Write;

use user_code_core::Span;

/// Logical name of the user's module. Reserved; callers must not supply it.
pub const USER_FILE: &str = "__user_file";

/// Logical name of the synthesized harness module. Reserved.
pub const HARNESS_FILE: &str = "__execution_harness";

/// Structural anchors of the harness, by byte span in `HarnessModule::text`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarnessAnchors {
  /// The `[T1, ...]` tuple annotating the ambient `args`.
  pub arg_types: Span,
  /// The annotation of the ambient `result`.
  pub return_type: Span,
  /// The `result` identifier on the left of the final assignment.
  pub result_lhs: Span,
  /// The callee of the call on the right of that assignment.
  pub callee: Span,
  /// The spread argument list of that call.
  pub arg_list: Span,
  /// The whole call expression.
  pub call: Span,
}

#[derive(Clone, Debug)]
pub struct HarnessModule {
  pub text: String,
  pub anchors: HarnessAnchors,
}

/// Emits the harness for the given expected types. `aux_names` are the
/// stripped names of the caller's non-declaration auxiliary files, imported
/// for side effects in the order given; declaration files contribute only
/// types and are not imported. The type strings are opaque UL type
/// expressions and are spliced, never parsed.
pub fn synthesize(
  aux_names: &[&str],
  return_type: &str,
  arg_types: &[String],
) -> HarnessModule {
  let mut text = String::new();
  for name in aux_names {
    writeln!(text, "import '{}';", name).unwrap();
  }
  writeln!(text, "import defaultExport from '{}';", USER_FILE).unwrap();

  text.push_str("declare global {\n  const args: ");
  let arg_types = mark(&mut text, &format!("[{}]", arg_types.join(", ")));
  text.push_str(";\n  let result: ");
  let return_type = mark(&mut text, return_type);
  text.push_str(";\n}\n");

  let result_lhs = mark(&mut text, "result");
  text.push_str(" = ");
  let call_start = text.len() as u32;
  let callee = mark(&mut text, "defaultExport");
  text.push('(');
  let arg_list = mark(&mut text, "...args");
  text.push(')');
  let call = Span::new(call_start, text.len() as u32 - call_start);
  text.push_str(";\n");

  HarnessModule {
    text,
    anchors: HarnessAnchors {
      arg_types,
      return_type,
      result_lhs,
      callee,
      arg_list,
      call,
    },
  }
}

/// Appends `piece` and returns the span it occupies.
fn mark(text: &mut String, piece: &str) -> Span {
  let start = text.len() as u32;
  text.push_str(piece);
  Span::new(start, piece.len() as u32)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn slice(text: &str, span: Span) -> &str {
    &text[span.start as usize..span.end() as usize]
  }

  #[test]
  fn harness_text_matches_the_template() {
    let harness = synthesize(
      &["helpers"],
      "number",
      &["string".to_string(), "number".to_string()],
    );
    assert_eq!(
      harness.text,
      "import 'helpers';\n\
       import defaultExport from '__user_file';\n\
       declare global {\n\
       \x20 const args: [string, number];\n\
       \x20 let result: number;\n\
       }\n\
       result = defaultExport(...args);\n"
    );
  }

  #[test]
  fn empty_argument_tuple() {
    let harness = synthesize(&[], "void", &[]);
    assert_eq!(slice(&harness.text, harness.anchors.arg_types), "[]");
  }

  #[test]
  fn anchors_cover_the_expected_nodes() {
    let harness = synthesize(&[], "string", &["string".to_string()]);
    let text = &harness.text;
    let a = &harness.anchors;
    assert_eq!(slice(text, a.arg_types), "[string]");
    assert_eq!(slice(text, a.return_type), "string");
    assert_eq!(slice(text, a.result_lhs), "result");
    assert_eq!(slice(text, a.callee), "defaultExport");
    assert_eq!(slice(text, a.arg_list), "...args");
    assert_eq!(slice(text, a.call), "defaultExport(...args)");
    assert!(a.call.contains(a.callee));
    assert!(a.call.contains(a.arg_list));
    assert!(!a.call.contains(a.result_lhs));
  }

  #[test]
  fn aux_imports_precede_the_user_import_in_input_order() {
    let harness = synthesize(&["b", "a"], "void", &[]);
    let b = harness.text.find("import 'b';").unwrap();
    let a = harness.text.find("import 'a';").unwrap();
    let user = harness.text.find("import defaultExport").unwrap();
    assert!(b < a && a < user);
  }
}
