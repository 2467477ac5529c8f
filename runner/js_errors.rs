// Copyright 2026 the user-code runner authors. MIT license.

//! Mapping of runtime faults back to the user's source. The raw stack text
//! references positions in emitted modules; frames are filtered to the
//! user's module by logical-name equality and translated through the user
//! file's source map, producing a trimmed stack with no harness frames.

use once_cell::sync::Lazy;
use regex::Regex;

use user_code_core::EvaluationFault;

use crate::diagnostics::Location;
use crate::diagnostics::UserCodeError;
use crate::source_maps::SourceMapConsumer;

/// One parsed stack frame. Lines and columns are 1-based, as printed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
  pub script_name: String,
  pub function_name: String,
  pub line: u32,
  pub column: u32,
}

// Covers both frame shapes: `at name (id:L:C)` and `at id:L:C`.
static FRAME_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"^\s*at\s+(?:(?P<name>[^()\s]+)\s+)?\((?P<id>[^():]+):(?P<line>\d+):(?P<col>\d+)\)\s*$|^\s*at\s+(?P<bare_id>[^():\s]+):(?P<bare_line>\d+):(?P<bare_col>\d+)\s*$",
  )
  .unwrap()
});

/// Parses a raw stack, innermost frame first. Lines that do not look like
/// frames are skipped.
pub fn parse_stack(stack: &str) -> Vec<StackFrame> {
  let mut frames = Vec::new();
  for line in stack.lines() {
    let captures = match FRAME_RE.captures(line) {
      Some(captures) => captures,
      None => continue,
    };
    let (id, line_no, col) = if captures.name("id").is_some() {
      ("id", "line", "col")
    } else {
      ("bare_id", "bare_line", "bare_col")
    };
    frames.push(StackFrame {
      script_name: captures[id].to_string(),
      function_name: captures
        .name("name")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default(),
      line: captures[line_no].parse().unwrap_or(1),
      column: captures[col].parse().unwrap_or(1),
    });
  }
  frames
}

/// Translates a fault raised during evaluation into the user-facing error:
/// frames outside `user_name` are dropped, the rest are mapped through the
/// source map, and frames with no original position are dropped too. When
/// nothing survives, the location degrades to the top of the file.
pub fn map_fault(
  fault: &EvaluationFault,
  user_name: &str,
  source_map: &SourceMapConsumer,
) -> UserCodeError {
  let mut lines = Vec::new();
  let mut location = None;

  for frame in parse_stack(&fault.stack) {
    if frame.script_name != user_name {
      continue;
    }
    let original = match source_map
      .original_position_for(frame.line.saturating_sub(1), frame.column.saturating_sub(1))
    {
        Some(original) => original,
        None => continue,
      };
    let mapped = Location::new(original.line + 1, original.column + 1);
    let name = if frame.function_name.is_empty() {
      "null"
    } else {
      &frame.function_name
    };
    lines.push(format!("at {}({}:{})", name, mapped.line, mapped.column));
    if location.is_none() {
      location = Some(mapped);
    }
  }

  UserCodeError::new(
    format!("Error: {}", fault.message),
    lines.join("\n"),
    location.unwrap_or_else(|| Location::new(1, 1)),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  // Line 1 of the generated module: columns 0, 43 and 79 map straight back
  // to the same columns of `__user_file`.
  const USER_MAP: &str = r#"{"version":3,"sources":["__user_file"],"names":[],"mappings":"AAAA,2CAA2C,oCAAoC"}"#;

  #[test]
  fn parses_both_frame_shapes() {
    let stack = "    at sub (__user_file:1:80)\n    at __execution_harness:6:10\nnot a frame";
    let frames = parse_stack(stack);
    assert_eq!(
      frames,
      vec![
        StackFrame {
          script_name: "__user_file".to_string(),
          function_name: "sub".to_string(),
          line: 1,
          column: 80,
        },
        StackFrame {
          script_name: "__execution_harness".to_string(),
          function_name: "".to_string(),
          line: 6,
          column: 10,
        },
      ]
    );
  }

  #[test]
  fn keeps_only_user_frames_and_translates_them() {
    let sm = SourceMapConsumer::from_json(USER_MAP).unwrap();
    let fault = EvaluationFault::new(
      "X",
      "    at sub (__user_file:1:80)\n    at F (__user_file:1:44)\n    at __execution_harness:6:10",
    );
    let mapped = map_fault(&fault, "__user_file", &sm);
    assert_eq!(mapped.message, "Error: X");
    assert_eq!(mapped.stack, "at sub(1:80)\nat F(1:44)");
    assert_eq!(mapped.location, Location::new(1, 80));
  }

  #[test]
  fn filters_by_name_equality_not_suffix() {
    let sm = SourceMapConsumer::from_json(USER_MAP).unwrap();
    let fault = EvaluationFault::new(
      "X",
      "    at f (extra__user_file:1:44)\n    at g (__user_file:1:44)",
    );
    let mapped = map_fault(&fault, "__user_file", &sm);
    assert_eq!(mapped.stack, "at g(1:44)");
  }

  #[test]
  fn anonymous_frames_print_null() {
    let sm = SourceMapConsumer::from_json(USER_MAP).unwrap();
    let fault = EvaluationFault::new("X", "    at __user_file:1:1");
    let mapped = map_fault(&fault, "__user_file", &sm);
    assert_eq!(mapped.stack, "at null(1:1)");
    assert_eq!(mapped.location, Location::new(1, 1));
  }

  #[test]
  fn no_surviving_frames_degrades_to_the_top_of_file() {
    let sm = SourceMapConsumer::from_json(USER_MAP).unwrap();
    let fault = EvaluationFault::new(
      "Script execution timed out after 100ms",
      "    at __execution_harness:6:10",
    );
    let mapped = map_fault(&fault, "__user_file", &sm);
    assert_eq!(
      mapped.message,
      "Error: Script execution timed out after 100ms"
    );
    assert_eq!(mapped.stack, "");
    assert_eq!(mapped.location, Location::new(1, 1));
  }
}
