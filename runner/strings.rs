// Copyright 2026 the user-code runner authors. MIT license.

//! Free string utilities. Kept as plain functions threaded through the
//! components that need them; nothing here touches shared state.

/// Removes the longest common leading whitespace from every non-blank line.
pub fn dedent(text: &str) -> String {
  let indent = text
    .lines()
    .filter(|line| !line.trim().is_empty())
    .map(|line| line.len() - line.trim_start().len())
    .min()
    .unwrap_or(0);

  let mut out = String::with_capacity(text.len());
  for (i, line) in text.lines().enumerate() {
    if i > 0 {
      out.push('\n');
    }
    if line.trim().is_empty() {
      continue;
    }
    out.push_str(&line[indent..]);
  }
  if text.ends_with('\n') {
    out.push('\n');
  }
  out
}

/// Dedents an inline template and trims the blank first and last lines that
/// multi-line literals carry.
pub fn trim_template(text: &str) -> String {
  let dedented = dedent(text);
  dedented.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dedent_strips_common_indent() {
    let text = "  one\n    two\n  three";
    assert_eq!(dedent(text), "one\n  two\nthree");
  }

  #[test]
  fn dedent_ignores_blank_lines_for_indent() {
    let text = "    a\n\n    b\n";
    assert_eq!(dedent(text), "a\n\nb\n");
  }

  #[test]
  fn trim_template_drops_surrounding_newlines() {
    let text = "
      export default function f() {
        return 1;
      }
    ";
    assert_eq!(
      trim_template(text),
      "export default function f() {\n  return 1;\n}"
    );
  }
}
