// Copyright 2026 the user-code runner authors. MIT license.

//! The diagnostic surface returned to callers. Every location points into
//! the user's original source, 1-based.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;

use crate::colors;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub line: u32,
  pub column: u32,
}

impl Location {
  pub fn new(line: u32, column: u32) -> Self {
    Self { line, column }
  }
}

/// A user-caused failure, either a type error found during compilation or a
/// fault raised while the code ran. `stack` is newline-separated
/// `at <name>(line:column)` frames, innermost first, all inside the user's
/// source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserCodeError {
  pub message: String,
  pub stack: String,
  pub location: Location,
}

impl UserCodeError {
  pub fn new(
    message: impl Into<String>,
    stack: impl Into<String>,
    location: Location,
  ) -> Self {
    Self {
      message: message.into(),
      stack: stack.into(),
      location,
    }
  }
}

impl fmt::Display for UserCodeError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.message)?;
    for frame in self.stack.lines() {
      write!(f, "\n    {}", frame)?;
    }
    Ok(())
  }
}

/// Converts a byte offset in `text` to a 1-based line and column.
pub(crate) fn line_col_at(text: &str, offset: u32) -> Location {
  let offset = (offset as usize).min(text.len());
  let mut line = 1;
  let mut column = 1;
  for ch in text[..offset].chars() {
    if ch == '\n' {
      line += 1;
      column = 1;
    } else {
      column += 1;
    }
  }
  Location::new(line, column)
}

/// Renders diagnostics for terminal display, one block per error.
pub fn format_diagnostics(errors: &[UserCodeError]) -> String {
  let mut out = String::new();
  for (i, e) in errors.iter().enumerate() {
    if i > 0 {
      out.push('\n');
    }
    out.push_str(&format!(
      "{}:{} - {} {}",
      colors::yellow(e.location.line.to_string()),
      colors::yellow(e.location.column.to_string()),
      colors::red_bold("error".to_string()),
      colors::bold(e.message.clone()),
    ));
    for frame in e.stack.lines() {
      out.push_str(&format!("\n    {}", colors::cyan(frame.to_string())));
    }
  }
  out
}
