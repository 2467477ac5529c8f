// Copyright 2026 the user-code runner authors. MIT license.

//! Raw diagnostics as yielded by the UL compiler, before any remapping.

use serde::Deserialize;
use serde::Serialize;

/// A byte range inside a source unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
  pub start: u32,
  pub length: u32,
}

impl Span {
  pub fn new(start: u32, length: u32) -> Self {
    Self { start, length }
  }

  pub fn end(&self) -> u32 {
    self.start + self.length
  }

  /// True when `other` lies entirely inside this span.
  pub fn contains(&self, other: Span) -> bool {
    self.start <= other.start && other.end() <= self.end()
  }
}

/// A chained sub-message tree attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageChain {
  pub message_text: String,
  pub code: u32,
  pub next: Vec<MessageChain>,
}

/// The message of a diagnostic: either plain text or a chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
  Simple(String),
  Chain(MessageChain),
}

impl From<&str> for MessageText {
  fn from(text: &str) -> Self {
    MessageText::Simple(text.to_string())
  }
}

/// A diagnostic as the compiler reports it. `file` is the logical name of
/// the originating source unit; diagnostics with no file are program-global.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub file: Option<String>,
  pub span: Option<Span>,
  pub code: u32,
  pub message: MessageText,
}

impl Diagnostic {
  pub fn new(
    file: impl Into<String>,
    span: Span,
    code: u32,
    message: impl Into<MessageText>,
  ) -> Self {
    Self {
      file: Some(file.into()),
      span: Some(span),
      code,
      message: message.into(),
    }
  }

  /// A diagnostic not rooted in any source unit.
  pub fn global(code: u32, message: impl Into<MessageText>) -> Self {
    Self {
      file: None,
      span: None,
      code,
      message: message.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn span_containment() {
    let outer = Span::new(10, 20);
    assert!(outer.contains(Span::new(10, 20)));
    assert!(outer.contains(Span::new(15, 0)));
    assert!(outer.contains(Span::new(29, 1)));
    assert!(!outer.contains(Span::new(9, 2)));
    assert!(!outer.contains(Span::new(25, 6)));
  }

  #[test]
  fn message_text_serializes_untagged() {
    let simple = MessageText::Simple("Type 'A' is not assignable.".to_string());
    assert_eq!(
      serde_json::to_value(&simple).unwrap(),
      serde_json::json!("Type 'A' is not assignable.")
    );

    let chain = MessageText::Chain(MessageChain {
      message_text: "outer".to_string(),
      code: 2322,
      next: vec![MessageChain {
        message_text: "inner".to_string(),
        code: 2328,
        next: vec![],
      }],
    });
    let value = serde_json::to_value(&chain).unwrap();
    assert_eq!(value["code"], 2322);
    assert_eq!(value["next"][0]["message_text"], "inner");
  }
}
