// Copyright 2026 the user-code runner authors. MIT license.

//! Per-code rewriting of compiler message text. Chained sub-messages are
//! rewritten recursively and joined depth-first, each level indented two
//! spaces. A registered rewriter returning `None` means the code was
//! claimed but the message shape was not understood, which is an
//! inconsistency in the embedding, not in user code.

use std::collections::HashMap;

use user_code_core::MessageChain;
use user_code_core::MessageText;

use crate::errors::HostError;

pub type MessageMapper = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct MessageMappers {
  table: HashMap<u32, MessageMapper>,
}

impl MessageMappers {
  /// An empty table: every message passes through unchanged.
  pub fn empty() -> Self {
    Self {
      table: HashMap::new(),
    }
  }

  pub fn register(&mut self, code: u32, mapper: MessageMapper) {
    self.table.insert(code, mapper);
  }

  fn apply(&self, code: u32, text: &str) -> Result<String, HostError> {
    match self.table.get(&code) {
      None => Ok(text.to_string()),
      Some(mapper) => {
        mapper(text).ok_or_else(|| HostError::UnhandledMessageShape {
          code,
          text: text.to_string(),
        })
      }
    }
  }

  /// Rewrites a diagnostic message. Plain text is rewritten under the
  /// diagnostic's own code; each chain node under its own.
  pub fn render(&self, code: u32, message: &MessageText) -> Result<String, HostError> {
    match message {
      MessageText::Simple(text) => self.apply(code, text),
      MessageText::Chain(chain) => {
        let mut out = String::new();
        self.render_chain(chain, 0, &mut out)?;
        Ok(out)
      }
    }
  }

  fn render_chain(
    &self,
    chain: &MessageChain,
    depth: usize,
    out: &mut String,
  ) -> Result<(), HostError> {
    if depth > 0 {
      out.push('\n');
    }
    for _ in 0..depth {
      out.push_str("  ");
    }
    out.push_str(&self.apply(chain.code, &chain.message_text)?);
    for next in &chain.next {
      self.render_chain(next, depth + 1, out)?;
    }
    Ok(())
  }
}

impl Default for MessageMappers {
  /// The stock table: code 2792 loses its module-resolution suggestion
  /// tail, which talks about compiler settings the user cannot change.
  fn default() -> Self {
    let mut mappers = Self::empty();
    mappers.register(2792, Box::new(strip_module_resolution_suggestion));
    mappers
  }
}

fn strip_module_resolution_suggestion(text: &str) -> Option<String> {
  if !text.starts_with("Cannot find module") {
    return None;
  }
  match text.find(". Did you mean to set") {
    Some(idx) => Some(format!("{}.", &text[..idx])),
    None => Some(text.to_string()),
  }
}
