// Copyright 2026 the user-code runner authors. MIT license.

//! Decoding and querying of source maps emitted alongside compiled modules.
//! A consumer owns its decoded tables; it is built once per compilation and
//! shared for the lifetime of the artifacts.

use serde::Deserialize;
use source_map_mappings::parse_mappings;
use source_map_mappings::Bias;
use source_map_mappings::Mappings;

use user_code_core::error::generic_error;
use user_code_core::AnyError;

#[derive(Deserialize)]
struct RawSourceMap {
  mappings: String,
  sources: Vec<String>,
}

/// A position in an original source, 0-based like the decoded tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginalPosition {
  pub source: String,
  pub line: u32,
  pub column: u32,
}

pub struct SourceMapConsumer {
  mappings: Mappings,
  sources: Vec<String>,
}

impl SourceMapConsumer {
  pub fn from_json(json_str: &str) -> Option<Self> {
    let raw: RawSourceMap = serde_json::from_str(json_str).ok()?;
    let mappings = parse_mappings::<()>(raw.mappings.as_bytes()).ok()?;
    Some(SourceMapConsumer {
      mappings,
      sources: raw.sources,
    })
  }

  /// Builds a consumer off the async task, decoding on the blocking pool.
  pub async fn decode(name: String, json: String) -> Result<Self, AnyError> {
    tokio::task::spawn_blocking(move || Self::from_json(&json))
      .await?
      .ok_or_else(|| generic_error(format!("invalid source map for '{}'", name)))
  }

  /// Maps a 0-based generated position back to the original source.
  /// `None` when the position has no original counterpart.
  pub fn original_position_for(
    &self,
    line: u32,
    column: u32,
  ) -> Option<OriginalPosition> {
    let mapping = self
      .mappings
      .original_location_for(line, column, Bias::default())?;
    let original = mapping.original.as_ref()?;
    let source = self.sources.get(original.source as usize)?.clone();
    Some(OriginalPosition {
      source,
      line: original.original_line,
      column: original.original_column,
    })
  }
}

impl std::fmt::Debug for SourceMapConsumer {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("SourceMapConsumer")
      .field("sources", &self.sources)
      .finish()
  }
}
