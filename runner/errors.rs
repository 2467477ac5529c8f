// Copyright 2026 the user-code runner authors. MIT license.

//! Errors that indicate a bug in the embedding, never in user code. These
//! are returned as `Err` from the runner's API; user-caused conditions are
//! always surfaced as diagnostic values instead.

use thiserror::Error;
use user_code_core::AnyError;

#[derive(Debug, Error)]
pub enum HostError {
  #[error("logical file name '{0}' is reserved by the runner")]
  ReservedFileName(String),

  #[error("files '{0}' and '{1}' collide after extension stripping")]
  FileCollision(String, String),

  #[error("compiler failed to run: {0}")]
  Compiler(AnyError),

  #[error(
    "compiler reported a fileless diagnostic outside the allow-list: TS{code}: {message}"
  )]
  GlobalDiagnostic { code: u32, message: String },

  #[error("no remapping for harness diagnostic TS{code} at offset {offset}")]
  UnmappedHarnessDiagnostic { code: u32, offset: u32 },

  #[error("source unit '{0}' is missing from the compiled program")]
  MissingSourceUnit(String),

  #[error("message mapper for TS{code} did not understand: {text}")]
  UnhandledMessageShape { code: u32, text: String },

  #[error("emitted module '{0}' is missing from the compiler output")]
  MissingEmit(String),

  #[error("compiler emitted '{0}', which matches no non-declaration source")]
  UnexpectedEmit(String),

  #[error("no source map was emitted for '{0}'")]
  MissingSourceMap(String),

  #[error("source map for '{0}' could not be decoded")]
  SourceMapDecode(String),

  #[error("failed to load module '{identifier}' into the sandbox: {error}")]
  ModuleLoad { identifier: String, error: AnyError },

  #[error(
    "import specifier '{specifier}' in module '{referrer}' is not part of the compiled program"
  )]
  UnresolvedSpecifier {
    specifier: String,
    referrer: String,
  },

  #[error("failed to link module '{identifier}': {error}")]
  ModuleLink { identifier: String, error: AnyError },
}
