// Copyright 2026 the user-code runner authors. MIT license.

//! Error surface shared with collaborator bridges.

/// A generic wrapper that can encapsulate any concrete error type.
pub type AnyError = anyhow::Error;

/// Creates a new error for conditions that have no better classification.
pub fn generic_error(message: impl Into<String>) -> AnyError {
  anyhow::anyhow!(message.into())
}
