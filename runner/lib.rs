// Copyright 2026 the user-code runner authors. MIT license.

//! Compiles, type-checks and executes untrusted user-authored source inside
//! a sandboxed evaluation context, returning either the value produced by
//! the user's default-exported function or a list of diagnostics whose
//! locations always point into the user's own source.
//!
//! The pipeline is single-shot: probe the compilation cache, synthesize the
//! execution harness, assemble and compile the virtual program, remap any
//! diagnostic to the user's file, then load the emitted modules into the
//! caller's sandbox, evaluate under a wall-clock budget, and map any
//! runtime fault back through the source map. User-caused failures are
//! values; only embedder bugs surface as errors.

mod cache;
pub mod colors;
mod diagnostics;
mod errors;
mod exec;
mod harness;
mod js_errors;
mod messages;
mod program;
mod remap;
mod source_maps;
pub mod strings;

use log::debug;
use std::time::Duration;

use user_code_core::strip_extension;
use user_code_core::Compiler;
use user_code_core::CompilerOptions;
use user_code_core::EvalContext;
use user_code_core::Sandbox;
use user_code_core::Value;

pub use crate::cache::cache_key;
pub use crate::cache::CacheEntry;
pub use crate::cache::CacheStore;
pub use crate::cache::LruTtlCache;
pub use crate::cache::MemoryCache;
pub use crate::diagnostics::format_diagnostics;
pub use crate::diagnostics::Location;
pub use crate::diagnostics::UserCodeError;
pub use crate::errors::HostError;
pub use crate::harness::synthesize as synthesize_harness;
pub use crate::harness::HarnessAnchors;
pub use crate::harness::HarnessModule;
pub use crate::harness::HARNESS_FILE;
pub use crate::harness::USER_FILE;
pub use crate::messages::MessageMapper;
pub use crate::messages::MessageMappers;
pub use crate::program::AuxFile;
pub use crate::program::CompilationArtifacts;
pub use crate::program::DEFAULT_BENIGN_GLOBAL_CODES;
pub use crate::source_maps::SourceMapConsumer;

use crate::program::collect_artifacts;
use crate::program::partition_global_diagnostics;
use crate::program::VirtualHost;
use crate::remap::Remapper;

/// The outcome of running user code: its value, or the diagnostics that
/// stopped it.
pub type RunOutcome = Result<Value, Vec<UserCodeError>>;

/// One compilation's inputs. `arg_types` and `return_type` are opaque UL
/// type expressions spliced into the harness verbatim.
#[derive(Clone, Copy, Debug)]
pub struct CompileRequest<'a> {
  pub user_source: &'a str,
  pub return_type: &'a str,
  pub arg_types: &'a [String],
  pub aux_files: &'a [AuxFile],
}

pub struct RunnerOptions {
  /// Wall-clock budget for one evaluation, unless overridden per call.
  pub timeout: Duration,
  pub cache: Box<dyn CacheStore>,
  pub message_mappers: MessageMappers,
  /// Fileless diagnostic codes tolerated as compiler chatter.
  pub benign_global_codes: Vec<u32>,
}

impl Default for RunnerOptions {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(5),
      cache: Box::new(LruTtlCache::default()),
      message_mappers: MessageMappers::default(),
      benign_global_codes: DEFAULT_BENIGN_GLOBAL_CODES.to_vec(),
    }
  }
}

pub struct Runner {
  compiler: Box<dyn Compiler>,
  options: RunnerOptions,
}

impl Runner {
  pub fn new(compiler: Box<dyn Compiler>) -> Self {
    Self::with_options(compiler, RunnerOptions::default())
  }

  pub fn with_options(compiler: Box<dyn Compiler>, options: RunnerOptions) -> Self {
    Self { compiler, options }
  }

  /// Compiles and type-checks `request`, returning artifacts on success or
  /// the remapped diagnostics on failure. Both outcomes are cached, so a
  /// repeat of the same inputs is a pure lookup.
  pub async fn pre_process(
    &self,
    request: &CompileRequest<'_>,
  ) -> Result<CacheEntry, HostError> {
    let aux_texts: Vec<&str> =
      request.aux_files.iter().map(|a| a.text.as_str()).collect();
    let key = cache_key(
      request.user_source,
      request.return_type,
      request.arg_types,
      &aux_texts,
    );
    if let Some(entry) = self.options.cache.get(&key) {
      debug!("compilation cache hit for {}", key);
      return Ok(entry);
    }

    debug!("compilation cache miss for {}", key);
    let entry = self.compile_uncached(request).await?;
    self.options.cache.set(&key, entry.clone());
    Ok(entry)
  }

  async fn compile_uncached(
    &self,
    request: &CompileRequest<'_>,
  ) -> Result<CacheEntry, HostError> {
    let aux_names: Vec<&str> = request
      .aux_files
      .iter()
      .filter(|a| !a.is_declaration())
      .map(|a| strip_extension(&a.name))
      .collect();
    let harness =
      harness::synthesize(&aux_names, request.return_type, request.arg_types);
    let mut host =
      VirtualHost::assemble(request.user_source, request.aux_files, &harness.text)?;

    let program = self
      .compiler
      .compile(
        &mut host,
        &[HARNESS_FILE.to_string()],
        &CompilerOptions::default(),
      )
      .map_err(HostError::Compiler)?;

    let diagnostics = partition_global_diagnostics(
      program.diagnostics(),
      &self.options.benign_global_codes,
    )?;
    if !diagnostics.is_empty() {
      debug!("type check produced {} diagnostics", diagnostics.len());
      let remapper = Remapper {
        program: program.as_ref(),
        anchors: &harness.anchors,
        mappers: &self.options.message_mappers,
        expected_return: request.return_type,
        expected_args: request.arg_types,
      };
      return Ok(Err(remapper.remap(&diagnostics)?));
    }

    Ok(Ok(collect_artifacts(&host).await?))
  }

  /// Compiles (or reuses a cached compilation of) `request` and evaluates
  /// the user's default export with `args` in the caller's sandbox.
  pub async fn execute_user_code(
    &self,
    sandbox: &mut dyn Sandbox,
    ctx: &EvalContext,
    request: &CompileRequest<'_>,
    args: &[Value],
    timeout: Option<Duration>,
  ) -> Result<RunOutcome, HostError> {
    match self.pre_process(request).await? {
      Err(errors) => Ok(Err(errors)),
      Ok(artifacts) => {
        self
          .execute_from_artifacts(sandbox, ctx, &artifacts, args, timeout)
          .await
      }
    }
  }

  /// Evaluates already-compiled artifacts, skipping compilation entirely.
  pub async fn execute_from_artifacts(
    &self,
    sandbox: &mut dyn Sandbox,
    ctx: &EvalContext,
    artifacts: &CompilationArtifacts,
    args: &[Value],
    timeout: Option<Duration>,
  ) -> Result<RunOutcome, HostError> {
    exec::execute(
      sandbox,
      ctx,
      artifacts,
      args,
      timeout.unwrap_or(self.options.timeout),
    )
    .await
  }
}
