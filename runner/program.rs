// Copyright 2026 the user-code runner authors. MIT license.

//! Assembly of the virtual program handed to the compiler: the user's
//! module, the synthesized harness, and the caller's auxiliary files, all
//! identified by stripped name. The host serves inputs from memory and
//! collects emitted JS and source-map artifacts into in-memory maps; only
//! the UL standard library is left for the compiler to find on its own.

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use user_code_core::strip_extension;
use user_code_core::CompilerHost;
use user_code_core::Diagnostic;
use user_code_core::FileKind;
use user_code_core::MessageText;
use user_code_core::VirtualFile;

use crate::errors::HostError;
use crate::harness::HARNESS_FILE;
use crate::harness::USER_FILE;
use crate::source_maps::SourceMapConsumer;

/// Fileless diagnostic codes that are expected compiler chatter (the
/// markers some compiler versions emit while probing imported modules for
/// default exports) rather than embedder bugs.
pub const DEFAULT_BENIGN_GLOBAL_CODES: &[u32] = &[1192, 2306];

const DECLARATION_SUFFIX: &str = ".d.ts";
const SOURCE_MAP_SUFFIX: &str = ".map";

/// A caller-supplied additional source file.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxFile {
  /// Logical name including extension, e.g. `helpers.ts` or `globals.d.ts`.
  pub name: String,
  pub text: String,
}

impl AuxFile {
  pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      text: text.into(),
    }
  }

  pub fn is_declaration(&self) -> bool {
    self.name.ends_with(DECLARATION_SUFFIX)
  }
}

/// The in-memory file surface for one compilation.
#[derive(Debug)]
pub(crate) struct VirtualHost {
  files: Vec<VirtualFile>,
  outputs: Vec<(String, String)>,
}

impl VirtualHost {
  /// Builds the virtual file set, rejecting reserved and colliding names.
  pub fn assemble(
    user_source: &str,
    aux_files: &[AuxFile],
    harness_text: &str,
  ) -> Result<Self, HostError> {
    let mut files = vec![
      VirtualFile::new(
        format!("{}.ts", USER_FILE),
        user_source,
        FileKind::Source,
      ),
      VirtualFile::new(
        format!("{}.ts", HARNESS_FILE),
        harness_text,
        FileKind::Source,
      ),
    ];

    let mut seen: HashMap<String, String> = HashMap::new();
    for aux in aux_files {
      let stripped = strip_extension(&aux.name);
      if stripped == USER_FILE || stripped == HARNESS_FILE {
        return Err(HostError::ReservedFileName(aux.name.clone()));
      }
      if let Some(prev) = seen.insert(stripped.to_string(), aux.name.clone()) {
        return Err(HostError::FileCollision(prev, aux.name.clone()));
      }
      let kind = if aux.is_declaration() {
        FileKind::Declaration
      } else {
        FileKind::Source
      };
      files.push(VirtualFile::new(aux.name.clone(), aux.text.clone(), kind));
    }

    Ok(Self {
      files,
      outputs: Vec::new(),
    })
  }
}

impl CompilerHost for VirtualHost {
  fn input_files(&self) -> &[VirtualFile] {
    &self.files
  }

  fn read_file(&self, name: &str) -> Option<&str> {
    self
      .files
      .iter()
      .find(|f| f.stripped_name() == strip_extension(name))
      .map(|f| f.text.as_str())
  }

  fn write_file(&mut self, name: &str, text: &str) {
    self.outputs.push((name.to_string(), text.to_string()));
  }
}

/// Everything retained from a clean compilation.
#[derive(Clone, Debug)]
pub struct CompilationArtifacts {
  /// Emitted module text by stripped name; exactly one entry per
  /// non-declaration source.
  pub js_by_name: HashMap<String, String>,
  /// Original source text by stripped name.
  pub ts_by_name: HashMap<String, String>,
  /// Maps positions in the emitted user module back to the user's source.
  pub user_source_map: Arc<SourceMapConsumer>,
}

/// Splits off fileless diagnostics, which are never surfaced to the user:
/// codes on the allow-list are dropped, anything else is an embedder bug.
pub(crate) fn partition_global_diagnostics(
  diagnostics: Vec<Diagnostic>,
  benign_codes: &[u32],
) -> Result<Vec<Diagnostic>, HostError> {
  let mut sourced = Vec::with_capacity(diagnostics.len());
  for diagnostic in diagnostics {
    if diagnostic.file.is_some() {
      sourced.push(diagnostic);
      continue;
    }
    if benign_codes.contains(&diagnostic.code) {
      debug!("dropping benign global diagnostic TS{}", diagnostic.code);
      continue;
    }
    return Err(HostError::GlobalDiagnostic {
      code: diagnostic.code,
      message: root_message(&diagnostic.message),
    });
  }
  Ok(sourced)
}

fn root_message(message: &MessageText) -> String {
  match message {
    MessageText::Simple(text) => text.clone(),
    MessageText::Chain(chain) => chain.message_text.clone(),
  }
}

/// Partitions the emitted outputs and builds the user file's source-map
/// consumer. Called only after a clean type-check.
pub(crate) async fn collect_artifacts(
  host: &VirtualHost,
) -> Result<CompilationArtifacts, HostError> {
  let mut js_by_name = HashMap::new();
  let mut maps_by_name = HashMap::new();
  for (name, text) in &host.outputs {
    let stripped = strip_extension(name).to_string();
    if name.ends_with(SOURCE_MAP_SUFFIX) {
      maps_by_name.insert(stripped, text.clone());
    } else {
      js_by_name.insert(stripped, text.clone());
    }
  }

  for file in &host.files {
    match file.kind {
      FileKind::Source => {
        if !js_by_name.contains_key(file.stripped_name()) {
          return Err(HostError::MissingEmit(file.name.clone()));
        }
      }
      _ => {
        if js_by_name.contains_key(file.stripped_name()) {
          return Err(HostError::UnexpectedEmit(file.name.clone()));
        }
      }
    }
  }
  let sources: Vec<&str> = host.files.iter().map(|f| f.stripped_name()).collect();
  if let Some(orphan) = js_by_name.keys().find(|k| !sources.contains(&k.as_str())) {
    return Err(HostError::UnexpectedEmit(orphan.clone()));
  }

  let map_json = maps_by_name
    .remove(USER_FILE)
    .ok_or_else(|| HostError::MissingSourceMap(USER_FILE.to_string()))?;
  let user_source_map = SourceMapConsumer::decode(USER_FILE.to_string(), map_json)
    .await
    .map_err(|_| HostError::SourceMapDecode(USER_FILE.to_string()))?;

  let ts_by_name = host
    .files
    .iter()
    .map(|f| (f.stripped_name().to_string(), f.text.clone()))
    .collect();

  debug!("collected {} emitted modules", js_by_name.len());
  Ok(CompilationArtifacts {
    js_by_name,
    ts_by_name,
    user_source_map: Arc::new(user_source_map),
  })
}
