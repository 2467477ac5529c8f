// Copyright 2026 the user-code runner authors. MIT license.

//! Interfaces to the two external collaborators of the runner — the UL
//! compiler and the sandboxing runtime — plus the data model shared between
//! them: raw diagnostics, byte spans, virtual files, and the evaluation
//! context through which ambient bindings are exchanged with evaluated
//! modules. No pipeline logic lives here.

mod compiler;
mod diagnostics;
pub mod error;
mod sandbox;

pub use crate::compiler::CallSignature;
pub use crate::compiler::Compiler;
pub use crate::compiler::CompilerHost;
pub use crate::compiler::CompilerOptions;
pub use crate::compiler::DeclarationShape;
pub use crate::compiler::FileKind;
pub use crate::compiler::LibKind;
pub use crate::compiler::ModuleKind;
pub use crate::compiler::Parameter;
pub use crate::compiler::Program;
pub use crate::compiler::ScriptTarget;
pub use crate::compiler::SourceUnit;
pub use crate::compiler::SymbolId;
pub use crate::compiler::TypeChecker;
pub use crate::compiler::VirtualFile;
pub use crate::compiler::strip_extension;
pub use crate::diagnostics::Diagnostic;
pub use crate::diagnostics::MessageChain;
pub use crate::diagnostics::MessageText;
pub use crate::diagnostics::Span;
pub use crate::error::AnyError;
pub use crate::sandbox::Binding;
pub use crate::sandbox::EvalContext;
pub use crate::sandbox::EvaluationFault;
pub use crate::sandbox::ModuleId;
pub use crate::sandbox::Sandbox;
pub use crate::sandbox::Value;
