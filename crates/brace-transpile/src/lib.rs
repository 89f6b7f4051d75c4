//! Conversion of syntax trees into a brace-delimited, statically typed dialect.
//!
//! The [`Pipeline`] runs a fixed sequence of stages over a validated
//! [`SyntaxTree`](brace_syntax::SyntaxTree):
//!
//! 1. `BeforeInference` plugin hooks may rewrite nodes,
//! 2. optional constant folding ([`fold`]),
//! 3. heuristic type inference ([`infer`]),
//! 4. rendering through the [`MappingTable`] and the render hooks ([`render`]).
//!
//! Results are cached by a BLAKE3 fingerprint of the input, the [`Config`]
//! and the plugin set. Anything that cannot be translated exactly is reported
//! as a [`Diagnostic`]; only malformed input or configuration is an error.
//!
//! # Example
//!
//! ```ignore
//! use brace_transpile::{Config, Pipeline, PluginChain};
//!
//! let pipeline = Pipeline::new(Config::default(), PluginChain::empty())?;
//! let out = pipeline.convert_source("x = 1\n", &brace_syntax::PYTHON_READER)?;
//! assert!(out.text.contains("int x = 1;"));
//! ```

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fold;
pub mod infer;
pub mod mapping;
pub mod pipeline;
pub mod plugin;
pub mod render;
pub mod types;

pub use cache::{CacheEntry, CacheStats, ContextKey, ConversionCache, Fingerprint};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{CacheFileError, ConvertError};
pub use infer::{Binding, Scope, ScopeId, ScopeKind, TypeTable};
pub use mapping::{ConstructKey, MappingEntry, MappingTable, OperandKind, Selector, Template};
pub use pipeline::{Conversion, Pipeline};
pub use plugin::{
    ExtensionPoint, HookContext, HookOutcome, Plugin, PluginChain, PluginChainBuilder,
    PluginError, PluginInfo,
};
pub use render::{BlockKind, ScopeState};
pub use types::{InferredType, ReturnType};
