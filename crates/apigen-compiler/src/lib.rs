//! # Apigen Compiler
//!
//! This crate turns annotated HTTP controllers and the data types they use
//! into a frozen, language-neutral API description, and validates incoming
//! requests against it. Source languages plug in through a frontend
//! architecture.
//!
//! ## Supported Languages
//!
//! - TypeScript (default)
//!
//! ## Architecture
//!
//! ```text
//! Source Code (TS, etc.)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  Language-specific parsing
//! │ (TS → decl)  │
//! └──────┬───────┘
//!        │  Declaration graph
//!        ▼
//! ┌──────────────┐
//! │   Extract    │  Controllers → operations, resolving every
//! │  + Resolve   │  referenced type into the schema registry
//! └──────┬───────┘
//!        │  ApiIR (frozen, Send + Sync)
//!        ▼
//! ┌──────────────┐
//! │   Validate   │  Raw request → typed arguments or field errors
//! │  (per call)  │
//! └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apigen_compiler::{Compiler, CompilerConfig, HttpVerb, RawRequest};
//!
//! let compiler = Compiler::new(CompilerConfig {
//!     source_dir: "src".into(),
//!     ..CompilerConfig::default()
//! });
//! let api = compiler.compile()?;
//!
//! let op = api.operation(HttpVerb::Get, "/users/{id}").unwrap();
//! let outcome = api.validate(op, &RawRequest::new().with_path_param("id", "7"), &compiler.config().validation);
//! ```

pub mod config;
pub mod decl;
pub mod diagnostic;
pub mod extract;
pub mod frontend;
pub mod ir;
pub mod resolve;
pub mod validate;

pub use config::{CompilerConfig, ExtrasPolicy, SecurityCombination, ValidationConfig};
pub use decl::{DeclarationGraph, DeclarationSource, HttpVerb};
pub use diagnostic::{CompilerError, Span};
pub use extract::ControllerExtractor;
pub use ir::{ApiIR, Operation, SchemaNode};
pub use validate::{FieldErrors, RawRequest, TypedValue, ValidationOutcome};

/// The main compiler struct that orchestrates the generation pipeline.
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    /// Creates a new compiler with the given configuration.
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Runs the full pipeline over the configured source directory:
    /// 1. Create frontend for the configured language
    /// 2. Parse source files into a declaration graph
    /// 3. Extract operations and resolve their schemas
    pub fn compile(&self) -> Result<ApiIR, CompilerError> {
        let mut frontend = frontend::create_frontend(&self.config.language)?;
        let graph = frontend.parse_directory(&self.config.source_dir)?;
        self.build_ir(&graph)
    }

    /// Like [`compile`](Self::compile), for `(module id, text)` pairs held in memory.
    pub fn compile_sources(&self, sources: &[(&str, &str)]) -> Result<ApiIR, CompilerError> {
        let mut frontend = frontend::create_frontend(&self.config.language)?;
        let graph = frontend.parse_sources(sources)?;
        self.build_ir(&graph)
    }

    /// Builds the IR from any declaration source. All-or-nothing: the first
    /// fatal error aborts the run.
    pub fn build_ir(&self, source: &dyn DeclarationSource) -> Result<ApiIR, CompilerError> {
        let api = ControllerExtractor::new(source, self.config.security).extract()?;

        tracing::info!(
            controllers = source.controllers().len(),
            operations = api.operations.len(),
            definitions = api.definitions.len(),
            "api metadata generated"
        );
        Ok(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_sources() {
        let compiler = Compiler::new(CompilerConfig::default());
        let api = compiler
            .compile_sources(&[(
                "controllers/ping",
                r#"
@Route("ping")
export class PingController {
    @Get()
    public ping(): string { return "pong"; }
}
"#,
            )])
            .unwrap();

        assert_eq!(api.operations.len(), 1);
        assert_eq!(api.operations[0].path, "/ping");
    }

    #[test]
    fn test_unsupported_language() {
        let compiler = Compiler::new(CompilerConfig {
            language: "cobol".into(),
            ..CompilerConfig::default()
        });
        assert!(matches!(compiler.compile(), Err(CompilerError::UnsupportedLanguage { .. })));
    }
}
