//! Language frontends for loading source code into a declaration graph.
//!
//! Each frontend is responsible for:
//! 1. Parsing source files in its language
//! 2. Translating declarations and annotations into the [`decl`](crate::decl) model
//!
//! The resolver and extractor only see the resulting graph, so new source
//! languages plug in here without touching them.

pub mod typescript;

use std::path::Path;

use crate::decl::DeclarationGraph;
use crate::diagnostic::CompilerError;

/// Trait for language frontends.
pub trait Frontend {
    /// Returns the language name (e.g., "typescript").
    fn language(&self) -> &str;

    /// Returns file extensions this frontend handles (e.g., ["ts"]).
    fn extensions(&self) -> &[&str];

    /// Parses all source files under `dir`. Module ids are paths relative to
    /// `dir` without extension.
    fn parse_directory(&mut self, dir: &Path) -> Result<DeclarationGraph, CompilerError>;

    /// Parses in-memory sources given as `(module id, text)` pairs.
    fn parse_sources(&mut self, sources: &[(&str, &str)]) -> Result<DeclarationGraph, CompilerError>;

    /// Parses a single in-memory source.
    fn parse_source(&mut self, module: &str, source: &str) -> Result<DeclarationGraph, CompilerError> {
        self.parse_sources(&[(module, source)])
    }
}

/// Creates a frontend for the given language.
pub fn create_frontend(language: &str) -> Result<Box<dyn Frontend>, CompilerError> {
    match language {
        "typescript" | "ts" => Ok(Box::new(typescript::TypeScriptFrontend::new()?)),
        _ => Err(CompilerError::UnsupportedLanguage {
            language: language.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_frontend() {
        assert_eq!(create_frontend("ts").unwrap().language(), "typescript");
        assert!(matches!(
            create_frontend("cobol"),
            Err(CompilerError::UnsupportedLanguage { .. })
        ));
    }
}
