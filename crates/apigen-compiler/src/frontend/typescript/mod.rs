//! TypeScript frontend.

pub mod ast;
pub mod parser;
pub mod to_decl;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Frontend;
use crate::decl::DeclarationGraph;
use crate::diagnostic::CompilerError;
use parser::TypeScriptParser;

/// TypeScript frontend implementation.
pub struct TypeScriptFrontend {
    parser: TypeScriptParser,
}

impl TypeScriptFrontend {
    /// Creates a new TypeScript frontend.
    pub fn new() -> Result<Self, CompilerError> {
        Ok(Self {
            parser: TypeScriptParser::new()?,
        })
    }
}

impl Frontend for TypeScriptFrontend {
    fn language(&self) -> &str {
        "typescript"
    }

    fn extensions(&self) -> &[&str] {
        &["ts"]
    }

    fn parse_directory(&mut self, dir: &Path) -> Result<DeclarationGraph, CompilerError> {
        if !dir.is_dir() {
            return Err(CompilerError::io(dir, "source directory does not exist"));
        }

        let mut parsed_files = Vec::new();

        // Sorted walk keeps discovery order, and so the output, stable.
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules")
        {
            let entry = entry.map_err(|e| CompilerError::io(dir, e.to_string()))?;
            let path = entry.path();
            if !path.is_file() || path.to_string_lossy().ends_with(".d.ts") {
                continue;
            }
            let Some(ext) = path.extension() else {
                continue;
            };
            if !self.extensions().contains(&ext.to_string_lossy().as_ref()) {
                continue;
            }

            let source = std::fs::read_to_string(path).map_err(|e| CompilerError::io(path, e.to_string()))?;
            let module = module_id(dir, path);
            tracing::debug!(path = %path.display(), module = %module, "parsing source file");
            parsed_files.push(self.parser.parse(&source, path, &module)?);
        }

        to_decl::build_graph(&parsed_files)
    }

    fn parse_sources(&mut self, sources: &[(&str, &str)]) -> Result<DeclarationGraph, CompilerError> {
        let mut parsed_files = Vec::with_capacity(sources.len());
        for (module, text) in sources {
            let path = PathBuf::from(format!("{}.ts", module));
            parsed_files.push(self.parser.parse(text, &path, module)?);
        }
        to_decl::build_graph(&parsed_files)
    }
}

/// `<root>/models/user.ts` -> `models/user`.
fn module_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
