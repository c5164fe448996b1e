//! Source location tracking.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// A span in the source code.
///
/// Lines and columns are zero-based, as reported by tree-sitter. `Display`
/// renders them one-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub file: PathBuf,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(file: PathBuf, start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            file,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A span for declarations that were built in memory rather than parsed.
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn is_synthetic(&self) -> bool {
        self.file.as_os_str().is_empty()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            return f.write_str("<memory>");
        }
        write!(
            f,
            "{}:{}:{}",
            self.file.display(),
            self.start_line + 1,
            self.start_col + 1
        )
    }
}
