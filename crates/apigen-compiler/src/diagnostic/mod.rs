//! Diagnostic types for fatal generation errors and source locations.

mod error;
mod span;

pub use error::CompilerError;
pub use span::Span;
