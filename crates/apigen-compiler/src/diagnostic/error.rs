//! Compiler error types.
//!
//! Everything in here is fatal: a generation run that hits one of these
//! produces no IR at all. Request-time problems live in
//! [`crate::validate::FieldErrors`] instead.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use super::Span;

/// Errors that can occur during compilation.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompilerError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read file '{path}': {message}")]
    #[diagnostic(code(apigen::io::read_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(apigen::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(apigen::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    #[error("Syntax error at {location}: {message}")]
    #[diagnostic(code(apigen::parse::syntax_error))]
    SyntaxError {
        message: String,
        location: Span,
    },

    // =========================================================================
    // Type Resolution Errors
    // =========================================================================
    #[error("Unsupported type alias '{decl}' at {location}")]
    #[diagnostic(
        code(apigen::types::unsupported_alias),
        help("Type aliases are only supported as unions of string literals, e.g. type Status = 'open' | 'closed'. Use an interface for object shapes.")
    )]
    UnsupportedTypeAlias {
        decl: String,
        location: Span,
    },

    #[error("Unsupported type construct in '{decl}': {construct}")]
    #[diagnostic(
        code(apigen::types::unsupported_construct),
        help("Only primitives, arrays, literal unions, enums, interfaces, classes, intersections and simple index signatures can be described")
    )]
    UnsupportedConstruct {
        decl: String,
        construct: String,
        location: Span,
    },

    #[error("Cannot resolve type reference '{name}' used in '{decl}'")]
    #[diagnostic(code(apigen::types::unknown_reference))]
    UnresolvableReference {
        name: String,
        decl: String,
        location: Span,
    },

    #[error("Type reference '{name}' is ambiguous: declared in {}", candidates.join(", "))]
    #[diagnostic(
        code(apigen::types::ambiguous_reference),
        help("Import the declaration explicitly so the reference can be tied to one module")
    )]
    AmbiguousReference {
        name: String,
        candidates: Vec<String>,
        location: Span,
    },

    #[error("Type parameter '{param}' is not bound while resolving '{decl}'")]
    #[diagnostic(code(apigen::types::unbound_parameter))]
    UnboundTypeParameter {
        param: String,
        decl: String,
    },

    #[error("'{decl}' expects {expected} type argument(s) but got {found}")]
    #[diagnostic(code(apigen::types::arity_mismatch))]
    GenericArityMismatch {
        decl: String,
        expected: usize,
        found: usize,
    },

    #[error("Schema name '{name}' is claimed by both '{first}' and '{second}'")]
    #[diagnostic(
        code(apigen::types::name_collision),
        help("Rename one of the declarations; schema documents index definitions by name only")
    )]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Schema reference '{name}' does not resolve to any registered definition")]
    #[diagnostic(code(apigen::types::dangling_reference))]
    DanglingReference {
        name: String,
    },

    #[error("Inheritance cycle detected: {}", cycle.join(" -> "))]
    #[diagnostic(code(apigen::types::inheritance_cycle))]
    InheritanceCycle {
        cycle: Vec<String>,
    },

    #[error("'{decl}' extends '{base}', which is not an interface or class")]
    #[diagnostic(code(apigen::types::invalid_base))]
    InvalidBaseType {
        decl: String,
        base: String,
    },

    // =========================================================================
    // Annotation Errors
    // =========================================================================
    #[error("Unrecognized annotation '@{name}' at {location}")]
    #[diagnostic(
        code(apigen::annotations::unrecognized),
        help("Unknown decorators are rejected so the generated schema never silently drops API surface")
    )]
    UnrecognizedAnnotation {
        name: String,
        location: Span,
    },

    #[error("Annotation '@{name}' cannot be placed on a {target} ({location})")]
    #[diagnostic(code(apigen::annotations::misplaced))]
    MisplacedAnnotation {
        name: String,
        target: String,
        location: Span,
    },

    #[error("Invalid arguments for '@{name}' at {location}: {message}")]
    #[diagnostic(code(apigen::annotations::invalid_arguments))]
    InvalidAnnotation {
        name: String,
        message: String,
        location: Span,
    },

    // =========================================================================
    // Controller Errors
    // =========================================================================
    #[error("Parameter '{parameter}' of {operation} has conflicting bindings: {message}")]
    #[diagnostic(code(apigen::controllers::conflicting_binding))]
    ConflictingBinding {
        operation: String,
        parameter: String,
        message: String,
        location: Span,
    },

    #[error("{operation} declares more than one request body")]
    #[diagnostic(
        code(apigen::controllers::duplicate_body),
        help("Use either a single @Body parameter or several @BodyProp/unannotated parameters, not both")
    )]
    DuplicateBody {
        operation: String,
        location: Span,
    },

    #[error("Path placeholder '{{{placeholder}}}' in {operation} has no matching parameter")]
    #[diagnostic(code(apigen::controllers::unbound_placeholder))]
    UnboundPathPlaceholder {
        operation: String,
        placeholder: String,
        location: Span,
    },

    #[error("Path parameter '{parameter}' of {operation} does not appear in the route '{path}'")]
    #[diagnostic(code(apigen::controllers::missing_placeholder))]
    MissingPathPlaceholder {
        operation: String,
        parameter: String,
        path: String,
        location: Span,
    },

    #[error("Path parameter '{parameter}' of {operation} cannot be optional")]
    #[diagnostic(code(apigen::controllers::optional_path_parameter))]
    OptionalPathParameter {
        operation: String,
        parameter: String,
        location: Span,
    },

    #[error("Missing type annotation for {what} at {location}")]
    #[diagnostic(
        code(apigen::controllers::missing_type),
        help("Every bound parameter and every route method needs an explicit type")
    )]
    MissingTypeAnnotation {
        what: String,
        location: Span,
    },

    #[error("Duplicate operation {verb} {path} (declared by {first} and {second})")]
    #[diagnostic(code(apigen::controllers::duplicate_operation))]
    DuplicateOperation {
        verb: String,
        path: String,
        first: String,
        second: String,
    },

    // =========================================================================
    // Frontend Errors
    // =========================================================================
    #[error("Unsupported language: {language}")]
    #[diagnostic(code(apigen::frontend::unsupported_language))]
    UnsupportedLanguage {
        language: String,
    },
}

impl CompilerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported-construct error.
    pub fn unsupported(decl: impl Into<String>, construct: impl Into<String>, location: Span) -> Self {
        Self::UnsupportedConstruct {
            decl: decl.into(),
            construct: construct.into(),
            location,
        }
    }
}
