//! Explicit annotation records attached to controllers, methods and parameters.
//!
//! Frontends translate whatever their language uses (decorators, attributes,
//! comments) into these records. The controller extractor consumes only this
//! model.

use std::fmt;

use serde::{Serialize, Serializer};

use super::{DeclId, FormatHint, Initializer, TypeExpr};
use crate::diagnostic::Span;

/// HTTP verbs a route method can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpVerb {
    /// Parse a verb from its decorator name (e.g. "Get").
    pub fn from_decorator(name: &str) -> Option<Self> {
        match name {
            "Get" => Some(HttpVerb::Get),
            "Post" => Some(HttpVerb::Post),
            "Put" => Some(HttpVerb::Put),
            "Patch" => Some(HttpVerb::Patch),
            "Delete" => Some(HttpVerb::Delete),
            "Head" => Some(HttpVerb::Head),
            "Options" => Some(HttpVerb::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response status key: a concrete code or the documented fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResponseStatus {
    Code(u16),
    Default,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Code(code) => write!(f, "{}", code),
            ResponseStatus::Default => f.write_str("default"),
        }
    }
}

impl Serialize for ResponseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where an annotation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationTarget {
    Controller,
    Method,
    Parameter,
}

impl AnnotationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationTarget::Controller => "controller class",
            AnnotationTarget::Method => "method",
            AnnotationTarget::Parameter => "parameter",
        }
    }
}

/// A recognized annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// `@Route("users")` - controller path prefix.
    Route(String),
    /// `@Get("{id}")` and friends.
    Verb { verb: HttpVerb, path: String },
    /// `@Path("id")` - the optional argument overrides the wire name.
    Path(Option<String>),
    Query(Option<String>),
    Header(Option<String>),
    Body,
    BodyProp(Option<String>),
    /// `@Request()` - raw server request object.
    Request,
    /// `@Inject()` - supplied by the host, never by the caller.
    Inject,
    /// One alternative security requirement: every listed scheme is required.
    Security(Vec<(String, Vec<String>)>),
    NoSecurity,
    Response {
        status: ResponseStatus,
        description: Option<String>,
        schema: Option<TypeExpr>,
    },
    SuccessResponse {
        status: u16,
        description: Option<String>,
    },
    Tags(Vec<String>),
    OperationId(String),
    Hidden,
    Deprecated,
}

impl Annotation {
    /// The decorator name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Annotation::Route(_) => "Route",
            Annotation::Verb { verb, .. } => match verb {
                HttpVerb::Get => "Get",
                HttpVerb::Post => "Post",
                HttpVerb::Put => "Put",
                HttpVerb::Patch => "Patch",
                HttpVerb::Delete => "Delete",
                HttpVerb::Head => "Head",
                HttpVerb::Options => "Options",
            },
            Annotation::Path(_) => "Path",
            Annotation::Query(_) => "Query",
            Annotation::Header(_) => "Header",
            Annotation::Body => "Body",
            Annotation::BodyProp(_) => "BodyProp",
            Annotation::Request => "Request",
            Annotation::Inject => "Inject",
            Annotation::Security(_) => "Security",
            Annotation::NoSecurity => "NoSecurity",
            Annotation::Response { .. } => "Response",
            Annotation::SuccessResponse { .. } => "SuccessResponse",
            Annotation::Tags(_) => "Tags",
            Annotation::OperationId(_) => "OperationId",
            Annotation::Hidden => "Hidden",
            Annotation::Deprecated => "Deprecated",
        }
    }

    /// Whether this annotation may appear on the given construct.
    pub fn allowed_on(&self, target: AnnotationTarget) -> bool {
        use AnnotationTarget::*;
        match self {
            Annotation::Route(_) => target == Controller,
            Annotation::Verb { .. }
            | Annotation::SuccessResponse { .. }
            | Annotation::OperationId(_) => target == Method,
            Annotation::Path(_)
            | Annotation::Query(_)
            | Annotation::Header(_)
            | Annotation::Body
            | Annotation::BodyProp(_)
            | Annotation::Request
            | Annotation::Inject => target == Parameter,
            Annotation::Security(_)
            | Annotation::NoSecurity
            | Annotation::Response { .. }
            | Annotation::Tags(_)
            | Annotation::Hidden
            | Annotation::Deprecated => target == Controller || target == Method,
        }
    }

    /// True for annotations that choose a parameter's binding source.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            Annotation::Path(_)
                | Annotation::Query(_)
                | Annotation::Header(_)
                | Annotation::Body
                | Annotation::BodyProp(_)
                | Annotation::Request
                | Annotation::Inject
        )
    }
}

/// An annotation plus where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUse {
    pub annotation: Annotation,
    pub span: Span,
}

impl AnnotationUse {
    pub fn new(annotation: Annotation) -> Self {
        Self {
            annotation,
            span: Span::synthetic(),
        }
    }
}

impl From<Annotation> for AnnotationUse {
    fn from(annotation: Annotation) -> Self {
        Self::new(annotation)
    }
}

/// An annotated controller class.
#[derive(Debug, Clone)]
pub struct ControllerDecl {
    pub id: DeclId,
    pub annotations: Vec<AnnotationUse>,
    pub methods: Vec<MethodDecl>,
    pub description: Option<String>,
    pub span: Span,
}

impl ControllerDecl {
    pub fn new(id: DeclId) -> Self {
        Self {
            id,
            annotations: Vec::new(),
            methods: Vec::new(),
            description: None,
            span: Span::synthetic(),
        }
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

/// A method of a controller class.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub annotations: Vec<AnnotationUse>,
    pub parameters: Vec<ParameterDecl>,
    /// Declared return type; `None` when the source omits it.
    pub return_type: Option<TypeExpr>,
    pub description: Option<String>,
    pub span: Span,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, return_type: TypeExpr) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            parameters: Vec::new(),
            return_type: Some(return_type),
            description: None,
            span: Span::synthetic(),
        }
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn param(mut self, parameter: ParameterDecl) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// A parameter of a controller method.
#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub optional: bool,
    pub default: Option<Initializer>,
    pub annotations: Vec<AnnotationUse>,
    pub description: Option<String>,
    pub format: Option<FormatHint>,
    pub span: Span,
}

impl ParameterDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            optional: false,
            default: None,
            annotations: Vec::new(),
            description: None,
            format: None,
            span: Span::synthetic(),
        }
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(Initializer::from_value(value));
        self
    }

    pub fn with_format(mut self, format: FormatHint) -> Self {
        self.format = Some(format);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_round_trip_names() {
        for name in ["Get", "Post", "Put", "Patch", "Delete", "Head", "Options"] {
            let verb = HttpVerb::from_decorator(name).unwrap();
            let annotation = Annotation::Verb { verb, path: String::new() };
            assert_eq!(annotation.name(), name);
        }
        assert_eq!(HttpVerb::from_decorator("Fetch"), None);
    }

    #[test]
    fn test_annotation_placement_rules() {
        assert!(Annotation::Route("users".into()).allowed_on(AnnotationTarget::Controller));
        assert!(!Annotation::Route("users".into()).allowed_on(AnnotationTarget::Method));
        assert!(!Annotation::Query(None).allowed_on(AnnotationTarget::Method));
        assert!(Annotation::Tags(vec![]).allowed_on(AnnotationTarget::Controller));
        assert!(Annotation::Tags(vec![]).allowed_on(AnnotationTarget::Method));
        assert!(!Annotation::Hidden.allowed_on(AnnotationTarget::Parameter));
    }

    #[test]
    fn test_response_status_display() {
        assert_eq!(ResponseStatus::Code(404).to_string(), "404");
        assert_eq!(ResponseStatus::Default.to_string(), "default");
        assert_eq!(serde_json::to_string(&ResponseStatus::Code(201)).unwrap(), "\"201\"");
    }
}
