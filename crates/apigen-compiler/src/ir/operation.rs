//! Operation descriptors produced by the controller extractor.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::schema::{ObjectSchema, SchemaNode};
use crate::decl::{HttpVerb, ResponseStatus};

/// Where a parameter's value comes from at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    Path,
    Query,
    Header,
    /// The whole request body.
    Body,
    /// One named field of an object body.
    ImplicitBodyField,
    /// The raw server request; never validated.
    RequestContext,
    /// Supplied by the host; never validated.
    Injected,
}

impl BindingSource {
    /// Sources whose raw values arrive as text and need coercion.
    pub fn is_text(&self) -> bool {
        matches!(self, BindingSource::Path | BindingSource::Query | BindingSource::Header)
    }

    /// Whether the validator processes this parameter at all.
    pub fn is_validated(&self) -> bool {
        !matches!(self, BindingSource::RequestContext | BindingSource::Injected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingSource::Path => "path",
            BindingSource::Query => "query",
            BindingSource::Header => "header",
            BindingSource::Body => "body",
            BindingSource::ImplicitBodyField => "body",
            BindingSource::RequestContext => "request",
            BindingSource::Injected => "injected",
        }
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bound method parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    /// Name of the parameter in the method signature.
    pub name: String,
    /// Name on the wire (path placeholder, query key, header, body field).
    pub wire_name: String,
    pub source: BindingSource,
    /// Absent for request-context and injected parameters.
    pub schema: Option<SchemaNode>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A documented response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDescriptor {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

/// One alternative security requirement. Every scheme listed must be satisfied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SecurityRequirement {
    pub schemes: IndexMap<String, Vec<String>>,
}

impl SecurityRequirement {
    pub fn single(scheme: impl Into<String>, scopes: Vec<String>) -> Self {
        let mut schemes = IndexMap::new();
        schemes.insert(scheme.into(), scopes);
        Self { schemes }
    }

    /// Merges another requirement into this one; scopes are unioned per scheme.
    pub fn merge(&mut self, other: &SecurityRequirement) {
        for (scheme, scopes) in &other.schemes {
            let entry = self.schemes.entry(scheme.clone()).or_default();
            for scope in scopes {
                if !entry.contains(scope) {
                    entry.push(scope.clone());
                }
            }
        }
    }
}

/// A fully extracted HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    /// Controller class name.
    pub controller: String,
    /// Method name.
    pub method: String,
    pub verb: HttpVerb,
    /// Full normalized template, e.g. `/users/{id}`.
    pub path: String,
    /// Normalized controller prefix, e.g. `/users`.
    pub prefix: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterDescriptor>,
    /// Success payload; `None` when the method returns nothing.
    pub returns: Option<SchemaNode>,
    pub success_status: u16,
    pub responses: IndexMap<ResponseStatus, ResponseDescriptor>,
    /// Alternatives: satisfying any one requirement is enough. Empty means public.
    pub security: Vec<SecurityRequirement>,
    pub tags: Vec<String>,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
    pub hidden: bool,
    /// Object schema assembled from the implicit body fields, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit_body: Option<ObjectSchema>,
}

impl Operation {
    /// `Controller.method`, used in diagnostics.
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.controller, self.method)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn body_parameter(&self) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.source == BindingSource::Body)
    }
}
