//! Language-agnostic declaration graph.
//!
//! Frontends turn source files into [`Declaration`]s (data-model types) and
//! [`ControllerDecl`]s (annotated route classes). The resolver and extractor
//! only ever see these records, never a live compiler or runtime object.

mod annotation;
mod graph;

pub use annotation::{
    Annotation, AnnotationTarget, AnnotationUse, ControllerDecl, HttpVerb, MethodDecl,
    ParameterDecl, ResponseStatus,
};
pub use graph::{DeclarationGraph, DeclarationSource};

use std::fmt;

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::diagnostic::Span;

/// Stable identity of a declaration: the module it lives in plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId {
    /// Module path relative to the source root, without extension (e.g. "models/user").
    pub module: String,
    pub name: String,
}

impl DeclId {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}::{}", self.module, self.name)
        }
    }
}

/// A declaration identity together with its concrete type arguments.
///
/// Two references are equal iff the identity and the fully substituted
/// argument lists are equal. This is the deduplication key of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclRef {
    pub id: DeclId,
    pub args: Vec<TypeExpr>,
}

impl fmt::Display for DeclRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

/// Built-in keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    String,
    Number,
    Boolean,
    Any,
    Unknown,
    Void,
    Undefined,
    Null,
    Never,
    Object,
    BigInt,
    Symbol,
}

impl Keyword {
    /// Parse a keyword from its source spelling.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Keyword::String),
            "number" => Some(Keyword::Number),
            "boolean" => Some(Keyword::Boolean),
            "any" => Some(Keyword::Any),
            "unknown" => Some(Keyword::Unknown),
            "void" => Some(Keyword::Void),
            "undefined" => Some(Keyword::Undefined),
            "null" => Some(Keyword::Null),
            "never" => Some(Keyword::Never),
            "object" => Some(Keyword::Object),
            "bigint" => Some(Keyword::BigInt),
            "symbol" => Some(Keyword::Symbol),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::Boolean => "boolean",
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Void => "void",
            Keyword::Undefined => "undefined",
            Keyword::Null => "null",
            Keyword::Never => "never",
            Keyword::Object => "object",
            Keyword::BigInt => "bigint",
            Keyword::Symbol => "symbol",
        }
    }
}

/// A literal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    String(String),
    Number(OrderedFloat<f64>),
    Boolean(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A reference to a named type as written at a use site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    /// Module the frontend bound this name to, if it could. `None` means the
    /// name is looked up among built-ins and then globally.
    pub module: Option<String>,
    pub args: Vec<TypeExpr>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
            args: Vec::new(),
        }
    }

    pub fn in_module(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: Some(module.into()),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<TypeExpr>) -> Self {
        self.args = args;
        self
    }
}

/// A type expression in a declaration or signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Keyword(Keyword),
    Literal(Literal),
    /// T[]
    Array(Box<TypeExpr>),
    /// T | U
    Union(Vec<TypeExpr>),
    /// T & U
    Intersection(Vec<TypeExpr>),
    /// { a: T; [key: string]: U }
    Object(ObjectShape),
    /// Named type, possibly generic.
    Ref(TypeRef),
    /// A type parameter of the enclosing declaration.
    Param(String),
    /// A construct the frontend recognized but that has no schema
    /// representation (tuples, functions, conditional types...).
    Unsupported(String),
}

impl TypeExpr {
    pub fn keyword(k: Keyword) -> Self {
        TypeExpr::Keyword(k)
    }

    pub fn string_literal(s: impl Into<String>) -> Self {
        TypeExpr::Literal(Literal::String(s.into()))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeExpr::Ref(TypeRef::named(name))
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }

    /// True for `undefined` (and `void`, which behaves the same in a union).
    pub fn is_undefined(&self) -> bool {
        matches!(self, TypeExpr::Keyword(Keyword::Undefined | Keyword::Void))
    }

    /// Replaces type parameters using `lookup`. Parameters the lookup does
    /// not know are left untouched.
    pub fn substitute(&self, lookup: &dyn Fn(&str) -> Option<TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::Param(name) => lookup(name).unwrap_or_else(|| self.clone()),
            TypeExpr::Array(inner) => TypeExpr::Array(Box::new(inner.substitute(lookup))),
            TypeExpr::Union(members) => {
                TypeExpr::Union(members.iter().map(|m| m.substitute(lookup)).collect())
            }
            TypeExpr::Intersection(members) => {
                TypeExpr::Intersection(members.iter().map(|m| m.substitute(lookup)).collect())
            }
            TypeExpr::Object(shape) => TypeExpr::Object(shape.substitute(lookup)),
            TypeExpr::Ref(r) => TypeExpr::Ref(TypeRef {
                name: r.name.clone(),
                module: r.module.clone(),
                args: r.args.iter().map(|a| a.substitute(lookup)).collect(),
            }),
            TypeExpr::Keyword(_) | TypeExpr::Literal(_) | TypeExpr::Unsupported(_) => self.clone(),
        }
    }

    /// Returns the first type parameter still present in the expression.
    pub fn first_param(&self) -> Option<&str> {
        match self {
            TypeExpr::Param(name) => Some(name),
            TypeExpr::Array(inner) => inner.first_param(),
            TypeExpr::Union(members) | TypeExpr::Intersection(members) => {
                members.iter().find_map(|m| m.first_param())
            }
            TypeExpr::Object(shape) => shape
                .properties
                .iter()
                .find_map(|p| p.ty.first_param())
                .or_else(|| shape.index.iter().find_map(|i| i.value.first_param())),
            TypeExpr::Ref(r) => r.args.iter().find_map(|a| a.first_param()),
            TypeExpr::Keyword(_) | TypeExpr::Literal(_) | TypeExpr::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Keyword(k) => f.write_str(k.as_str()),
            TypeExpr::Literal(l) => write!(f, "{}", l),
            TypeExpr::Array(inner) => write!(f, "{}[]", inner),
            TypeExpr::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                f.write_str(&parts.join(" | "))
            }
            TypeExpr::Intersection(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                f.write_str(&parts.join(" & "))
            }
            TypeExpr::Object(shape) => {
                let parts: Vec<String> = shape
                    .properties
                    .iter()
                    .map(|p| format!("{}{}: {}", p.name, if p.optional { "?" } else { "" }, p.ty))
                    .collect();
                write!(f, "{{ {} }}", parts.join("; "))
            }
            TypeExpr::Ref(r) => {
                f.write_str(&r.name)?;
                if !r.args.is_empty() {
                    let args: Vec<String> = r.args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            TypeExpr::Param(name) => f.write_str(name),
            TypeExpr::Unsupported(what) => write!(f, "<{}>", what),
        }
    }
}

/// Format hints that refine a declared type (from JSDoc tags such as `@isInt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatHint {
    Integer,
    Float,
    Date,
    DateTime,
}

impl FormatHint {
    /// Maps a JSDoc tag name to a format hint.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "isInt" | "isLong" => Some(FormatHint::Integer),
            "isFloat" | "isDouble" => Some(FormatHint::Float),
            "isDate" => Some(FormatHint::Date),
            "isDateTime" => Some(FormatHint::DateTime),
            _ => None,
        }
    }
}

/// An initializer or declared default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initializer {
    /// Raw source text.
    pub text: String,
    /// The value, when the text is a JSON-compatible literal.
    pub value: Option<serde_json::Value>,
}

impl Initializer {
    pub fn from_value(value: serde_json::Value) -> Self {
        Self {
            text: value.to_string(),
            value: Some(value),
        }
    }
}

/// A property of an object-like declaration or inline object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub optional: bool,
    pub default: Option<Initializer>,
    pub description: Option<String>,
    pub format: Option<FormatHint>,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
            description: None,
            format: None,
        }
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

/// `[key: K]: V`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSignature {
    pub key_name: String,
    pub key: TypeExpr,
    pub value: TypeExpr,
}

/// Members of an object-like type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectShape {
    pub properties: Vec<PropertyDecl>,
    pub index: Vec<IndexSignature>,
}

impl ObjectShape {
    pub fn new(properties: Vec<PropertyDecl>) -> Self {
        Self {
            properties,
            index: Vec::new(),
        }
    }

    fn substitute(&self, lookup: &dyn Fn(&str) -> Option<TypeExpr>) -> ObjectShape {
        ObjectShape {
            properties: self
                .properties
                .iter()
                .map(|p| PropertyDecl {
                    ty: p.ty.substitute(lookup),
                    ..p.clone()
                })
                .collect(),
            index: self
                .index
                .iter()
                .map(|i| IndexSignature {
                    key_name: i.key_name.clone(),
                    key: i.key.substitute(lookup),
                    value: i.value.substitute(lookup),
                })
                .collect(),
        }
    }
}

/// A generic type parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub default: Option<TypeExpr>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }
}

/// A member of an enum declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: Literal,
}

/// What kind of declaration this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// An interface or a data class.
    Object {
        bases: Vec<TypeRef>,
        shape: ObjectShape,
        is_class: bool,
    },
    /// `type Name = ...`
    Alias(TypeExpr),
    /// `enum Name { ... }`
    Enum(Vec<EnumMember>),
}

/// A named type declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclKind,
    pub type_params: Vec<TypeParam>,
    pub description: Option<String>,
    pub span: Span,
}

impl Declaration {
    /// Creates an interface declaration.
    pub fn interface(id: DeclId, properties: Vec<PropertyDecl>) -> Self {
        Self {
            id,
            kind: DeclKind::Object {
                bases: Vec::new(),
                shape: ObjectShape::new(properties),
                is_class: false,
            },
            type_params: Vec::new(),
            description: None,
            span: Span::synthetic(),
        }
    }

    /// Creates a type alias declaration.
    pub fn alias(id: DeclId, target: TypeExpr) -> Self {
        Self {
            id,
            kind: DeclKind::Alias(target),
            type_params: Vec::new(),
            description: None,
            span: Span::synthetic(),
        }
    }

    /// Creates an enum declaration.
    pub fn enumeration(id: DeclId, members: Vec<EnumMember>) -> Self {
        Self {
            id,
            kind: DeclKind::Enum(members),
            type_params: Vec::new(),
            description: None,
            span: Span::synthetic(),
        }
    }

    pub fn with_bases(mut self, new_bases: Vec<TypeRef>) -> Self {
        if let DeclKind::Object { bases, .. } = &mut self.kind {
            *bases = new_bases;
        }
        self
    }

    pub fn with_type_params(mut self, params: Vec<TypeParam>) -> Self {
        self.type_params = params;
        self
    }

    pub fn with_index(mut self, signature: IndexSignature) -> Self {
        if let DeclKind::Object { shape, .. } = &mut self.kind {
            shape.index.push(signature);
        }
        self
    }

    /// Declared members (own properties only, not inherited ones).
    pub fn members(&self) -> &[PropertyDecl] {
        match &self.kind {
            DeclKind::Object { shape, .. } => &shape.properties,
            _ => &[],
        }
    }

    /// Declared base types.
    pub fn bases(&self) -> &[TypeRef] {
        match &self.kind {
            DeclKind::Object { bases, .. } => bases,
            _ => &[],
        }
    }
}
