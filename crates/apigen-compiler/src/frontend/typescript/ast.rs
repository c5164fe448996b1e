//! TypeScript-specific syntax records.
//!
//! The parser produces one [`ParsedFile`] per source file. Type expressions
//! are already lowered to [`TypeExpr`]; names inside them are bound to
//! modules later, once every file is known.

use std::path::PathBuf;

use serde_json::Value;

use crate::decl::{Declaration, FormatHint, Initializer, TypeExpr};
use crate::diagnostic::Span;

/// A parsed TypeScript file.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    /// Module id: path relative to the source root, without extension.
    pub module: String,
    pub imports: Vec<ImportDecl>,
    pub declarations: Vec<Declaration>,
    pub controllers: Vec<ControllerSyntax>,
    /// Decorators on members that cannot carry annotations.
    pub misplaced: Vec<MisplacedDecorators>,
}

impl ParsedFile {
    /// Whether the file declares a type with this name.
    pub fn declares(&self, name: &str) -> bool {
        self.declarations.iter().any(|d| d.id.name == name)
    }
}

/// An import declaration.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    pub span: Span,
}

/// An import specifier.
#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    /// Name exported by the source module.
    pub name: String,
    /// Local name, when renamed with `as`.
    pub alias: Option<String>,
}

impl ImportSpecifier {
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A decorator argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSyntax {
    /// A JSON-compatible literal (string, number, boolean, null, array, object).
    Literal(Value),
    /// Anything else, kept as source text for diagnostics.
    Expression(String),
}

/// A decorator as written: `@Name<TypeArgs>(args)`.
#[derive(Debug, Clone)]
pub struct DecoratorSyntax {
    pub name: String,
    pub type_args: Vec<TypeExpr>,
    pub args: Vec<ArgSyntax>,
    pub span: Span,
}

/// Decorators written on a class member that is not an operation: a field,
/// a constructor, or a non-public, static or accessor method.
#[derive(Debug, Clone)]
pub struct MisplacedDecorators {
    /// What the decorators were attached to, e.g. `"property"`.
    pub target: &'static str,
    pub decorators: Vec<DecoratorSyntax>,
}

/// A class carrying decorators, treated as a controller.
#[derive(Debug, Clone)]
pub struct ControllerSyntax {
    pub name: String,
    pub decorators: Vec<DecoratorSyntax>,
    pub methods: Vec<MethodSyntax>,
    pub doc: Option<JsDoc>,
    pub span: Span,
}

/// A public instance method of a controller class.
#[derive(Debug, Clone)]
pub struct MethodSyntax {
    pub name: String,
    pub decorators: Vec<DecoratorSyntax>,
    pub parameters: Vec<ParameterSyntax>,
    pub return_type: Option<TypeExpr>,
    pub doc: Option<JsDoc>,
    pub span: Span,
}

/// A parameter of a controller method.
#[derive(Debug, Clone)]
pub struct ParameterSyntax {
    pub name: String,
    pub decorators: Vec<DecoratorSyntax>,
    pub ty: Option<TypeExpr>,
    pub optional: bool,
    pub default: Option<Initializer>,
    pub span: Span,
}

/// A `/** ... */` comment split into free text and tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsDoc {
    pub description: Option<String>,
    pub tags: Vec<JsDocTag>,
}

/// `@name text`
#[derive(Debug, Clone, PartialEq)]
pub struct JsDocTag {
    pub name: String,
    pub text: String,
}

impl JsDoc {
    /// Parses the raw comment text, delimiters included.
    pub fn parse(comment: &str) -> Self {
        let body = comment
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        let mut description = Vec::new();
        let mut tags: Vec<JsDocTag> = Vec::new();

        for line in body.lines() {
            let line = line.trim().trim_start_matches('*').trim();
            if let Some(rest) = line.strip_prefix('@') {
                let (name, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                tags.push(JsDocTag {
                    name: name.to_string(),
                    text: text.trim().to_string(),
                });
            } else if let Some(tag) = tags.last_mut() {
                if !line.is_empty() {
                    if !tag.text.is_empty() {
                        tag.text.push(' ');
                    }
                    tag.text.push_str(line);
                }
            } else {
                description.push(line);
            }
        }

        let description = description.join("\n").trim().to_string();
        Self {
            description: (!description.is_empty()).then_some(description),
            tags,
        }
    }

    pub fn tag(&self, name: &str) -> Option<&JsDocTag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    /// The first format tag on a property (`@isInt`, `@isDate`...).
    pub fn format(&self) -> Option<FormatHint> {
        self.tags.iter().find_map(|t| FormatHint::from_tag(&t.name))
    }

    /// `@default <json>`; text that is not JSON is taken as a string.
    pub fn default_value(&self) -> Option<Initializer> {
        let text = self.tag("default")?.text.trim();
        if text.is_empty() {
            return None;
        }
        let value = serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
        Some(Initializer {
            text: text.to_string(),
            value: Some(value),
        })
    }

    /// `@param <name> <description>` on a method.
    pub fn param_description(&self, param: &str) -> Option<String> {
        self.tags
            .iter()
            .filter(|t| t.name == "param")
            .find_map(|t| {
                let (name, text) = t.text.split_once(char::is_whitespace).unwrap_or((&t.text, ""));
                let text = text.trim().trim_start_matches("- ").trim();
                (name == param && !text.is_empty()).then(|| text.to_string())
            })
    }

    /// A format tag naming a parameter on a method, e.g. `@isInt id`.
    pub fn param_format(&self, param: &str) -> Option<FormatHint> {
        self.tags.iter().find_map(|t| {
            let hint = FormatHint::from_tag(&t.name)?;
            (t.text.split_whitespace().next() == Some(param)).then_some(hint)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"/**
     * Fetches a user.
     * Second line.
     * @param id - The user id
     * @param verbose include
     *   extra detail
     * @isInt id
     * @deprecated
     */"#;

    #[test]
    fn test_parse_description_and_tags() {
        let doc = JsDoc::parse(DOC);
        assert_eq!(doc.description.as_deref(), Some("Fetches a user.\nSecond line."));
        assert_eq!(doc.tags.len(), 4);
        assert!(doc.has_tag("deprecated"));
        assert_eq!(doc.param_description("id").as_deref(), Some("The user id"));
        assert_eq!(doc.param_description("verbose").as_deref(), Some("include extra detail"));
        assert_eq!(doc.param_format("id"), Some(FormatHint::Integer));
        assert_eq!(doc.param_format("verbose"), None);
    }

    #[test]
    fn test_default_tag() {
        let doc = JsDoc::parse("/** @default 10 */");
        assert_eq!(doc.default_value().unwrap().value, Some(serde_json::json!(10)));

        let doc = JsDoc::parse("/** @default active */");
        assert_eq!(doc.default_value().unwrap().value, Some(serde_json::json!("active")));
    }

    #[test]
    fn test_property_format() {
        let doc = JsDoc::parse("/**\n * Age in years\n * @isInt\n */");
        assert_eq!(doc.format(), Some(FormatHint::Integer));
        assert_eq!(doc.description.as_deref(), Some("Age in years"));
    }
}
