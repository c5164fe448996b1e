//! Parameter binding rules.

use crate::decl::{Annotation, ParameterDecl};
use crate::diagnostic::CompilerError;
use crate::ir::BindingSource;
use crate::resolve::strip_undefined;

use super::path::placeholders;

/// Where one parameter is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub source: BindingSource,
    pub wire_name: String,
}

/// Decides a parameter's binding.
///
/// An explicit binding annotation always wins. Without one, a parameter named
/// like a path placeholder binds to the path; anything else becomes a field
/// of the implicit request body.
pub fn bind(param: &ParameterDecl, template: &str, operation: &str) -> Result<Binding, CompilerError> {
    let placeholders = placeholders(template);
    let explicit: Vec<&Annotation> = param
        .annotations
        .iter()
        .map(|u| &u.annotation)
        .filter(|a| a.is_binding())
        .collect();

    let (source, wire_name) = match explicit.as_slice() {
        [] if placeholders.contains(&param.name) => (BindingSource::Path, param.name.clone()),
        [] => (BindingSource::ImplicitBodyField, param.name.clone()),
        [annotation] => explicit_binding(annotation, &param.name),
        [first, second, ..] => {
            return Err(CompilerError::ConflictingBinding {
                operation: operation.to_string(),
                parameter: param.name.clone(),
                message: format!("both @{} and @{} are present", first.name(), second.name()),
                location: param.span.clone(),
            })
        }
    };

    if source == BindingSource::Path {
        if !placeholders.contains(&wire_name) {
            return Err(CompilerError::MissingPathPlaceholder {
                operation: operation.to_string(),
                parameter: param.name.clone(),
                path: template.to_string(),
                location: param.span.clone(),
            });
        }
        let undefined = param.ty.as_ref().map_or(false, |ty| strip_undefined(ty).1);
        if param.optional || undefined {
            return Err(CompilerError::OptionalPathParameter {
                operation: operation.to_string(),
                parameter: param.name.clone(),
                location: param.span.clone(),
            });
        }
    }

    Ok(Binding { source, wire_name })
}

fn explicit_binding(annotation: &Annotation, name: &str) -> (BindingSource, String) {
    let wire = |rename: &Option<String>| rename.clone().unwrap_or_else(|| name.to_string());
    match annotation {
        Annotation::Path(rename) => (BindingSource::Path, wire(rename)),
        Annotation::Query(rename) => (BindingSource::Query, wire(rename)),
        Annotation::Header(rename) => (BindingSource::Header, wire(rename)),
        Annotation::BodyProp(rename) => (BindingSource::ImplicitBodyField, wire(rename)),
        Annotation::Body => (BindingSource::Body, name.to_string()),
        Annotation::Request => (BindingSource::RequestContext, name.to_string()),
        _ => (BindingSource::Injected, name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Keyword, TypeExpr};

    fn param(name: &str) -> ParameterDecl {
        ParameterDecl::new(name, TypeExpr::keyword(Keyword::String))
    }

    #[test]
    fn test_implicit_path_and_body_binding() {
        let template = "/users/{id}";
        assert_eq!(bind(&param("id"), template, "op").unwrap().source, BindingSource::Path);
        assert_eq!(
            bind(&param("name"), template, "op").unwrap().source,
            BindingSource::ImplicitBodyField
        );
    }

    #[test]
    fn test_explicit_annotation_overrides_name_match() {
        let p = param("id").annotate(Annotation::Query(None));
        let binding = bind(&p, "/users/{id}", "op").unwrap();
        assert_eq!(binding.source, BindingSource::Query);
    }

    #[test]
    fn test_renamed_bindings() {
        let p = param("userId").annotate(Annotation::Path(Some("id".into())));
        let binding = bind(&p, "/users/{id}", "op").unwrap();
        assert_eq!(binding, Binding { source: BindingSource::Path, wire_name: "id".into() });

        let h = param("token").annotate(Annotation::Header(Some("x-token".into())));
        assert_eq!(bind(&h, "/users", "op").unwrap().wire_name, "x-token");
    }

    #[test]
    fn test_two_binding_annotations_conflict() {
        let p = param("id").annotate(Annotation::Query(None)).annotate(Annotation::Header(None));
        assert!(matches!(
            bind(&p, "/users", "op").unwrap_err(),
            CompilerError::ConflictingBinding { .. }
        ));
    }

    #[test]
    fn test_path_binding_without_placeholder() {
        let p = param("slug").annotate(Annotation::Path(None));
        assert!(matches!(
            bind(&p, "/users/{id}", "op").unwrap_err(),
            CompilerError::MissingPathPlaceholder { .. }
        ));
    }

    #[test]
    fn test_optional_path_parameter_rejected() {
        let p = param("id").optional();
        assert!(matches!(
            bind(&p, "/users/{id}", "op").unwrap_err(),
            CompilerError::OptionalPathParameter { .. }
        ));
    }
}
