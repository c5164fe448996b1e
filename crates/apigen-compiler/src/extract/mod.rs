//! Controller extraction: annotated controllers to operation descriptors.
//!
//! Every route method becomes one [`Operation`]. Parameter, return and
//! response types are resolved through the [`TypeResolver`] into a single
//! [`SchemaRegistry`], which is frozen together with the operations into an
//! [`ApiIR`]. Any fatal error aborts the whole run; nothing partial escapes.

mod params;
mod path;
mod security;

pub use params::{bind, Binding};
pub use path::{join_path, placeholders, route_shape};

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::config::SecurityCombination;
use crate::decl::{
    Annotation, AnnotationTarget, AnnotationUse, ControllerDecl, DeclarationSource, HttpVerb,
    MethodDecl, ResponseStatus,
};
use crate::diagnostic::CompilerError;
use crate::ir::{
    ApiIR, BindingSource, ObjectSchema, Operation, ParameterDescriptor, PrimitiveKind,
    PropertySchema, ResponseDescriptor, SchemaNode, SecurityRequirement,
};
use crate::resolve::{apply_format, strip_undefined, Origin, SchemaRegistry, TypeResolver};

/// Walks the controllers of a declaration source and builds the IR.
pub struct ControllerExtractor<'a> {
    source: &'a dyn DeclarationSource,
    resolver: TypeResolver<'a>,
    registry: SchemaRegistry,
    security: SecurityCombination,
}

/// Controller-level settings inherited by every method.
struct ControllerContext {
    name: String,
    prefix: String,
    tags: Vec<String>,
    security: Option<Vec<SecurityRequirement>>,
    responses: IndexMap<ResponseStatus, ResponseDescriptor>,
    hidden: bool,
    deprecated: bool,
}

impl<'a> ControllerExtractor<'a> {
    pub fn new(source: &'a dyn DeclarationSource, security: SecurityCombination) -> Self {
        Self {
            source,
            resolver: TypeResolver::new(source),
            registry: SchemaRegistry::new(),
            security,
        }
    }

    /// Extracts every operation and freezes the registry.
    pub fn extract(mut self) -> Result<ApiIR, CompilerError> {
        let source = self.source;
        let mut operations: Vec<Operation> = Vec::new();
        let mut routes: HashMap<(HttpVerb, String), String> = HashMap::new();

        for controller in source.controllers() {
            let context = self.controller_context(controller)?;

            for method in &controller.methods {
                let Some(operation) = self.extract_method(&context, method)? else {
                    continue;
                };

                let key = (operation.verb, route_shape(&operation.path));
                if let Some(first) = routes.get(&key) {
                    return Err(CompilerError::DuplicateOperation {
                        verb: operation.verb.to_string(),
                        path: operation.path.clone(),
                        first: first.clone(),
                        second: operation.display_name(),
                    });
                }
                routes.insert(key, operation.display_name());

                tracing::debug!(
                    operation = %operation.display_name(),
                    verb = %operation.verb,
                    path = %operation.path,
                    "extracted operation"
                );
                operations.push(operation);
            }
        }

        for operation in &operations {
            self.check_operation_references(operation)?;
        }

        let definitions = self.registry.freeze()?;
        Ok(ApiIR {
            definitions,
            operations,
        })
    }

    fn controller_context(&mut self, controller: &ControllerDecl) -> Result<ControllerContext, CompilerError> {
        check_placement(&controller.annotations, AnnotationTarget::Controller)?;

        let name = controller.id.name.clone();
        let origin = Origin::new(controller.id.to_string(), controller.span.clone());
        let mut context = ControllerContext {
            prefix: join_path("", ""),
            tags: Vec::new(),
            security: security::declared(&controller.annotations, self.security),
            responses: IndexMap::new(),
            hidden: false,
            deprecated: false,
            name,
        };

        for use_ in &controller.annotations {
            match &use_.annotation {
                Annotation::Route(prefix) => context.prefix = join_path(prefix, ""),
                Annotation::Tags(tags) => push_unique(&mut context.tags, tags),
                Annotation::Hidden => context.hidden = true,
                Annotation::Deprecated => context.deprecated = true,
                Annotation::Response { .. } => {
                    let (status, response) = self.response(use_, &origin)?;
                    context.responses.insert(status, response);
                }
                _ => {}
            }
        }
        Ok(context)
    }

    /// Builds the operation for one method, or `None` for plain helpers.
    fn extract_method(
        &mut self,
        controller: &ControllerContext,
        method: &MethodDecl,
    ) -> Result<Option<Operation>, CompilerError> {
        let verbs: Vec<(&AnnotationUse, HttpVerb, &str)> = method
            .annotations
            .iter()
            .filter_map(|u| match &u.annotation {
                Annotation::Verb { verb, path } => Some((u, *verb, path.as_str())),
                _ => None,
            })
            .collect();

        let (verb, suffix) = match verbs.as_slice() {
            [] => {
                if let Some(stray) = method.annotations.first() {
                    return Err(CompilerError::MisplacedAnnotation {
                        name: stray.annotation.name().to_string(),
                        target: "method without an HTTP verb".to_string(),
                        location: stray.span.clone(),
                    });
                }
                return Ok(None);
            }
            [(_, verb, suffix)] => (*verb, *suffix),
            [_, (second, _, _), ..] => {
                return Err(CompilerError::InvalidAnnotation {
                    name: second.annotation.name().to_string(),
                    message: format!("{}.{} already has an HTTP verb", controller.name, method.name),
                    location: second.span.clone(),
                })
            }
        };

        check_placement(&method.annotations, AnnotationTarget::Method)?;

        let display = format!("{}.{}", controller.name, method.name);
        let origin = Origin::new(display.clone(), method.span.clone());
        let template = join_path(&controller.prefix, suffix);

        let parameters = self.extract_parameters(method, &template, &display)?;
        let implicit_body = implicit_body(&parameters);

        let return_type = method.return_type.as_ref().ok_or_else(|| CompilerError::MissingTypeAnnotation {
            what: format!("return type of {}", display),
            location: method.span.clone(),
        })?;
        let returns = match self.resolver.resolve_type(return_type, &origin, &mut self.registry)? {
            SchemaNode::Primitive(PrimitiveKind::Void) => None,
            node => Some(node),
        };

        let mut success: Option<(u16, Option<String>)> = None;
        let mut tags = controller.tags.clone();
        let mut operation_id = None;
        let mut hidden = controller.hidden;
        let mut deprecated = controller.deprecated;
        let mut method_responses = IndexMap::new();

        for use_ in &method.annotations {
            match &use_.annotation {
                Annotation::SuccessResponse { status, description } => {
                    success = Some((*status, description.clone()));
                }
                Annotation::Response { .. } => {
                    let (status, response) = self.response(use_, &origin)?;
                    method_responses.insert(status, response);
                }
                Annotation::Tags(more) => push_unique(&mut tags, more),
                Annotation::OperationId(id) => operation_id = Some(id.clone()),
                Annotation::Hidden => hidden = true,
                Annotation::Deprecated => deprecated = true,
                _ => {}
            }
        }

        let (success_status, success_description) = match success {
            Some((status, description)) => (status, description),
            None if returns.is_none() => (204, None),
            None => (200, None),
        };
        let success_description = success_description.unwrap_or_else(|| {
            let text = if returns.is_some() { "Ok" } else { "No content" };
            text.to_string()
        });

        let mut responses = IndexMap::new();
        responses.insert(
            ResponseStatus::Code(success_status),
            ResponseDescriptor {
                description: success_description,
                schema: returns.clone(),
            },
        );
        for (status, response) in controller.responses.iter().chain(method_responses.iter()) {
            responses.insert(*status, response.clone());
        }

        let security = security::declared(&method.annotations, self.security)
            .or_else(|| controller.security.clone())
            .unwrap_or_default();

        Ok(Some(Operation {
            controller: controller.name.clone(),
            method: method.name.clone(),
            verb,
            path: template,
            prefix: controller.prefix.clone(),
            parameters,
            returns,
            success_status,
            responses,
            security,
            tags,
            operation_id: operation_id.unwrap_or_else(|| method.name.clone()),
            description: method.description.clone(),
            deprecated,
            hidden,
            implicit_body,
        }))
    }

    fn extract_parameters(
        &mut self,
        method: &MethodDecl,
        template: &str,
        display: &str,
    ) -> Result<Vec<ParameterDescriptor>, CompilerError> {
        let mut parameters = Vec::with_capacity(method.parameters.len());
        let mut body_span = None;
        let mut implicit_span = None;
        let mut bound_placeholders: HashMap<String, String> = HashMap::new();

        for param in &method.parameters {
            check_placement(&param.annotations, AnnotationTarget::Parameter)?;
            let binding = bind(param, template, display)?;

            match binding.source {
                BindingSource::Body => {
                    if body_span.is_some() || implicit_span.is_some() {
                        return Err(CompilerError::DuplicateBody {
                            operation: display.to_string(),
                            location: param.span.clone(),
                        });
                    }
                    body_span = Some(param.span.clone());
                }
                BindingSource::ImplicitBodyField => {
                    if body_span.is_some() {
                        return Err(CompilerError::DuplicateBody {
                            operation: display.to_string(),
                            location: param.span.clone(),
                        });
                    }
                    implicit_span = Some(param.span.clone());
                }
                BindingSource::Path => {
                    if let Some(other) = bound_placeholders.insert(binding.wire_name.clone(), param.name.clone()) {
                        return Err(CompilerError::ConflictingBinding {
                            operation: display.to_string(),
                            parameter: param.name.clone(),
                            message: format!("placeholder '{{{}}}' is already bound to '{}'", binding.wire_name, other),
                            location: param.span.clone(),
                        });
                    }
                }
                _ => {}
            }

            if !binding.source.is_validated() {
                parameters.push(ParameterDescriptor {
                    name: param.name.clone(),
                    wire_name: binding.wire_name,
                    source: binding.source,
                    schema: None,
                    required: false,
                    default: None,
                    description: param.description.clone(),
                });
                continue;
            }

            let ty = param.ty.as_ref().ok_or_else(|| CompilerError::MissingTypeAnnotation {
                what: format!("parameter '{}' of {}", param.name, display),
                location: param.span.clone(),
            })?;
            let (ty, undefined) = strip_undefined(ty);
            let origin = Origin::new(display, param.span.clone());
            let mut schema = self.resolver.resolve_type(&ty, &origin, &mut self.registry)?;
            if let Some(hint) = param.format {
                schema = apply_format(schema, hint);
            }

            parameters.push(ParameterDescriptor {
                name: param.name.clone(),
                wire_name: binding.wire_name,
                source: binding.source,
                schema: Some(schema),
                required: !(param.optional || undefined || param.default.is_some()),
                default: param.default.as_ref().and_then(|d| d.value.clone()),
                description: param.description.clone(),
            });
        }

        for placeholder in placeholders(template) {
            if !bound_placeholders.contains_key(&placeholder) {
                return Err(CompilerError::UnboundPathPlaceholder {
                    operation: display.to_string(),
                    placeholder,
                    location: method.span.clone(),
                });
            }
        }

        Ok(parameters)
    }

    fn response(
        &mut self,
        use_: &AnnotationUse,
        origin: &Origin,
    ) -> Result<(ResponseStatus, ResponseDescriptor), CompilerError> {
        let Annotation::Response { status, description, schema } = &use_.annotation else {
            return Err(CompilerError::InvalidAnnotation {
                name: use_.annotation.name().to_string(),
                message: "expected a response annotation".to_string(),
                location: use_.span.clone(),
            });
        };
        let schema = match schema {
            Some(ty) => match self.resolver.resolve_type(ty, origin, &mut self.registry)? {
                SchemaNode::Primitive(PrimitiveKind::Void) => None,
                node => Some(node),
            },
            None => None,
        };
        let description = description.clone().unwrap_or_else(|| match status {
            ResponseStatus::Default => "Unexpected error".to_string(),
            ResponseStatus::Code(code) => code.to_string(),
        });
        Ok((*status, ResponseDescriptor { description, schema }))
    }

    fn check_operation_references(&self, operation: &Operation) -> Result<(), CompilerError> {
        let parameter_schemas = operation.parameters.iter().filter_map(|p| p.schema.as_ref());
        let response_schemas = operation.responses.values().filter_map(|r| r.schema.as_ref());
        for schema in parameter_schemas.chain(response_schemas).chain(operation.returns.as_ref()) {
            self.registry.check_references(schema)?;
        }
        Ok(())
    }
}

fn check_placement(annotations: &[AnnotationUse], target: AnnotationTarget) -> Result<(), CompilerError> {
    for use_ in annotations {
        if !use_.annotation.allowed_on(target) {
            return Err(CompilerError::MisplacedAnnotation {
                name: use_.annotation.name().to_string(),
                target: target.as_str().to_string(),
                location: use_.span.clone(),
            });
        }
    }
    Ok(())
}

fn push_unique(into: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !into.contains(value) {
            into.push(value.clone());
        }
    }
}

/// Object schema made of all implicit body fields, keyed by wire name.
fn implicit_body(parameters: &[ParameterDescriptor]) -> Option<ObjectSchema> {
    let mut object = ObjectSchema::new();
    for param in parameters.iter().filter(|p| p.source == BindingSource::ImplicitBodyField) {
        let Some(schema) = &param.schema else {
            continue;
        };
        object.properties.insert(
            param.wire_name.clone(),
            PropertySchema {
                schema: schema.clone(),
                required: param.required,
                default: param.default.clone(),
                description: param.description.clone(),
            },
        );
    }
    (!object.properties.is_empty()).then_some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{
        DeclId, Declaration, DeclarationGraph, Keyword, MethodDecl, ParameterDecl, PropertyDecl,
        TypeExpr, TypeRef,
    };

    fn user_graph() -> DeclarationGraph {
        DeclarationGraph::new()
            .with_declaration(Declaration::interface(
                DeclId::new("models", "User"),
                vec![
                    PropertyDecl::new("id", TypeExpr::keyword(Keyword::Number)),
                    PropertyDecl::new("name", TypeExpr::keyword(Keyword::String)).optional(),
                ],
            ))
            .unwrap()
    }

    fn controller() -> ControllerDecl {
        ControllerDecl::new(DeclId::new("controllers", "UsersController"))
            .annotate(Annotation::Route("users".into()))
    }

    fn get(path: &str) -> Annotation {
        Annotation::Verb { verb: HttpVerb::Get, path: path.into() }
    }

    fn num() -> TypeExpr {
        TypeExpr::keyword(Keyword::Number)
    }

    fn extract(graph: DeclarationGraph) -> Result<ApiIR, CompilerError> {
        ControllerExtractor::new(&graph, SecurityCombination::AnyOf).extract()
    }

    #[test]
    fn test_basic_operation() {
        let graph = user_graph().with_controller(
            controller().method(
                MethodDecl::new("getUser", TypeExpr::reference("User"))
                    .annotate(get("{id}"))
                    .param(ParameterDecl::new("id", num()))
                    .param(
                        ParameterDecl::new("name", TypeExpr::keyword(Keyword::String))
                            .annotate(Annotation::Query(None))
                            .optional(),
                    ),
            ),
        );

        let ir = extract(graph).unwrap();
        assert_eq!(ir.operations.len(), 1);

        let op = &ir.operations[0];
        assert_eq!(op.path, "/users/{id}");
        assert_eq!(op.prefix, "/users");
        assert_eq!(op.operation_id, "getUser");
        assert_eq!(op.success_status, 200);
        assert_eq!(op.returns, Some(SchemaNode::reference("User")));
        assert_eq!(op.parameters[0].source, BindingSource::Path);
        assert!(op.parameters[0].required);
        assert_eq!(op.parameters[1].source, BindingSource::Query);
        assert!(!op.parameters[1].required);
        assert!(ir.definitions.contains("User"));
    }

    #[test]
    fn test_void_return_is_no_content() {
        let graph = user_graph().with_controller(
            controller().method(
                MethodDecl::new("remove", TypeExpr::Ref(TypeRef::named("Promise").with_args(vec![TypeExpr::keyword(Keyword::Void)])))
                    .annotate(Annotation::Verb { verb: HttpVerb::Delete, path: "{id}".into() })
                    .param(ParameterDecl::new("id", num())),
            ),
        );

        let op = &extract(graph).unwrap().operations[0];
        assert_eq!(op.returns, None);
        assert_eq!(op.success_status, 204);
        assert!(op.responses.contains_key(&ResponseStatus::Code(204)));
    }

    #[test]
    fn test_implicit_body_from_unannotated_parameters() {
        let graph = user_graph().with_controller(
            controller().method(
                MethodDecl::new("create", TypeExpr::reference("User"))
                    .annotate(Annotation::Verb { verb: HttpVerb::Post, path: String::new() })
                    .param(ParameterDecl::new("name", TypeExpr::keyword(Keyword::String)))
                    .param(ParameterDecl::new("age", num()).optional()),
            ),
        );

        let op = &extract(graph).unwrap().operations[0];
        let body = op.implicit_body.as_ref().unwrap();
        assert!(body.properties["name"].required);
        assert!(!body.properties["age"].required);
        assert!(op.parameters.iter().all(|p| p.source == BindingSource::ImplicitBodyField));
    }

    #[test]
    fn test_body_mixed_with_implicit_fields_is_fatal() {
        let graph = user_graph().with_controller(
            controller().method(
                MethodDecl::new("create", TypeExpr::reference("User"))
                    .annotate(Annotation::Verb { verb: HttpVerb::Post, path: String::new() })
                    .param(ParameterDecl::new("user", TypeExpr::reference("User")).annotate(Annotation::Body))
                    .param(ParameterDecl::new("extra", num())),
            ),
        );
        assert!(matches!(extract(graph).unwrap_err(), CompilerError::DuplicateBody { .. }));
    }

    #[test]
    fn test_explicit_binding_leaves_placeholder_unbound() {
        let graph = user_graph().with_controller(
            controller().method(
                MethodDecl::new("getUser", TypeExpr::reference("User"))
                    .annotate(get("{id}"))
                    .param(ParameterDecl::new("id", num()).annotate(Annotation::Query(None))),
            ),
        );
        assert!(matches!(
            extract(graph).unwrap_err(),
            CompilerError::UnboundPathPlaceholder { ref placeholder, .. } if placeholder == "id"
        ));
    }

    #[test]
    fn test_request_and_injected_parameters_stay_out_of_registry() {
        let graph = user_graph().with_controller(
            controller().method(
                MethodDecl::new("list", TypeExpr::array(TypeExpr::reference("User")))
                    .annotate(get(""))
                    .param(ParameterDecl::new("req", TypeExpr::reference("ExpressRequest")).annotate(Annotation::Request))
                    .param(ParameterDecl::new("db", TypeExpr::reference("Database")).annotate(Annotation::Inject)),
            ),
        );

        let ir = extract(graph).unwrap();
        let op = &ir.operations[0];
        assert!(op.parameters.iter().all(|p| p.schema.is_none()));
        assert_eq!(ir.definitions.names().collect::<Vec<_>>(), vec!["User"]);
    }

    #[test]
    fn test_security_inheritance_and_override() {
        let graph = user_graph().with_controller(
            controller()
                .annotate(Annotation::Security(vec![("jwt".into(), vec!["read".into()])]))
                .method(MethodDecl::new("a", num()).annotate(get("a")))
                .method(
                    MethodDecl::new("b", num())
                        .annotate(get("b"))
                        .annotate(Annotation::Security(vec![("api_key".into(), vec![])]))
                        .annotate(Annotation::Security(vec![("jwt".into(), vec!["admin".into()])])),
                )
                .method(MethodDecl::new("c", num()).annotate(get("c")).annotate(Annotation::NoSecurity)),
        );

        let ir = extract(graph).unwrap();
        assert_eq!(ir.operations[0].security.len(), 1);
        assert_eq!(ir.operations[1].security.len(), 2);
        assert!(ir.operations[2].security.is_empty());
    }

    #[test]
    fn test_duplicate_route_is_fatal() {
        let graph = user_graph().with_controller(
            controller()
                .method(MethodDecl::new("a", num()).annotate(get("{id}")).param(ParameterDecl::new("id", num())))
                .method(MethodDecl::new("b", num()).annotate(get("{userId}")).param(ParameterDecl::new("userId", num()))),
        );
        assert!(matches!(extract(graph).unwrap_err(), CompilerError::DuplicateOperation { .. }));
    }

    #[test]
    fn test_misplaced_annotations() {
        let on_param = user_graph().with_controller(
            controller().method(
                MethodDecl::new("a", num())
                    .annotate(get(""))
                    .param(ParameterDecl::new("x", num()).annotate(Annotation::Hidden)),
            ),
        );
        assert!(matches!(extract(on_param).unwrap_err(), CompilerError::MisplacedAnnotation { .. }));

        let without_verb = user_graph().with_controller(
            controller().method(MethodDecl::new("helper", num()).annotate(Annotation::Deprecated)),
        );
        assert!(matches!(extract(without_verb).unwrap_err(), CompilerError::MisplacedAnnotation { .. }));
    }

    #[test]
    fn test_responses_and_operation_extras() {
        let graph = user_graph().with_controller(
            controller()
                .annotate(Annotation::Tags(vec!["Users".into()]))
                .annotate(Annotation::Response {
                    status: ResponseStatus::Default,
                    description: None,
                    schema: None,
                })
                .method(
                    MethodDecl::new("create", TypeExpr::reference("User"))
                        .annotate(Annotation::Verb { verb: HttpVerb::Post, path: String::new() })
                        .annotate(Annotation::SuccessResponse { status: 201, description: Some("Created".into()) })
                        .annotate(Annotation::Response {
                            status: ResponseStatus::Code(422),
                            description: Some("Validation failed".into()),
                            schema: Some(TypeExpr::keyword(Keyword::String)),
                        })
                        .annotate(Annotation::OperationId("createUser".into()))
                        .annotate(Annotation::Deprecated)
                        .param(ParameterDecl::new("user", TypeExpr::reference("User")).annotate(Annotation::Body)),
                ),
        );

        let op = &extract(graph).unwrap().operations[0];
        assert_eq!(op.success_status, 201);
        assert_eq!(op.operation_id, "createUser");
        assert!(op.deprecated);
        assert_eq!(op.tags, vec!["Users".to_string()]);
        let statuses: Vec<String> = op.responses.keys().map(|s| s.to_string()).collect();
        assert_eq!(statuses, vec!["201", "default", "422"]);
        assert_eq!(op.responses[&ResponseStatus::Code(201)].description, "Created");
        assert!(op.body_parameter().is_some());
    }
}
